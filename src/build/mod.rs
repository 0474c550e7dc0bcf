//! Building processes from scratch
//!
//! This module provides the constructors callers start pipelines from: fixed
//! values, request/response pairs, lifted functions and scoped resources.

mod func;
mod resource;
