//! Commonly used imports
//!
//! Use `use pullproc::prelude::*;` for quick access to the most common types.

// Core types
pub use crate::{Cause, Error, Failure, Process, Request, Result, Signal, Step};

// Execution
pub use crate::{ProcessIter, Runner};

// Tee inputs
pub use either::Either;
