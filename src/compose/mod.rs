//! Structural combinators.
//!
//! This module provides output transformation ([`Process::map`],
//! [`Process::try_map`], [`Process::flat_map`]) and sequencing
//! ([`Process::append`], [`Process::repeat`]).

mod chain;
mod map;
