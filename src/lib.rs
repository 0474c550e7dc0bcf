//! # pullproc: resource-safe pull-based stream processes
//!
//! A [`Process<I, O>`] describes one pipeline stage as an explicit state machine:
//! it emits a value, awaits a value, runs an effect, defers a step or halts.
//! Stages compose into pipelines without running anything; an interpreter then
//! pulls values through them in constant stack space.
//!
//! ## Key Features
//!
//! - **Composable**: sequence with [`append`](Process::append), transform with
//!   [`map`](Process::map) and [`flat_map`](Process::flat_map), connect with
//!   [`pipe`](Process::pipe) and [`tee`](Process::tee)
//! - **Resource-safe**: [`resource`](Process::resource) and
//!   [`on_complete`](Process::on_complete) release on every exit path, including
//!   when a downstream stage stops early
//! - **Stack-safe**: recursion goes through [`Process::Continue`], which only the
//!   interpreter and [`kill`](Process::kill) force
//! - **Stoppable**: a kill stops infinite sources at their next step, so
//!   `Process::emit_all(1..).pipe(Process::take(3))` ends
//!
//! ## Example
//!
//! ```
//! use pullproc::prelude::*;
//! use std::{cell::Cell, rc::Rc};
//!
//! let released = Rc::new(Cell::new(false));
//! let lines: Process<(), &str> = Process::resource(
//!     || vec!["alpha", "beta", "gamma"],
//!     |_| {},
//!     { let released = released.clone(); move |_| released.set(true) },
//!     |file| Process::emit_all((0..file.len()).map(move |i| file[i])),
//! );
//!
//! // only two lines are needed; the file is still released
//! let out: Vec<usize> = lines.map(str::len).pipe(Process::take(2)).run_log().unwrap();
//! assert_eq!(out, vec![5, 4]);
//! assert!(released.get());
//! ```
//!
//! ## Common Functions
//!
//! **Building processes:**
//! - [`Process::emit_all`] - emit fixed values
//! - [`Process::source`] / [`Process::request`] - pull values from a blocking call
//! - [`Process::lift`] - apply a function to every input
//! - [`Process::resource`] - scoped acquisition with guaranteed release
//!
//! **Execution:**
//! - [`Process::run_log`] - collect every output
//! - [`Process::run`] - first output only
//! - [`Process::iter`] - pull outputs one at a time

mod build;
mod cause;
mod compose;
mod finalize;
mod handler;
mod iter;
mod pipe;
pub mod prelude;
mod process;
mod step;
mod tee;

pub use cause::{Cause, Error, Failure, Result};
pub use handler::{Advanced, Runner, advance};
pub use iter::ProcessIter;
pub use process::{Action, Process, Recv, Request, Signal, Source, Thunk};
pub use step::*;
