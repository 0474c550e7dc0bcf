//! Pulling outputs one at a time.
//!
//! [`Process::iter`] turns a process into an iterator of `Result<O>`. Every
//! output is yielded as `Ok`; a halt other than a clean end is yielded once as
//! `Err` and ends the iteration.
//!
//! ```rust
//! use pullproc::prelude::*;
//!
//! let p: Process<(), i32> = Process::emit_all(vec![1, 2])
//!     .append(|| Process::fail(Failure::msg("truncated")));
//! let mut iter = p.iter();
//! assert_eq!(iter.next().unwrap().unwrap(), 1);
//! assert_eq!(iter.next().unwrap().unwrap(), 2);
//! assert_eq!(iter.next().unwrap().unwrap_err().to_string(), "truncated");
//! assert!(iter.next().is_none());
//! ```
//!
//! An iterator that is abandoned part way does not stop the process on its own.
//! Call [`ProcessIter::close`] to kill the rest and run its finalizers.

use tracing::debug;

use crate::{
    cause::Result,
    handler::{advance, finish},
    process::Process,
    step::Step,
};

/// Iterator over the outputs of a [`Process`].
///
/// Both `ProcessIter` and `&mut ProcessIter` implement `Iterator`, so part of the
/// outputs can be taken before the iterator is closed.
pub struct ProcessIter<I, O> {
    state: State<I, O>,
}

enum State<I, O> {
    Active(Process<I, O>),
    Complete(Result<()>),
    Invalid,
}

impl<I, O> State<I, O> {
    fn take(&mut self) -> Self {
        std::mem::replace(self, State::Invalid)
    }
}

impl<I: 'static, O: 'static> ProcessIter<I, O> {
    pub fn new(process: Process<I, O>) -> Self {
        Self {
            state: State::Active(process),
        }
    }

    /// Whether the process has halted.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete(_))
    }

    /// How the process halted, once it has.
    pub fn outcome(&self) -> Option<&Result<()>> {
        match &self.state {
            State::Complete(done) => Some(done),
            _ => None,
        }
    }

    /// Stops the process and waits for its finalizers.
    ///
    /// On a process that has already halted this returns how it halted.
    pub fn close(mut self) -> Result<()> {
        match self.state.take() {
            State::Active(p) => {
                debug!("closing process iterator before completion");
                finish(p.kill::<O>())
            }
            State::Complete(done) => done,
            State::Invalid => Ok(()),
        }
    }
}

impl<I: 'static, O: 'static> Iterator for ProcessIter<I, O> {
    type Item = Result<O>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state.take() {
            State::Active(p) => match advance(p) {
                Step::Yielded((output, rest)) => {
                    self.state = State::Active(rest);
                    Some(Ok(output))
                }
                Step::Complete(Ok(())) => {
                    self.state = State::Complete(Ok(()));
                    None
                }
                Step::Complete(Err(e)) => {
                    self.state = State::Complete(Err(e.clone()));
                    Some(Err(e))
                }
            },
            State::Complete(done) => {
                self.state = State::Complete(done);
                None
            }
            State::Invalid => None,
        }
    }
}

impl<I: 'static, O: 'static> Process<I, O> {
    /// Iterates over the outputs of this process.
    pub fn iter(self) -> ProcessIter<I, O> {
        ProcessIter::new(self)
    }
}

impl<I: 'static, O: 'static> IntoIterator for Process<I, O> {
    type Item = Result<O>;
    type IntoIter = ProcessIter<I, O>;

    fn into_iter(self) -> Self::IntoIter {
        ProcessIter::new(self)
    }
}
