//! Driving processes to completion.
//!
//! The interpreter is a single loop over a "current process" cursor. Combinators
//! return [`Continue`](Process::Continue) instead of recursing, and this loop is
//! the only place those thunks are forced, so pipelines of any length run in
//! constant stack.
//!
//! - [`Process::run_log`] collects every output.
//! - [`Process::run`] returns the first output, then stops the rest.
//! - [`Runner`] configures a run, e.g. with an output limit.

use tracing::{debug, debug_span, trace, warn};

use crate::{
    cause::{Cause, Error, Failure, Result, catching},
    process::{Process, Request, Signal, guard},
    step::Step,
};

/// Next output and the rest of the process, or how the process finished.
pub type Advanced<I, O> = Step<(O, Process<I, O>), Result<()>>;

/// Runs a process until it emits or halts.
///
/// Awaits are served here: [`Request::Call`] invokes its source, any other
/// request has nothing connected at the root and receives [`Cause::End`].
///
/// A kill that reaches the root completes the process cleanly.
pub fn advance<I: 'static, O: 'static>(mut cur: Process<I, O>) -> Advanced<I, O> {
    let mut steps: u64 = 0;
    loop {
        steps += 1;
        cur = match cur {
            Process::Emit(head, tail) => return Step::Yielded((head, *tail)),
            Process::Halt(cause) => {
                trace!(steps, %cause, "process halted");
                return Step::Complete(match cause {
                    Cause::End => Ok(()),
                    Cause::Kill => {
                        debug!(steps, "kill reached the root, treating it as a clean end");
                        Ok(())
                    }
                    Cause::Error(failure) => Err(Error::Failed(failure)),
                });
            }
            Process::Await(request, recv) => {
                let input = serve(request);
                guard(move || recv(input))
            }
            Process::Continue(thunk) => guard(move || thunk(Signal::Resume)),
            Process::Effect(action, next) => match catching(action) {
                Ok(()) => *next,
                Err(failure) => abandon(*next, failure),
            },
        };
    }
}

pub(crate) fn serve<I>(request: Request<I>) -> std::result::Result<I, Cause> {
    match request {
        Request::Call(source) => match catching(|| source()) {
            Ok(answer) => answer,
            Err(failure) => Err(Cause::Error(failure)),
        },
        Request::Input | Request::Left | Request::Right => Err(Cause::End),
    }
}

/// A failed effect still lets the rest of the process clean up.
fn abandon<I: 'static, O: 'static>(rest: Process<I, O>, failure: Failure) -> Process<I, O> {
    rest.kill().on_halt(move |_| Process::fail(failure))
}

/// Interpreter configuration.
///
/// ```rust
/// use pullproc::prelude::*;
///
/// let p: Process<(), i32> = Process::emit_all(1..=10);
/// let first = Runner::new().max_outputs(3).run_log(p).unwrap();
/// assert_eq!(first, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Runner {
    max_outputs: Option<usize>,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `n` outputs.
    ///
    /// The rest of the process is then killed and driven until it halts, so its
    /// finalizers run before the runner returns.
    pub fn max_outputs(mut self, n: usize) -> Self {
        self.max_outputs = Some(n);
        self
    }

    /// Collects every output until the process ends cleanly.
    ///
    /// Any other halt is returned as an error; outputs gathered so far are
    /// discarded.
    pub fn run_log<I: 'static, O: 'static>(&self, p: Process<I, O>) -> Result<Vec<O>> {
        let _span = debug_span!("run_log", limit = ?self.max_outputs).entered();
        let mut out = Vec::new();
        self.drive(p, |o| out.push(o))?;
        Ok(out)
    }

    /// Returns the first output (or `None` on a clean end without one) and stops
    /// the rest of the process.
    ///
    /// `max_outputs` does not apply here: `run` always stops after exactly one
    /// output.
    pub fn run<I: 'static, O: 'static>(&self, p: Process<I, O>) -> Result<Option<O>> {
        let _span = debug_span!("run").entered();
        let mut first = None;
        Runner {
            max_outputs: Some(1),
        }
        .drive(p, |o| first = Some(o))?;
        Ok(first)
    }

    fn drive<I: 'static, O: 'static>(&self, mut p: Process<I, O>, mut sink: impl FnMut(O)) -> Result<()> {
        let mut emitted = 0usize;
        loop {
            if self.max_outputs.is_some_and(|n| emitted >= n) {
                debug!(emitted, "output limit reached, stopping process");
                return finish(p.kill::<O>());
            }
            match advance(p) {
                Step::Yielded((o, rest)) => {
                    sink(o);
                    emitted += 1;
                    p = rest;
                }
                Step::Complete(done) => return done,
            }
        }
    }
}

/// Drives a stopped process until it halts, discarding anything it emits.
pub(crate) fn finish<I: 'static, O: 'static>(mut p: Process<I, O>) -> Result<()> {
    loop {
        match advance(p) {
            Step::Yielded((_, rest)) => p = rest,
            Step::Complete(done) => {
                if let Err(e) = &done {
                    warn!(error = %e, "cleanup after stopping a process failed");
                }
                return done;
            }
        }
    }
}

impl<I: 'static, O: 'static> Process<I, O> {
    /// Runs to completion and collects every output.
    pub fn run_log(self) -> Result<Vec<O>> {
        Runner::default().run_log(self)
    }

    /// Runs until the first output, then stops the rest of the process.
    pub fn run(self) -> Result<Option<O>> {
        Runner::default().run(self)
    }
}
