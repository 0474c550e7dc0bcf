//! Transforming the outputs of a process.

use std::rc::Rc;

use crate::{
    cause::{Cause, Failure, catching},
    process::{Process, Signal},
};

type MapFn<O, O2> = Rc<dyn Fn(O) -> Result<O2, Failure>>;
type BindFn<I, O, O2> = Rc<dyn Fn(O) -> Process<I, O2>>;

impl<I: 'static, O: 'static> Process<I, O> {
    /// Transforms every output with `f`.
    ///
    /// A panic in `f` halts the process with that failure after the rest of the
    /// process is killed, so its finalizers still run.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p: Process<(), i32> = Process::emit_all(vec![1, 2, 3]);
    /// assert_eq!(p.map(|x| x * 10).run_log().unwrap(), vec![10, 20, 30]);
    /// ```
    pub fn map<O2, F>(self, f: F) -> Process<I, O2>
    where
        O2: 'static,
        F: Fn(O) -> O2 + 'static,
    {
        self.map_with(Rc::new(move |o: O| -> Result<O2, Failure> { Ok(f(o)) }))
    }

    /// Like [`map`](Process::map), but `f` may reject a value.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p: Process<(), &str> = Process::emit_all(vec!["1", "x", "3"]);
    /// let parsed = p.try_map(|s| s.parse::<i32>().map_err(Failure::new));
    /// assert!(parsed.run_log().is_err());
    /// ```
    pub fn try_map<O2, F>(self, f: F) -> Process<I, O2>
    where
        O2: 'static,
        F: Fn(O) -> Result<O2, Failure> + 'static,
    {
        self.map_with(Rc::new(f))
    }

    fn map_with<O2: 'static>(self, f: MapFn<O, O2>) -> Process<I, O2> {
        match self {
            Process::Halt(cause) => Process::Halt(cause),
            Process::Emit(head, tail) => match catching(|| f(head)).and_then(|r| r) {
                Ok(mapped) => {
                    Process::emit(mapped, Process::defer(move || (*tail).map_with(f)))
                }
                Err(failure) => abandon(*tail, failure),
            },
            Process::Await(request, recv) => {
                Process::awaiting(request, move |r| recv(r).map_with(f))
            }
            Process::Continue(thunk) => {
                Process::Continue(Box::new(move |signal: Signal| thunk(signal).map_with(f)))
            }
            Process::Effect(action, next) => Process::Effect(
                action,
                Box::new(Process::defer(move || (*next).map_with(f))),
            ),
        }
    }

    /// Replaces every output with the process `f` builds from it.
    ///
    /// Each sub-process runs to its end before the rest of this process resumes; a
    /// sub-process that halts with anything but a clean end kills the rest of
    /// this process and stops the whole process with that cause.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p: Process<(), i32> = Process::emit_all(vec![1, 2]);
    /// let twice = p.flat_map(|x| Process::emit_all(vec![x, x]));
    /// assert_eq!(twice.run_log().unwrap(), vec![1, 1, 2, 2]);
    /// ```
    pub fn flat_map<O2, F>(self, f: F) -> Process<I, O2>
    where
        O2: 'static,
        F: Fn(O) -> Process<I, O2> + 'static,
    {
        self.flat_map_with(Rc::new(f))
    }

    fn flat_map_with<O2: 'static>(self, f: BindFn<I, O, O2>) -> Process<I, O2> {
        match self {
            Process::Halt(cause) => Process::Halt(cause),
            Process::Emit(head, tail) => match catching(|| f(head)) {
                Ok(sub) => sub.on_halt(move |cause| match cause {
                    Cause::End => (*tail).flat_map_with(f),
                    cause => (*tail)
                        .kill()
                        .on_halt(move |stopped| Process::halt(cause.join(stopped))),
                }),
                Err(failure) => abandon(*tail, failure),
            },
            Process::Await(request, recv) => {
                Process::awaiting(request, move |r| recv(r).flat_map_with(f))
            }
            Process::Continue(thunk) => {
                Process::Continue(Box::new(move |signal: Signal| thunk(signal).flat_map_with(f)))
            }
            Process::Effect(action, next) => Process::Effect(
                action,
                Box::new(Process::defer(move || (*next).flat_map_with(f))),
            ),
        }
    }
}

/// Kills what is left of a process whose callback failed, then fails.
fn abandon<I, O, O2>(rest: Process<I, O>, failure: Failure) -> Process<I, O2>
where
    I: 'static,
    O: 'static,
    O2: 'static,
{
    rest.kill().on_halt(move |_| Process::fail(failure))
}
