//! Halt interception, kills and finalizers.
//!
//! - [`Process::on_halt`] rewrites every halt of a process into another process.
//! - [`Process::on_complete`] runs a finalizer on every exit path.
//! - [`Process::as_finalizer`] makes a process deaf to kills.
//! - [`Process::kill`] stops a running process at its next await or deferred step.
//! - [`Process::drain`] runs a process for its effects only.

use crate::{
    cause::Cause,
    process::{Process, Signal, guard},
};

type Handler<I, O> = Box<dyn FnOnce(Cause) -> Process<I, O>>;

impl<I: 'static, O: 'static> Process<I, O> {
    /// Replaces the eventual halt of this process with `handler(cause)`.
    ///
    /// This is the single hook behind concatenation, recovery and finalizers. A
    /// panic inside `handler` halts with that failure.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p: Process<(), i32> = Process::fail(Failure::msg("lost"))
    ///     .on_halt(|_| Process::emit(0, Process::end()));
    /// assert_eq!(p.run_log().unwrap(), vec![0]);
    /// ```
    pub fn on_halt<F>(self, handler: F) -> Self
    where
        F: FnOnce(Cause) -> Self + 'static,
    {
        self.on_halt_boxed(Box::new(handler))
    }

    fn on_halt_boxed(self, handler: Handler<I, O>) -> Self {
        match self {
            Process::Halt(cause) => guard(move || handler(cause)),
            Process::Emit(head, tail) => {
                Process::emit(head, Process::defer(move || (*tail).on_halt_boxed(handler)))
            }
            Process::Await(request, recv) => {
                Process::awaiting(request, move |r| recv(r).on_halt_boxed(handler))
            }
            Process::Continue(thunk) => {
                Process::Continue(Box::new(move |signal: Signal| thunk(signal).on_halt_boxed(handler)))
            }
            Process::Effect(action, next) => Process::Effect(
                action,
                Box::new(Process::defer(move || (*next).on_halt_boxed(handler))),
            ),
        }
    }

    /// Runs `finalizer` exactly once, however this process ends.
    ///
    /// The finalizer runs as a [`finalizer`](Process::as_finalizer), so a kill
    /// arriving while it is running cannot cut it short. On a clean end the result
    /// is the finalizer's own halt; on any other cause the original cause is
    /// re-raised after the finalizer ends cleanly.
    pub fn on_complete<F>(self, finalizer: F) -> Self
    where
        F: FnOnce() -> Self + 'static,
    {
        self.on_halt(move |cause| match cause {
            Cause::End => finalizer().as_finalizer(),
            cause => finalizer()
                .as_finalizer()
                .append(move || Process::halt(cause)),
        })
    }

    /// Makes this process deaf to kills: a pending await that is woken with a kill
    /// issues the same request again, and deferred steps are always resumed.
    pub fn as_finalizer(self) -> Self {
        match self {
            Process::Halt(cause) => Process::Halt(cause),
            Process::Emit(head, tail) => {
                Process::emit(head, Process::defer(move || (*tail).as_finalizer()))
            }
            Process::Await(request, recv) => {
                let again = request.clone();
                Process::awaiting(request, move |r| match r {
                    Err(Cause::Kill) => Process::Await(again, recv).as_finalizer(),
                    r => recv(r).as_finalizer(),
                })
            }
            Process::Continue(thunk) => {
                Process::Continue(Box::new(move |_: Signal| thunk(Signal::Resume).as_finalizer()))
            }
            Process::Effect(action, next) => Process::Effect(
                action,
                Box::new(Process::defer(move || (*next).as_finalizer())),
            ),
        }
    }

    /// Stops this process at its next await or deferred step.
    ///
    /// Pending outputs are dropped. A pending await is woken with
    /// [`Cause::Kill`]; a deferred step is forced with [`Signal::Kill`], so an
    /// unbuilt [`suspend`](Process::suspend) halts without running and halt
    /// handlers wrapped around it see the kill. Whatever the process does in
    /// response (typically its finalizers) runs with its output discarded.
    /// Effects already in the process still run.
    ///
    /// A process that ends because of the kill ends cleanly; any other cause it
    /// raises while stopping is kept.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let naturals: Process<(), u64> = Process::emit_all(1..);
    /// assert!(naturals.kill::<u64>().run_log().unwrap().is_empty());
    /// ```
    pub fn kill<O2: 'static>(self) -> Process<I, O2> {
        self.fold(
            |cause| match cause {
                Cause::Kill => Process::end(),
                cause => Process::halt(cause),
            },
            |_, tail| Process::defer(move || tail.kill()),
            |_, recv| {
                guard(move || recv(Err(Cause::Kill)))
                    .drain()
                    .on_halt(|cause| match cause {
                        Cause::Kill => Process::end(),
                        cause => Process::halt(cause),
                    })
            },
            |thunk| Process::defer(move || thunk(Signal::Kill).kill()),
            |action, next| Process::Effect(action, Box::new(Process::defer(move || next.kill()))),
        )
    }

    /// Discards every output while still running awaits and effects and keeping
    /// the halt.
    pub fn drain<O2: 'static>(self) -> Process<I, O2> {
        self.fold(
            Process::halt,
            |_, tail| Process::defer(move || tail.drain()),
            |request, recv| Process::awaiting(request, move |r| recv(r).drain()),
            |thunk| Process::Continue(Box::new(move |signal: Signal| thunk(signal).drain())),
            |action, next| Process::Effect(action, Box::new(Process::defer(move || next.drain()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
    };

    use crate::{Cause, Error, Failure, Process, Request};

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) + Clone + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let push = {
            let log = Rc::clone(&log);
            move |s: &str| log.borrow_mut().push(s.to_string())
        };
        (log, push)
    }

    fn noted(push: impl Fn(&str) + 'static, note: &'static str) -> Process<i32, i32> {
        Process::effect(move || push(note), Process::end())
    }

    #[test]
    fn test_on_halt_sees_the_cause() {
        let seen = Rc::new(RefCell::new(None));
        let p: Process<(), i32> = Process::emit(1, Process::fail(Failure::msg("x"))).on_halt({
            let seen = Rc::clone(&seen);
            move |cause| {
                *seen.borrow_mut() = Some(cause.to_string());
                Process::emit(2, Process::end())
            }
        });
        assert_eq!(p.run_log().unwrap(), vec![1, 2]);
        assert_eq!(seen.borrow().as_deref(), Some("x"));
    }

    #[test]
    fn test_on_halt_handler_panic_becomes_failure() {
        let p: Process<(), i32> = Process::end().on_halt(|_| panic!("handler broke"));
        let err = p.run_log().unwrap_err();
        assert_eq!(err.to_string(), "callback panicked: handler broke");
    }

    #[test]
    fn test_on_complete_runs_once_on_end() {
        let (log, push) = recorder();
        let p = Process::emit(1, Process::end()).on_complete({
            let push = push.clone();
            move || noted(push, "finalized")
        });
        assert_eq!(p.run_log().unwrap(), vec![1]);
        assert_eq!(*log.borrow(), vec!["finalized"]);
    }

    #[test]
    fn test_on_complete_reraises_failure_after_finalizer() {
        let (log, push) = recorder();
        let p = Process::emit(1, Process::fail(Failure::msg("broken")))
            .on_complete(move || noted(push, "finalized"));
        let err = p.run_log().unwrap_err();
        assert_eq!(err.to_string(), "broken");
        assert_eq!(*log.borrow(), vec!["finalized"]);
    }

    #[test]
    fn test_as_finalizer_ignores_kill() {
        // first answer is a kill, second is a real value
        let answers = Rc::new(RefCell::new(vec![Ok(7), Err(Cause::Kill)]));
        let request = Request::call({
            let answers = Rc::clone(&answers);
            move || answers.borrow_mut().pop().unwrap_or(Err(Cause::End))
        });
        let p: Process<i32, i32> = Process::awaiting(request, |r| match r {
            Ok(v) => Process::emit(v, Process::end()),
            Err(cause) => Process::halt(cause),
        })
        .as_finalizer();
        assert_eq!(p.run_log().unwrap(), vec![7]);
    }

    #[test]
    fn test_kill_feeds_kill_and_drains() {
        let (log, push) = recorder();
        let p: Process<i32, i32> = Process::awaiting(Request::Input, move |r| match r {
            Err(Cause::Kill) => Process::emit(
                99,
                Process::effect(move || push("cleanup"), Process::halt(Cause::Kill)),
            ),
            _ => Process::emit(1, Process::end()),
        });
        assert_eq!(p.kill::<i32>().run_log().unwrap(), Vec::<i32>::new());
        assert_eq!(*log.borrow(), vec!["cleanup"]);
    }

    #[test]
    fn test_kill_keeps_cleanup_failure() {
        let p: Process<i32, i32> =
            Process::awaiting(Request::Input, |_| Process::fail(Failure::msg("cleanup failed")));
        let err = p.kill::<i32>().run_log().unwrap_err();
        assert!(matches!(err, Error::Failed(_)));
        assert_eq!(err.to_string(), "cleanup failed");
    }

    #[test]
    fn test_kill_of_halted_process() {
        assert!(Process::<(), i32>::halt(Cause::Kill).kill::<i32>().run_log().is_ok());
        assert!(Process::<(), i32>::end().kill::<i32>().run_log().is_ok());
    }

    #[test]
    fn test_kill_stops_infinite_emitter_and_runs_finalizer() {
        let (log, push) = recorder();
        let pulled = Rc::new(Cell::new(0));
        let p: Process<(), u64> = Process::emit_all((1..).inspect({
            let pulled = Rc::clone(&pulled);
            move |_| pulled.set(pulled.get() + 1)
        }))
        .on_complete(move || Process::effect(move || push("finalized"), Process::end()));

        let mut it = p.iter();
        assert_eq!(it.next().unwrap().unwrap(), 1);
        assert_eq!(it.next().unwrap().unwrap(), 2);
        assert!(it.close().is_ok());
        assert_eq!(pulled.get(), 2);
        assert_eq!(*log.borrow(), vec!["finalized"]);
    }

    #[test]
    fn test_kill_stops_repeat_between_rounds() {
        let (log, push) = recorder();
        let rounds = Rc::new(Cell::new(0));
        let p: Process<(), i32> = Process::repeat({
            let rounds = Rc::clone(&rounds);
            move || {
                rounds.set(rounds.get() + 1);
                Process::emit_all(vec![1, 2])
            }
        })
        .on_complete(move || Process::effect(move || push("finalized"), Process::end()));

        let mut it = p.iter();
        let taken: Vec<i32> = it.by_ref().take(3).map(|r| r.unwrap()).collect();
        assert_eq!(taken, vec![1, 2, 1]);
        assert!(it.close().is_ok());
        assert_eq!(rounds.get(), 2);
        assert_eq!(*log.borrow(), vec!["finalized"]);
    }

    #[test]
    fn test_kill_does_not_cut_finalizer_short() {
        let (log, push) = recorder();
        let release = move || {
            let push = push.clone();
            Process::emit(1, Process::effect(move || push("released"), Process::end()))
        };

        let plain: Process<(), i32> = Process::suspend(release.clone());
        assert!(plain.kill::<i32>().run_log().is_ok());
        assert!(log.borrow().is_empty());

        let finalizer: Process<(), i32> = Process::suspend(release).as_finalizer();
        assert!(finalizer.kill::<i32>().run_log().is_ok());
        assert_eq!(*log.borrow(), vec!["released"]);
    }

    #[test]
    fn test_drain_keeps_effects_and_halt() {
        let (log, push) = recorder();
        let p: Process<(), i32> = Process::emit(
            1,
            Process::effect(move || push("effect"), Process::emit(2, Process::end())),
        );
        assert_eq!(p.drain::<i32>().run_log().unwrap(), Vec::<i32>::new());
        assert_eq!(*log.borrow(), vec!["effect"]);

        let p: Process<(), i32> = Process::emit(1, Process::fail(Failure::msg("kept")));
        assert_eq!(p.drain::<i32>().run_log().unwrap_err().to_string(), "kept");
    }
}
