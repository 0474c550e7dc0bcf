//! One-to-one composition.
//!
//! `up.pipe(down)` feeds every output of `up` to the [`Request::Input`] awaits of
//! `down`. The pipe is pulled from the downstream end: `up` only runs when
//! `down` asks for a value, and once `down` halts `up` is killed and drained so
//! its finalizers run.

use std::rc::Rc;

use tracing::debug;

use crate::{
    cause::Cause,
    handler::serve,
    process::{Process, Recv, Request, Signal, guard},
};

impl<I: 'static, O: 'static> Process<I, O> {
    /// Connects the outputs of this process to the inputs of `down`.
    ///
    /// - When `down` halts, this process is killed. The pipe halts with the
    ///   reason of `down`, unless `down` ended cleanly and stopping this process
    ///   failed.
    /// - When `down` awaits input and this process has halted, `down` receives
    ///   the halt reason as a failed input and decides what to do.
    /// - Any other request of `down` is served in place, unless the pipe is
    ///   killed first: then `down` receives the kill and the request is never
    ///   made.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p: Process<(), i32> = Process::emit_all(1..);
    /// let evens = p.pipe(Process::filter(|x: &i32| x % 2 == 0)).pipe(Process::take(3));
    /// assert_eq!(evens.run_log().unwrap(), vec![2, 4, 6]);
    /// ```
    pub fn pipe<O2: 'static>(self, down: Process<O, O2>) -> Process<I, O2> {
        Process::defer(move || step(self, down))
    }
}

fn step<I, O, O2>(up: Process<I, O>, down: Process<O, O2>) -> Process<I, O2>
where
    I: 'static,
    O: 'static,
    O2: 'static,
{
    match down {
        Process::Halt(cause) => stop_upstream(up, cause),
        Process::Emit(head, tail) => Process::emit(head, Process::defer(move || step(up, *tail))),
        Process::Await(Request::Input, recv) => feed(up, recv),
        Process::Await(request, recv) => Process::Continue(Box::new(move |signal: Signal| {
            let answer = match signal {
                Signal::Resume => serve(request),
                Signal::Kill => Err(Cause::Kill),
            };
            step(up, guard(move || recv(answer)))
        })),
        Process::Continue(thunk) => {
            Process::Continue(Box::new(move |signal: Signal| step(up, guard(move || thunk(signal)))))
        }
        Process::Effect(action, next) => {
            Process::Effect(action, Box::new(Process::defer(move || step(up, *next))))
        }
    }
}

/// Downstream is waiting for input: advance upstream until it has one.
fn feed<I, O, O2>(up: Process<I, O>, recv: Recv<O, O2>) -> Process<I, O2>
where
    I: 'static,
    O: 'static,
    O2: 'static,
{
    match up {
        Process::Emit(head, tail) => {
            Process::defer(move || step(*tail, guard(move || recv(Ok(head)))))
        }
        Process::Halt(cause) => Process::defer(move || {
            let reason = cause.clone();
            step(Process::Halt(cause), guard(move || recv(Err(reason))))
        }),
        Process::Await(request, urecv) => Process::Await(
            request,
            Box::new(move |r| {
                let up = guard(move || urecv(r));
                Process::defer(move || step(up, Process::Await(Request::Input, recv)))
            }),
        ),
        Process::Continue(thunk) => Process::Continue(Box::new(move |signal: Signal| {
            step(guard(move || thunk(signal)), Process::Await(Request::Input, recv))
        })),
        Process::Effect(action, next) => Process::Effect(
            action,
            Box::new(Process::defer(move || step(*next, Process::Await(Request::Input, recv)))),
        ),
    }
}

fn stop_upstream<I, O, O2>(up: Process<I, O>, cause: Cause) -> Process<I, O2>
where
    I: 'static,
    O: 'static,
    O2: 'static,
{
    if !up.is_halt() {
        debug!(%cause, "downstream halted, killing upstream");
    }
    up.kill().on_halt(move |stopped| {
        if !cause.is_end() && !stopped.is_end() {
            debug!(%cause, %stopped, "both ends of pipe halted abnormally");
        }
        Process::halt(cause.join(stopped))
    })
}

impl<I: 'static> Process<I, I> {
    /// Passes every input through unchanged.
    pub fn echo() -> Self {
        Process::await1(|input| Process::emit(input, Process::echo()))
    }

    /// Passes the first `n` inputs through, then ends.
    ///
    /// Upstream is not asked for anything after the `n`th value.
    pub fn take(n: usize) -> Self {
        if n == 0 {
            return Process::end();
        }
        Process::await1(move |input| Process::emit(input, Process::take(n - 1)))
    }

    /// Passes inputs through for as long as `keep` holds, then ends.
    pub fn take_while<F>(keep: F) -> Self
    where
        F: Fn(&I) -> bool + 'static,
    {
        take_while_with(Rc::new(keep))
    }

    /// Passes through only the inputs for which `keep` holds.
    pub fn filter<F>(keep: F) -> Self
    where
        F: Fn(&I) -> bool + 'static,
    {
        filter_with(Rc::new(keep))
    }
}

type Predicate<I> = Rc<dyn Fn(&I) -> bool>;

fn take_while_with<I: 'static>(keep: Predicate<I>) -> Process<I, I> {
    Process::await1(move |input| {
        if keep(&input) {
            Process::emit(input, take_while_with(keep))
        } else {
            Process::end()
        }
    })
}

fn filter_with<I: 'static>(keep: Predicate<I>) -> Process<I, I> {
    Process::await1(move |input| {
        if keep(&input) {
            Process::emit(input, filter_with(keep))
        } else {
            // rejected inputs loop through the interpreter, not the stack
            Process::suspend(move || filter_with(keep))
        }
    })
}
