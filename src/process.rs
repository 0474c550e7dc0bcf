//! The five-state process machine.
//!
//! A [`Process<I, O>`] is one pipeline stage described as data: it is either
//! finished ([`Halt`](Process::Halt)), has produced a value
//! ([`Emit`](Process::Emit)), needs a value ([`Await`](Process::Await)), is a
//! deferred step ([`Continue`](Process::Continue)) or must run a side effect first
//! ([`Effect`](Process::Effect)).
//!
//! Nothing happens until an interpreter (see [`Runner`](crate::Runner)) drives the
//! process. Every successor is built from closures, so an infinite pipeline only
//! occupies its current frontier.
//!
//! ```rust
//! use pullproc::prelude::*;
//!
//! let p: Process<(), i32> = Process::emit(1, Process::emit(2, Process::end()));
//! assert_eq!(p.run_log().unwrap(), vec![1, 2]);
//! ```

use std::{fmt, rc::Rc};

use crate::cause::{Cause, Failure, catching};

/// Deferred step; forced at most once, with the [`Signal`] it is forced with.
pub type Thunk<I, O> = Box<dyn FnOnce(Signal) -> Process<I, O>>;

/// Receives the answer to a [`Request`].
pub type Recv<I, O> = Box<dyn FnOnce(Result<I, Cause>) -> Process<I, O>>;

/// Side effect with no input or output.
pub type Action = Box<dyn FnOnce()>;

/// Synchronous, possibly blocking, source of one input.
pub type Source<I> = Rc<dyn Fn() -> Result<I, Cause>>;

/// Why a deferred step is being forced.
///
/// The interpreter forces every [`Continue`](Process::Continue) with
/// [`Signal::Resume`]. [`Process::kill`] forces it with [`Signal::Kill`], so a
/// step that has not been built yet can stop instead of running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Resume,
    Kill,
}

/// What an [`Await`](Process::Await) is waiting for.
///
/// A request the surrounding context cannot serve is answered with
/// `Err(Cause::End)`: there is nothing connected to provide it.
pub enum Request<I> {
    /// Call a function to obtain the value. May block the calling thread.
    Call(Source<I>),
    /// Next value from the upstream of a [`pipe`](Process::pipe).
    Input,
    /// Next value from the left side of a [`tee`](Process::tee).
    Left,
    /// Next value from the right side of a [`tee`](Process::tee).
    Right,
}

impl<I> Request<I> {
    pub fn call<F>(f: F) -> Self
    where
        F: Fn() -> Result<I, Cause> + 'static,
    {
        Request::Call(Rc::new(f))
    }
}

impl<I> Clone for Request<I> {
    fn clone(&self) -> Self {
        match self {
            Request::Call(source) => Request::Call(Rc::clone(source)),
            Request::Input => Request::Input,
            Request::Left => Request::Left,
            Request::Right => Request::Right,
        }
    }
}

impl<I> fmt::Debug for Request<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Call(_) => f.write_str("Call(..)"),
            Request::Input => f.write_str("Input"),
            Request::Left => f.write_str("Left"),
            Request::Right => f.write_str("Right"),
        }
    }
}

/// A pipeline stage consuming `I` and producing `O`.
pub enum Process<I, O> {
    /// Finished.
    Halt(Cause),
    /// Produced one output, then behaves as the tail.
    Emit(O, Box<Process<I, O>>),
    /// Needs one input before it knows what to do next.
    Await(Request<I>, Recv<I, O>),
    /// Deferred step, forced by the interpreter or by a kill.
    Continue(Thunk<I, O>),
    /// Run the action, then behave as the tail.
    Effect(Action, Box<Process<I, O>>),
}

impl<I: 'static, O: 'static> Process<I, O> {
    pub fn halt(cause: Cause) -> Self {
        Process::Halt(cause)
    }

    /// Clean end of stream.
    pub fn end() -> Self {
        Process::Halt(Cause::End)
    }

    pub fn fail(failure: Failure) -> Self {
        Process::Halt(Cause::Error(failure))
    }

    pub fn emit(head: O, tail: Self) -> Self {
        Process::Emit(head, Box::new(tail))
    }

    pub fn awaiting<F>(request: Request<I>, recv: F) -> Self
    where
        F: FnOnce(Result<I, Cause>) -> Self + 'static,
    {
        Process::Await(request, Box::new(recv))
    }

    /// Defers construction of a process until the interpreter reaches it.
    ///
    /// A kill arriving here halts with [`Cause::Kill`] and `thunk` is never
    /// called, which is what lets a kill stop an infinite generator.
    pub fn suspend<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Self + 'static,
    {
        Process::Continue(Box::new(move |signal: Signal| match signal {
            Signal::Resume => thunk(),
            Signal::Kill => Process::Halt(Cause::Kill),
        }))
    }

    /// Like [`suspend`](Process::suspend), but also forced by a kill.
    ///
    /// Combinators use this for steps that only rebuild structure around a
    /// process that already exists, so the kill reaches that process and its
    /// halt handlers.
    pub(crate) fn defer<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Self + 'static,
    {
        Process::Continue(Box::new(move |_: Signal| thunk()))
    }

    pub fn effect<F>(action: F, next: Self) -> Self
    where
        F: FnOnce() + 'static,
    {
        Process::Effect(Box::new(action), Box::new(next))
    }

    /// Total match over the five states, one handler per state.
    pub fn fold<R>(
        self,
        on_halt: impl FnOnce(Cause) -> R,
        on_emit: impl FnOnce(O, Self) -> R,
        on_await: impl FnOnce(Request<I>, Recv<I, O>) -> R,
        on_continue: impl FnOnce(Thunk<I, O>) -> R,
        on_effect: impl FnOnce(Action, Self) -> R,
    ) -> R {
        match self {
            Process::Halt(cause) => on_halt(cause),
            Process::Emit(head, tail) => on_emit(head, *tail),
            Process::Await(request, recv) => on_await(request, recv),
            Process::Continue(thunk) => on_continue(thunk),
            Process::Effect(action, next) => on_effect(action, *next),
        }
    }

    #[inline]
    pub const fn is_halt(&self) -> bool {
        matches!(self, Process::Halt(_))
    }
}

/// Builds a process from a user callback; a panic becomes a halt.
pub(crate) fn guard<I, O, F>(f: F) -> Process<I, O>
where
    I: 'static,
    O: 'static,
    F: FnOnce() -> Process<I, O>,
{
    catching(f).unwrap_or_else(Process::fail)
}

impl<I, O: fmt::Debug> fmt::Debug for Process<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Halt(cause) => f.debug_tuple("Halt").field(cause).finish(),
            Process::Emit(head, _) => f.debug_tuple("Emit").field(head).field(&"..").finish(),
            Process::Await(request, _) => f.debug_tuple("Await").field(request).finish(),
            Process::Continue(_) => f.write_str("Continue(..)"),
            Process::Effect(_, _) => f.write_str("Effect(..)"),
        }
    }
}
