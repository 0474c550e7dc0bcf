//! Two-input merge under a controller.
//!
//! `left.tee(right, controller)` runs `controller`, a process whose inputs are
//! [`Either`] values. Each [`Request::Left`] await of the controller pulls one
//! value from `left`, each [`Request::Right`] await pulls one from `right`. The
//! side that is not asked for does not run.
//!
//! When a side halts, its reason is handed to the controller as a failed input.
//! When the controller halts, both sides are killed and drained, left first, so
//! their finalizers run before the tee halts. A kill that is still the tee's
//! reason once both sides have stopped becomes a clean end.

use std::rc::Rc;

use either::Either;
use tracing::debug;

use crate::{
    cause::{Cause, Failure},
    handler::serve,
    process::{Process, Recv, Request, Signal, guard},
};

type Controller<L, R, O> = Process<Either<L, R>, O>;

impl<I: 'static, O: 'static> Process<I, O> {
    /// Merges this process with `right` as `controller` directs.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let left: Process<(), i32> = Process::emit_all(vec![1, 2, 3]);
    /// let right: Process<(), i32> = Process::emit_all(vec![10, 20, 30]);
    /// let sums = left.tee(right, Process::zip_with(|l: i32, r: i32| l + r));
    /// assert_eq!(sums.run_log().unwrap(), vec![11, 22, 33]);
    /// ```
    pub fn tee<R, O2>(
        self,
        right: Process<I, R>,
        controller: Process<Either<O, R>, O2>,
    ) -> Process<I, O2>
    where
        R: 'static,
        O2: 'static,
    {
        Process::defer(move || step(self, right, controller))
    }
}

fn step<I, L, R, O>(left: Process<I, L>, right: Process<I, R>, ctl: Controller<L, R, O>) -> Process<I, O>
where
    I: 'static,
    L: 'static,
    R: 'static,
    O: 'static,
{
    match ctl {
        Process::Halt(cause) => stop_sides(left, right, cause),
        Process::Emit(head, tail) => {
            Process::emit(head, Process::defer(move || step(left, right, *tail)))
        }
        Process::Await(Request::Left, recv) => pull_left(left, right, recv),
        Process::Await(Request::Right, recv) => pull_right(left, right, recv),
        Process::Await(request, recv) => Process::Continue(Box::new(move |signal: Signal| {
            let answer = match signal {
                Signal::Resume => serve(request),
                Signal::Kill => Err(Cause::Kill),
            };
            step(left, right, guard(move || recv(answer)))
        })),
        Process::Continue(thunk) => Process::Continue(Box::new(move |signal: Signal| {
            step(left, right, guard(move || thunk(signal)))
        })),
        Process::Effect(action, next) => Process::Effect(
            action,
            Box::new(Process::defer(move || step(left, right, *next))),
        ),
    }
}

fn pull_left<I, L, R, O>(
    left: Process<I, L>,
    right: Process<I, R>,
    recv: Recv<Either<L, R>, O>,
) -> Process<I, O>
where
    I: 'static,
    L: 'static,
    R: 'static,
    O: 'static,
{
    let waiting =
        |recv: Recv<Either<L, R>, O>| -> Controller<L, R, O> { Process::Await(Request::Left, recv) };
    match left {
        Process::Emit(head, tail) => Process::defer(move || {
            step(*tail, right, guard(move || recv(Ok(Either::Left(head)))))
        }),
        Process::Halt(cause) => Process::defer(move || {
            let reason = cause.clone();
            step(Process::Halt(cause), right, guard(move || recv(Err(reason))))
        }),
        Process::Await(request, lrecv) => Process::Await(
            request,
            Box::new(move |r| {
                let left = guard(move || lrecv(r));
                Process::defer(move || step(left, right, waiting(recv)))
            }),
        ),
        Process::Continue(thunk) => Process::Continue(Box::new(move |signal: Signal| {
            step(guard(move || thunk(signal)), right, waiting(recv))
        })),
        Process::Effect(action, next) => Process::Effect(
            action,
            Box::new(Process::defer(move || step(*next, right, waiting(recv)))),
        ),
    }
}

fn pull_right<I, L, R, O>(
    left: Process<I, L>,
    right: Process<I, R>,
    recv: Recv<Either<L, R>, O>,
) -> Process<I, O>
where
    I: 'static,
    L: 'static,
    R: 'static,
    O: 'static,
{
    let waiting =
        |recv: Recv<Either<L, R>, O>| -> Controller<L, R, O> { Process::Await(Request::Right, recv) };
    match right {
        Process::Emit(head, tail) => Process::defer(move || {
            step(left, *tail, guard(move || recv(Ok(Either::Right(head)))))
        }),
        Process::Halt(cause) => Process::defer(move || {
            let reason = cause.clone();
            step(left, Process::Halt(cause), guard(move || recv(Err(reason))))
        }),
        Process::Await(request, rrecv) => Process::Await(
            request,
            Box::new(move |r| {
                let right = guard(move || rrecv(r));
                Process::defer(move || step(left, right, waiting(recv)))
            }),
        ),
        Process::Continue(thunk) => Process::Continue(Box::new(move |signal: Signal| {
            step(left, guard(move || thunk(signal)), waiting(recv))
        })),
        Process::Effect(action, next) => Process::Effect(
            action,
            Box::new(Process::defer(move || step(left, *next, waiting(recv)))),
        ),
    }
}

fn stop_sides<I, L, R, O>(left: Process<I, L>, right: Process<I, R>, cause: Cause) -> Process<I, O>
where
    I: 'static,
    L: 'static,
    R: 'static,
    O: 'static,
{
    if !(left.is_halt() && right.is_halt()) {
        debug!(%cause, "tee controller halted, killing both sides");
    }
    left.kill().on_halt(move |from_left| {
        right.kill().on_halt(move |from_right| {
            match cause.join(from_left).join(from_right) {
                Cause::Kill => Process::end(),
                cause => Process::halt(cause),
            }
        })
    })
}

impl<L: 'static, R: 'static, O: 'static> Process<Either<L, R>, O> {
    /// Awaits one value from the left side of a tee.
    pub fn await_left<F>(f: F) -> Self
    where
        F: FnOnce(L) -> Self + 'static,
    {
        Process::awaiting(Request::Left, move |r| match r {
            Ok(Either::Left(value)) => f(value),
            Ok(Either::Right(_)) => Process::fail(Failure::msg("right value answered a left request")),
            Err(cause) => Process::halt(cause),
        })
    }

    /// Awaits one value from the right side of a tee.
    pub fn await_right<F>(f: F) -> Self
    where
        F: FnOnce(R) -> Self + 'static,
    {
        Process::awaiting(Request::Right, move |r| match r {
            Ok(Either::Right(value)) => f(value),
            Ok(Either::Left(_)) => Process::fail(Failure::msg("left value answered a right request")),
            Err(cause) => Process::halt(cause),
        })
    }

    /// Controller that takes one value from each side and combines them, until
    /// either side halts.
    pub fn zip_with<F>(f: F) -> Self
    where
        F: Fn(L, R) -> O + 'static,
    {
        zip_with_rc(Rc::new(f))
    }
}

fn zip_with_rc<L, R, O>(f: Rc<dyn Fn(L, R) -> O>) -> Controller<L, R, O>
where
    L: 'static,
    R: 'static,
    O: 'static,
{
    Process::await_left(move |l| {
        Process::await_right(move |r| Process::emit(f(l, r), zip_with_rc(f)))
    })
}

impl<L: 'static, R: 'static> Process<Either<L, R>, (L, R)> {
    /// Controller that pairs up values from both sides.
    pub fn zip() -> Self {
        Process::zip_with(|l, r| (l, r))
    }
}

impl<L: 'static, R: 'static> Process<Either<L, R>, Either<L, R>> {
    /// Controller that alternates between the sides, starting on the left, and
    /// halts as soon as the side it asks for has halted.
    ///
    /// ```rust
    /// use either::Either;
    /// use pullproc::prelude::*;
    ///
    /// let left: Process<(), i32> = Process::emit_all(vec![1, 2]);
    /// let right: Process<(), char> = Process::emit_all(vec!['a', 'b']);
    /// let out = left.tee(right, Process::interleave()).run_log().unwrap();
    /// assert_eq!(out, vec![Either::Left(1), Either::Right('a'), Either::Left(2), Either::Right('b')]);
    /// ```
    pub fn interleave() -> Self {
        Process::await_left(|l| {
            Process::emit(
                Either::Left(l),
                Process::await_right(|r| Process::emit(Either::Right(r), Process::interleave())),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use either::Either::{self, Left, Right};

    use crate::{Cause, Failure, Process, Request};

    struct Side {
        pulls: Rc<Cell<i32>>,
        finalized: Rc<Cell<i32>>,
    }

    /// A side that pays one request per value and counts its finalizer runs.
    fn side<T: Clone + 'static>(values: Vec<T>) -> (Side, Process<(), T>) {
        let pulls = Rc::new(Cell::new(0));
        let finalized = Rc::new(Cell::new(0));
        let p = read(Rc::clone(&pulls), Rc::new(values)).on_complete({
            let finalized = Rc::clone(&finalized);
            move || Process::effect(move || finalized.set(finalized.get() + 1), Process::end())
        });
        (Side { pulls, finalized }, p)
    }

    fn read<T: Clone + 'static>(pulls: Rc<Cell<i32>>, values: Rc<Vec<T>>) -> Process<(), T> {
        Process::request(|| Ok(()), move |r| match r {
            Ok(()) => {
                let i = pulls.get();
                pulls.set(i + 1);
                let next = values.get(i as usize).cloned();
                match next {
                    Some(v) => Process::emit(v, read(pulls, values)),
                    None => Process::end(),
                }
            }
            Err(cause) => Process::halt(cause),
        })
    }

    #[test]
    fn test_interleave_until_a_side_is_exhausted() {
        let (l, left) = side(vec![1, 2, 3]);
        let (r, right) = side(vec!["a", "b"]);
        let out = left.tee(right, Process::interleave()).run_log().unwrap();
        assert_eq!(out, vec![Left(1), Right("a"), Left(2), Right("b"), Left(3)]);
        assert_eq!(l.finalized.get(), 1);
        assert_eq!(r.finalized.get(), 1);
        // nothing more was asked of left after its third value
        assert_eq!(l.pulls.get(), 3);
    }

    #[test]
    fn test_killed_side_drains_the_other() {
        let (l, left) = side(vec![1, 2, 3, 4, 5]);
        let right: Process<(), &str> = Process::emit("a", Process::halt(Cause::Kill));

        let seen: Vec<Either<i32, &str>> =
            left.tee(right, Process::interleave()).run_log().unwrap();
        assert_eq!(seen, vec![Left(1), Right("a"), Left(2)]);
        assert_eq!(l.pulls.get(), 2);
        assert_eq!(l.finalized.get(), 1);
    }

    #[test]
    fn test_side_kill_lets_what_follows_run() {
        let (_, left) = side(vec![1, 2]);
        let right: Process<(), i32> = Process::halt(Cause::Kill);
        let zipped = left.tee(right, Process::zip());
        // the tee ends cleanly, so what follows it still runs
        let out = zipped.append(|| Process::emit((0, 0), Process::end())).run_log().unwrap();
        assert_eq!(out, vec![(0, 0)]);
    }

    #[test]
    fn test_infinite_sides_into_take() {
        let left: Process<(), u64> = Process::emit_all(1u64..);
        let right: Process<(), u64> = Process::emit_all((1u64..).map(|x| x * 100));
        let sums = left.tee(right, Process::zip_with(|l: u64, r: u64| l + r));
        assert_eq!(sums.pipe(Process::take(3)).run_log().unwrap(), vec![101, 202, 303]);
    }

    #[test]
    fn test_downstream_take_stops_both_sides() {
        let (l, left) = side(vec![1, 2, 3]);
        let (r, right) = side(vec!['x', 'y', 'z']);
        let out = left.tee(right, Process::zip()).pipe(Process::take(1)).run_log().unwrap();
        assert_eq!(out, vec![(1, 'x')]);
        assert_eq!((l.pulls.get(), r.pulls.get()), (1, 1));
        assert_eq!((l.finalized.get(), r.finalized.get()), (1, 1));
    }

    #[test]
    fn test_killed_nested_tee_finalizes_every_side() {
        let (a, first) = side(vec![1, 2]);
        let (b, second) = side(vec!["a", "b"]);
        let (c, third) = side(vec!['x', 'y']);
        let inner = first.tee(second, Process::interleave());
        let outer = inner.tee(third, Process::zip());
        assert!(outer.kill::<(Either<i32, &str>, char)>().run_log().unwrap().is_empty());
        for s in [&a, &b, &c] {
            assert_eq!(s.pulls.get(), 0);
            assert_eq!(s.finalized.get(), 1);
        }
    }

    #[test]
    fn test_killed_tee_skips_pending_controller_call() {
        let calls = Rc::new(Cell::new(0));
        let ctl: Process<Either<i32, i32>, i32> = Process::request(
            {
                let calls = Rc::clone(&calls);
                move || {
                    calls.set(calls.get() + 1);
                    Ok(Left(0))
                }
            },
            |r| match r {
                Ok(_) => Process::emit(1, Process::end()),
                Err(cause) => Process::halt(cause),
            },
        );
        let (l, left) = side(vec![1]);
        let (_, right) = side(vec![2]);
        assert!(left.tee(right, ctl).kill::<i32>().run_log().unwrap().is_empty());
        assert_eq!(calls.get(), 0);
        assert_eq!(l.finalized.get(), 1);
    }

    #[test]
    fn test_zip_stops_at_shorter_side() {
        let (l, left) = side(vec![1, 2, 3]);
        let (r, right) = side(vec!['x', 'y']);
        let out = left.tee(right, Process::zip()).run_log().unwrap();
        assert_eq!(out, vec![(1, 'x'), (2, 'y')]);
        assert_eq!(l.finalized.get(), 1);
        assert_eq!(r.finalized.get(), 1);
    }

    #[test]
    fn test_side_failure_reaches_caller_after_cleanup() {
        let (l, left) = side(vec![1, 2, 3]);
        let right: Process<(), i32> = Process::emit(10, Process::fail(Failure::msg("right broke")));
        let err = left
            .tee(right, Process::zip_with(|a: i32, b: i32| a * b))
            .run_log()
            .unwrap_err();
        assert_eq!(err.to_string(), "right broke");
        assert_eq!(l.finalized.get(), 1);
    }

    #[test]
    fn test_controller_sees_side_halt() {
        let (_, left) = side(Vec::<i32>::new());
        let (_, right) = side(vec![5]);
        // on a halted left, fall back to the right side
        let ctl: Process<Either<i32, i32>, i32> = Process::awaiting(Request::Left, |r| match r {
            Ok(Left(v)) => Process::emit(v, Process::end()),
            Ok(Right(_)) => Process::end(),
            Err(_) => Process::await_right(|v| Process::emit(v * 100, Process::end())),
        });
        assert_eq!(left.tee(right, ctl).run_log().unwrap(), vec![500]);
    }

    #[test]
    fn test_unasked_side_never_runs() {
        let (l, left) = side(vec![1, 2]);
        let (r, right) = side(vec![9]);
        let ctl: Process<Either<i32, i32>, i32> =
            Process::await_left(|v| Process::emit(v, Process::end()));
        assert_eq!(left.tee(right, ctl).run_log().unwrap(), vec![1]);
        assert_eq!(l.pulls.get(), 1);
        assert_eq!(r.pulls.get(), 0);
        assert_eq!(r.finalized.get(), 1);
    }
}
