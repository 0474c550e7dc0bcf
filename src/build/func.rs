use std::rc::Rc;

use crate::{
    cause::Cause,
    process::{Process, Request, Source},
};

impl<I: 'static, O: 'static> Process<I, O> {
    /// Emits each value in order, then ends.
    ///
    /// The values are pulled from the iterator lazily, one per output, and
    /// nothing is pulled before the process is run. A panic in the iterator
    /// halts the process with that failure. The iterator may be infinite: a
    /// surrounding [`take`](Process::take) or [`run`](Process::run) stops it.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p: Process<(), char> = Process::emit_all("abc".chars());
    /// assert_eq!(p.run_log().unwrap(), vec!['a', 'b', 'c']);
    /// ```
    pub fn emit_all<T>(values: T) -> Self
    where
        T: IntoIterator<Item = O>,
        T::IntoIter: 'static,
    {
        let values = values.into_iter();
        Process::suspend(move || emit_iter(values))
    }

    /// Awaits the answer to `request` and continues as `recv` decides.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p = Process::request(|| Ok(20), |r: Result<i32, Cause>| match r {
    ///     Ok(v) => Process::emit(v + 1, Process::end()),
    ///     Err(cause) => Process::halt(cause),
    /// });
    /// assert_eq!(p.run_log().unwrap(), vec![21]);
    /// ```
    pub fn request<R, F>(request: R, recv: F) -> Self
    where
        R: Fn() -> Result<I, Cause> + 'static,
        F: FnOnce(Result<I, Cause>) -> Self + 'static,
    {
        Process::awaiting(Request::call(request), recv)
    }

    /// Awaits the next input from upstream and continues as `f` decides.
    ///
    /// If upstream has halted, this process halts with the same cause.
    pub fn await1<F>(f: F) -> Self
    where
        F: FnOnce(I) -> Self + 'static,
    {
        Process::awaiting(Request::Input, move |r| match r {
            Ok(input) => f(input),
            Err(cause) => Process::halt(cause),
        })
    }

    /// Applies `f` to every input from upstream, ending when upstream does.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let src: Process<(), i32> = Process::emit_all(vec![1, 2, 3]);
    /// let out = src.pipe(Process::lift(|x: i32| x * x)).run_log().unwrap();
    /// assert_eq!(out, vec![1, 4, 9]);
    /// ```
    pub fn lift<F>(f: F) -> Self
    where
        F: Fn(I) -> O + 'static,
    {
        lift_with(Rc::new(f))
    }
}

fn lift_with<I: 'static, O: 'static>(f: Rc<dyn Fn(I) -> O>) -> Process<I, O> {
    Process::await1(move |input| Process::emit(f(input), lift_with(f)))
}

impl<I: 'static> Process<I, I> {
    /// Asks `request` once and emits the answer.
    pub fn eval<R>(request: R) -> Self
    where
        R: Fn() -> Result<I, Cause> + 'static,
    {
        Process::request(request, |r| match r {
            Ok(value) => Process::emit(value, Process::end()),
            Err(cause) => Process::halt(cause),
        })
    }

    /// Asks `request` repeatedly and emits every answer, until it answers with an
    /// error: `Err(Cause::End)` ends the stream cleanly.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    /// use std::cell::Cell;
    ///
    /// let n = Cell::new(0);
    /// let p = Process::source(move || {
    ///     n.set(n.get() + 1);
    ///     if n.get() <= 3 { Ok(n.get()) } else { Err(Cause::End) }
    /// });
    /// assert_eq!(p.run_log().unwrap(), vec![1, 2, 3]);
    /// ```
    pub fn source<R>(request: R) -> Self
    where
        R: Fn() -> Result<I, Cause> + 'static,
    {
        poll(Rc::new(request))
    }
}

fn emit_iter<I, O, T>(mut values: T) -> Process<I, O>
where
    I: 'static,
    O: 'static,
    T: Iterator<Item = O> + 'static,
{
    match values.next() {
        Some(value) => Process::emit(value, Process::suspend(move || emit_iter(values))),
        None => Process::end(),
    }
}

fn poll<I: 'static>(source: Source<I>) -> Process<I, I> {
    let again = Rc::clone(&source);
    Process::awaiting(Request::Call(source), move |r| match r {
        Ok(value) => Process::emit(value, Process::suspend(move || poll(again))),
        Err(cause) => Process::halt(cause),
    })
}
