use std::rc::Rc;

use crate::{cause::Cause, process::Process};

impl<I: 'static, O: 'static> Process<I, O> {
    /// Runs this process, then the one built by `next` if this one ended cleanly.
    ///
    /// Any other cause is re-raised as-is and `next` is never built. A panic while
    /// building `next` halts with that failure.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p: Process<(), i32> = Process::emit_all(vec![1, 2]).append(|| Process::emit_all(vec![3]));
    /// assert_eq!(p.run_log().unwrap(), vec![1, 2, 3]);
    /// ```
    pub fn append<F>(self, next: F) -> Self
    where
        F: FnOnce() -> Self + 'static,
    {
        self.on_halt(move |cause| match cause {
            Cause::End => next(),
            cause => Process::halt(cause),
        })
    }

    /// Runs the process built by `make` over and over, for as long as each run ends
    /// cleanly.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    ///
    /// let p: Process<(), i32> = Process::repeat(|| Process::emit_all(vec![1, 2]));
    /// let first: Vec<i32> = p.iter().take(5).map(Result::unwrap).collect();
    /// assert_eq!(first, vec![1, 2, 1, 2, 1]);
    /// ```
    pub fn repeat<F>(make: F) -> Self
    where
        F: Fn() -> Self + 'static,
    {
        repeat_with(Rc::new(make))
    }
}

fn repeat_with<I: 'static, O: 'static>(make: Rc<dyn Fn() -> Process<I, O>>) -> Process<I, O> {
    // suspended so that a run which ends immediately does not recurse here, and
    // so that a kill between rounds stops the repetition
    Process::suspend(move || {
        let again = Rc::clone(&make);
        make().append(move || repeat_with(again))
    })
}
