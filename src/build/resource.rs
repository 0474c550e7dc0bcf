use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use tracing::trace;

use crate::process::Process;

impl<I: 'static, O: 'static> Process<I, O> {
    /// Scoped acquisition of an external resource.
    ///
    /// `create` and then `initialize` run as effects, after which `body` runs
    /// with a handle to the resource. `release` runs exactly once after `body`
    /// halts, whether it ends, fails or is killed by a surrounding pipe or tee,
    /// and the body's halt is re-raised afterwards.
    ///
    /// If `initialize` fails the resource is still released and `body` is never
    /// built. If `create` fails there is nothing to release.
    ///
    /// ```rust
    /// use pullproc::prelude::*;
    /// use std::{cell::RefCell, rc::Rc};
    ///
    /// let log = Rc::new(RefCell::new(Vec::new()));
    /// let p: Process<(), &str> = Process::resource(
    ///     || "conn",
    ///     { let log = log.clone(); move |_: &&str| log.borrow_mut().push("open") },
    ///     { let log = log.clone(); move |_: &&str| log.borrow_mut().push("close") },
    ///     |conn| Process::emit(*conn, Process::end()),
    /// );
    /// assert_eq!(p.run_log().unwrap(), vec!["conn"]);
    /// assert_eq!(*log.borrow(), vec!["open", "close"]);
    /// ```
    pub fn resource<R, C, N, L, B>(create: C, initialize: N, release: L, body: B) -> Self
    where
        R: 'static,
        C: FnOnce() -> R + 'static,
        N: FnOnce(&R) + 'static,
        L: FnOnce(&R) + 'static,
        B: FnOnce(Rc<R>) -> Self + 'static,
    {
        let slot: Rc<RefCell<Option<Rc<R>>>> = Rc::new(RefCell::new(None));
        let created = Rc::clone(&slot);
        Process::effect(
            move || *created.borrow_mut() = Some(Rc::new(create())),
            Process::defer(move || {
                // empty only when `create` failed and the rest is being abandoned
                let Some(handle) = slot.borrow_mut().take() else {
                    return Process::end();
                };
                scoped(handle, initialize, release, body)
            }),
        )
    }
}

fn scoped<I, O, R, N, L, B>(handle: Rc<R>, initialize: N, release: L, body: B) -> Process<I, O>
where
    I: 'static,
    O: 'static,
    R: 'static,
    N: FnOnce(&R) + 'static,
    L: FnOnce(&R) + 'static,
    B: FnOnce(Rc<R>) -> Process<I, O> + 'static,
{
    let ready = Rc::new(Cell::new(false));
    let opened = Rc::clone(&ready);
    let for_init = Rc::clone(&handle);
    let for_body = Rc::clone(&handle);
    Process::effect(
        move || {
            initialize(&for_init);
            opened.set(true);
        },
        Process::suspend(move || {
            if ready.get() {
                body(for_body)
            } else {
                Process::end()
            }
        }),
    )
    .on_halt(move |cause| {
        trace!(%cause, "resource scope halted, releasing");
        Process::effect(move || release(&handle), Process::halt(cause))
    })
}
