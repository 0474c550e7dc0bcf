/// Outcome of advancing a process: either it yielded a value and can continue, or it
/// completed.
///
/// The interpreter produces `Step<(O, Process<I, O>), Result<()>>`: the next output
/// together with the rest of the process, or the way the process finished.
///
/// # Examples
///
/// ```rust
/// use pullproc::prelude::*;
///
/// let p: Process<(), i32> = Process::emit(42, Process::end());
/// let Step::Yielded((first, rest)) = pullproc::advance(p) else {
///     panic!("expected an output");
/// };
/// assert_eq!(first, 42);
/// assert!(matches!(pullproc::advance(rest), Step::Complete(Ok(()))));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step<Y, D> {
    /// Produced an intermediate value
    Yielded(Y),
    /// Finished with a final value
    Complete(D),
}
