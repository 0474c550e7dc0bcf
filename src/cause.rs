//! Why a process stopped, and what the interpreter reports.
//!
//! Every [`Process::Halt`](crate::Process::Halt) carries a [`Cause`]. Two causes are
//! reserved: [`Cause::End`] is a clean, expected completion and [`Cause::Kill`] is the
//! signal a composition uses to cut one of its stages short. Anything else is an
//! ordinary [`Failure`] that travels to the caller of the interpreter untouched.

use std::{
    any::Any,
    error::Error as StdError,
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

/// Reason a process halted.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Cause {
    /// Clean end of stream.
    #[error("end of stream")]
    End,
    /// A pipe or tee no longer needs this process.
    #[error("process killed")]
    Kill,
    /// Any other failure.
    #[error(transparent)]
    Error(#[from] Failure),
}

impl Cause {
    #[inline]
    pub const fn is_end(&self) -> bool {
        matches!(self, Cause::End)
    }

    #[inline]
    pub const fn is_kill(&self) -> bool {
        matches!(self, Cause::Kill)
    }

    /// Reason for two halts in a row: the first one wins unless it was a clean
    /// end.
    ///
    /// When both are failures the first is reported and the later one is kept
    /// as its [`source`](StdError::source), see [`Failure::suppressed`].
    pub fn join(self, later: Cause) -> Cause {
        match (self, later) {
            (Cause::End, later) => later,
            (Cause::Error(first), Cause::Error(then)) if !first.ptr_eq(&then) => {
                Cause::Error(Failure::new(Both { first, then }))
            }
            (cause, _) => cause,
        }
    }

    /// Returns the carried failure, if this is an ordinary failure.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Cause::Error(f) => Some(f),
            _ => None,
        }
    }
}

/// An arbitrary error payload carried by a halted process.
///
/// Cloning is cheap; all clones point at the same underlying error, so
/// [`Failure::downcast_ref`] recovers exactly what was raised.
#[derive(Clone)]
pub struct Failure(Rc<dyn StdError + 'static>);

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

#[derive(Debug, thiserror::Error)]
#[error("callback panicked: {0}")]
struct Panicked(String);

/// A failure raised while stopping after an earlier one.
#[derive(Debug, thiserror::Error)]
#[error("{first}")]
struct Both {
    first: Failure,
    #[source]
    then: Failure,
}

impl Failure {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        Failure(Rc::new(error))
    }

    /// Failure with only a message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Failure::new(Message(message.to_string()))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_string(),
                Err(_) => "non-string panic payload".to_string(),
            },
        };
        Failure::new(Panicked(message))
    }

    /// Recovers the raised error. For a joined failure this is the first one.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self.0.downcast_ref::<Both>() {
            Some(both) => both.first.downcast_ref(),
            None => self.0.downcast_ref::<E>(),
        }
    }

    /// The later failure a [`Cause::join`] kept behind this one.
    pub fn suppressed(&self) -> Option<&Failure> {
        self.0.downcast_ref::<Both>().map(|both| &both.then)
    }

    /// Whether two failures are the same raised value, not merely equal.
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Error returned by the interpreter when a process halts with a failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Failed(#[from] Failure),
}

impl Error {
    pub fn failure(&self) -> &Failure {
        match self {
            Error::Failed(f) => f,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Runs a user callback, turning a panic into a [`Failure`].
pub(crate) fn catching<T>(f: impl FnOnce() -> T) -> Result<T, Failure> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(Failure::from_panic)
}
