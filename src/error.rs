//! Error kinds shared by every component of the debugger core.
//!
//! These mirror the error kinds named in the design: they are not meant to
//! be exhaustively pattern-matched by callers trying to recover fine-grained
//! behavior, just reported or used to decide whether an operation can be
//! retried.

use std::fmt;

use libc::pid_t;

/// The single error type returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("process {pid} exited with status {status}")]
    ProcessExited { pid: pid_t, status: i32 },

    #[error("operation requires the target to be stopped")]
    TargetRunning,

    #[error("thread {0} is not known to this process")]
    InvalidThread(pid_t),

    #[error("address 0x{0:x} is not a valid breakpoint address")]
    InvalidAddress(u64),

    #[error("a breakpoint is already set at 0x{0:x}")]
    AlreadySet(u64),

    #[error("not found")]
    NotFound,

    #[error("nil pointer dereference")]
    NilDeref,

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("arithmetic error: {0}")]
    ArithmeticError(String),

    #[error("key not found in map")]
    KeyNotFound,

    #[error("already at the top of the stack")]
    TopOfStack,

    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("unknown identifier: {0}")]
    Unknown(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A reason a [`Variable`](crate::eval::value::Variable) could not be fully
/// loaded. Stored inline on the variable rather than aborting the walk that
/// produced it (see the propagation policy in the design notes).
#[derive(Clone, Debug)]
pub struct UnreadableReason(pub String);

impl fmt::Display for UnreadableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Error> for UnreadableReason {
    fn from(e: Error) -> Self {
        UnreadableReason(e.to_string())
    }
}
