//! TCAM error types and caller-facing status codes.

use std::fmt;

use switch_regs::{BlockAddr, RegError};
use thiserror::Error;

/// Outcome classes reported to callers of the rule-level API.
///
/// Busy timeouts and transport failures both collapse into `Fail`: without
/// transport-specific diagnostics a caller cannot tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcamStatus {
    Ok,
    InvalidArgument,
    NotFound,
    Fail,
}

impl TcamStatus {
    pub fn is_ok(&self) -> bool {
        *self == TcamStatus::Ok
    }
}

impl fmt::Display for TcamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TcamStatus::Ok => "TCAM_OK",
            TcamStatus::InvalidArgument => "TCAM_INVALID_ARGUMENT",
            TcamStatus::NotFound => "TCAM_NOT_FOUND",
            TcamStatus::Fail => "TCAM_FAIL",
        };
        write!(f, "{}", s)
    }
}

/// Error type for TCAM operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TcamError {
    /// A caller-supplied value is out of range or malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The busy bit did not clear within the poll budget.
    #[error("TCAM block {block} still busy after {attempts} polls")]
    BusyTimeout { block: BlockAddr, attempts: u32 },

    /// The register transport failed.
    #[error("register transport failure: {0}")]
    Transport(#[from] RegError),

    /// No valid entry at or after the requested slot.
    #[error("no valid TCAM entry for slot {slot}")]
    NotFound { slot: u16 },

    /// A previous holder of the table lock panicked.
    #[error("TCAM table lock poisoned")]
    LockPoisoned,

    /// The configuration could not be parsed or is inconsistent.
    #[error("invalid TCAM configuration: {message}")]
    Config { message: String },
}

impl TcamError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        TcamError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(slot: u16) -> Self {
        TcamError::NotFound { slot }
    }

    pub fn config(message: impl Into<String>) -> Self {
        TcamError::Config {
            message: message.into(),
        }
    }

    /// Maps the error onto the status class a caller sees.
    pub fn status(&self) -> TcamStatus {
        match self {
            TcamError::InvalidArgument { .. } | TcamError::Config { .. } => {
                TcamStatus::InvalidArgument
            }
            TcamError::NotFound { .. } => TcamStatus::NotFound,
            TcamError::BusyTimeout { .. }
            | TcamError::Transport(_)
            | TcamError::LockPoisoned => TcamStatus::Fail,
        }
    }

    /// Returns true for failures where re-running the whole operation may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TcamError::BusyTimeout { .. } | TcamError::Transport(_))
    }
}

/// Result type for TCAM operations.
pub type TcamResult<T> = Result<T, TcamError>;

/// Extension for collapsing a result into its status class.
pub trait TcamResultExt {
    fn status(&self) -> TcamStatus;
}

impl<T> TcamResultExt for TcamResult<T> {
    fn status(&self) -> TcamStatus {
        match self {
            Ok(_) => TcamStatus::Ok,
            Err(e) => e.status(),
        }
    }
}
