//! The status taxonomy and error type every fallible engine operation uses.
//!
//! The set of outcomes is closed: every fallible operation in this workspace
//! returns one of the [`Status`] variants, never an ad-hoc error. `thiserror`
//! gives us the `Display`/`Error` impls the same way the rest of the
//! workspace derives them.

use std::io;
use thiserror::Error;

/// Result type alias used throughout kvengine.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of outcomes a fallible operation can return.
///
/// `NotFound` and `StoppedByCb` are ordinary, expected outcomes, not
/// failures — they do not set the facade's thread-local diagnostic
/// message (see `errormsg()` on the `Database` facade).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Success.
    Ok,
    /// Catch-all for unexpected failure.
    UnknownError,
    /// Record or config item absent. Not an error.
    NotFound,
    /// Operation unimplemented for this engine.
    NotSupported,
    /// Caller supplied an illegal argument.
    InvalidArgument,
    /// The optional JSON config translator reported malformed input.
    ConfigParsingError,
    /// Config item has the wrong type for the requested accessor.
    ConfigTypeError,
    /// Range iteration was aborted by the caller's callback. Not an error.
    StoppedByCb,
    /// Device or host allocation failed.
    OutOfMemory,
    /// Unknown engine name requested at open.
    WrongEngineName,
    /// Operation forbidden inside a persistent transaction scope.
    TransactionScopeError,
    /// Compaction failed midway.
    DefragError,
    /// Persisted comparator name differs from the one supplied at open.
    ComparatorMismatch,
}

impl Status {
    /// Whether this status represents an ordinary, non-error outcome.
    pub fn is_soft(&self) -> bool {
        matches!(self, Status::Ok | Status::NotFound | Status::StoppedByCb)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::UnknownError => "UNKNOWN_ERROR",
            Status::NotFound => "NOT_FOUND",
            Status::NotSupported => "NOT_SUPPORTED",
            Status::InvalidArgument => "INVALID_ARGUMENT",
            Status::ConfigParsingError => "CONFIG_PARSING_ERROR",
            Status::ConfigTypeError => "CONFIG_TYPE_ERROR",
            Status::StoppedByCb => "STOPPED_BY_CB",
            Status::OutOfMemory => "OUT_OF_MEMORY",
            Status::WrongEngineName => "WRONG_ENGINE_NAME",
            Status::TransactionScopeError => "TRANSACTION_SCOPE_ERROR",
            Status::DefragError => "DEFRAG_ERROR",
            Status::ComparatorMismatch => "COMPARATOR_MISMATCH",
        };
        f.write_str(s)
    }
}

/// An error carrying a [`Status`] plus a human-readable message.
///
/// Engines and the facade propagate this with `?`. For every status
/// where [`Status::is_soft`] is false, the message becomes the
/// thread-local diagnostic string `Database::errormsg()` returns.
#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct Error {
    status: Status,
    message: String,
}

impl Error {
    /// Construct an error from a status and message.
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The status this error carries.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Error::new(Status::NotFound, e.to_string()),
            io::ErrorKind::OutOfMemory => Error::new(Status::OutOfMemory, e.to_string()),
            _ => Error::new(Status::UnknownError, e.to_string()),
        }
    }
}

/// Shorthand constructors, one per [`Status`] variant engines return often.
impl Error {
    /// `Status::NotFound`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::new(Status::NotFound, message)
    }

    /// `Status::NotSupported`.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Error::new(Status::NotSupported, message)
    }

    /// `Status::InvalidArgument`.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::new(Status::InvalidArgument, message)
    }

    /// `Status::ConfigParsingError`.
    pub fn config_parsing_error(message: impl Into<String>) -> Self {
        Error::new(Status::ConfigParsingError, message)
    }

    /// `Status::ConfigTypeError`.
    pub fn config_type_error(message: impl Into<String>) -> Self {
        Error::new(Status::ConfigTypeError, message)
    }

    /// `Status::WrongEngineName`.
    pub fn wrong_engine_name(message: impl Into<String>) -> Self {
        Error::new(Status::WrongEngineName, message)
    }

    /// `Status::TransactionScopeError`.
    pub fn transaction_scope_error(message: impl Into<String>) -> Self {
        Error::new(Status::TransactionScopeError, message)
    }

    /// `Status::ComparatorMismatch`.
    pub fn comparator_mismatch(message: impl Into<String>) -> Self {
        Error::new(Status::ComparatorMismatch, message)
    }

    /// `Status::OutOfMemory`.
    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Error::new(Status::OutOfMemory, message)
    }

    /// `Status::DefragError`.
    pub fn defrag_error(message: impl Into<String>) -> Self {
        Error::new(Status::DefragError, message)
    }
}
