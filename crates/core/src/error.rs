use thiserror::Error;

use crate::handle::ForeignTypeId;

/// Errors raised while packing or parsing a marker payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("marker payload must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("invalid affinity value {0} (expected 0 = upstream or 1 = downstream)")]
    InvalidAffinity(u32),

    #[error("invalid boolean byte {value:#04x} in field '{field}'")]
    InvalidBool { field: &'static str, value: u8 },
}

/// Errors raised by the marker API and its backends.
///
/// A foreign crash inside a private primitive is not representable here: the
/// primitives have no error channel. Backends prevent that class of failure by
/// reporting [`MarkerError::Unavailable`] instead of calling them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarkerError {
    #[error("text marker backend '{backend}' is unavailable: {reason}")]
    Unavailable { backend: &'static str, reason: String },

    #[error("buffer too small for a text marker payload: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("foreign object has type id {actual}, expected {expected}")]
    TypeMismatch { expected: ForeignTypeId, actual: ForeignTypeId },

    #[error("markers belong to different backends")]
    BackendMismatch,

    #[error("no text marker backend registered with id '{0}'")]
    BackendNotFound(String),

    #[error("unexpected null from {0}")]
    InvalidHandle(&'static str),

    #[error("{context} failed: {message}")]
    Foreign { context: &'static str, message: String },
}

impl MarkerError {
    pub fn unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable { backend, reason: reason.into() }
    }

    pub fn foreign(context: &'static str, err: impl ToString) -> Self {
        Self::Foreign { context, message: err.to_string() }
    }

    /// True for errors that only mean "this backend is switched off".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
