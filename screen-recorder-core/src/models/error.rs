use thiserror::Error;

/// Errors surfaced by the recorder.
///
/// The first three variants are the structural failures that abort
/// `start()`. Steady-state delivery problems (a track that is not ready, a
/// container that is not writable) never become errors; the sample is
/// dropped instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("acquisition failed: {0}")]
    AcquisitionFailure(String),

    #[error("writer failure: {0}")]
    WriterFailure(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("finalization failed: {0}")]
    FinalizationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Coarse category of a [`RecorderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceUnavailable,
    AcquisitionFailure,
    WriterFailure,
    InvalidState,
    InvalidConfiguration,
    FinalizationFailed,
    StorageError,
}

impl RecorderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            Self::AcquisitionFailure(_) => ErrorKind::AcquisitionFailure,
            Self::WriterFailure(_) => ErrorKind::WriterFailure,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::FinalizationFailed(_) => ErrorKind::FinalizationFailed,
            Self::StorageError(_) => ErrorKind::StorageError,
        }
    }

    /// Whether this error aborts `start()` (as opposed to being reported
    /// after the fact through a completion signal).
    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SourceUnavailable | ErrorKind::AcquisitionFailure | ErrorKind::WriterFailure
        )
    }
}
