pub mod audio;
pub(crate) mod delivery;
pub mod video;

use crate::models::error::RecorderError;

/// Providers report their own error kinds; anything that is not already a
/// source/acquisition error is reported as an acquisition failure.
pub(crate) fn as_acquisition_failure(err: RecorderError, what: &str) -> RecorderError {
    match err {
        RecorderError::SourceUnavailable(_) | RecorderError::AcquisitionFailure(_) => err,
        other => RecorderError::AcquisitionFailure(format!("{}: {}", what, other)),
    }
}
