use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::SessionState;

/// Event delegate for recorder notifications.
///
/// Methods are called from whichever thread caused the event: the control
/// thread for start/stop transitions, an adapter's delivery thread for a
/// writer fault, the finalize thread for completion. Implementations should
/// marshal to the UI thread if needed.
pub trait RecorderDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &SessionState);

    /// Called when a structural error occurs, including finalization
    /// failures.
    fn on_error(&self, error: &RecorderError);

    /// Called when the container has been finalized.
    fn on_recording_finished(&self, result: &RecordingResult);
}
