use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingResult;

pub type FinalizeResult = Result<RecordingResult, RecorderError>;

/// Completion signal for a stopped recording.
///
/// `stop()` returns as soon as finalization has been requested; the handle
/// yields the outcome once the container writer has flushed.
pub struct FinalizeHandle {
    receiver: Receiver<FinalizeResult>,
}

impl FinalizeHandle {
    pub(crate) fn channel() -> (Sender<FinalizeResult>, Self) {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        (sender, Self { receiver })
    }

    /// Block until finalization completes.
    pub fn wait(self) -> FinalizeResult {
        self.receiver.recv().unwrap_or_else(|_| Err(dropped()))
    }

    /// Block for at most `timeout`. `None` if still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<FinalizeResult> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(dropped())),
        }
    }

    /// The outcome, if finalization has already completed.
    pub fn try_result(&self) -> Option<FinalizeResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(dropped())),
        }
    }
}

fn dropped() -> RecorderError {
    RecorderError::FinalizationFailed("container writer dropped its completion signal".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_until_sent() {
        let (sender, handle) = FinalizeHandle::channel();
        assert!(handle.try_result().is_none());
        assert!(handle.wait_timeout(Duration::from_millis(10)).is_none());
        sender.send(Err(RecorderError::FinalizationFailed("flush failed".into()))).unwrap();
        assert_eq!(
            handle.wait(),
            Err(RecorderError::FinalizationFailed("flush failed".into()))
        );
    }

    #[test]
    fn dropped_sender_reports_failure() {
        let (sender, handle) = FinalizeHandle::channel();
        drop(sender);
        let err = handle.wait().unwrap_err();
        assert!(matches!(err, RecorderError::FinalizationFailed(_)));
    }
}
