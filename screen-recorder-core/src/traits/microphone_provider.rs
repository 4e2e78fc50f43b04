use crate::models::config::MicrophoneConfiguration;
use crate::models::error::RecorderError;
use crate::models::media::AudioDevice;

use super::screen_provider::SampleCallback;

/// Platform microphone capture service.
pub trait MicrophoneProvider: Send + Sync + 'static {
    type Session: MicrophoneSession;

    /// The system default input device, if any.
    fn default_device(&self) -> Option<AudioDevice>;

    /// Open (but do not start) a capture session on `device`.
    fn open_session(
        &self,
        device: &AudioDevice,
        config: &MicrophoneConfiguration,
    ) -> Result<Self::Session, RecorderError>;
}

/// An opened microphone capture session.
pub trait MicrophoneSession: Send + 'static {
    /// Register the sample output. Must be called before `start`.
    fn add_output(&mut self, on_sample: SampleCallback) -> Result<(), RecorderError>;

    fn start(&mut self) -> Result<(), RecorderError>;

    /// Stop capturing and release the device.
    fn stop(&mut self);
}
