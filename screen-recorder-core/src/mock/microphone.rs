use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::MicrophoneConfiguration;
use crate::models::error::RecorderError;
use crate::models::media::AudioDevice;
use crate::traits::microphone_provider::{MicrophoneProvider, MicrophoneSession};
use crate::traits::screen_provider::SampleCallback;

use super::MockFeed;

/// Mock microphone provider with an optional default device.
pub struct MockMicrophoneProvider {
    device: Option<AudioDevice>,
    open_error: Option<RecorderError>,
    start_error: Option<RecorderError>,
    feed: MockFeed,
    opened_config: Arc<Mutex<Option<MicrophoneConfiguration>>>,
    stops: Arc<AtomicUsize>,
}

impl MockMicrophoneProvider {
    pub fn new() -> Self {
        Self {
            device: Some(AudioDevice {
                id: "mock-mic".into(),
                name: "Mock Microphone".into(),
                is_default: true,
            }),
            open_error: None,
            start_error: None,
            feed: MockFeed::default(),
            opened_config: Arc::new(Mutex::new(None)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn without_device() -> Self {
        Self {
            device: None,
            ..Self::new()
        }
    }

    pub fn failing_open(mut self, error: RecorderError) -> Self {
        self.open_error = Some(error);
        self
    }

    pub fn failing_start(mut self, error: RecorderError) -> Self {
        self.start_error = Some(error);
        self
    }

    pub fn feed(&self) -> MockFeed {
        self.feed.clone()
    }

    pub fn opened_configuration(&self) -> Option<MicrophoneConfiguration> {
        self.opened_config.lock().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Default for MockMicrophoneProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrophoneProvider for MockMicrophoneProvider {
    type Session = MockMicrophoneSession;

    fn default_device(&self) -> Option<AudioDevice> {
        self.device.clone()
    }

    fn open_session(
        &self,
        _device: &AudioDevice,
        config: &MicrophoneConfiguration,
    ) -> Result<Self::Session, RecorderError> {
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        *self.opened_config.lock() = Some(config.clone());
        Ok(MockMicrophoneSession {
            feed: self.feed.clone(),
            output: None,
            start_error: self.start_error.clone(),
            stops: Arc::clone(&self.stops),
        })
    }
}

/// Session returned by [`MockMicrophoneProvider`].
pub struct MockMicrophoneSession {
    feed: MockFeed,
    output: Option<SampleCallback>,
    start_error: Option<RecorderError>,
    stops: Arc<AtomicUsize>,
}

impl MicrophoneSession for MockMicrophoneSession {
    fn add_output(&mut self, on_sample: SampleCallback) -> Result<(), RecorderError> {
        if self.output.is_some() {
            return Err(RecorderError::AcquisitionFailure("output already added".into()));
        }
        self.output = Some(on_sample);
        Ok(())
    }

    fn start(&mut self) -> Result<(), RecorderError> {
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }
        let output = self
            .output
            .clone()
            .ok_or_else(|| RecorderError::AcquisitionFailure("no output added".into()))?;
        self.feed.attach(output);
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
