//! Microphone capture adapter.

use std::sync::Arc;

use crate::models::config::RecorderConfiguration;
use crate::models::error::RecorderError;
use crate::models::media::{AudioDevice, TrackKind};
use crate::traits::capture_source::{CaptureSource, DeliveryStats};
use crate::traits::microphone_provider::{MicrophoneProvider, MicrophoneSession};
use crate::traits::screen_provider::SampleCallback;

use super::as_acquisition_failure;
use super::delivery::DeliveryQueue;

/// Wraps a [`MicrophoneProvider`]: opens the default input device and
/// streams its buffers through a dedicated delivery queue.
pub struct AudioCaptureSource<P: MicrophoneProvider> {
    provider: Arc<P>,
    config: RecorderConfiguration,
    device: Option<AudioDevice>,
    session: Option<P::Session>,
    running: bool,
    queue: Option<DeliveryQueue>,
}

impl<P: MicrophoneProvider> AudioCaptureSource<P> {
    pub fn new(provider: Arc<P>, config: &RecorderConfiguration) -> Self {
        Self {
            provider,
            config: config.clone(),
            device: None,
            session: None,
            running: false,
            queue: None,
        }
    }

    pub fn device(&self) -> Option<&AudioDevice> {
        self.device.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl<P: MicrophoneProvider> CaptureSource for AudioCaptureSource<P> {
    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn acquire(&mut self) -> Result<(), RecorderError> {
        let device = self
            .provider
            .default_device()
            .ok_or_else(|| RecorderError::SourceUnavailable("no microphone found".into()))?;

        let session = self
            .provider
            .open_session(&device, &self.config.microphone_configuration())
            .map_err(|e| as_acquisition_failure(e, "failed to open microphone session"))?;

        log::debug!("opened microphone {} ({})", device.name, device.id);
        self.device = Some(device);
        self.session = Some(session);
        Ok(())
    }

    fn start_delivery(&mut self, on_sample: SampleCallback) -> Result<(), RecorderError> {
        let Some(session) = self.session.as_mut() else {
            return Err(RecorderError::InvalidState("audio source not acquired".into()));
        };
        if self.queue.is_some() {
            return Err(RecorderError::InvalidState("audio delivery already started".into()));
        }

        let mut queue = DeliveryQueue::spawn(TrackKind::Audio, self.config.delivery_queue_capacity, on_sample)?;

        let started = session
            .add_output(queue.producer())
            .and_then(|()| session.start());
        if let Err(e) = started {
            queue.shutdown();
            return Err(as_acquisition_failure(e, "failed to start microphone session"));
        }

        self.running = true;
        self.queue = Some(queue);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(queue) = &self.queue {
            queue.halt();
        }
        if let Some(mut session) = self.session.take() {
            if self.running {
                session.stop();
            }
            self.running = false;
        }
        if let Some(queue) = &mut self.queue {
            queue.shutdown();
        }
    }

    fn delivery_stats(&self) -> DeliveryStats {
        self.queue.as_ref().map(DeliveryQueue::stats).unwrap_or_default()
    }
}

impl<P: MicrophoneProvider> Drop for AudioCaptureSource<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockMicrophoneProvider;
    use crate::models::error::ErrorKind;
    use crate::models::media::{MediaTime, Sample};
    use parking_lot::Mutex;

    #[test]
    fn missing_microphone_is_source_unavailable() {
        let provider = Arc::new(MockMicrophoneProvider::without_device());
        let mut source = AudioCaptureSource::new(provider, &RecorderConfiguration::default());
        assert_eq!(source.acquire().unwrap_err().kind(), ErrorKind::SourceUnavailable);
        assert!(source.device().is_none());
    }

    #[test]
    fn open_failure_is_acquisition_failure() {
        let provider = Arc::new(
            MockMicrophoneProvider::new().failing_open(RecorderError::WriterFailure("busy".into())),
        );
        let mut source = AudioCaptureSource::new(provider, &RecorderConfiguration::default());
        let err = source.acquire().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AcquisitionFailure);
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn session_opened_with_configured_format() {
        let provider = Arc::new(MockMicrophoneProvider::new());
        let mut config = RecorderConfiguration::default();
        config.audio.sample_rate = 48_000;
        config.audio.channels = 1;
        let mut source = AudioCaptureSource::new(Arc::clone(&provider), &config);
        source.acquire().unwrap();

        let opened = provider.opened_configuration().unwrap();
        assert_eq!(opened.sample_rate, 48_000);
        assert_eq!(opened.channels, 1);
    }

    #[test]
    fn start_failure_releases_queue() {
        let provider = Arc::new(
            MockMicrophoneProvider::new().failing_start(RecorderError::AcquisitionFailure("denied".into())),
        );
        let mut source = AudioCaptureSource::new(Arc::clone(&provider), &RecorderConfiguration::default());
        source.acquire().unwrap();
        let err = source.start_delivery(Arc::new(|_| {})).unwrap_err();
        assert_eq!(err, RecorderError::AcquisitionFailure("denied".into()));
        assert!(!source.is_running());
    }

    #[test]
    fn delivers_buffers_and_stops_device() {
        let provider = Arc::new(MockMicrophoneProvider::new());
        let feed = provider.feed();
        let mut source = AudioCaptureSource::new(Arc::clone(&provider), &RecorderConfiguration::default());
        source.acquire().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        source
            .start_delivery(Arc::new(move |sample: Sample| sink.lock().push(sample.pts())))
            .unwrap();
        assert!(source.is_running());

        feed.push(Sample::audio(MediaTime::new(0, 44_100), vec![0u8; 8]));
        feed.push(Sample::audio(MediaTime::new(1024, 44_100), vec![0u8; 8]));
        source.stop();

        assert_eq!(*seen.lock(), vec![MediaTime::new(0, 44_100), MediaTime::new(1024, 44_100)]);
        assert_eq!(provider.stop_count(), 1);
        assert!(!source.is_running());
    }
}
