//! Display capture adapter.

use std::sync::Arc;

use crate::models::config::{RecorderConfiguration, StreamConfiguration};
use crate::models::error::RecorderError;
use crate::models::media::{Display, TrackKind};
use crate::traits::capture_source::{CaptureSource, DeliveryStats};
use crate::traits::screen_provider::{SampleCallback, ScreenCaptureProvider, ScreenStream};

use super::as_acquisition_failure;
use super::delivery::DeliveryQueue;

/// Wraps a [`ScreenCaptureProvider`]: selects the first shareable display
/// and streams its frames through a dedicated delivery queue.
///
/// The platform stream binds its sample handler at creation, so the stream
/// itself is opened by `start_delivery`; `acquire` resolves the display and
/// the stream configuration.
pub struct VideoCaptureSource<P: ScreenCaptureProvider> {
    provider: Arc<P>,
    config: RecorderConfiguration,
    display: Option<Display>,
    stream_config: Option<StreamConfiguration>,
    stream: Option<P::Stream>,
    queue: Option<DeliveryQueue>,
}

impl<P: ScreenCaptureProvider> VideoCaptureSource<P> {
    pub fn new(provider: Arc<P>, config: &RecorderConfiguration) -> Self {
        Self {
            provider,
            config: config.clone(),
            display: None,
            stream_config: None,
            stream: None,
            queue: None,
        }
    }

    /// The display selected by `acquire`.
    pub fn display(&self) -> Option<&Display> {
        self.display.as_ref()
    }

    pub fn stream_configuration(&self) -> Option<&StreamConfiguration> {
        self.stream_config.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }
}

impl<P: ScreenCaptureProvider> CaptureSource for VideoCaptureSource<P> {
    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn acquire(&mut self) -> Result<(), RecorderError> {
        let displays = self
            .provider
            .list_displays()
            .map_err(|e| as_acquisition_failure(e, "failed to list shareable content"))?;

        let display = displays
            .into_iter()
            .next()
            .ok_or_else(|| RecorderError::SourceUnavailable("no display found".into()))?;

        let stream_config = self.config.stream_configuration(display.width, display.height);
        log::debug!(
            "selected display {} ({}x{}), streaming at {}x{}",
            display.id,
            display.width,
            display.height,
            stream_config.width,
            stream_config.height
        );

        self.display = Some(display);
        self.stream_config = Some(stream_config);
        Ok(())
    }

    fn start_delivery(&mut self, on_sample: SampleCallback) -> Result<(), RecorderError> {
        let (Some(display), Some(stream_config)) = (&self.display, &self.stream_config) else {
            return Err(RecorderError::InvalidState("video source not acquired".into()));
        };
        if self.queue.is_some() {
            return Err(RecorderError::InvalidState("video delivery already started".into()));
        }

        let mut queue = DeliveryQueue::spawn(TrackKind::Video, self.config.delivery_queue_capacity, on_sample)?;

        match self.provider.start_stream(display, stream_config, queue.producer()) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.queue = Some(queue);
                Ok(())
            }
            Err(e) => {
                queue.shutdown();
                Err(as_acquisition_failure(e, "failed to start display stream"))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(queue) = &self.queue {
            queue.halt();
        }
        if let Some(mut stream) = self.stream.take() {
            stream.stop(Box::new(|result| {
                if let Err(e) = result {
                    log::warn!("display stream stop failed: {}", e);
                }
            }));
        }
        if let Some(queue) = &mut self.queue {
            queue.shutdown();
        }
    }

    fn delivery_stats(&self) -> DeliveryStats {
        self.queue.as_ref().map(DeliveryQueue::stats).unwrap_or_default()
    }
}

impl<P: ScreenCaptureProvider> Drop for VideoCaptureSource<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockScreenProvider;
    use crate::models::error::ErrorKind;
    use crate::models::media::{MediaTime, Sample};
    use parking_lot::Mutex;

    fn display(id: u32, width: u32, height: u32) -> Display {
        Display {
            id,
            name: format!("Display {}", id),
            width,
            height,
        }
    }

    #[test]
    fn acquire_selects_first_display() {
        let provider = Arc::new(MockScreenProvider::with_displays(vec![
            display(7, 2560, 1440),
            display(8, 1920, 1080),
        ]));
        let mut source = VideoCaptureSource::new(provider, &RecorderConfiguration::default());
        source.acquire().unwrap();

        assert_eq!(source.display().map(|d| d.id), Some(7));
        let stream = source.stream_configuration().unwrap();
        assert_eq!((stream.width, stream.height), (2560, 1440));
        assert_eq!(stream.minimum_frame_interval, MediaTime::new(1, 60));
    }

    #[test]
    fn no_display_is_source_unavailable() {
        let provider = Arc::new(MockScreenProvider::with_displays(Vec::new()));
        let mut source = VideoCaptureSource::new(provider, &RecorderConfiguration::default());
        let err = source.acquire().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[test]
    fn stream_start_failure_is_acquisition_failure() {
        let provider = Arc::new(
            MockScreenProvider::new().failing_start(RecorderError::StorageError("tcc denied".into())),
        );
        let mut source = VideoCaptureSource::new(provider, &RecorderConfiguration::default());
        source.acquire().unwrap();
        let err = source.start_delivery(Arc::new(|_| {})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AcquisitionFailure);
        assert!(!source.is_streaming());
    }

    #[test]
    fn start_before_acquire_is_rejected() {
        let provider = Arc::new(MockScreenProvider::new());
        let mut source = VideoCaptureSource::new(provider, &RecorderConfiguration::default());
        let err = source.start_delivery(Arc::new(|_| {})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn delivers_frames_until_stopped() {
        let provider = Arc::new(MockScreenProvider::new());
        let feed = provider.feed();
        let mut source = VideoCaptureSource::new(Arc::clone(&provider), &RecorderConfiguration::default());
        source.acquire().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        source
            .start_delivery(Arc::new(move |sample: Sample| sink.lock().push(sample.pts())))
            .unwrap();

        for i in 0..3 {
            assert!(feed.push(Sample::video(MediaTime::new(i, 60), vec![0u8; 4])));
        }
        source.stop();
        // The platform stream may still call back briefly after stop.
        feed.push(Sample::video(MediaTime::new(3, 60), vec![0u8; 4]));
        source.stop();

        assert_eq!(seen.lock().len(), 3);
        assert_eq!(source.delivery_stats().dropped_after_stop, 1);
        assert_eq!(provider.stop_count(), 1);
    }
}
