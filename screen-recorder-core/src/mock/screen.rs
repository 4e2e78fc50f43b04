use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::StreamConfiguration;
use crate::models::error::RecorderError;
use crate::models::media::Display;
use crate::traits::screen_provider::{SampleCallback, ScreenCaptureProvider, ScreenStream, StopCallback};

use super::MockFeed;

/// Mock screen capture provider with a configurable display list.
pub struct MockScreenProvider {
    displays: Vec<Display>,
    listing_error: Option<RecorderError>,
    start_error: Option<RecorderError>,
    feed: MockFeed,
    stream_config: Arc<Mutex<Option<StreamConfiguration>>>,
    stops: Arc<AtomicUsize>,
}

impl MockScreenProvider {
    /// One 1920x1080 display.
    pub fn new() -> Self {
        Self::with_displays(vec![Display {
            id: 1,
            name: "Mock Display".into(),
            width: 1920,
            height: 1080,
        }])
    }

    pub fn with_displays(displays: Vec<Display>) -> Self {
        Self {
            displays,
            listing_error: None,
            start_error: None,
            feed: MockFeed::default(),
            stream_config: Arc::new(Mutex::new(None)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_listing(mut self, error: RecorderError) -> Self {
        self.listing_error = Some(error);
        self
    }

    pub fn failing_start(mut self, error: RecorderError) -> Self {
        self.start_error = Some(error);
        self
    }

    pub fn feed(&self) -> MockFeed {
        self.feed.clone()
    }

    /// Configuration of the most recently started stream.
    pub fn last_stream_configuration(&self) -> Option<StreamConfiguration> {
        self.stream_config.lock().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Default for MockScreenProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenCaptureProvider for MockScreenProvider {
    type Stream = MockScreenStream;

    fn list_displays(&self) -> Result<Vec<Display>, RecorderError> {
        match &self.listing_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.displays.clone()),
        }
    }

    fn start_stream(
        &self,
        _display: &Display,
        config: &StreamConfiguration,
        on_sample: SampleCallback,
    ) -> Result<Self::Stream, RecorderError> {
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }
        *self.stream_config.lock() = Some(config.clone());
        self.feed.attach(on_sample);
        Ok(MockScreenStream {
            stops: Arc::clone(&self.stops),
            stopped: false,
        })
    }
}

/// Stream returned by [`MockScreenProvider`]. The feed keeps its callback
/// after stop, like a platform stream that still has frames in flight.
pub struct MockScreenStream {
    stops: Arc<AtomicUsize>,
    stopped: bool,
}

impl ScreenStream for MockScreenStream {
    fn stop(&mut self, on_done: StopCallback) {
        if !self.stopped {
            self.stopped = true;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        on_done(Ok(()));
    }
}
