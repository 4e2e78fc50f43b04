use std::sync::Arc;

use crate::models::config::StreamConfiguration;
use crate::models::error::RecorderError;
use crate::models::media::{Display, Sample};

/// Callback invoked for every sample a provider produces.
///
/// Providers call it from their own capture thread. It must stay cheap;
/// the capture adapters only enqueue the sample and return.
pub type SampleCallback = Arc<dyn Fn(Sample) + Send + Sync + 'static>;

/// Completion callback for a screen stream stop request.
pub type StopCallback = Box<dyn FnOnce(Result<(), RecorderError>) + Send + 'static>;

/// Platform screen capture service.
///
/// Implementations wrap the OS display capture API. The recorder only needs
/// the display listing and a way to start a stream on one display.
pub trait ScreenCaptureProvider: Send + Sync + 'static {
    type Stream: ScreenStream;

    /// Shareable displays, in the platform's preferred order.
    fn list_displays(&self) -> Result<Vec<Display>, RecorderError>;

    /// Open a capture stream on `display` and begin calling `on_sample`.
    fn start_stream(
        &self,
        display: &Display,
        config: &StreamConfiguration,
        on_sample: SampleCallback,
    ) -> Result<Self::Stream, RecorderError>;
}

/// A running display stream.
pub trait ScreenStream: Send + 'static {
    /// Request the stream to stop. `on_done` fires once the platform has
    /// torn the stream down; it may run on any thread.
    fn stop(&mut self, on_done: StopCallback);
}
