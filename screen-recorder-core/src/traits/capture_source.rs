use crate::models::error::RecorderError;
use crate::models::media::TrackKind;

use super::screen_provider::SampleCallback;

/// Samples an adapter discarded before they reached the writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub dropped_queue_full: u64,
    pub dropped_after_stop: u64,
}

/// A capture source adapter: one OS provider behind a dedicated delivery
/// queue.
///
/// Lifecycle: `acquire` → `start_delivery` → `stop`. An adapter is not
/// restartable; a new session builds new adapters.
pub trait CaptureSource: Send {
    fn kind(&self) -> TrackKind;

    /// Locate the device and open the underlying stream or session.
    fn acquire(&mut self) -> Result<(), RecorderError>;

    /// Start pushing samples to `on_sample` from this adapter's own
    /// delivery thread.
    fn start_delivery(&mut self, on_sample: SampleCallback) -> Result<(), RecorderError>;

    /// Halt delivery and release the device. Samples already queued are
    /// delivered before this returns; samples produced afterwards are
    /// discarded. Safe to call more than once.
    fn stop(&mut self);

    fn delivery_stats(&self) -> DeliveryStats;
}
