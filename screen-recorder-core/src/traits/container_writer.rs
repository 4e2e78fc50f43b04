use std::path::Path;

use crate::models::config::{ContainerFormat, TrackSettings};
use crate::models::error::RecorderError;
use crate::models::media::{MediaTime, Sample, TrackKind};

/// Completion callback for container finalization.
pub type FinishCallback = Box<dyn FnOnce(Result<(), RecorderError>) + Send + 'static>;

/// Status reported by the underlying container writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterStatus {
    /// Created, no session started yet.
    Unknown,
    Writing,
    Completed,
    Failed(String),
}

/// Factory for container writers (the platform muxer).
pub trait ContainerBackend: Send + Sync + 'static {
    /// Create the output file at `path`.
    fn create(
        &self,
        path: &Path,
        format: ContainerFormat,
    ) -> Result<Box<dyn ContainerWriter>, RecorderError>;
}

/// A container being written.
pub trait ContainerWriter: Send {
    /// Declare a track. All tracks are added before the session starts.
    fn add_track(&mut self, settings: &TrackSettings) -> Result<Box<dyn ContainerTrack>, RecorderError>;

    /// Begin the media timeline at `at`. Called once, with the first
    /// observed sample's timestamp.
    fn start_session(&mut self, at: MediaTime);

    fn status(&self) -> WriterStatus;

    /// Flush buffered data and close the file. Returns immediately;
    /// `on_done` fires when the flush has completed.
    fn finish(self: Box<Self>, on_done: FinishCallback);

    /// Abandon the container and remove whatever was written.
    fn cancel(self: Box<Self>);
}

/// One track of a container being written.
pub trait ContainerTrack: Send {
    fn kind(&self) -> TrackKind;

    /// Whether the track can take another sample without blocking.
    fn is_ready(&self) -> bool;

    /// Append a sample. Returns `false` if the writer refused it.
    fn append(&mut self, sample: &Sample) -> bool;

    /// No further samples will be appended.
    fn mark_finished(&mut self);
}
