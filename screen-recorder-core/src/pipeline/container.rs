use std::fs;
use std::path::{Path, PathBuf};

use crate::models::config::{ContainerFormat, TrackSettings};
use crate::models::error::RecorderError;
use crate::models::media::{MediaTime, Sample, TrackKind};
use crate::traits::container_writer::{
    ContainerBackend, ContainerTrack, ContainerWriter, FinishCallback, WriterStatus,
};

/// Lifecycle of the output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// File created and tracks declared; no session started yet.
    Unopened,
    Writing,
    Finished,
    Failed,
}

struct TrackSlot {
    track: Box<dyn ContainerTrack>,
    settings: TrackSettings,
    finished: bool,
}

/// The muxed output file: one video and one audio track on top of a
/// platform container writer.
pub struct OutputContainer {
    path: PathBuf,
    format: ContainerFormat,
    status: ContainerStatus,
    writer: Box<dyn ContainerWriter>,
    video: TrackSlot,
    audio: TrackSlot,
}

impl OutputContainer {
    /// Create the file at `path` and declare both tracks.
    ///
    /// With `overwrite_existing`, a stale file at `path` is removed first;
    /// without it, an existing file makes the open fail.
    pub fn open(
        backend: &dyn ContainerBackend,
        path: &Path,
        format: ContainerFormat,
        video: TrackSettings,
        audio: TrackSettings,
        overwrite_existing: bool,
    ) -> Result<Self, RecorderError> {
        if video.kind() != TrackKind::Video || audio.kind() != TrackKind::Audio {
            return Err(RecorderError::InvalidConfiguration("track settings do not match track kinds".into()));
        }

        if path.exists() {
            if !overwrite_existing {
                return Err(RecorderError::WriterFailure(format!(
                    "output file already exists: {}",
                    path.display()
                )));
            }
            if let Err(e) = fs::remove_file(path) {
                log::warn!("could not remove existing file {}: {}", path.display(), e);
            }
        }

        let mut writer = backend.create(path, format).map_err(as_writer_failure)?;

        let video_track = match writer.add_track(&video) {
            Ok(track) => track,
            Err(e) => {
                writer.cancel();
                return Err(as_writer_failure(e));
            }
        };
        let audio_track = match writer.add_track(&audio) {
            Ok(track) => track,
            Err(e) => {
                drop(video_track);
                writer.cancel();
                return Err(as_writer_failure(e));
            }
        };

        log::debug!("opened {:?} container at {}", format, path.display());

        Ok(Self {
            path: path.to_path_buf(),
            format,
            status: ContainerStatus::Unopened,
            writer,
            video: TrackSlot {
                track: video_track,
                settings: video,
                finished: false,
            },
            audio: TrackSlot {
                track: audio_track,
                settings: audio,
                finished: false,
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    pub fn track_settings(&self) -> Vec<TrackSettings> {
        vec![self.video.settings.clone(), self.audio.settings.clone()]
    }

    /// Current status; a writer that reports failure makes the container failed.
    pub fn status(&self) -> ContainerStatus {
        match self.writer.status() {
            WriterStatus::Failed(_) if self.status != ContainerStatus::Finished => ContainerStatus::Failed,
            _ => self.status,
        }
    }

    pub fn failure_reason(&self) -> Option<String> {
        match self.writer.status() {
            WriterStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Unopened is accepted alongside writing: the first sample opens the
    /// session, and samples racing it must not be lost.
    pub fn is_writable(&self) -> bool {
        matches!(self.status(), ContainerStatus::Unopened | ContainerStatus::Writing)
    }

    /// Start the container timeline at `at`. Unopened → writing.
    pub fn start_session(&mut self, at: MediaTime) {
        if self.status != ContainerStatus::Unopened {
            log::warn!("session already started, ignoring start at {}", at);
            return;
        }
        self.writer.start_session(at);
        self.status = ContainerStatus::Writing;
    }

    pub fn is_track_finished(&self, kind: TrackKind) -> bool {
        self.slot(kind).finished
    }

    /// Instantaneous readiness of the track for `kind`.
    pub fn is_track_ready(&self, kind: TrackKind) -> bool {
        let slot = self.slot(kind);
        !slot.finished && slot.track.is_ready()
    }

    /// Append to the track matching the sample's kind.
    pub fn append(&mut self, sample: &Sample) -> bool {
        let slot = self.slot_mut(sample.kind());
        if slot.finished {
            return false;
        }
        slot.track.append(sample)
    }

    pub fn mark_finished(&mut self, kind: TrackKind) {
        let slot = self.slot_mut(kind);
        if !slot.finished {
            slot.track.mark_finished();
            slot.finished = true;
        }
    }

    pub fn mark_all_finished(&mut self) {
        self.mark_finished(TrackKind::Video);
        self.mark_finished(TrackKind::Audio);
    }

    /// Flush and close the file. Both tracks must already be finished.
    ///
    /// Returns once the flush has been requested; `on_done` reports the
    /// outcome when the writer completes.
    pub fn finalize(mut self, on_done: FinishCallback) -> Result<(), RecorderError> {
        if !(self.video.finished && self.audio.finished) {
            return Err(RecorderError::InvalidState(
                "finalize requires both tracks to be finished".into(),
            ));
        }
        self.status = ContainerStatus::Finished;
        log::debug!("finalizing container at {}", self.path.display());
        let Self { writer, video, audio, .. } = self;
        drop((video, audio));
        writer.finish(on_done);
        Ok(())
    }

    /// Abandon the container, removing partial output.
    pub fn discard(self) {
        log::debug!("discarding container at {}", self.path.display());
        let Self { writer, video, audio, .. } = self;
        drop((video, audio));
        writer.cancel();
    }

    fn slot(&self, kind: TrackKind) -> &TrackSlot {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }

    fn slot_mut(&mut self, kind: TrackKind) -> &mut TrackSlot {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        }
    }
}

fn as_writer_failure(err: RecorderError) -> RecorderError {
    match err {
        RecorderError::WriterFailure(_) => err,
        other => RecorderError::WriterFailure(other.to_string()),
    }
}
