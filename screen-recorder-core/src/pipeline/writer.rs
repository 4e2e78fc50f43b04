use crate::models::diagnostics::SessionDiagnostics;
use crate::models::media::Sample;

use super::container::OutputContainer;
use super::timebase::TimeBase;

/// What happened to one sample handed to [`SampleWriter::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// The track could not take more data right now.
    DroppedNotReady,
    /// The container is not in a writable state.
    DroppedNotWritable,
    DroppedTrackFinished,
    /// The track passed the readiness check but refused the sample.
    Rejected,
}

impl AppendOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, Self::Appended)
    }
}

/// Backpressure-aware write path.
///
/// Every delivered sample gets exactly one readiness check on its track.
/// A sample that finds the track busy is dropped, never queued or retried,
/// which keeps memory bounded and the pipeline real-time. Drops are counted
/// but never raised as errors.
pub struct SampleWriter {
    container: OutputContainer,
    timebase: TimeBase,
    diagnostics: SessionDiagnostics,
}

impl SampleWriter {
    pub fn new(container: OutputContainer) -> Self {
        Self {
            container,
            timebase: TimeBase::new(),
            diagnostics: SessionDiagnostics::default(),
        }
    }

    pub fn append(&mut self, sample: &Sample) -> AppendOutcome {
        let kind = sample.kind();
        let pts = sample.pts();
        self.diagnostics.track_mut(kind).delivered += 1;

        if !self.container.is_writable() {
            self.diagnostics.track_mut(kind).dropped_not_writable += 1;
            log::trace!("{} sample at {} dropped: container not writable", kind, pts);
            return AppendOutcome::DroppedNotWritable;
        }
        if self.container.is_track_finished(kind) {
            self.diagnostics.track_mut(kind).dropped_track_finished += 1;
            return AppendOutcome::DroppedTrackFinished;
        }

        if let Some(anchor) = self.timebase.observe(pts) {
            self.container.start_session(anchor);
            self.diagnostics.session_start = Some(anchor);
            log::info!("session anchored at {} by first {} sample", anchor, kind);
        }
        if !self.timebase.is_anchored() {
            // Timebase sealed before any sample arrived.
            self.diagnostics.track_mut(kind).dropped_not_writable += 1;
            return AppendOutcome::DroppedNotWritable;
        }

        if !self.container.is_track_ready(kind) {
            self.diagnostics.track_mut(kind).dropped_not_ready += 1;
            log::trace!("{} track not ready, sample at {} dropped", kind, pts);
            return AppendOutcome::DroppedNotReady;
        }

        let track = self.diagnostics.track_mut(kind);
        if self.container.append(sample) {
            track.appended += 1;
            track.last_appended_pts = Some(pts);
            AppendOutcome::Appended
        } else {
            track.rejected += 1;
            log::debug!("{} track rejected sample at {}", kind, pts);
            AppendOutcome::Rejected
        }
    }

    /// Refuse to anchor from here on; used once the session is stopping.
    pub fn seal_timebase(&mut self) {
        self.timebase.seal();
    }

    pub fn timebase(&self) -> &TimeBase {
        &self.timebase
    }

    pub fn container(&self) -> &OutputContainer {
        &self.container
    }

    pub fn diagnostics(&self) -> &SessionDiagnostics {
        &self.diagnostics
    }

    /// Abandon the output, removing anything written so far.
    pub fn discard(self) {
        self.container.discard();
    }

    /// Mark both tracks finished and hand back the container for
    /// finalization together with the final counters.
    pub fn finish(mut self) -> (OutputContainer, SessionDiagnostics) {
        self.container.mark_all_finished();
        (self.container, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryContainerBackend;
    use crate::models::config::{ContainerFormat, RecorderConfiguration};
    use crate::models::media::{MediaTime, TrackKind};

    fn writer(backend: &MemoryContainerBackend) -> SampleWriter {
        let config = RecorderConfiguration::default();
        let container = OutputContainer::open(
            backend,
            &std::env::temp_dir().join(format!("screen_recorder_writer_{}.mp4", uuid::Uuid::new_v4())),
            ContainerFormat::Mp4,
            config.video_track_settings(1280, 720),
            config.audio_track_settings(),
            false,
        )
        .unwrap();
        SampleWriter::new(container)
    }

    fn video(t: i64) -> Sample {
        Sample::video(MediaTime::new(t, 1), vec![0u8; 16])
    }

    fn audio(t: i64) -> Sample {
        Sample::audio(MediaTime::new(t, 1), vec![0u8; 4])
    }

    #[test]
    fn first_sample_anchors_container() {
        let backend = MemoryContainerBackend::new();
        let mut writer = writer(&backend);
        assert!(writer.append(&video(100)).is_appended());
        assert!(writer.append(&audio(50)).is_appended());

        assert_eq!(writer.timebase().anchor(), Some(MediaTime::new(100, 1)));
        assert_eq!(backend.snapshot().session_start, Some(MediaTime::new(100, 1)));
        assert_eq!(writer.diagnostics().session_start, Some(MediaTime::new(100, 1)));
    }

    #[test]
    fn not_ready_samples_are_dropped_not_queued() {
        let backend = MemoryContainerBackend::new();
        backend.script_readiness(TrackKind::Video, [true, true, false, false, true]);
        let mut writer = writer(&backend);

        let outcomes: Vec<AppendOutcome> = (1..=5).map(|t| writer.append(&video(t))).collect();
        assert_eq!(outcomes[2], AppendOutcome::DroppedNotReady);
        assert_eq!(outcomes[3], AppendOutcome::DroppedNotReady);

        let state = backend.snapshot();
        assert_eq!(
            state.timestamps(TrackKind::Video),
            vec![MediaTime::new(1, 1), MediaTime::new(2, 1), MediaTime::new(5, 1)]
        );
        assert_eq!(state.appended_while_not_ready, 0);
        assert_eq!(writer.diagnostics().video.dropped_not_ready, 2);
    }

    #[test]
    fn unready_first_sample_still_anchors() {
        let backend = MemoryContainerBackend::new();
        backend.script_readiness(TrackKind::Audio, [false]);
        let mut writer = writer(&backend);
        assert_eq!(writer.append(&audio(7)), AppendOutcome::DroppedNotReady);
        assert_eq!(writer.timebase().anchor(), Some(MediaTime::new(7, 1)));
    }

    #[test]
    fn failed_container_drops_silently() {
        let backend = MemoryContainerBackend::new();
        let mut writer = writer(&backend);
        writer.append(&video(0));
        backend.fail_writer("disk full");

        assert_eq!(writer.append(&video(1)), AppendOutcome::DroppedNotWritable);
        assert_eq!(writer.append(&audio(1)), AppendOutcome::DroppedNotWritable);
        assert_eq!(backend.snapshot().video.len(), 1);
        assert_eq!(writer.diagnostics().total_dropped(), 2);
    }

    #[test]
    fn sealed_timebase_without_anchor_drops() {
        let backend = MemoryContainerBackend::new();
        let mut writer = writer(&backend);
        writer.seal_timebase();
        assert_eq!(writer.append(&video(3)), AppendOutcome::DroppedNotWritable);
        assert_eq!(backend.snapshot().session_start_calls, 0);
    }

    #[test]
    fn finish_marks_tracks_and_blocks_late_samples() {
        let backend = MemoryContainerBackend::new();
        let mut writer = writer(&backend);
        writer.append(&video(0));
        writer.append(&audio(0));
        let (container, diagnostics) = writer.finish();

        assert!(container.is_track_finished(TrackKind::Video));
        assert!(container.is_track_finished(TrackKind::Audio));
        assert_eq!(diagnostics.video.appended, 1);
        assert_eq!(diagnostics.audio.appended, 1);
        assert_eq!(backend.snapshot().finished_tracks, vec![TrackKind::Video, TrackKind::Audio]);
    }
}
