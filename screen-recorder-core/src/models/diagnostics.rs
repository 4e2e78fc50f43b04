use serde::Serialize;

use super::media::{MediaTime, TrackKind};

/// Per-track delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackDiagnostics {
    /// Samples that reached the writer.
    pub delivered: u64,
    pub appended: u64,
    pub dropped_not_ready: u64,
    pub dropped_not_writable: u64,
    pub dropped_track_finished: u64,
    /// Refused by the container track after passing the readiness check.
    pub rejected: u64,
    /// Dropped at the adapter because its delivery queue was full.
    pub dropped_queue_full: u64,
    /// Dropped at the adapter because they arrived after its stop signal.
    pub dropped_after_stop: u64,
    pub last_appended_pts: Option<MediaTime>,
}

impl TrackDiagnostics {
    pub fn dropped(&self) -> u64 {
        self.dropped_not_ready
            + self.dropped_not_writable
            + self.dropped_track_finished
            + self.rejected
            + self.dropped_queue_full
            + self.dropped_after_stop
    }
}

/// Diagnostics for debugging recording sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionDiagnostics {
    pub video: TrackDiagnostics,
    pub audio: TrackDiagnostics,
    pub session_start: Option<MediaTime>,
}

impl SessionDiagnostics {
    pub fn track(&self, kind: TrackKind) -> &TrackDiagnostics {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }

    pub fn track_mut(&mut self, kind: TrackKind) -> &mut TrackDiagnostics {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        }
    }

    pub fn total_dropped(&self) -> u64 {
        self.video.dropped() + self.audio.dropped()
    }

    /// Latest appended timestamp minus the anchor, in seconds.
    pub fn duration_secs(&self) -> f64 {
        let Some(start) = self.session_start else {
            return 0.0;
        };
        [self.video.last_appended_pts, self.audio.last_appended_pts]
            .into_iter()
            .flatten()
            .max()
            .map(|last| last.secs_since(start))
            .unwrap_or(0.0)
    }
}
