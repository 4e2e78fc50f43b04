use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::{ContainerFormat, TrackSettings};
use super::diagnostics::SessionDiagnostics;
use super::media::{MediaTime, TrackKind};

/// Result delivered when a recording has been finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub session_start: Option<MediaTime>,
    pub duration_secs: f64,
    pub video_samples: u64,
    pub audio_samples: u64,
    pub dropped_samples: u64,
    pub checksum: Option<String>,
    pub metadata: RecordingMetadata,
}

/// One track as recorded in the metadata sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub kind: TrackKind,
    pub sample_count: u64,
    pub settings: TrackSettings,
}

/// Metadata stored alongside a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub created_at: String,
    pub container_format: ContainerFormat,
    pub session_start: Option<MediaTime>,
    pub duration_secs: f64,
    pub tracks: Vec<TrackMetadata>,
    pub checksum: Option<String>,
}

impl RecordingMetadata {
    /// Metadata for a finished screen + microphone recording.
    pub fn new(
        file_path: &str,
        container_format: ContainerFormat,
        diagnostics: &SessionDiagnostics,
        track_settings: &[TrackSettings],
        checksum: Option<String>,
    ) -> Self {
        let tracks = track_settings
            .iter()
            .map(|settings| TrackMetadata {
                kind: settings.kind(),
                sample_count: diagnostics.track(settings.kind()).appended,
                settings: settings.clone(),
            })
            .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            container_format,
            session_start: diagnostics.session_start,
            duration_secs: diagnostics.duration_secs(),
            tracks,
            checksum,
        }
    }
}

impl RecordingResult {
    pub fn new(
        file_path: PathBuf,
        container_format: ContainerFormat,
        diagnostics: &SessionDiagnostics,
        track_settings: &[TrackSettings],
        checksum: Option<String>,
    ) -> Self {
        let metadata = RecordingMetadata::new(
            &file_path.to_string_lossy(),
            container_format,
            diagnostics,
            track_settings,
            checksum.clone(),
        );
        Self {
            file_path,
            session_start: diagnostics.session_start,
            duration_secs: diagnostics.duration_secs(),
            video_samples: diagnostics.video.appended,
            audio_samples: diagnostics.audio.appended,
            dropped_samples: diagnostics.total_dropped(),
            checksum,
            metadata,
        }
    }
}
