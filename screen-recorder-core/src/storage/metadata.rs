use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar path for a recording: `out.mp4` → `out.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, RecorderError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| RecorderError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| RecorderError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, RecorderError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| RecorderError::StorageError(format!("failed to read metadata: {}", e)))?;
    let metadata: RecordingMetadata = serde_json::from_str(&json)
        .map_err(|e| RecorderError::StorageError(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{ContainerFormat, RecorderConfiguration};
    use crate::models::diagnostics::SessionDiagnostics;
    use crate::models::media::{MediaTime, TrackKind};

    #[test]
    fn sidecar_round_trips() {
        let recording = std::env::temp_dir().join("screen_recorder_test_meta.mp4");
        let config = RecorderConfiguration::default();
        let mut diagnostics = SessionDiagnostics {
            session_start: Some(MediaTime::new(10, 1)),
            ..Default::default()
        };
        diagnostics.video.appended = 3;
        diagnostics.video.last_appended_pts = Some(MediaTime::new(12, 1));
        let metadata = RecordingMetadata::new(
            &recording.to_string_lossy(),
            ContainerFormat::Mp4,
            &diagnostics,
            &[config.video_track_settings(800, 600), config.audio_track_settings()],
            Some("abc".into()),
        );

        let written = write_metadata(&metadata, &recording).unwrap();
        assert_eq!(written, std::env::temp_dir().join("screen_recorder_test_meta.metadata.json"));

        let loaded = read_metadata(&recording).unwrap();
        assert_eq!(loaded, metadata);
        assert_eq!(loaded.tracks[0].kind, TrackKind::Video);
        assert_eq!(loaded.tracks[0].sample_count, 3);
        assert_eq!(loaded.tracks[1].sample_count, 0);

        fs::remove_file(&written).ok();
    }
}
