use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::media::{MediaTime, TrackKind};

/// Output container file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Mov,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Hevc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Bgra32,
    Nv12,
}

/// Video track encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    pub codec: VideoCodec,

    /// Encoded width; `None` uses the selected display's width.
    pub width: Option<u32>,

    /// Encoded height; `None` uses the selected display's height.
    pub height: Option<u32>,

    /// Average bit rate in bits per second (default: 6 Mbps).
    pub average_bit_rate: u32,

    pub profile_level: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            width: None,
            height: None,
            average_bit_rate: 6_000_000,
            profile_level: "H264HighAutoLevel".into(),
        }
    }
}

/// Audio track encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    pub codec: AudioCodec,
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_rate: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Aac,
            channels: 2,
            sample_rate: 44_100,
            bit_rate: 128_000,
        }
    }
}

/// Format parameters declared for one container track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrackSettings {
    Video(VideoSettings),
    Audio(AudioSettings),
}

impl TrackSettings {
    pub fn kind(&self) -> TrackKind {
        match self {
            Self::Video(_) => TrackKind::Video,
            Self::Audio(_) => TrackKind::Audio,
        }
    }
}

/// Display stream parameters handed to the screen capture provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfiguration {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub minimum_frame_interval: MediaTime,
}

/// Parameters applied when opening the microphone session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrophoneConfiguration {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Configuration for a recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfiguration {
    /// Where the muxed file is written.
    pub output_path: PathBuf,

    pub container_format: ContainerFormat,

    pub video: VideoSettings,

    pub audio: AudioSettings,

    pub pixel_format: PixelFormat,

    /// Shortest interval between captured frames (default: 1/60 s).
    pub minimum_frame_interval: MediaTime,

    /// Samples each adapter may hold before its delivery queue drops new ones.
    pub delivery_queue_capacity: usize,

    /// Remove a stale file at `output_path` before creating the container.
    pub overwrite_existing: bool,

    /// Write `<output>.metadata.json` once finalization completes.
    pub write_metadata_sidecar: bool,

    /// Compute a SHA-256 of the finished file.
    pub compute_checksum: bool,
}

impl RecorderConfiguration {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.output_path.as_os_str().is_empty() {
            return Err("output path must not be empty".into());
        }
        if self.video.average_bit_rate == 0 {
            return Err("video bit rate must be positive".into());
        }
        if matches!(self.video.width, Some(0)) || matches!(self.video.height, Some(0)) {
            return Err("video dimensions must be positive".into());
        }
        if ![1, 2].contains(&self.audio.channels) {
            return Err(format!("unsupported channel count: {}", self.audio.channels));
        }
        if self.audio.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.minimum_frame_interval <= MediaTime::ZERO {
            return Err("frame interval must be positive".into());
        }
        if self.delivery_queue_capacity == 0 {
            return Err("delivery queue capacity must be at least 1".into());
        }
        Ok(())
    }

    /// Stream configuration for a display of the given size.
    pub fn stream_configuration(&self, display_width: u32, display_height: u32) -> StreamConfiguration {
        StreamConfiguration {
            width: self.video.width.unwrap_or(display_width),
            height: self.video.height.unwrap_or(display_height),
            pixel_format: self.pixel_format,
            minimum_frame_interval: self.minimum_frame_interval,
        }
    }

    /// Video track settings with the dimensions resolved against the display.
    pub fn video_track_settings(&self, display_width: u32, display_height: u32) -> TrackSettings {
        TrackSettings::Video(VideoSettings {
            width: Some(self.video.width.unwrap_or(display_width)),
            height: Some(self.video.height.unwrap_or(display_height)),
            ..self.video.clone()
        })
    }

    pub fn audio_track_settings(&self) -> TrackSettings {
        TrackSettings::Audio(self.audio.clone())
    }

    pub fn microphone_configuration(&self) -> MicrophoneConfiguration {
        MicrophoneConfiguration {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
        }
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("recording.mp4"),
            container_format: ContainerFormat::Mp4,
            video: VideoSettings::default(),
            audio: AudioSettings::default(),
            pixel_format: PixelFormat::Bgra32,
            minimum_frame_interval: MediaTime::new(1, 60),
            delivery_queue_capacity: 120,
            overwrite_existing: true,
            write_metadata_sidecar: true,
            compute_checksum: true,
        }
    }
}
