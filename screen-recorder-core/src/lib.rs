//! # screen-recorder-core
//!
//! Platform-agnostic screen + microphone recording core.
//!
//! Drives two independent capture sources into one container file with a
//! shared time base. Platform backends (ScreenCaptureKit, AVFoundation,
//! AVAssetWriter and friends) implement the provider and container traits
//! and plug into the generic `ScreenRecorder`.
//!
//! ## Architecture
//!
//! ```text
//! screen-recorder-core (this crate)
//! ├── traits/    ← ScreenCaptureProvider, MicrophoneProvider, ContainerBackend, RecorderDelegate
//! ├── models/    ← RecorderError, SessionState, RecorderConfiguration, MediaTime, Sample
//! ├── capture/   ← VideoCaptureSource, AudioCaptureSource, per-source delivery threads
//! ├── pipeline/  ← TimeBase, OutputContainer, SampleWriter (readiness-gated appends)
//! ├── session/   ← ScreenRecorder state machine, FinalizeHandle
//! ├── storage/   ← FileContainerBackend, checksum, metadata sidecar
//! └── mock/      ← in-memory providers and container for tests
//! ```

pub mod capture;
pub mod mock;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use capture::audio::AudioCaptureSource;
pub use capture::video::VideoCaptureSource;
pub use models::config::{
    AudioCodec, AudioSettings, ContainerFormat, MicrophoneConfiguration, PixelFormat, RecorderConfiguration,
    StreamConfiguration, TrackSettings, VideoCodec, VideoSettings,
};
pub use models::diagnostics::{SessionDiagnostics, TrackDiagnostics};
pub use models::error::{ErrorKind, RecorderError};
pub use models::media::{AudioDevice, Display, MediaTime, Sample, TrackKind};
pub use models::recording_result::{RecordingMetadata, RecordingResult, TrackMetadata};
pub use models::state::SessionState;
pub use pipeline::container::{ContainerStatus, OutputContainer};
pub use pipeline::timebase::TimeBase;
pub use pipeline::writer::{AppendOutcome, SampleWriter};
pub use session::finalize::FinalizeHandle;
pub use session::recorder::ScreenRecorder;
pub use storage::file_container::{inspect, ContainerSummary, FileContainerBackend};
pub use traits::capture_source::{CaptureSource, DeliveryStats};
pub use traits::container_writer::{ContainerBackend, ContainerTrack, ContainerWriter, WriterStatus};
pub use traits::microphone_provider::{MicrophoneProvider, MicrophoneSession};
pub use traits::recorder_delegate::RecorderDelegate;
pub use traits::screen_provider::{SampleCallback, ScreenCaptureProvider, ScreenStream};
