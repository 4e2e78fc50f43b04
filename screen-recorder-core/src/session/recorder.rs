use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::capture::audio::AudioCaptureSource;
use crate::capture::video::VideoCaptureSource;
use crate::models::config::{ContainerFormat, RecorderConfiguration, TrackSettings};
use crate::models::diagnostics::SessionDiagnostics;
use crate::models::error::RecorderError;
use crate::models::media::{Sample, TrackKind};
use crate::models::recording_result::RecordingResult;
use crate::models::state::SessionState;
use crate::pipeline::container::OutputContainer;
use crate::pipeline::writer::{AppendOutcome, SampleWriter};
use crate::storage::{checksum, metadata};
use crate::traits::capture_source::{CaptureSource, DeliveryStats};
use crate::traits::container_writer::ContainerBackend;
use crate::traits::microphone_provider::MicrophoneProvider;
use crate::traits::recorder_delegate::RecorderDelegate;
use crate::traits::screen_provider::{SampleCallback, ScreenCaptureProvider};

use super::finalize::{FinalizeHandle, FinalizeResult};

/// Shared session state. Every mutation, from the control thread or from
/// either delivery thread, goes through this one lock.
struct SessionCore {
    state: SessionState,
    writer: Option<SampleWriter>,
    last_diagnostics: SessionDiagnostics,
}

struct ActiveSources<S: ScreenCaptureProvider, M: MicrophoneProvider> {
    video: VideoCaptureSource<S>,
    audio: AudioCaptureSource<M>,
}

impl<S: ScreenCaptureProvider, M: MicrophoneProvider> ActiveSources<S, M> {
    fn stop(&mut self) -> (DeliveryStats, DeliveryStats) {
        self.video.stop();
        self.audio.stop();
        (self.video.delivery_stats(), self.audio.delivery_stats())
    }
}

/// Screen + microphone recorder.
///
/// Orchestrates the capture adapters, the time base and the output
/// container:
/// ```text
/// [Screen Provider] → [video delivery thread] ─┐
///                                              ├→ [SessionCore lock] → [SampleWriter] → [OutputContainer]
/// [Mic Provider]    → [audio delivery thread] ─┘
/// ```
pub struct ScreenRecorder<S, M, C>
where
    S: ScreenCaptureProvider,
    M: MicrophoneProvider,
    C: ContainerBackend,
{
    screen: Arc<S>,
    microphone: Arc<M>,
    backend: Arc<C>,
    config: RecorderConfiguration,
    core: Arc<Mutex<SessionCore>>,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    sources: Option<ActiveSources<S, M>>,
}

impl<S, M, C> ScreenRecorder<S, M, C>
where
    S: ScreenCaptureProvider,
    M: MicrophoneProvider,
    C: ContainerBackend,
{
    pub fn new(screen: S, microphone: M, backend: C, config: RecorderConfiguration) -> Self {
        Self::with_shared(Arc::new(screen), Arc::new(microphone), Arc::new(backend), config)
    }

    /// Build from providers the caller keeps a handle to.
    pub fn with_shared(screen: Arc<S>, microphone: Arc<M>, backend: Arc<C>, config: RecorderConfiguration) -> Self {
        Self {
            screen,
            microphone,
            backend,
            config,
            core: Arc::new(Mutex::new(SessionCore {
                state: SessionState::Idle,
                writer: None,
                last_diagnostics: SessionDiagnostics::default(),
            })),
            delegate: None,
            sources: None,
        }
    }

    /// Takes effect for the next session.
    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn configuration(&self) -> &RecorderConfiguration {
        &self.config
    }

    /// Replace the configuration. Only allowed while idle.
    pub fn set_configuration(&mut self, config: RecorderConfiguration) -> Result<(), RecorderError> {
        let state = self.state();
        if !state.is_idle() {
            return Err(RecorderError::InvalidState(format!(
                "cannot reconfigure in {} state",
                state.name()
            )));
        }
        self.config = config;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.core.lock().state.clone()
    }

    /// True exactly while the session is recording.
    pub fn is_recording(&self) -> bool {
        self.core.lock().state.is_recording()
    }

    /// Live counters while a session is active, otherwise those of the
    /// last session.
    pub fn diagnostics(&self) -> SessionDiagnostics {
        let mut diagnostics = {
            let core = self.core.lock();
            match &core.writer {
                Some(writer) => writer.diagnostics().clone(),
                None => return core.last_diagnostics.clone(),
            }
        };
        if let Some(sources) = &self.sources {
            merge_delivery_stats(
                &mut diagnostics,
                sources.video.delivery_stats(),
                sources.audio.delivery_stats(),
            );
        }
        diagnostics
    }

    /// Start recording. Transitions: idle → starting → recording.
    ///
    /// Any acquisition failure releases what was acquired so far and leaves
    /// the session in `failed`.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        let state = self.state();
        if !state.is_idle() {
            return Err(RecorderError::InvalidState(format!(
                "can only start from idle state, not {}",
                state.name()
            )));
        }
        self.config.validate().map_err(RecorderError::InvalidConfiguration)?;

        self.transition(SessionState::Starting);
        log::info!("starting recording to {}", self.config.output_path.display());

        match self.acquire_and_start() {
            Ok(sources) => {
                self.sources = Some(sources);
                self.transition(SessionState::Recording);
                log::info!("recording started");
                Ok(())
            }
            Err(err) => {
                log::error!("failed to start recording: {}", err);
                self.transition(SessionState::Failed(err.clone()));
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(&err);
                }
                Err(err)
            }
        }
    }

    /// Stop recording and request finalization.
    /// Transitions: recording → stopping → stopped.
    ///
    /// Returns `None` without side effects unless the session is recording.
    /// Finalization completes asynchronously; the handle and the delegate
    /// both receive the outcome.
    pub fn stop(&mut self) -> Option<FinalizeHandle> {
        if !self.is_recording() {
            log::debug!("stop ignored in {} state", self.state().name());
            return None;
        }
        if !self.transition(SessionState::Stopping) {
            return None;
        }

        // Halts new deliveries and drains what was queued before the stop.
        // Drained samples may still anchor the time base.
        let (video_stats, audio_stats) = self
            .sources
            .take()
            .map(|mut sources| sources.stop())
            .unwrap_or_default();

        let writer = self.core.lock().writer.take().map(|mut writer| {
            writer.seal_timebase();
            writer
        });
        let Some(writer) = writer else {
            self.transition(SessionState::Stopped);
            return None;
        };
        let (container, mut diagnostics) = writer.finish();
        merge_delivery_stats(&mut diagnostics, video_stats, audio_stats);

        let (sender, handle) = FinalizeHandle::channel();
        let completion = Completion {
            file_path: container.path().to_path_buf(),
            format: container.format(),
            track_settings: container.track_settings(),
            diagnostics: diagnostics.clone(),
            compute_checksum: self.config.compute_checksum,
            write_metadata_sidecar: self.config.write_metadata_sidecar,
            delegate: self.delegate.clone(),
            sender,
        };

        // Stopped is announced before the writer can report completion.
        self.core.lock().last_diagnostics = diagnostics;
        self.transition(SessionState::Stopped);

        if let Err(err) = container.finalize(Box::new(move |result| completion.run(result))) {
            log::error!("finalize refused: {}", err);
        }
        log::info!("recording stopped, finalization requested");
        Some(handle)
    }

    /// Acknowledge a stopped or failed session and return to idle,
    /// releasing anything the session still holds.
    pub fn acknowledge(&mut self) -> Result<(), RecorderError> {
        let state = self.state();
        if !state.is_terminal() {
            return Err(RecorderError::InvalidState(format!(
                "nothing to acknowledge in {} state",
                state.name()
            )));
        }
        self.teardown();
        self.transition(SessionState::Idle);
        Ok(())
    }

    // --- Internal helpers ---

    fn acquire_and_start(&mut self) -> Result<ActiveSources<S, M>, RecorderError> {
        let mut video = VideoCaptureSource::new(Arc::clone(&self.screen), &self.config);
        let mut audio = AudioCaptureSource::new(Arc::clone(&self.microphone), &self.config);

        video.acquire()?;
        audio.acquire()?;

        let (width, height) = video
            .display()
            .map(|d| (d.width, d.height))
            .ok_or_else(|| RecorderError::SourceUnavailable("no display selected".into()))?;

        let container = OutputContainer::open(
            self.backend.as_ref(),
            &self.config.output_path,
            self.config.container_format,
            self.config.video_track_settings(width, height),
            self.config.audio_track_settings(),
            self.config.overwrite_existing,
        )?;
        self.core.lock().writer = Some(SampleWriter::new(container));

        let on_sample = self.sample_handler();
        let started = video
            .start_delivery(Arc::clone(&on_sample))
            .and_then(|()| audio.start_delivery(on_sample));

        if let Err(err) = started {
            log::warn!("rolling back partially started session: {}", err);
            video.stop();
            audio.stop();
            let writer = self.core.lock().writer.take();
            if let Some(writer) = writer {
                writer.discard();
            }
            return Err(err);
        }

        Ok(ActiveSources { video, audio })
    }

    /// Handler run on each adapter's delivery thread.
    fn sample_handler(&self) -> SampleCallback {
        let core = Arc::clone(&self.core);
        let delegate = self.delegate.clone();

        Arc::new(move |sample: Sample| {
            let fault = {
                let mut guard = core.lock();
                let SessionCore { state, writer, .. } = &mut *guard;
                let Some(writer) = writer.as_mut() else {
                    return;
                };
                if writer.append(&sample) != AppendOutcome::DroppedNotWritable || !state.is_recording() {
                    return;
                }
                // A writer fault fails the session once; later samples just count as drops.
                let Some(reason) = writer.container().failure_reason() else {
                    return;
                };
                let err = RecorderError::WriterFailure(reason);
                *state = SessionState::Failed(err.clone());
                err
            };

            log::error!("container writer failed while recording: {}", fault);
            if let Some(ref delegate) = delegate {
                delegate.on_state_changed(&SessionState::Failed(fault.clone()));
                delegate.on_error(&fault);
            }
        })
    }

    /// Release adapters and the writer, keeping whatever was persisted.
    fn teardown(&mut self) {
        if let Some(mut sources) = self.sources.take() {
            sources.stop();
        }
        let writer = self.core.lock().writer.take();
        if let Some(writer) = writer {
            let (container, diagnostics) = writer.finish();
            self.core.lock().last_diagnostics = diagnostics;
            let path = container.path().to_path_buf();
            let finalized = container.finalize(Box::new(move |result| {
                if let Err(e) = result {
                    log::warn!("finalizing {} after failure: {}", path.display(), e);
                }
            }));
            if let Err(e) = finalized {
                log::error!("finalize refused during teardown: {}", e);
            }
        }
    }

    /// Apply a state change if it is legal from the current state.
    fn transition(&self, next: SessionState) -> bool {
        {
            let mut core = self.core.lock();
            if !core.state.can_transition_to(&next) {
                log::warn!("ignoring transition {} -> {}", core.state.name(), next.name());
                return false;
            }
            core.state = next.clone();
        }
        log::debug!("session state: {}", next.name());
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&next);
        }
        true
    }
}

impl<S, M, C> Drop for ScreenRecorder<S, M, C>
where
    S: ScreenCaptureProvider,
    M: MicrophoneProvider,
    C: ContainerBackend,
{
    fn drop(&mut self) {
        if self.is_recording() {
            let _ = self.stop();
        }
        self.teardown();
    }
}

/// Everything the finalize callback needs, moved onto the writer's thread.
struct Completion {
    file_path: PathBuf,
    format: ContainerFormat,
    track_settings: Vec<TrackSettings>,
    diagnostics: SessionDiagnostics,
    compute_checksum: bool,
    write_metadata_sidecar: bool,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    sender: Sender<FinalizeResult>,
}

impl Completion {
    fn run(self, flushed: Result<(), RecorderError>) {
        let outcome = flushed
            .map_err(|e| match e {
                RecorderError::FinalizationFailed(_) => e,
                other => RecorderError::FinalizationFailed(other.to_string()),
            })
            .map(|()| self.build_result());

        match &outcome {
            Ok(result) => {
                log::info!(
                    "recording finalized: {} ({} video, {} audio samples)",
                    result.file_path.display(),
                    result.video_samples,
                    result.audio_samples
                );
                if let Some(ref delegate) = self.delegate {
                    delegate.on_recording_finished(result);
                }
            }
            Err(err) => {
                log::error!("finalization failed: {}", err);
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(err);
                }
            }
        }
        let _ = self.sender.send(outcome);
    }

    fn build_result(&self) -> RecordingResult {
        let on_disk = self.file_path.is_file();
        let checksum = if self.compute_checksum && on_disk {
            checksum::sha256_file(&self.file_path)
                .map_err(|e| log::warn!("checksum skipped: {}", e))
                .ok()
        } else {
            None
        };

        let result = RecordingResult::new(
            self.file_path.clone(),
            self.format,
            &self.diagnostics,
            &self.track_settings,
            checksum,
        );

        if self.write_metadata_sidecar && on_disk {
            if let Err(e) = metadata::write_metadata(&result.metadata, &self.file_path) {
                log::warn!("metadata sidecar not written: {}", e);
            }
        }
        result
    }
}

fn merge_delivery_stats(diagnostics: &mut SessionDiagnostics, video: DeliveryStats, audio: DeliveryStats) {
    for (kind, stats) in [(TrackKind::Video, video), (TrackKind::Audio, audio)] {
        let track = diagnostics.track_mut(kind);
        track.dropped_queue_full = stats.dropped_queue_full;
        track.dropped_after_stop = stats.dropped_after_stop;
    }
}
