use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::{ContainerFormat, TrackSettings};
use crate::models::error::RecorderError;
use crate::models::media::{MediaTime, Sample, TrackKind};
use crate::traits::container_writer::{
    ContainerBackend, ContainerTrack, ContainerWriter, FinishCallback, WriterStatus,
};

/// Everything the in-memory container has seen during the current session.
#[derive(Debug, Clone)]
pub struct MemoryContainerState {
    pub path: Option<PathBuf>,
    pub format: Option<ContainerFormat>,
    pub tracks: Vec<TrackSettings>,
    pub session_start: Option<MediaTime>,
    pub session_start_calls: usize,
    pub video: Vec<Sample>,
    pub audio: Vec<Sample>,
    pub finished_tracks: Vec<TrackKind>,
    /// Appends made right after `is_ready` returned false. Always zero for a
    /// well-behaved caller.
    pub appended_while_not_ready: usize,
    pub appended_after_finish: usize,
    pub finish_requested: bool,
    pub completed: bool,
    pub cancelled: bool,
    pub status: WriterStatus,
}

impl Default for MemoryContainerState {
    fn default() -> Self {
        Self {
            path: None,
            format: None,
            tracks: Vec::new(),
            session_start: None,
            session_start_calls: 0,
            video: Vec::new(),
            audio: Vec::new(),
            finished_tracks: Vec::new(),
            appended_while_not_ready: 0,
            appended_after_finish: 0,
            finish_requested: false,
            completed: false,
            cancelled: false,
            status: WriterStatus::Unknown,
        }
    }
}

impl MemoryContainerState {
    pub fn samples(&self, kind: TrackKind) -> &[Sample] {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }

    /// Timestamps appended to `kind`, in append order.
    pub fn timestamps(&self, kind: TrackKind) -> Vec<MediaTime> {
        self.samples(kind).iter().map(Sample::pts).collect()
    }
}

struct Readiness {
    script: VecDeque<bool>,
    default: bool,
    last: bool,
}

impl Readiness {
    fn new() -> Self {
        Self {
            script: VecDeque::new(),
            default: true,
            last: true,
        }
    }

    fn next(&mut self) -> bool {
        self.last = self.script.pop_front().unwrap_or(self.default);
        self.last
    }
}

struct Shared {
    state: MemoryContainerState,
    video_ready: Readiness,
    audio_ready: Readiness,
    pending_finish: Option<(FinishCallback, Result<(), RecorderError>)>,
    append_delay: Option<Duration>,
}

impl Shared {
    fn readiness(&mut self, kind: TrackKind) -> &mut Readiness {
        match kind {
            TrackKind::Video => &mut self.video_ready,
            TrackKind::Audio => &mut self.audio_ready,
        }
    }

    fn complete(&mut self, result: &Result<(), RecorderError>) {
        match result {
            Ok(()) => {
                self.state.completed = true;
                self.state.status = WriterStatus::Completed;
            }
            Err(e) => self.state.status = WriterStatus::Failed(e.to_string()),
        }
    }
}

/// Container backend that keeps every appended sample in memory.
///
/// Readiness can be scripted per track; each `is_ready` call consumes one
/// scripted value and falls back to the track's default once the script is
/// exhausted.
#[derive(Clone)]
pub struct MemoryContainerBackend {
    shared: Arc<Mutex<Shared>>,
    create_error: Option<RecorderError>,
    add_track_error: Option<(TrackKind, RecorderError)>,
    finish_error: Option<RecorderError>,
    deferred_finish: bool,
}

impl MemoryContainerBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                state: MemoryContainerState::default(),
                video_ready: Readiness::new(),
                audio_ready: Readiness::new(),
                pending_finish: None,
                append_delay: None,
            })),
            create_error: None,
            add_track_error: None,
            finish_error: None,
            deferred_finish: false,
        }
    }

    pub fn failing_create(mut self, error: RecorderError) -> Self {
        self.create_error = Some(error);
        self
    }

    pub fn failing_add_track(mut self, kind: TrackKind, error: RecorderError) -> Self {
        self.add_track_error = Some((kind, error));
        self
    }

    pub fn failing_finish(mut self, error: RecorderError) -> Self {
        self.finish_error = Some(error);
        self
    }

    /// Make every append take at least `delay`, like an encoder that lags
    /// behind capture.
    pub fn with_append_delay(self, delay: Duration) -> Self {
        self.shared.lock().append_delay = Some(delay);
        self
    }

    /// Hold finish callbacks until [`complete_finish`](Self::complete_finish).
    pub fn deferred_finish(mut self) -> Self {
        self.deferred_finish = true;
        self
    }

    /// Readiness returned once any scripted values are used up.
    pub fn set_ready(&self, kind: TrackKind, ready: bool) {
        self.shared.lock().readiness(kind).default = ready;
    }

    /// Queue readiness answers for the next `is_ready` calls on `kind`.
    pub fn script_readiness(&self, kind: TrackKind, script: impl IntoIterator<Item = bool>) {
        self.shared.lock().readiness(kind).script.extend(script);
    }

    /// Put the writer into a failed state, as a full disk would.
    pub fn fail_writer(&self, message: &str) {
        self.shared.lock().state.status = WriterStatus::Failed(message.to_string());
    }

    /// Run a deferred finish callback. Returns `false` if none was pending.
    pub fn complete_finish(&self) -> bool {
        let pending = {
            let mut shared = self.shared.lock();
            let pending = shared.pending_finish.take();
            if let Some((_, result)) = &pending {
                shared.complete(result);
            }
            pending
        };
        match pending {
            Some((on_done, result)) => {
                on_done(result);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> MemoryContainerState {
        self.shared.lock().state.clone()
    }
}

impl Default for MemoryContainerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBackend for MemoryContainerBackend {
    fn create(
        &self,
        path: &Path,
        format: ContainerFormat,
    ) -> Result<Box<dyn ContainerWriter>, RecorderError> {
        if let Some(err) = &self.create_error {
            return Err(err.clone());
        }
        {
            let mut shared = self.shared.lock();
            shared.state = MemoryContainerState {
                path: Some(path.to_path_buf()),
                format: Some(format),
                ..Default::default()
            };
            shared.pending_finish = None;
        }
        Ok(Box::new(MemoryContainerWriter {
            shared: Arc::clone(&self.shared),
            add_track_error: self.add_track_error.clone(),
            finish_error: self.finish_error.clone(),
            deferred_finish: self.deferred_finish,
        }))
    }
}

struct MemoryContainerWriter {
    shared: Arc<Mutex<Shared>>,
    add_track_error: Option<(TrackKind, RecorderError)>,
    finish_error: Option<RecorderError>,
    deferred_finish: bool,
}

impl ContainerWriter for MemoryContainerWriter {
    fn add_track(&mut self, settings: &TrackSettings) -> Result<Box<dyn ContainerTrack>, RecorderError> {
        if let Some((kind, err)) = &self.add_track_error {
            if *kind == settings.kind() {
                return Err(err.clone());
            }
        }
        self.shared.lock().state.tracks.push(settings.clone());
        Ok(Box::new(MemoryTrack {
            kind: settings.kind(),
            shared: Arc::clone(&self.shared),
            finished: false,
        }))
    }

    fn start_session(&mut self, at: MediaTime) {
        let mut shared = self.shared.lock();
        shared.state.session_start_calls += 1;
        if shared.state.session_start.is_none() {
            shared.state.session_start = Some(at);
        }
        if shared.state.status == WriterStatus::Unknown {
            shared.state.status = WriterStatus::Writing;
        }
    }

    fn status(&self) -> WriterStatus {
        self.shared.lock().state.status.clone()
    }

    fn finish(self: Box<Self>, on_done: FinishCallback) {
        let result = match self.finish_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        let mut shared = self.shared.lock();
        shared.state.finish_requested = true;
        if self.deferred_finish {
            shared.pending_finish = Some((on_done, result));
            return;
        }
        drop(shared);

        let shared = Arc::clone(&self.shared);
        thread::spawn(move || {
            shared.lock().complete(&result);
            on_done(result);
        });
    }

    fn cancel(self: Box<Self>) {
        self.shared.lock().state.cancelled = true;
    }
}

struct MemoryTrack {
    kind: TrackKind,
    shared: Arc<Mutex<Shared>>,
    finished: bool,
}

impl ContainerTrack for MemoryTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_ready(&self) -> bool {
        !self.finished && self.shared.lock().readiness(self.kind).next()
    }

    fn append(&mut self, sample: &Sample) -> bool {
        let delay = self.shared.lock().append_delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let mut shared = self.shared.lock();
        if !shared.readiness(self.kind).last {
            shared.state.appended_while_not_ready += 1;
        }
        if self.finished {
            shared.state.appended_after_finish += 1;
            return false;
        }
        if matches!(shared.state.status, WriterStatus::Failed(_)) {
            return false;
        }
        match self.kind {
            TrackKind::Video => shared.state.video.push(sample.clone()),
            TrackKind::Audio => shared.state.audio.push(sample.clone()),
        }
        true
    }

    fn mark_finished(&mut self) {
        if !self.finished {
            self.finished = true;
            self.shared.lock().state.finished_tracks.push(self.kind);
        }
    }
}
