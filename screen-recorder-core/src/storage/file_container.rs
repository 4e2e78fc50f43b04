//! Filesystem container writer.
//!
//! ## File Format
//!
//! ```text
//! [32-byte header, patched on finish]
//!   0  magic "SRMX"
//!   4  version            u16 LE
//!   6  container format   u8   (0 = mp4, 1 = mov)
//!   7  flags              u8   (bit 0 session started, bit 1 finalized)
//!   8  session start      i64 LE value, i32 LE timescale
//!  20  track count        u32 LE
//!  24  record count       u64 LE
//! [Record 1: tag u8 | 4-byte LE payload length | payload]
//! [Record 2: ...]
//! ```
//!
//! Record payloads:
//! - track:   track index u8, JSON-encoded `TrackSettings`
//! - session: start value i64 LE, timescale i32 LE
//! - sample:  track index u8, pts value i64 LE, timescale i32 LE, data

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::models::config::{ContainerFormat, TrackSettings};
use crate::models::error::RecorderError;
use crate::models::media::{MediaTime, Sample, TrackKind};
use crate::traits::container_writer::{
    ContainerBackend, ContainerTrack, ContainerWriter, FinishCallback, WriterStatus,
};

pub const MAGIC: &[u8; 4] = b"SRMX";
pub const FORMAT_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 32;

const TAG_TRACK: u8 = 1;
const TAG_SESSION: u8 = 2;
const TAG_SAMPLE: u8 = 3;

const FLAG_SESSION_STARTED: u8 = 0b01;
const FLAG_FINALIZED: u8 = 0b10;

/// Container backend writing the record format above to local files.
#[derive(Debug, Clone)]
pub struct FileContainerBackend {
    queue_capacity: usize,
}

impl FileContainerBackend {
    /// `queue_capacity` bounds the samples buffered for the writer thread;
    /// tracks report not-ready while it is full.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
        }
    }
}

impl Default for FileContainerBackend {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ContainerBackend for FileContainerBackend {
    fn create(&self, path: &Path, format: ContainerFormat) -> Result<Box<dyn ContainerWriter>, RecorderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RecorderError::WriterFailure(format!("failed to create directory: {}", e)))?;
        }

        // Never truncate: callers remove a stale file first when overwriting.
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    RecorderError::WriterFailure(format!("output file already exists: {}", path.display()))
                }
                _ => RecorderError::WriterFailure(format!("failed to create file: {}", e)),
            })?;
        let header = Header::new(format);
        file.write_all(&header.encode())
            .map_err(|e| RecorderError::WriterFailure(format!("failed to write header: {}", e)))?;

        let status = Arc::new(Mutex::new(WriterStatus::Unknown));
        let (sender, receiver) = crossbeam_channel::bounded(self.queue_capacity);

        let worker = RecordWorker {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            header,
            status: Arc::clone(&status),
            failure: None,
        };
        let handle = thread::Builder::new()
            .name("container-writer".into())
            .spawn(move || worker.run(receiver))
            .map_err(|e| RecorderError::WriterFailure(format!("failed to spawn writer thread: {}", e)))?;

        Ok(Box::new(FileContainerWriter {
            sender,
            status,
            track_count: 0,
            handle: Some(handle),
        }))
    }
}

enum Command {
    Track(u8, TrackSettings),
    Session(MediaTime),
    Sample(u8, Sample),
    Finish(FinishCallback),
    Cancel,
}

struct FileContainerWriter {
    sender: Sender<Command>,
    status: Arc<Mutex<WriterStatus>>,
    track_count: u8,
    handle: Option<thread::JoinHandle<()>>,
}

impl ContainerWriter for FileContainerWriter {
    fn add_track(&mut self, settings: &TrackSettings) -> Result<Box<dyn ContainerTrack>, RecorderError> {
        if *self.status.lock() != WriterStatus::Unknown {
            return Err(RecorderError::WriterFailure("tracks must be added before the session starts".into()));
        }
        let index = self.track_count;
        self.sender
            .send(Command::Track(index, settings.clone()))
            .map_err(|_| RecorderError::WriterFailure("writer thread is gone".into()))?;
        self.track_count += 1;

        Ok(Box::new(FileTrack {
            index,
            kind: settings.kind(),
            sender: self.sender.clone(),
            status: Arc::clone(&self.status),
            finished: false,
        }))
    }

    fn start_session(&mut self, at: MediaTime) {
        {
            let mut status = self.status.lock();
            if *status != WriterStatus::Unknown {
                return;
            }
            *status = WriterStatus::Writing;
        }
        if self.sender.send(Command::Session(at)).is_err() {
            *self.status.lock() = WriterStatus::Failed("writer thread is gone".into());
        }
    }

    fn status(&self) -> WriterStatus {
        self.status.lock().clone()
    }

    fn finish(mut self: Box<Self>, on_done: FinishCallback) {
        // Detached: the writer thread reports through `on_done`.
        self.handle.take();
        if let Err(returned) = self.sender.send(Command::Finish(on_done)) {
            if let Command::Finish(on_done) = returned.into_inner() {
                on_done(Err(RecorderError::FinalizationFailed("writer thread is gone".into())));
            }
        }
    }

    fn cancel(mut self: Box<Self>) {
        let _ = self.sender.send(Command::Cancel);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("container writer thread panicked during cancel");
            }
        }
    }
}

struct FileTrack {
    index: u8,
    kind: TrackKind,
    sender: Sender<Command>,
    status: Arc<Mutex<WriterStatus>>,
    finished: bool,
}

impl ContainerTrack for FileTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_ready(&self) -> bool {
        !self.finished
            && !self.sender.is_full()
            && matches!(*self.status.lock(), WriterStatus::Unknown | WriterStatus::Writing)
    }

    fn append(&mut self, sample: &Sample) -> bool {
        if self.finished {
            return false;
        }
        match self.sender.try_send(Command::Sample(self.index, sample.clone())) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    fn mark_finished(&mut self) {
        self.finished = true;
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    format: ContainerFormat,
    flags: u8,
    session_start: MediaTime,
    track_count: u32,
    record_count: u64,
}

impl Header {
    fn new(format: ContainerFormat) -> Self {
        Self {
            format,
            flags: 0,
            session_start: MediaTime::ZERO,
            track_count: 0,
            record_count: 0,
        }
    }

    fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes[6] = match self.format {
            ContainerFormat::Mp4 => 0,
            ContainerFormat::Mov => 1,
        };
        bytes[7] = self.flags;
        bytes[8..16].copy_from_slice(&self.session_start.value().to_le_bytes());
        bytes[16..20].copy_from_slice(&self.session_start.timescale().to_le_bytes());
        bytes[20..24].copy_from_slice(&self.track_count.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.record_count.to_le_bytes());
        bytes
    }

    fn decode(bytes: &[u8]) -> Result<Self, RecorderError> {
        if bytes.len() < HEADER_SIZE || &bytes[0..4] != MAGIC {
            return Err(RecorderError::StorageError("not a recording container".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(RecorderError::StorageError(format!("unsupported container version {}", version)));
        }
        let format = match bytes[6] {
            0 => ContainerFormat::Mp4,
            1 => ContainerFormat::Mov,
            other => return Err(RecorderError::StorageError(format!("unknown container format {}", other))),
        };
        Ok(Self {
            format,
            flags: bytes[7],
            session_start: MediaTime::new(read_i64(&bytes[8..16]), read_i32(&bytes[16..20])),
            track_count: read_u32(&bytes[20..24]),
            record_count: u64::from_le_bytes(bytes[24..32].try_into().unwrap_or_default()),
        })
    }
}

/// Record lengths are stored as u32.
fn record_len(len: usize) -> Result<u32, String> {
    u32::try_from(len).map_err(|_| format!("record of {} bytes exceeds the format limit", len))
}

struct RecordWorker {
    path: PathBuf,
    file: BufWriter<File>,
    header: Header,
    status: Arc<Mutex<WriterStatus>>,
    failure: Option<String>,
}

impl RecordWorker {
    fn run(mut self, receiver: Receiver<Command>) {
        for command in receiver.iter() {
            match command {
                Command::Track(index, settings) => {
                    let payload = match serde_json::to_vec(&settings) {
                        Ok(json) => [vec![index], json].concat(),
                        Err(e) => {
                            self.fail(format!("failed to encode track settings: {}", e));
                            continue;
                        }
                    };
                    self.header.track_count += 1;
                    self.write_record(TAG_TRACK, &payload);
                }
                Command::Session(at) => {
                    self.header.flags |= FLAG_SESSION_STARTED;
                    self.header.session_start = at;
                    let mut payload = Vec::with_capacity(12);
                    payload.extend_from_slice(&at.value().to_le_bytes());
                    payload.extend_from_slice(&at.timescale().to_le_bytes());
                    self.write_record(TAG_SESSION, &payload);
                }
                Command::Sample(index, sample) => {
                    let mut payload = Vec::with_capacity(13 + sample.len());
                    payload.push(index);
                    payload.extend_from_slice(&sample.pts().value().to_le_bytes());
                    payload.extend_from_slice(&sample.pts().timescale().to_le_bytes());
                    payload.extend_from_slice(sample.data());
                    self.write_record(TAG_SAMPLE, &payload);
                }
                Command::Finish(on_done) => {
                    let result = self.finalize();
                    *self.status.lock() = match &result {
                        Ok(()) => WriterStatus::Completed,
                        Err(e) => WriterStatus::Failed(e.to_string()),
                    };
                    log::debug!("container {} finalized: {:?}", self.path.display(), result);
                    on_done(result);
                    return;
                }
                Command::Cancel => {
                    drop(self.file);
                    if let Err(e) = fs::remove_file(&self.path) {
                        log::warn!("failed to remove cancelled container {}: {}", self.path.display(), e);
                    }
                    return;
                }
            }
        }
    }

    fn write_record(&mut self, tag: u8, payload: &[u8]) {
        if self.failure.is_some() {
            return;
        }
        let len = match record_len(payload.len()) {
            Ok(len) => len,
            Err(reason) => {
                self.fail(reason);
                return;
            }
        };
        let written = self
            .file
            .write_all(&[tag])
            .and_then(|()| self.file.write_all(&len.to_le_bytes()))
            .and_then(|()| self.file.write_all(payload));
        match written {
            Ok(()) => self.header.record_count += 1,
            Err(e) => self.fail(format!("write failed: {}", e)),
        }
    }

    fn fail(&mut self, reason: String) {
        log::error!("container writer failed: {}", reason);
        *self.status.lock() = WriterStatus::Failed(reason.clone());
        self.failure = Some(reason);
    }

    fn finalize(&mut self) -> Result<(), RecorderError> {
        if let Some(reason) = &self.failure {
            return Err(RecorderError::FinalizationFailed(format!("writer failed earlier: {}", reason)));
        }
        self.header.flags |= FLAG_FINALIZED;
        let header = self.header.encode();
        let io = |e: std::io::Error| RecorderError::FinalizationFailed(e.to_string());

        self.file.flush().map_err(io)?;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(0)).map_err(io)?;
        file.write_all(&header).map_err(io)?;
        file.sync_all().map_err(io)?;
        Ok(())
    }
}

/// Contents of a container file, as read back by [`inspect`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSummary {
    pub format: ContainerFormat,
    pub finalized: bool,
    pub session_start: Option<MediaTime>,
    pub tracks: Vec<TrackSettings>,
    pub video: Vec<MediaTime>,
    pub audio: Vec<MediaTime>,
}

impl ContainerSummary {
    pub fn timestamps(&self, kind: TrackKind) -> &[MediaTime] {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }
}

/// Read a container file written by [`FileContainerBackend`].
pub fn inspect(path: &Path) -> Result<ContainerSummary, RecorderError> {
    let bytes = fs::read(path).map_err(|e| RecorderError::StorageError(format!("failed to read container: {}", e)))?;
    let header = Header::decode(&bytes)?;

    let mut summary = ContainerSummary {
        format: header.format,
        finalized: header.flags & FLAG_FINALIZED != 0,
        session_start: (header.flags & FLAG_SESSION_STARTED != 0).then_some(header.session_start),
        tracks: Vec::new(),
        video: Vec::new(),
        audio: Vec::new(),
    };
    let mut kinds: Vec<TrackKind> = Vec::new();
    let mut offset = HEADER_SIZE;
    let mut records: u64 = 0;
    let truncated = || RecorderError::StorageError("truncated record".into());

    while offset < bytes.len() {
        let tag = bytes[offset];
        let len_bytes = bytes.get(offset + 1..offset + 5).ok_or_else(truncated)?;
        let len = read_u32(len_bytes) as usize;
        let payload = bytes.get(offset + 5..offset + 5 + len).ok_or_else(truncated)?;
        offset += 5 + len;
        records += 1;

        match tag {
            TAG_TRACK => {
                let settings: TrackSettings = serde_json::from_slice(payload.get(1..).ok_or_else(truncated)?)
                    .map_err(|e| RecorderError::StorageError(format!("bad track record: {}", e)))?;
                kinds.push(settings.kind());
                summary.tracks.push(settings);
            }
            TAG_SESSION => {}
            TAG_SAMPLE => {
                if payload.len() < 13 {
                    return Err(truncated());
                }
                let kind = kinds
                    .get(payload[0] as usize)
                    .copied()
                    .ok_or_else(|| RecorderError::StorageError("sample for undeclared track".into()))?;
                let pts = MediaTime::new(read_i64(&payload[1..9]), read_i32(&payload[9..13]));
                match kind {
                    TrackKind::Video => summary.video.push(pts),
                    TrackKind::Audio => summary.audio.push(pts),
                }
            }
            other => return Err(RecorderError::StorageError(format!("unknown record tag {}", other))),
        }
    }

    if summary.finalized && records != header.record_count {
        return Err(RecorderError::StorageError(format!(
            "header lists {} records, found {}",
            header.record_count, records
        )));
    }
    Ok(summary)
}

fn read_i64(bytes: &[u8]) -> i64 {
    i64::from_le_bytes(bytes.try_into().unwrap_or_default())
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes(bytes.try_into().unwrap_or_default())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes.try_into().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::RecorderConfiguration;
    use std::sync::mpsc;
    use std::time::Duration;

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("screen_recorder_test_{}_{}", uuid::Uuid::new_v4(), name))
    }

    fn finish_and_wait(writer: Box<dyn ContainerWriter>) -> Result<(), RecorderError> {
        let (tx, rx) = mpsc::channel();
        writer.finish(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn writes_and_reads_back_samples() {
        let path = temp_file_path("roundtrip.srmx");
        let config = RecorderConfiguration::default();
        let backend = FileContainerBackend::new(16);

        let mut writer = backend.create(&path, ContainerFormat::Mov).unwrap();
        let mut video = writer.add_track(&config.video_track_settings(640, 480)).unwrap();
        let mut audio = writer.add_track(&config.audio_track_settings()).unwrap();
        assert_eq!(writer.status(), WriterStatus::Unknown);

        writer.start_session(MediaTime::new(100, 60));
        assert_eq!(writer.status(), WriterStatus::Writing);
        assert!(video.is_ready());
        assert!(video.append(&Sample::video(MediaTime::new(100, 60), vec![1u8; 32])));
        assert!(audio.append(&Sample::audio(MediaTime::new(90, 60), vec![2u8; 8])));
        assert!(video.append(&Sample::video(MediaTime::new(101, 60), vec![3u8; 32])));
        video.mark_finished();
        audio.mark_finished();
        assert!(!video.is_ready());
        drop((video, audio));

        finish_and_wait(writer).unwrap();

        let summary = inspect(&path).unwrap();
        assert!(summary.finalized);
        assert_eq!(summary.format, ContainerFormat::Mov);
        assert_eq!(summary.session_start, Some(MediaTime::new(100, 60)));
        assert_eq!(summary.tracks.len(), 2);
        assert_eq!(summary.video, vec![MediaTime::new(100, 60), MediaTime::new(101, 60)]);
        assert_eq!(summary.audio, vec![MediaTime::new(90, 60)]);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn empty_container_finalizes() {
        let path = temp_file_path("empty.srmx");
        let config = RecorderConfiguration::default();
        let mut writer = FileContainerBackend::default().create(&path, ContainerFormat::Mp4).unwrap();
        writer.add_track(&config.video_track_settings(64, 64)).unwrap();
        writer.add_track(&config.audio_track_settings()).unwrap();

        finish_and_wait(writer).unwrap();

        let summary = inspect(&path).unwrap();
        assert!(summary.finalized);
        assert_eq!(summary.session_start, None);
        assert!(summary.video.is_empty());
        assert!(summary.audio.is_empty());

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(u64::from_le_bytes(bytes[24..32].try_into().unwrap()), 2);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn cancel_removes_file() {
        let path = temp_file_path("cancelled.srmx");
        let writer = FileContainerBackend::default().create(&path, ContainerFormat::Mp4).unwrap();
        assert!(path.exists());
        writer.cancel();
        assert!(!path.exists());
    }

    #[test]
    fn create_in_missing_directory_creates_it() {
        let dir = temp_file_path("nested_dir");
        let path = dir.join("out.srmx");
        let writer = FileContainerBackend::default().create(&path, ContainerFormat::Mp4).unwrap();
        assert!(path.exists());
        writer.cancel();
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn oversized_record_length_is_refused() {
        assert_eq!(record_len(64), Ok(64));
        assert_eq!(record_len(u32::MAX as usize), Ok(u32::MAX));
        if let Some(too_big) = (u32::MAX as usize).checked_add(1) {
            assert!(record_len(too_big).is_err());
        }
    }

    #[test]
    fn existing_file_is_never_truncated() {
        let path = temp_file_path("existing.srmx");
        fs::write(&path, b"keep me").unwrap();

        let err = FileContainerBackend::default()
            .create(&path, ContainerFormat::Mp4)
            .err()
            .unwrap();
        assert!(matches!(err, RecorderError::WriterFailure(_)));
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn inspect_rejects_foreign_files() {
        let path = temp_file_path("foreign.bin");
        fs::write(&path, b"RIFF....WAVEfmt ").unwrap();
        assert!(matches!(inspect(&path), Err(RecorderError::StorageError(_))));
        fs::remove_file(&path).ok();
    }
}
