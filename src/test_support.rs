//! Test doubles shared across module tests

use crate::engine::{EngineError, ExecOutput, TranscodeEngine};
use crate::export::{
    ArtifactSink, ExportArtifact, ExportError, ExportEvent, FrameRenderer, PreparedTrack,
};
use async_trait::async_trait;
use image::RgbImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};

/// In-memory [`TranscodeEngine`] with scripted ffmpeg behaviour
pub(crate) struct FakeEngine {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub writes: Mutex<Vec<String>>,
    /// Last content written under each name, kept after deletion
    pub history: Mutex<HashMap<String, Vec<u8>>>,
    pub deletes: Mutex<Vec<String>>,
    pub execs: Mutex<Vec<Vec<String>>>,
    pub loads: AtomicUsize,
    fail_load: AtomicBool,
    fail_decode: AtomicBool,
    decode_frames: AtomicUsize,
    metadata: Mutex<Option<String>>,
    log: Mutex<String>,
    mux_gate: Mutex<Option<MuxGate>>,
}

/// Blocks the mux invocation until released
#[derive(Clone)]
pub(crate) struct MuxGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            history: Mutex::new(HashMap::new()),
            deletes: Mutex::new(Vec::new()),
            execs: Mutex::new(Vec::new()),
            loads: AtomicUsize::new(0),
            fail_load: AtomicBool::new(false),
            fail_decode: AtomicBool::new(false),
            decode_frames: AtomicUsize::new(100),
            metadata: Mutex::new(None),
            log: Mutex::new("Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'input':\n".to_string()),
            mux_gate: Mutex::new(None),
        }
    }

    pub fn fail_next_load(&self) {
        self.fail_load.store(true, Ordering::SeqCst);
    }

    pub fn fail_decode(&self) {
        self.fail_decode.store(true, Ordering::SeqCst);
    }

    /// Stereo frames produced by every audio decode
    pub fn set_decode_frames(&self, frames: usize) {
        self.decode_frames.store(frames, Ordering::SeqCst);
    }

    /// Text returned by `-f ffmetadata` dumps; without it the dump fails
    pub fn set_metadata(&self, text: &str) {
        *self.metadata.lock() = Some(text.to_string());
    }

    /// Diagnostic log printed by every invocation
    pub fn set_log(&self, log: &str) {
        *self.log.lock() = log.to_string();
    }

    pub fn gate_mux(&self) -> MuxGate {
        let gate = MuxGate {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        *self.mux_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().get(name).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.files.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn written(&self, name: &str) -> Option<Vec<u8>> {
        self.history.lock().get(name).cloned()
    }

    pub fn written_names(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    pub fn exec_count(&self) -> usize {
        self.execs.lock().len()
    }

    fn exit(&self, log: String) -> EngineError {
        EngineError::ExitStatus {
            status: Some(1),
            log,
        }
    }

    fn put(&self, name: &str, data: Vec<u8>) {
        self.files.lock().insert(name.to_string(), data);
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn load(&self) -> Result<(), EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.swap(false, Ordering::SeqCst) {
            return Err(EngineError::NotFound("scripted load failure".to_string()));
        }
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.writes.lock().push(name.to_string());
        self.history.lock().insert(name.to_string(), data.to_vec());
        self.put(name, data.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.file(name).ok_or_else(|| EngineError::Io {
            name: name.to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.deletes.lock().push(name.to_string());
        match self.files.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(EngineError::Io {
                name: name.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }

    async fn exec(&self, args: &[String]) -> Result<ExecOutput, EngineError> {
        self.execs.lock().push(args.to_vec());
        let log = self.log.lock().clone();
        let has = |flag: &str| args.iter().any(|a| a == flag);
        let output = args.last().cloned().unwrap_or_default();

        // Every `-i` input except image patterns must exist
        for pair in args.windows(2) {
            if pair[0] == "-i" && !pair[1].contains('%') && self.file(&pair[1]).is_none() {
                return Err(self.exit(format!("{}: No such file or directory", pair[1])));
            }
        }

        if has("ffmetadata") {
            let text = self.metadata.lock().clone();
            return match text {
                Some(text) => {
                    self.put(&output, text.into_bytes());
                    Ok(ExecOutput { log })
                }
                None => Err(self.exit(log)),
            };
        }

        if has("f32le") {
            if self.fail_decode.load(Ordering::SeqCst) {
                return Err(self.exit("Invalid data found when processing input".to_string()));
            }
            let frames = self.decode_frames.load(Ordering::SeqCst);
            self.put(&output, vec![0u8; frames * 2 * 4]);
            return Ok(ExecOutput { log });
        }

        if has("concat") {
            let gate = self.mux_gate.lock().clone();
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.put(&output, b"mp4data".to_vec());
            return Ok(ExecOutput { log });
        }

        // Input only: ffmpeg prints the summary and complains about the missing output
        Err(self.exit(format!("{}At least one output file must be specified\n", log)))
    }
}

/// Renderer that fills each frame with a constant colour and records calls
#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pub begun: Vec<String>,
    pub ended: usize,
    pub timestamps: Vec<f64>,
    pub fail_at: Option<usize>,
}

impl FrameRenderer for RecordingRenderer {
    fn begin_track(&mut self, track: &PreparedTrack) -> Result<(), ExportError> {
        self.begun.push(track.title.clone());
        Ok(())
    }

    fn render(
        &mut self,
        surface: &mut RgbImage,
        _width: u32,
        _height: u32,
        time_seconds: f64,
    ) -> Result<(), ExportError> {
        if self.fail_at == Some(self.timestamps.len()) {
            return Err(ExportError::Render("scripted render failure".to_string()));
        }
        self.timestamps.push(time_seconds);
        for pixel in surface.pixels_mut() {
            *pixel = image::Rgb([20, 20, 20]);
        }
        Ok(())
    }

    fn end_track(&mut self) {
        self.ended += 1;
    }
}

/// Sink keeping saved artifacts in memory
#[derive(Default)]
pub(crate) struct MemorySink {
    pub saved: Mutex<Vec<ExportArtifact>>,
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn save(&self, artifact: ExportArtifact) -> Result<(), ExportError> {
        self.saved.lock().push(artifact);
        Ok(())
    }
}

/// Everything currently queued on an event receiver
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<ExportEvent>) -> Vec<ExportEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// A box with a 32-bit size header
pub(crate) fn make_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

/// `chpl` body for `(ticks, title)` entries
pub(crate) fn encode_chpl(entries: &[(u64, &str)]) -> Vec<u8> {
    let mut out = vec![1, 0, 0, 0, 0, 0, 0, 0, entries.len() as u8];
    for (ticks, title) in entries {
        out.extend_from_slice(&ticks.to_be_bytes());
        out.push(title.len() as u8);
        out.extend_from_slice(title.as_bytes());
    }
    out
}

/// ftyp + moov/udta/chpl, with an optional mdat in front of the moov
pub(crate) fn sample_mp4(chapters: &[(u64, &str)], mdat_len: usize) -> Vec<u8> {
    let chpl = make_box(b"chpl", &encode_chpl(chapters));
    let udta = make_box(b"udta", &chpl);
    let mvhd = make_box(b"mvhd", &[0u8; 100]);
    let moov = make_box(b"moov", &[mvhd, udta].concat());

    let mut file = make_box(b"ftyp", b"M4B \0\0\0\0M4B isom");
    if mdat_len > 0 {
        file.extend(make_box(b"mdat", &vec![0u8; mdat_len]));
    }
    file.extend(moov);
    file
}
