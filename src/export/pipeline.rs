//! Export pipeline orchestration
//!
//! Drives a playlist through the transcoding engine one track at a time:
//! audio capture, frame rendering, then a single concat + mux invocation.

use super::render::{
    decode_cover_art, encode_jpeg, frame_file_name, FramePlan, FrameRenderer, PreparedTrack,
    FRAME_PATTERN,
};
use super::state::{audio_file_name, ExportJob, ExportState};
use super::types::{
    ArtifactSink, ExportArtifact, ExportError, ExportEvent, ExportOutcome, ExportProgress,
    ExportSettings, ExportStage, ExportSummary, NotificationLevel,
};
use crate::audio::AudioCapture;
use crate::engine::probe::probe_duration;
use crate::engine::{EngineHandle, TranscodeEngine};
use crate::project::{SourceHandle, Track};
use bytes::Bytes;
use chrono::Utc;
use image::RgbImage;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Concat demuxer manifest listing the per-track WAVs
pub const AUDIO_MANIFEST: &str = "audio_list.txt";

/// Sandbox name of the muxed video
pub const MUX_OUTPUT: &str = "output.mp4";

const PROGRESS_INTERVAL: u64 = 100;

/// Resets the in-progress flag however the export ends
struct ExportGuard(Arc<AtomicBool>);

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs playlist exports against a shared engine.
///
/// Clones share the in-progress flag, state and event channel, so only one
/// export can run across all of them.
#[derive(Clone)]
pub struct ExportOrchestrator {
    engine: Arc<EngineHandle>,
    settings: ExportSettings,
    is_exporting: Arc<AtomicBool>,
    state: Arc<RwLock<ExportState>>,
    event_tx: broadcast::Sender<ExportEvent>,
}

impl ExportOrchestrator {
    pub fn new(engine: Arc<EngineHandle>, settings: ExportSettings) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            engine,
            settings,
            is_exporting: Arc::new(AtomicBool::new(false)),
            state: Arc::new(RwLock::new(ExportState::Idle)),
            event_tx,
        }
    }

    /// Subscribe to progress and notification events
    pub fn subscribe(&self) -> broadcast::Receiver<ExportEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> ExportState {
        self.state.read().clone()
    }

    pub fn is_exporting(&self) -> bool {
        self.is_exporting.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Export a playlist to a single video and hand it to `sink`.
    ///
    /// Returns [`ExportOutcome::Skipped`] without side effects if another
    /// export is running. On failure exactly one error notification is sent;
    /// intermediate files are removed either way.
    pub async fn export_playlist(
        &self,
        tracks: &mut [Track],
        renderer: &mut dyn FrameRenderer,
        sink: &dyn ArtifactSink,
    ) -> Result<ExportOutcome, ExportError> {
        if self
            .is_exporting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Export already in progress, ignoring request");
            return Ok(ExportOutcome::Skipped);
        }
        let _guard = ExportGuard(self.is_exporting.clone());

        if tracks.is_empty() {
            let message = "Playlist is empty!";
            self.notify(NotificationLevel::Error, message);
            self.set_state(ExportState::Idle);
            return Err(ExportError::Validation(message.to_string()));
        }

        // Remote tracks cannot be probed, so a bad duration there is final
        if let Err(e) = check_remote_durations(tracks) {
            tracing::error!("Export rejected: {}", e);
            self.notify(NotificationLevel::Error, format!("Export Failed: {}", e));
            self.set_state(ExportState::Failed {
                message: e.to_string(),
            });
            return Err(e);
        }

        self.notify(NotificationLevel::Info, "Starting 4K Video Export...");
        let mut job = ExportJob::new(tracks.len(), &self.settings);
        tracing::info!(
            "Starting export {} of {} tracks at {}x{} @ {}fps",
            job.id,
            job.track_count,
            job.width,
            job.height,
            job.frame_rate
        );

        let result = self.run_pipeline(&mut job, tracks, renderer, sink).await;

        if let Err(e) = &result {
            tracing::error!("Export failed: {}", e);
            self.notify(NotificationLevel::Error, format!("Export Failed: {}", e));
        }

        self.set_state(ExportState::Cleanup);
        self.emit_progress(ExportStage::Cleanup, &job, job.track_count.saturating_sub(1));
        self.cleanup(&job).await;

        match result {
            Ok(summary) => {
                self.set_state(ExportState::Idle);
                self.emit_progress(ExportStage::Complete, &job, job.track_count - 1);
                tracing::info!(
                    "Export {} complete: {} frames, {} bytes",
                    job.id,
                    summary.frame_count,
                    summary.byte_size
                );
                Ok(ExportOutcome::Completed(summary))
            }
            Err(e) => {
                self.set_state(ExportState::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        job: &mut ExportJob,
        tracks: &mut [Track],
        renderer: &mut dyn FrameRenderer,
        sink: &dyn ArtifactSink,
    ) -> Result<ExportSummary, ExportError> {
        let engine = self.engine.ensure_loaded().await?;
        let capture = AudioCapture::new(engine, self.settings.sample_rate, self.settings.channels);
        let mut surface = RgbImage::new(self.settings.width, self.settings.height);

        for (index, track) in tracks.iter_mut().enumerate() {
            let prepared = self.prepare_track(engine, job, index, track).await?;

            self.set_state(ExportState::CapturingAudio { track_index: index });
            self.emit_progress(ExportStage::CapturingAudio, job, index);
            let captured = capture
                .capture_track(track, prepared.duration_seconds)
                .await?;
            let audio_name = audio_file_name(index);
            job.audio_files.push(audio_name.clone());
            engine.write_file(&audio_name, &captured.wav).await?;
            if captured.silent {
                job.silent_tracks.push(track.title.clone());
                self.notify(
                    NotificationLevel::Warning,
                    format!("No audio available for \"{}\", exporting silence", track.title),
                );
            }
            drop(captured);

            self.set_state(ExportState::RenderingFrames { track_index: index });
            self.emit_progress(ExportStage::RenderingFrames, job, index);
            let rendered = match renderer.begin_track(&prepared) {
                Ok(()) => {
                    self.render_frames(engine, job, &prepared, renderer, &mut surface)
                        .await
                }
                Err(e) => Err(e),
            };
            renderer.end_track();
            rendered?;
        }

        self.set_state(ExportState::Muxing);
        self.emit_progress(ExportStage::Muxing, job, job.track_count - 1);

        let manifest = concat_manifest(&job.audio_files);
        engine.write_file(AUDIO_MANIFEST, manifest.as_bytes()).await?;

        tracing::info!(
            "Muxing {} frames with {} audio files",
            job.frames_rendered(),
            job.audio_files.len()
        );
        engine.exec(&mux_args(&self.settings)).await?;

        let data = Bytes::from(engine.read_file(MUX_OUTPUT).await?);
        let byte_size = data.len();
        sink.save(ExportArtifact {
            file_name: self.settings.output_name.clone(),
            mime_type: "video/mp4".to_string(),
            data,
        })
        .await?;
        self.notify(NotificationLevel::Success, "Export Complete!");

        Ok(ExportSummary {
            job_id: job.id.to_string(),
            file_name: self.settings.output_name.clone(),
            byte_size,
            track_count: job.track_count,
            frame_count: job.frames_rendered(),
            silent_tracks: job.silent_tracks.clone(),
            started_at: job.started_at,
            finished_at: Utc::now(),
        })
    }

    /// Resolve duration and cover art for one track
    async fn prepare_track(
        &self,
        engine: &dyn TranscodeEngine,
        job: &ExportJob,
        index: usize,
        track: &mut Track,
    ) -> Result<PreparedTrack, ExportError> {
        self.set_state(ExportState::Preparing { track_index: index });
        self.emit_progress(ExportStage::Preparing, job, index);
        tracing::info!(
            "Preparing track {}/{}: {}",
            index + 1,
            job.track_count,
            track.title
        );

        if track.valid_duration().is_none() {
            let probed = match track.source() {
                Some(source) => probe_duration(engine, source).await,
                None => Ok(None),
            };
            match probed {
                Ok(Some(duration)) => track.duration_seconds = Some(duration),
                Ok(None) => {}
                Err(e) => tracing::warn!("Could not probe duration of {}: {}", track.title, e),
            }
        }

        let duration_seconds = track
            .valid_duration()
            .ok_or_else(|| invalid_duration(track))?;

        let cover_art = match &track.album_art {
            Some(art) => match load_cover_art(art).await {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!("Ignoring cover art of {}: {}", track.title, e);
                    None
                }
            },
            None => None,
        };

        Ok(PreparedTrack {
            index,
            title: track.title.clone(),
            author: track.author.clone(),
            duration_seconds,
            frame_count: FramePlan::new(duration_seconds, self.settings.frame_rate).frame_count,
            cover_art,
        })
    }

    async fn render_frames(
        &self,
        engine: &dyn TranscodeEngine,
        job: &mut ExportJob,
        track: &PreparedTrack,
        renderer: &mut dyn FrameRenderer,
        surface: &mut RgbImage,
    ) -> Result<(), ExportError> {
        let plan = FramePlan::new(track.duration_seconds, self.settings.frame_rate);
        let (width, height) = (self.settings.width, self.settings.height);

        for time_seconds in plan.timestamps() {
            renderer.render(surface, width, height, time_seconds)?;
            let jpeg = encode_jpeg(surface, self.settings.jpeg_quality)?;

            let index = job.next_frame_index();
            engine.write_file(&frame_file_name(index), &jpeg).await?;

            let rendered = job.frames_rendered();
            if rendered % PROGRESS_INTERVAL == 0 {
                tracing::debug!("Rendered {} frames...", rendered);
                self.emit_progress(ExportStage::RenderingFrames, job, track.index);
            }
        }

        tracing::info!(
            "Rendered {} frames for track {}",
            plan.frame_count,
            track.title
        );
        Ok(())
    }

    /// Remove every intermediate file of `job` from the sandbox.
    ///
    /// Best effort and safe to repeat: individual delete failures are only
    /// counted. Does nothing if the engine never loaded.
    pub async fn cleanup(&self, job: &ExportJob) {
        let Some(engine) = self.engine.loaded() else {
            return;
        };

        let names = (0..job.frames_rendered())
            .map(frame_file_name)
            .chain(job.audio_files.iter().cloned())
            .chain([AUDIO_MANIFEST.to_string(), MUX_OUTPUT.to_string()]);

        let mut removed = 0usize;
        let mut failed = 0usize;
        for name in names {
            match engine.delete_file(&name).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    failed += 1;
                    tracing::trace!("Delete of {} failed: {}", name, e);
                }
            }
        }

        if failed > 0 {
            tracing::warn!("Cleanup removed {} files, {} could not be deleted", removed, failed);
        } else {
            tracing::debug!("Cleanup removed {} files", removed);
        }
    }

    fn set_state(&self, state: ExportState) {
        *self.state.write() = state;
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let _ = self.event_tx.send(ExportEvent::Notification {
            level,
            message: message.into(),
        });
    }

    fn emit_progress(&self, stage: ExportStage, job: &ExportJob, track_index: usize) {
        let _ = self.event_tx.send(ExportEvent::Progress(ExportProgress {
            stage,
            track_index,
            track_count: job.track_count,
            frames_rendered: job.frames_rendered(),
        }));
    }
}

async fn load_cover_art(art: &SourceHandle) -> Result<RgbImage, ExportError> {
    let data = art.read_all().await?;
    decode_cover_art(&data).map_err(|e| ExportError::Render(format!("Invalid cover art: {}", e)))
}

fn invalid_duration(track: &Track) -> ExportError {
    ExportError::Validation(format!("Invalid duration for track: {}", track.title))
}

/// First remote track without a usable duration, as a validation error
fn check_remote_durations(tracks: &[Track]) -> Result<(), ExportError> {
    match tracks
        .iter()
        .find(|t| !t.is_local() && t.valid_duration().is_none())
    {
        Some(track) => Err(invalid_duration(track)),
        None => Ok(()),
    }
}

/// Concat demuxer input: one `file '<name>'` line per WAV, in order
pub fn concat_manifest(audio_files: &[String]) -> String {
    audio_files
        .iter()
        .map(|name| format!("file '{}'\n", name.replace('\'', "'\\''")))
        .collect()
}

/// Final ffmpeg invocation: concat audio + image sequence into H.264/AAC
pub fn mux_args(settings: &ExportSettings) -> Vec<String> {
    let frame_rate = settings.frame_rate.to_string();
    [
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
        AUDIO_MANIFEST,
        "-framerate",
        frame_rate.as_str(),
        "-i",
        FRAME_PATTERN,
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-preset",
        settings.video_preset.as_str(),
        "-c:a",
        "aac",
        "-map",
        "0:a",
        "-map",
        "1:v",
        "-shortest",
        MUX_OUTPUT,
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WAV_HEADER_LEN;
    use crate::test_support::{drain_events, FakeEngine, MemorySink, RecordingRenderer};

    fn small_settings() -> ExportSettings {
        ExportSettings {
            width: 64,
            height: 36,
            ..ExportSettings::default()
        }
    }

    fn orchestrator(fake: &Arc<FakeEngine>) -> ExportOrchestrator {
        ExportOrchestrator::new(Arc::new(EngineHandle::new(fake.clone())), small_settings())
    }

    fn local(title: &str, duration: f64) -> Track {
        let source = SourceHandle::from_bytes(format!("{}.mp3", title), vec![1u8; 16]);
        Track::local(title, source).with_duration(duration)
    }

    fn notifications(events: &[ExportEvent], wanted: NotificationLevel) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                ExportEvent::Notification { level, message } if *level == wanted => {
                    Some(message.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_concat_manifest() {
        let files = vec![audio_file_name(0), audio_file_name(1)];
        assert_eq!(
            concat_manifest(&files),
            "file 'audio_0.wav'\nfile 'audio_1.wav'\n"
        );
        assert_eq!(concat_manifest(&["it's.wav".to_string()]), "file 'it'\\''s.wav'\n");
    }

    #[tokio::test]
    async fn test_two_track_export() {
        let fake = Arc::new(FakeEngine::new());
        let orch = orchestrator(&fake);
        let mut events = orch.subscribe();
        let mut tracks = vec![local("one", 2.0), local("two", 3.0)];
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();

        let outcome = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap();

        let summary = match outcome {
            ExportOutcome::Completed(summary) => summary,
            ExportOutcome::Skipped => panic!("export was skipped"),
        };
        assert_eq!(summary.frame_count, 300);
        assert_eq!(summary.track_count, 2);
        assert_eq!(summary.byte_size, 7);
        assert!(summary.silent_tracks.is_empty());

        // One contiguous frame sequence across both tracks
        let frames: Vec<String> = fake
            .written_names()
            .into_iter()
            .filter(|name| name.starts_with("frame_"))
            .collect();
        let expected: Vec<String> = (0..300).map(frame_file_name).collect();
        assert_eq!(frames, expected);
        assert_eq!(frames[299], "frame_000299.jpg");

        assert_eq!(
            fake.written(AUDIO_MANIFEST).unwrap(),
            b"file 'audio_0.wav'\nfile 'audio_1.wav'\n".to_vec()
        );
        assert_eq!(
            fake.written("audio_0.wav").unwrap().len(),
            WAV_HEADER_LEN + 96_000 * 4
        );
        assert_eq!(
            fake.written("audio_1.wav").unwrap().len(),
            WAV_HEADER_LEN + 144_000 * 4
        );

        let execs = fake.execs.lock().clone();
        assert_eq!(execs.last().unwrap(), &mux_args(&small_settings()));

        // Renderer saw per-track timestamps
        assert_eq!(renderer.begun, vec!["one", "two"]);
        assert_eq!(renderer.ended, 2);
        assert_eq!(renderer.timestamps.len(), 300);
        assert_eq!(renderer.timestamps[120], 0.0);
        assert_eq!(renderer.timestamps[119], 119.0 / 60.0);

        let saved = sink.saved.lock();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].file_name, "vinyl_export_4k.mp4");
        assert_eq!(saved[0].mime_type, "video/mp4");
        assert_eq!(&saved[0].data[..], b"mp4data");

        assert!(fake.file_names().is_empty());
        assert_eq!(orch.state(), ExportState::Idle);
        assert!(!orch.is_exporting());

        let events = drain_events(&mut events);
        assert_eq!(
            notifications(&events, NotificationLevel::Info),
            vec!["Starting 4K Video Export..."]
        );
        assert_eq!(
            notifications(&events, NotificationLevel::Success),
            vec!["Export Complete!"]
        );
        assert!(notifications(&events, NotificationLevel::Error).is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            ExportEvent::Progress(ExportProgress {
                stage: ExportStage::Complete,
                frames_rendered: 300,
                ..
            })
        )));
    }

    #[tokio::test]
    async fn test_empty_playlist() {
        let fake = Arc::new(FakeEngine::new());
        let orch = orchestrator(&fake);
        let mut events = orch.subscribe();
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();

        let err = orch
            .export_playlist(&mut [], &mut renderer, &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Validation(_)));
        assert_eq!(fake.loads.load(Ordering::SeqCst), 0);
        assert_eq!(orch.state(), ExportState::Idle);
        assert!(!orch.is_exporting());
        assert_eq!(
            notifications(&drain_events(&mut events), NotificationLevel::Error),
            vec!["Playlist is empty!"]
        );
    }

    #[tokio::test]
    async fn test_invalid_duration_aborts_and_cleans_up() {
        let fake = Arc::new(FakeEngine::new());
        let orch = orchestrator(&fake);
        let mut events = orch.subscribe();
        // Default log has no Duration line, so probing finds nothing
        let unknown = Track::local("unknown", SourceHandle::from_bytes("unknown.mp3", vec![2u8; 8]));
        let mut tracks = vec![local("first", 0.05), unknown];
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();

        let err = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid duration for track: unknown");
        assert_eq!(
            notifications(&drain_events(&mut events), NotificationLevel::Error),
            vec!["Export Failed: Invalid duration for track: unknown"]
        );

        // First track's frames and audio were written, then removed
        assert_eq!(renderer.timestamps.len(), 3);
        assert!(fake.written("frame_000002.jpg").is_some());
        assert!(fake.written("audio_0.wav").is_some());
        assert!(fake.file_names().is_empty());
        assert!(sink.saved.lock().is_empty());

        assert!(matches!(orch.state(), ExportState::Failed { .. }));
        assert!(!orch.is_exporting());
    }

    #[tokio::test]
    async fn test_remote_without_duration_rejected_up_front() {
        let fake = Arc::new(FakeEngine::new());
        let orch = orchestrator(&fake);
        let mut events = orch.subscribe();
        let mut tracks = vec![local("first", 0.05), Track::remote("unknown", "abc")];
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();

        let err = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid duration for track: unknown");
        let events = drain_events(&mut events);
        assert_eq!(
            notifications(&events, NotificationLevel::Error),
            vec!["Export Failed: Invalid duration for track: unknown"]
        );
        assert!(notifications(&events, NotificationLevel::Info).is_empty());

        assert!(renderer.timestamps.is_empty());
        assert!(renderer.begun.is_empty());
        assert_eq!(fake.loads.load(Ordering::SeqCst), 0);
        assert!(fake.written_names().is_empty());
        assert!(matches!(orch.state(), ExportState::Failed { .. }));
        assert!(!orch.is_exporting());
    }

    #[tokio::test]
    async fn test_non_finite_duration_is_rejected() {
        let fake = Arc::new(FakeEngine::new());
        fake.set_log("Input #0, mp3, from 'x':\n  Duration: N/A\n");
        let orch = orchestrator(&fake);
        let mut tracks = vec![local("nan", f64::NAN)];
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();

        let err = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Validation(_)));
        assert!(renderer.begun.is_empty());
    }

    #[tokio::test]
    async fn test_missing_duration_is_probed() {
        let fake = Arc::new(FakeEngine::new());
        fake.set_log("Input #0, mp3, from 'x':\n  Duration: 00:00:01.50, start: 0.000000\n");
        let orch = orchestrator(&fake);
        let source = SourceHandle::from_bytes("probe.mp3", vec![3u8; 8]);
        let mut tracks = vec![Track::local("probe", source)];
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();

        let outcome = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap();

        assert!(matches!(outcome, ExportOutcome::Completed(ref s) if s.frame_count == 90));
        assert_eq!(tracks[0].duration_seconds, Some(1.5));
    }

    #[tokio::test]
    async fn test_decode_failure_aborts() {
        let fake = Arc::new(FakeEngine::new());
        fake.fail_decode();
        let orch = orchestrator(&fake);
        let mut events = orch.subscribe();
        let mut tracks = vec![local("broken", 1.0)];
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();

        let err = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Decode(_)));
        assert_eq!(
            notifications(&drain_events(&mut events), NotificationLevel::Error).len(),
            1
        );
        assert!(renderer.timestamps.is_empty());
        assert!(fake.file_names().is_empty());
    }

    #[tokio::test]
    async fn test_remote_track_is_reported_silent() {
        let fake = Arc::new(FakeEngine::new());
        let orch = orchestrator(&fake);
        let mut events = orch.subscribe();
        let mut tracks = vec![Track::remote("live", "dQw4w9WgXcQ").with_duration(0.05)];
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();

        let outcome = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap();

        match outcome {
            ExportOutcome::Completed(summary) => {
                assert_eq!(summary.silent_tracks, vec!["live"]);
                assert_eq!(summary.frame_count, 3);
            }
            ExportOutcome::Skipped => panic!("export was skipped"),
        }
        let warnings = notifications(&drain_events(&mut events), NotificationLevel::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("live"));
    }

    #[tokio::test]
    async fn test_render_failure_ends_track() {
        let fake = Arc::new(FakeEngine::new());
        let orch = orchestrator(&fake);
        let mut tracks = vec![local("one", 1.0)];
        let mut renderer = RecordingRenderer {
            fail_at: Some(1),
            ..RecordingRenderer::default()
        };
        let sink = MemorySink::default();

        let err = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Render(_)));
        assert_eq!(renderer.ended, 1);
        assert!(fake.written("frame_000000.jpg").is_some());
        assert!(fake.written("frame_000001.jpg").is_none());
        assert!(fake.file_names().is_empty());
    }

    #[tokio::test]
    async fn test_engine_loaded_once_across_exports() {
        let fake = Arc::new(FakeEngine::new());
        let orch = orchestrator(&fake);
        let sink = MemorySink::default();

        for _ in 0..2 {
            let mut tracks = vec![local("again", 0.05)];
            let mut renderer = RecordingRenderer::default();
            orch.export_playlist(&mut tracks, &mut renderer, &sink)
                .await
                .unwrap();
        }

        assert_eq!(fake.loads.load(Ordering::SeqCst), 1);
        assert_eq!(sink.saved.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let fake = Arc::new(FakeEngine::new());
        let handle = Arc::new(EngineHandle::new(fake.clone()));
        handle.ensure_loaded().await.unwrap();
        let orch = ExportOrchestrator::new(handle, small_settings());

        let mut job = ExportJob::new(1, &small_settings());
        for _ in 0..3 {
            let index = job.next_frame_index();
            fake.write_file(&frame_file_name(index), b"jpg").await.unwrap();
        }
        job.audio_files.push(audio_file_name(0));
        fake.write_file("audio_0.wav", b"wav").await.unwrap();
        fake.write_file(AUDIO_MANIFEST, b"file 'audio_0.wav'\n")
            .await
            .unwrap();

        orch.cleanup(&job).await;
        assert!(fake.file_names().is_empty());

        orch.cleanup(&job).await;
        assert!(fake.file_names().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_without_engine_is_noop() {
        let fake = Arc::new(FakeEngine::new());
        let orch = orchestrator(&fake);
        let job = ExportJob::new(1, &small_settings());

        orch.cleanup(&job).await;
        assert!(fake.deletes.lock().is_empty());
        assert_eq!(fake.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_export_is_ignored_while_running() {
        let fake = Arc::new(FakeEngine::new());
        let gate = fake.gate_mux();
        let orch = orchestrator(&fake);

        let first = orch.clone();
        let task = tokio::spawn(async move {
            let mut tracks = vec![local("first", 0.05)];
            let mut renderer = RecordingRenderer::default();
            let sink = MemorySink::default();
            first
                .export_playlist(&mut tracks, &mut renderer, &sink)
                .await
        });

        gate.entered.notified().await;
        assert!(orch.is_exporting());
        assert_eq!(orch.state(), ExportState::Muxing);
        let execs_before = fake.exec_count();
        let writes_before = fake.written_names().len();

        let mut tracks = vec![local("second", 0.05)];
        let mut renderer = RecordingRenderer::default();
        let sink = MemorySink::default();
        let outcome = orch
            .export_playlist(&mut tracks, &mut renderer, &sink)
            .await
            .unwrap();

        assert!(matches!(outcome, ExportOutcome::Skipped));
        assert!(renderer.timestamps.is_empty());
        assert_eq!(orch.state(), ExportState::Muxing);
        assert!(orch.is_exporting());
        assert_eq!(fake.exec_count(), execs_before);
        assert_eq!(fake.written_names().len(), writes_before);

        gate.release.notify_one();
        let first = task.await.unwrap().unwrap();
        assert!(matches!(first, ExportOutcome::Completed(_)));
        assert!(!orch.is_exporting());
        assert_eq!(orch.state(), ExportState::Idle);
    }
}
