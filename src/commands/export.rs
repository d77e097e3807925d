//! `export` command
//!
//! Loads a playlist file, runs the export with the built-in turntable
//! renderer and writes the finished video into an output directory.

use super::render::TurntableRenderer;
use crate::engine::EngineHandle;
use crate::export::{
    ArtifactSink, ExportArtifact, ExportError, ExportEvent, ExportOrchestrator, ExportOutcome,
    ExportSettings, NotificationLevel,
};
use crate::project::read_playlist;
use crate::utils::AppResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Saves artifacts as files in a directory
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn save(&self, artifact: ExportArtifact) -> Result<(), ExportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&artifact.file_name);
        tokio::fs::write(&path, &artifact.data)
            .await
            .map_err(|e| ExportError::Artifact(format!("{}: {}", path.display(), e)))?;
        tracing::info!(
            "Saved {} ({} bytes) to {:?}",
            artifact.mime_type,
            artifact.data.len(),
            path
        );
        Ok(())
    }
}

/// Export the playlist at `playlist_path` into `out_dir`
pub async fn export_playlist_file(
    engine: Arc<EngineHandle>,
    settings: ExportSettings,
    playlist_path: &Path,
    out_dir: &Path,
) -> AppResult<ExportOutcome> {
    let playlist = read_playlist(playlist_path)?;
    let mut tracks = playlist.tracks;

    let orchestrator = ExportOrchestrator::new(engine, settings);
    let listener = tokio::spawn(log_events(orchestrator.subscribe()));

    let mut renderer = TurntableRenderer::new();
    let sink = DirectorySink::new(out_dir);
    let result = orchestrator
        .export_playlist(&mut tracks, &mut renderer, &sink)
        .await;

    // Closing the channel ends the listener
    drop(orchestrator);
    let _ = listener.await;

    Ok(result?)
}

/// Mirror export events into the log until the channel closes
async fn log_events(mut rx: broadcast::Receiver<ExportEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => log_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Skipped {} export events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &ExportEvent) {
    match event {
        ExportEvent::Progress(progress) => tracing::debug!(
            "{:?}: track {}/{}, {} frames",
            progress.stage,
            progress.track_index + 1,
            progress.track_count,
            progress.frames_rendered
        ),
        ExportEvent::Notification { level, message } => match level {
            NotificationLevel::Info | NotificationLevel::Success => tracing::info!("{}", message),
            NotificationLevel::Warning => tracing::warn!("{}", message),
            NotificationLevel::Error => tracing::error!("{}", message),
        },
    }
}
