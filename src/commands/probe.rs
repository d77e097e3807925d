//! `probe` command: duration and chapters of one file

use crate::chapters::{Chapter, ChapterExtractor, ChapterSettings};
use crate::engine::probe::probe_duration;
use crate::engine::EngineHandle;
use crate::project::SourceHandle;
use crate::utils::{AppError, AppResult};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// What the engine can tell about a media file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub file: String,
    pub duration_seconds: Option<f64>,
    pub chapters: Vec<Chapter>,
}

pub async fn probe_file(
    engine: Arc<EngineHandle>,
    settings: &ChapterSettings,
    file: &Path,
) -> AppResult<ProbeReport> {
    if !file.is_file() {
        return Err(AppError::InvalidArgument(format!(
            "not a file: {}",
            file.display()
        )));
    }
    let source = SourceHandle::from_path(file);

    let loaded = engine.ensure_loaded().await?;
    let duration_seconds = probe_duration(loaded, &source).await?;

    let chapters = ChapterExtractor::new(engine.clone(), settings.clone())
        .extract_chapters(&source)
        .await;

    Ok(ProbeReport {
        file: source.display_name(),
        duration_seconds,
        chapters,
    })
}
