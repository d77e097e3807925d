//! `chapters` command

use crate::chapters::{Chapter, ChapterExtractor, ChapterSettings};
use crate::engine::EngineHandle;
use crate::project::SourceHandle;
use crate::utils::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Extract the chapters of a local media file
pub async fn list_chapters(
    engine: Arc<EngineHandle>,
    settings: &ChapterSettings,
    file: &Path,
) -> AppResult<Vec<Chapter>> {
    if !file.is_file() {
        return Err(AppError::InvalidArgument(format!(
            "not a file: {}",
            file.display()
        )));
    }

    let extractor = ChapterExtractor::new(engine, settings.clone());
    Ok(extractor
        .extract_chapters(&SourceHandle::from_path(file))
        .await)
}

/// `HH:MM:SS.mmm`
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let (hours, rest) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        hours,
        minutes,
        rest / 1000,
        rest % 1000
    )
}

/// One line per chapter for terminal output
pub fn format_chapters(chapters: &[Chapter]) -> String {
    if chapters.is_empty() {
        return "No chapters found\n".to_string();
    }
    chapters
        .iter()
        .map(|c| {
            format!(
                "{:>3}. {}  {}\n",
                c.index,
                format_timestamp(c.start_seconds),
                c.title
            )
        })
        .collect()
}
