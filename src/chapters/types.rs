//! Chapter types and settings

use crate::container::AtomError;
use crate::engine::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named time marker inside a media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// 1-based position in the final sorted list
    pub index: u32,
    pub title: String,
    pub start_seconds: f64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start_seconds: f64) -> Self {
        Self {
            index: 0,
            title: title.into(),
            start_seconds,
        }
    }
}

/// Sort by start time and renumber from 1
///
/// Negative starts (edit-list offsets) are clamped to zero; non-finite ones
/// are dropped.
pub fn finalize_chapters(chapters: Vec<Chapter>) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = chapters
        .into_iter()
        .filter(|c| c.start_seconds.is_finite())
        .map(|mut c| {
            c.start_seconds = c.start_seconds.max(0.0);
            c
        })
        .collect();
    chapters.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
    for (i, chapter) in chapters.iter_mut().enumerate() {
        chapter.index = i as u32 + 1;
    }
    chapters
}

/// Default title for a chapter without one
pub(crate) fn fallback_title(position: usize) -> String {
    format!("Chapter {}", position)
}

/// Chapter extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterSettings {
    /// Bytes handed to the box parser per step
    pub chunk_size: usize,
    /// Lines searched after a "Chapter #" log line for its title
    pub log_lookahead: usize,
}

impl Default for ChapterSettings {
    fn default() -> Self {
        Self {
            chunk_size: 2 * 1024 * 1024,
            log_lookahead: 4,
        }
    }
}

/// Errors inside a single strategy; never returned from the extractor
#[derive(Error, Debug)]
pub enum ChapterError {
    #[error("Chapter metadata parse error: {0}")]
    Parse(String),

    #[error("Transcode error: {0}")]
    Transcode(#[from] EngineError),

    #[error("Container parse error: {0}")]
    Atom(#[from] AtomError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
