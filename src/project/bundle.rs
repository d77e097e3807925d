//! Playlist file read/write operations
//!
//! A playlist file is a JSON document holding a [`Playlist`]. Relative source
//! paths inside it are resolved against the directory containing the file.
//! A remote track may give a YouTube `url` in place of its `video_id`.

use super::playlist::{parse_youtube_url, Playlist};
use super::schema::{SourceHandle, TrackKind};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Playlist file errors
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing playlist file: {0}")]
    MissingFile(String),

    #[error("Not a YouTube video link: {0}")]
    InvalidUrl(String),
}

/// Read a playlist from a JSON file
pub fn read_playlist(path: &Path) -> Result<Playlist, BundleError> {
    if !path.is_file() {
        return Err(BundleError::MissingFile(path.display().to_string()));
    }

    let content = fs::read_to_string(path)?;
    let mut value: Value = serde_json::from_str(&content)?;
    expand_video_urls(&mut value)?;
    let mut playlist: Playlist = serde_json::from_value(value)?;

    if let Some(base) = path.parent() {
        for track in &mut playlist.tracks {
            if let TrackKind::Local { source } = &mut track.kind {
                resolve_relative(source, base);
            }
            if let Some(art) = &mut track.album_art {
                resolve_relative(art, base);
            }
        }
    }

    tracing::debug!("Loaded playlist with {} tracks from {:?}", playlist.len(), path);

    Ok(playlist)
}

/// Write a playlist to a JSON file
pub fn write_playlist(playlist: &Playlist, path: &Path) -> Result<(), BundleError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(playlist)?;
    fs::write(path, content)?;

    tracing::debug!("Saved playlist with {} tracks to {:?}", playlist.len(), path);

    Ok(())
}

/// Turn `{"type": "remote", "url": ...}` into `{"type": "remote", "video_id": ...}`
fn expand_video_urls(value: &mut Value) -> Result<(), BundleError> {
    let Some(tracks) = value.get_mut("tracks").and_then(Value::as_array_mut) else {
        return Ok(());
    };

    for kind in tracks.iter_mut().filter_map(|t| t.get_mut("kind")) {
        let Some(kind) = kind.as_object_mut() else {
            continue;
        };
        if kind.get("type").and_then(Value::as_str) != Some("remote")
            || kind.contains_key("video_id")
        {
            continue;
        }
        let Some(url) = kind.remove("url") else {
            continue;
        };
        let url = url.as_str().unwrap_or_default().to_string();
        let video_id = parse_youtube_url(&url)
            .video_id
            .ok_or(BundleError::InvalidUrl(url))?;
        kind.insert("video_id".to_string(), Value::String(video_id));
    }

    Ok(())
}

fn resolve_relative(source: &mut SourceHandle, base: &Path) {
    if let SourceHandle::Path { path } = source {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}
