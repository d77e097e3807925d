//! Track and source definitions
//!
//! Tracks are supplied by the player UI. The export engine only reads them,
//! filling in a probed duration when the UI did not know it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tokio::io::AsyncRead;

// =============================================================================
// Sources
// =============================================================================

/// Readable byte source for a local track, its cover art, or a chapter probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceHandle {
    /// File on disk
    Path { path: PathBuf },
    /// Bytes already held in memory (e.g. a file picked in the UI)
    Memory { name: String, data: Bytes },
}

impl SourceHandle {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        SourceHandle::Path { path: path.into() }
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        SourceHandle::Memory {
            name: name.into(),
            data: data.into(),
        }
    }

    /// File name used in logs and for the staged sandbox copy
    pub fn display_name(&self) -> String {
        match self {
            SourceHandle::Path { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string()),
            SourceHandle::Memory { name, .. } => name.clone(),
        }
    }

    /// Lowercase extension, restricted to characters safe for sandbox names
    pub fn extension(&self) -> Option<String> {
        let name = self.display_name();
        let (_, ext) = name.rsplit_once('.')?;
        let valid = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then(|| ext.to_ascii_lowercase())
    }

    /// Read the whole source
    pub async fn read_all(&self) -> io::Result<Bytes> {
        match self {
            SourceHandle::Path { path } => Ok(Bytes::from(tokio::fs::read(path).await?)),
            SourceHandle::Memory { data, .. } => Ok(data.clone()),
        }
    }

    /// Open the source for sequential reading
    pub async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        match self {
            SourceHandle::Path { path } => Ok(Box::new(tokio::fs::File::open(path).await?)),
            SourceHandle::Memory { data, .. } => Ok(Box::new(io::Cursor::new(data.clone()))),
        }
    }
}

// =============================================================================
// Tracks
// =============================================================================

/// Where a track's media lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrackKind {
    /// Downloadable media we can decode
    Local { source: SourceHandle },
    /// Externally hosted video (YouTube); audio cannot be captured
    Remote { video_id: String },
}

/// A playlist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub kind: TrackKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Unknown until probed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_art: Option<SourceHandle>,
}

impl Track {
    pub fn local(title: impl Into<String>, source: SourceHandle) -> Self {
        Self {
            kind: TrackKind::Local { source },
            title: title.into(),
            author: None,
            duration_seconds: None,
            album_art: None,
        }
    }

    pub fn remote(title: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            kind: TrackKind::Remote {
                video_id: video_id.into(),
            },
            title: title.into(),
            author: None,
            duration_seconds: None,
            album_art: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_album_art(mut self, art: SourceHandle) -> Self {
        self.album_art = Some(art);
        self
    }

    /// Decodable source, for local tracks
    pub fn source(&self) -> Option<&SourceHandle> {
        match &self.kind {
            TrackKind::Local { source } => Some(source),
            TrackKind::Remote { .. } => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, TrackKind::Local { .. })
    }

    /// Duration if it is usable for frame and sample math (finite and > 0)
    pub fn valid_duration(&self) -> Option<f64> {
        self.duration_seconds.filter(|d| d.is_finite() && *d > 0.0)
    }
}
