//! Export types and configuration
//!
//! Settings, progress events, the final artifact and the error taxonomy of
//! the playlist export pipeline.

use crate::audio::AudioError;
use crate::engine::EngineError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    /// Output frames per second
    pub frame_rate: u32,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// JPEG quality for intermediate frames (1-100)
    pub jpeg_quality: u8,
    /// Intermediate audio sample rate
    pub sample_rate: u32,
    /// Intermediate audio channel count
    pub channels: u16,
    /// File name of the delivered video
    pub output_name: String,
    /// x264 preset used for the final encode
    pub video_preset: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            width: 3840,
            height: 2160,
            jpeg_quality: 80,
            sample_rate: 48_000,
            channels: 2,
            output_name: "vinyl_export_4k.mp4".to_string(),
            video_preset: "ultrafast".to_string(),
        }
    }
}

/// Export progress stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportStage {
    Preparing,
    CapturingAudio,
    RenderingFrames,
    Muxing,
    Cleanup,
    Complete,
}

/// Export progress information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub stage: ExportStage,
    /// Zero-based index of the track being processed
    pub track_index: usize,
    pub track_count: usize,
    /// Frames written so far across all tracks
    pub frames_rendered: u64,
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Events emitted during export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ExportEvent {
    Progress(ExportProgress),
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

/// The finished video, ready to be saved by the caller
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// Destination of the finished video
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn save(&self, artifact: ExportArtifact) -> Result<(), ExportError>;
}

/// What a completed export produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub job_id: String,
    pub file_name: String,
    pub byte_size: usize,
    pub track_count: usize,
    pub frame_count: u64,
    /// Titles of tracks whose audio was replaced by silence
    pub silent_tracks: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Result of an export request
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// Another export was already running; nothing was done
    Skipped,
    Completed(ExportSummary),
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{0}")]
    Validation(String),

    #[error("Audio decode failed: {0}")]
    Decode(AudioError),

    #[error("Transcode failed: {0}")]
    Transcode(#[from] EngineError),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to save export: {0}")]
    Artifact(String),
}

impl From<AudioError> for ExportError {
    fn from(e: AudioError) -> Self {
        match e {
            // Sandbox and process failures are not about the audio itself
            AudioError::Engine(inner) => ExportError::Transcode(inner),
            other => ExportError::Decode(other),
        }
    }
}

impl From<ExportError> for String {
    fn from(e: ExportError) -> String {
        e.to_string()
    }
}
