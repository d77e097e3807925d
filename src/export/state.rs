//! Export state management
//!
//! Defines the export state machine and the per-job bookkeeping that has to
//! survive across tracks.

use super::types::ExportSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current state of the export pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum ExportState {
    /// No export in progress
    Idle,
    /// Resolving duration and cover art of a track
    Preparing { track_index: usize },
    /// Producing and staging a track's WAV
    CapturingAudio { track_index: usize },
    /// Writing a track's frames
    RenderingFrames { track_index: usize },
    /// Final engine invocation
    Muxing,
    /// Removing intermediate files
    Cleanup,
    /// Last export failed
    Failed { message: String },
}

impl Default for ExportState {
    fn default() -> Self {
        Self::Idle
    }
}

impl ExportState {
    /// True while a job is between its first track and the end of cleanup
    pub fn is_active(&self) -> bool {
        !matches!(self, ExportState::Idle | ExportState::Failed { .. })
    }
}

/// One run of the pipeline over a playlist
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub id: Uuid,
    pub track_count: usize,
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
    /// Next global frame index; never reset between tracks
    frame_counter: u64,
    /// Per-track WAV names in playlist order
    pub audio_files: Vec<String>,
    /// Titles of tracks exported with silent audio
    pub silent_tracks: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl ExportJob {
    pub fn new(track_count: usize, settings: &ExportSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            track_count,
            frame_rate: settings.frame_rate,
            width: settings.width,
            height: settings.height,
            frame_counter: 0,
            audio_files: Vec::new(),
            silent_tracks: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Claim the next frame index
    pub fn next_frame_index(&mut self) -> u64 {
        let index = self.frame_counter;
        self.frame_counter += 1;
        index
    }

    /// Frame indices claimed so far (`0..frames_rendered()`)
    pub fn frames_rendered(&self) -> u64 {
        self.frame_counter
    }
}

/// Sandbox name of a track's WAV
pub fn audio_file_name(track_index: usize) -> String {
    format!("audio_{}.wav", track_index)
}
