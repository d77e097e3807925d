//! Audio capture and PCM encoding
//!
//! Produces one WAV file per track whose length matches the track's video
//! exactly, so concatenated audio never drifts from the frame sequence.

mod buffer;
mod capture;
mod wav;

pub use buffer::{expected_frames, AudioBuffer};
pub use capture::{AudioCapture, CapturedAudio};
pub use wav::{encode_wav, sample_to_i16, WAV_HEADER_LEN};

use crate::engine::EngineError;
use thiserror::Error;

/// Audio capture errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to decode audio from {source_name}: {message}")]
    Decode { source_name: String, message: String },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}
