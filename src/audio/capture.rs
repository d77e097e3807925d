//! Per-track audio capture
//!
//! Local tracks are decoded by the engine to interleaved `f32le` PCM at the
//! target rate and channel count. Remote tracks cannot be downloaded, so they
//! get a silent buffer of the same length instead.

use super::buffer::{expected_frames, AudioBuffer};
use super::wav::encode_wav;
use super::AudioError;
use crate::engine::{discard, stage_source, TranscodeEngine};
use crate::project::{SourceHandle, Track};
use bytes::Bytes;

/// Encoded audio for one track
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub wav: Bytes,
    /// Sample frames in `wav`
    pub frames: usize,
    /// True when the track's audio could not be captured and silence was used
    pub silent: bool,
}

/// Decodes track audio through a loaded engine
pub struct AudioCapture<'a> {
    engine: &'a dyn TranscodeEngine,
    sample_rate: u32,
    channels: u16,
}

impl<'a> AudioCapture<'a> {
    pub fn new(engine: &'a dyn TranscodeEngine, sample_rate: u32, channels: u16) -> Self {
        Self {
            engine,
            sample_rate,
            channels,
        }
    }

    /// Decode a whole source at the target rate and channel count
    pub async fn decode(&self, source: &SourceHandle) -> Result<AudioBuffer, AudioError> {
        let input = stage_source(self.engine, source, "decode_src").await?;
        let output = format!("pcm_{}.f32", uuid::Uuid::new_v4().simple());

        let args: Vec<String> = vec![
            "-i".into(),
            input.clone(),
            "-vn".into(),
            "-f".into(),
            "f32le".into(),
            "-acodec".into(),
            "pcm_f32le".into(),
            "-ac".into(),
            self.channels.to_string(),
            "-ar".into(),
            self.sample_rate.to_string(),
            output.clone(),
        ];

        let raw = match self.engine.exec(&args).await {
            Ok(_) => self.engine.read_file(&output).await.map_err(AudioError::from),
            Err(e) => Err(AudioError::Decode {
                source_name: source.display_name(),
                message: e.to_string(),
            }),
        };
        discard(self.engine, &input).await;
        discard(self.engine, &output).await;

        let buffer = AudioBuffer::from_f32le(&raw?, self.channels as usize, self.sample_rate);
        tracing::debug!(
            "Decoded {} frames ({:.2}s) from {}",
            buffer.len(),
            buffer.duration_seconds(),
            source.display_name()
        );
        Ok(buffer)
    }

    /// Capture a track as WAV of exactly `floor(duration * rate)` frames
    pub async fn capture_track(
        &self,
        track: &Track,
        duration_seconds: f64,
    ) -> Result<CapturedAudio, AudioError> {
        let expected = expected_frames(duration_seconds, self.sample_rate);

        let (mut buffer, silent) = match track.source() {
            Some(source) => (self.decode(source).await?, false),
            None => {
                tracing::warn!(
                    "Audio for remote track {} cannot be captured, using silence",
                    track.title
                );
                (
                    AudioBuffer::silent(self.channels as usize, self.sample_rate, expected),
                    true,
                )
            }
        };

        if buffer.len() != expected {
            tracing::debug!(
                "Fitting {} audio from {} to {} frames",
                track.title,
                buffer.len(),
                expected
            );
        }
        buffer.fit_to_length(expected);

        Ok(CapturedAudio {
            wav: encode_wav(&buffer)?,
            frames: expected,
            silent,
        })
    }
}
