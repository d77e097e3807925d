//! Planar float sample buffers

/// Decoded audio, one `Vec<f32>` per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

/// Frames a track of `duration_seconds` must have at `sample_rate`
pub fn expected_frames(duration_seconds: f64, sample_rate: u32) -> usize {
    (duration_seconds * sample_rate as f64).floor() as usize
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// All-zero buffer
    pub fn silent(channel_count: usize, sample_rate: u32, frames: usize) -> Self {
        Self::new(sample_rate, vec![vec![0.0; frames]; channel_count])
    }

    /// Split interleaved samples into channels; a trailing partial frame is dropped
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        let channel_count = channel_count.max(1);
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];

        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(sample_rate, channels)
    }

    /// Parse raw little-endian `f32` PCM as produced by ffmpeg's `f32le` muxer
    pub fn from_f32le(raw: &[u8], channel_count: usize, sample_rate: u32) -> Self {
        let samples: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Self::from_interleaved(&samples, channel_count, sample_rate)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample frames per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncate or zero-pad every channel to exactly `frames`
    pub fn fit_to_length(&mut self, frames: usize) {
        for channel in &mut self.channels {
            channel.resize(frames, 0.0);
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }
}
