//! Canonical 16-bit PCM WAV encoding

use super::buffer::AudioBuffer;
use bytes::Bytes;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// RIFF + 16-byte `fmt ` + `data` headers of a plain PCM file
pub const WAV_HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;

/// Convert a float sample to 16-bit PCM.
///
/// Negative values scale by 32768 and non-negative ones by 32767, so -1.0
/// maps to `i16::MIN` and 1.0 to `i16::MAX`.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode `buffer` as a RIFF/WAVE file with interleaved 16-bit samples
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Bytes, hound::Error> {
    let spec = WavSpec {
        channels: buffer.channel_count() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };
    let capacity = WAV_HEADER_LEN + buffer.len() * buffer.channel_count() * 2;
    let mut cursor = Cursor::new(Vec::with_capacity(capacity));

    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for i in 0..buffer.len() {
            for channel in &buffer.channels {
                writer.write_sample(sample_to_i16(channel[i]))?;
            }
        }
        writer.finalize()?;
    }

    Ok(Bytes::from(cursor.into_inner()))
}
