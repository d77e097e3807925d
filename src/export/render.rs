//! Frame rendering contract
//!
//! The pipeline never draws pixels itself. A [`FrameRenderer`] paints each
//! frame from a timestamp alone; the pipeline decides how many frames a track
//! gets, serializes them to JPEG and names them in one global sequence.

use super::types::ExportError;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// `printf` pattern the muxer uses to read the frame sequence
pub const FRAME_PATTERN: &str = "frame_%06d.jpg";

/// Track data handed to the renderer for the duration of one track
#[derive(Debug, Clone)]
pub struct PreparedTrack {
    pub index: usize,
    pub title: String,
    pub author: Option<String>,
    pub duration_seconds: f64,
    pub frame_count: u64,
    /// Decoded album art, if the track had any that could be read
    pub cover_art: Option<RgbImage>,
}

/// Paints export frames.
///
/// `render` must be deterministic: the pixels may depend on `time_seconds`
/// and the current track, never on how many frames were drawn before.
pub trait FrameRenderer: Send {
    /// Called once before the first frame of a track
    fn begin_track(&mut self, _track: &PreparedTrack) -> Result<(), ExportError> {
        Ok(())
    }

    fn render(
        &mut self,
        surface: &mut RgbImage,
        width: u32,
        height: u32,
        time_seconds: f64,
    ) -> Result<(), ExportError>;

    /// Called after the last frame of a track, also when rendering failed.
    /// Per-track resources must be dropped here.
    fn end_track(&mut self) {}
}

/// `max(1, round(duration * fps))`
pub fn frame_count(duration_seconds: f64, frame_rate: u32) -> u64 {
    ((duration_seconds * frame_rate as f64).round() as u64).max(1)
}

/// Timestamp of frame `i` within its track
pub fn frame_timestamp(index: u64, frame_rate: u32) -> f64 {
    index as f64 / frame_rate as f64
}

/// Frame schedule of one track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    pub frame_count: u64,
    pub frame_rate: u32,
}

impl FramePlan {
    pub fn new(duration_seconds: f64, frame_rate: u32) -> Self {
        Self {
            frame_count: frame_count(duration_seconds, frame_rate),
            frame_rate,
        }
    }

    /// `i / fps` for every frame of the track
    pub fn timestamps(&self) -> impl Iterator<Item = f64> {
        let rate = self.frame_rate;
        (0..self.frame_count).map(move |i| frame_timestamp(i, rate))
    }
}

/// Sandbox name of global frame `index`
pub fn frame_file_name(index: u64) -> String {
    format!("frame_{:06}.jpg", index)
}

/// JPEG-encode a rendered frame
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode_image(frame)
        .map_err(|e| ExportError::Render(format!("JPEG encoding failed: {}", e)))?;
    Ok(out)
}

/// Decode album art into RGB
pub fn decode_cover_art(data: &[u8]) -> Result<RgbImage, image::ImageError> {
    Ok(image::load_from_memory(data)?.to_rgb8())
}
