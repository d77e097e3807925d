//! Playlist video export
//!
//! Turns an ordered list of tracks into one MP4: per-track WAV audio, a
//! rendered JPEG frame sequence, and a final concat + mux through the
//! transcoding engine.

pub mod pipeline;
pub mod render;
pub mod state;
pub mod types;

pub use pipeline::{concat_manifest, mux_args, ExportOrchestrator, AUDIO_MANIFEST, MUX_OUTPUT};
pub use render::{
    encode_jpeg, frame_count, frame_file_name, frame_timestamp, FramePlan, FrameRenderer,
    PreparedTrack, FRAME_PATTERN,
};
pub use state::{audio_file_name, ExportJob, ExportState};
pub use types::{
    ArtifactSink, ExportArtifact, ExportError, ExportEvent, ExportOutcome, ExportProgress,
    ExportSettings, ExportStage, ExportSummary, NotificationLevel,
};
