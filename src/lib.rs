//! Vinyl Export - chapter discovery and 4K playlist video export.
//!
//! This is the main library crate. It provides chapter extraction for local
//! media files and the export pipeline that renders a playlist into a single
//! muxed MP4 through an external ffmpeg engine.

pub mod audio;
pub mod chapters;
pub mod commands;
pub mod config;
pub mod container;
pub mod engine;
pub mod export;
pub mod project;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use chapters::{Chapter, ChapterExtractor};
pub use engine::{EngineHandle, FfmpegEngine, TranscodeEngine};
pub use export::{ExportOrchestrator, FrameRenderer};
pub use project::{SourceHandle, Track, TrackKind};

/// Initialize tracing/logging
///
/// Honors `RUST_LOG` and falls back to debug output for this crate.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vinyl_export=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    tracing::debug!("Vinyl Export v{}", env!("CARGO_PKG_VERSION"));
}
