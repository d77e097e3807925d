//! Command handlers
//!
//! Each subcommand of the `vinyl-export` binary is a thin async function here
//! over the library: it wires configuration, the shared engine handle and the
//! built-in renderer and sink together.

pub mod chapters;
pub mod export;
pub mod probe;
pub mod render;

use crate::config::AppConfig;
use crate::engine::{EngineHandle, FfmpegEngine};
use std::sync::Arc;

/// Engine handle backed by the configured ffmpeg binary; not loaded yet
pub fn engine_from_config(config: &AppConfig) -> Arc<EngineHandle> {
    Arc::new(EngineHandle::new(Arc::new(FfmpegEngine::new(
        config.engine.clone(),
    ))))
}
