//! Lazily loaded engine handle
//!
//! One handle is shared by everything that talks to the engine so the
//! engine is loaded at most once for the lifetime of the process.

use super::{EngineError, TranscodeEngine};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Shared, lazily loaded access to a [`TranscodeEngine`]
pub struct EngineHandle {
    engine: Arc<dyn TranscodeEngine>,
    loaded: OnceCell<()>,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self {
            engine,
            loaded: OnceCell::new(),
        }
    }

    /// Load the engine if needed and return it.
    ///
    /// Safe to call before every use. Concurrent callers wait on the same
    /// load; a failed load is retried by the next caller.
    pub async fn ensure_loaded(&self) -> Result<&dyn TranscodeEngine, EngineError> {
        self.loaded
            .get_or_try_init(|| async {
                tracing::info!("Loading transcoding engine");
                self.engine.load().await
            })
            .await?;
        Ok(self.engine.as_ref())
    }

    /// The engine, only if it has already been loaded
    pub fn loaded(&self) -> Option<&dyn TranscodeEngine> {
        self.loaded.get().map(|_| self.engine.as_ref())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }
}
