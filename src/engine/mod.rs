//! Transcoding engine sandbox
//!
//! The engine is an external ffmpeg instance with a private file namespace
//! (the "sandbox") used to stage inputs and outputs for each invocation.
//! Callers only ever address sandbox files by bare name.

mod ffmpeg;
mod handle;
pub mod probe;

pub use ffmpeg::FfmpegEngine;
pub use handle::EngineHandle;

use crate::project::SourceHandle;
use async_trait::async_trait;
use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("ffmpeg not found: {0}")]
    NotFound(String),

    #[error("Engine not loaded")]
    NotLoaded,

    #[error("Failed to start ffmpeg: {0}")]
    Spawn(std::io::Error),

    #[error("ffmpeg exited with status {}: {}", status_text(.status), last_line(.log))]
    ExitStatus { status: Option<i32>, log: String },

    #[error("Invalid sandbox file name: {0:?}")]
    InvalidName(String),

    #[error("Sandbox IO error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read source media: {0}")]
    Source(std::io::Error),
}

impl EngineError {
    /// Diagnostic log captured from a failed invocation, if any
    pub fn log(&self) -> Option<&str> {
        match self {
            EngineError::ExitStatus { log, .. } => Some(log),
            _ => None,
        }
    }
}

fn status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

fn last_line(log: &str) -> &str {
    log.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(str::trim)
        .unwrap_or("")
}

/// Output of a successful engine invocation
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Diagnostic log text written by ffmpeg
    pub log: String,
}

/// Sandbox operations the export pipeline and chapter extractor rely on
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Prepare the engine for use. Called at most once through [`EngineHandle`].
    async fn load(&self) -> Result<(), EngineError>;

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError>;

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    async fn delete_file(&self, name: &str) -> Result<(), EngineError>;

    /// Run ffmpeg with `args` inside the sandbox.
    ///
    /// A non-zero exit is an error; the log is still available through
    /// [`EngineError::log`].
    async fn exec(&self, args: &[String]) -> Result<ExecOutput, EngineError>;
}

/// Reject names that would escape the sandbox
pub fn validate_name(name: &str) -> Result<(), EngineError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(EngineError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Copy a source into the sandbox under a unique name and return that name
pub async fn stage_source(
    engine: &dyn TranscodeEngine,
    source: &SourceHandle,
    prefix: &str,
) -> Result<String, EngineError> {
    let data = source.read_all().await.map_err(EngineError::Source)?;
    let name = match source.extension() {
        Some(ext) => format!("{}_{}.{}", prefix, uuid::Uuid::new_v4().simple(), ext),
        None => format!("{}_{}", prefix, uuid::Uuid::new_v4().simple()),
    };
    engine.write_file(&name, &data).await?;
    tracing::debug!("Staged {} ({} bytes) as {}", source.display_name(), data.len(), name);
    Ok(name)
}

/// Best-effort delete; failures are logged and swallowed
pub async fn discard(engine: &dyn TranscodeEngine, name: &str) {
    if let Err(e) = engine.delete_file(name).await {
        tracing::debug!("Ignoring failed delete of {}: {}", name, e);
    }
}
