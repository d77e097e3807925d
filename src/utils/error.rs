//! Error types and handling
//!
//! Umbrella error for the command layer and its serializable form.

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::export::ExportError;
use crate::project::BundleError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Playlist error: {0}")]
    Playlist(#[from] BundleError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Error response for machine-readable output
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Playlist(_) => "PLAYLIST_ERROR",
            AppError::Engine(_) => "ENGINE_ERROR",
            AppError::Export(ExportError::Validation(_)) => "VALIDATION_ERROR",
            AppError::Export(_) => "EXPORT_ERROR",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
