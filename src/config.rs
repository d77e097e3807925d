//! Application configuration
//!
//! Settings are read from an optional JSON file. Every field has a default,
//! so an empty object (or no file at all) yields a working configuration.

use crate::chapters::ChapterSettings;
use crate::export::ExportSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where and how to run the external ffmpeg engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Program name or path of the ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Parent directory for the sandbox (system temp dir when unset)
    pub sandbox_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            sandbox_dir: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub export: ExportSettings,
    pub chapters: ChapterSettings,
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded configuration from {:?}", path);

        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let export = &self.export;
        if export.frame_rate == 0 {
            return Err(ConfigError::Invalid("frameRate must be positive".to_string()));
        }
        if export.width == 0 || export.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "frame size {}x{} is empty",
                export.width, export.height
            )));
        }
        if !(1..=100).contains(&export.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpegQuality {} is outside 1..=100",
                export.jpeg_quality
            )));
        }
        if export.sample_rate == 0 {
            return Err(ConfigError::Invalid("sampleRate must be positive".to_string()));
        }
        // More channels would need a WAVE_FORMAT_EXTENSIBLE header
        if !(1..=2).contains(&export.channels) {
            return Err(ConfigError::Invalid(format!(
                "channels {} is outside 1..=2",
                export.channels
            )));
        }
        if self.chapters.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunkSize must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_export_contract() {
        let config = AppConfig::default();
        assert_eq!(config.export.frame_rate, 60);
        assert_eq!((config.export.width, config.export.height), (3840, 2160));
        assert_eq!(config.export.sample_rate, 48_000);
        assert_eq!(config.export.channels, 2);
        assert_eq!(config.chapters.chunk_size, 2 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "export": { "frameRate": 30, "width": 1280, "height": 720 } }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.export.frame_rate, 30);
        assert_eq!(config.export.width, 1280);
        // Untouched fields keep their defaults
        assert_eq!(config.export.sample_rate, 48_000);
        assert_eq!(config.engine.ffmpeg_path, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_invalid_quality_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "export": { "jpegQuality": 0 } }"#).unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_channel_count_limited_to_stereo() {
        let mut config = AppConfig::default();
        config.export.channels = 6;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.export.channels = 0;
        assert!(config.validate().is_err());

        config.export.channels = 1;
        assert!(config.validate().is_ok());
    }
}
