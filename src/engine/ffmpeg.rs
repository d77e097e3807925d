//! FFmpeg-backed engine
//!
//! The sandbox is a private temporary directory; every invocation runs
//! ffmpeg with that directory as its working directory so argv can refer to
//! staged files by bare name.

use super::{validate_name, EngineError, ExecOutput, TranscodeEngine};
use crate::config::EngineConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::OnceCell;

/// Resolved binary plus the sandbox directory it works in
struct Sandbox {
    binary: PathBuf,
    dir: TempDir,
}

/// Engine that shells out to a local ffmpeg binary
pub struct FfmpegEngine {
    config: EngineConfig,
    sandbox: OnceCell<Sandbox>,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sandbox: OnceCell::new(),
        }
    }

    /// Directory backing the sandbox, once loaded
    pub fn sandbox_path(&self) -> Option<&Path> {
        self.sandbox.get().map(|s| s.dir.path())
    }

    fn sandbox(&self) -> Result<&Sandbox, EngineError> {
        self.sandbox.get().ok_or(EngineError::NotLoaded)
    }

    fn file_path(&self, name: &str) -> Result<PathBuf, EngineError> {
        validate_name(name)?;
        Ok(self.sandbox()?.dir.path().join(name))
    }

    async fn create_sandbox(&self) -> Result<Sandbox, EngineError> {
        let binary = which::which(&self.config.ffmpeg_path).map_err(|e| {
            EngineError::NotFound(format!("{}: {}", self.config.ffmpeg_path.display(), e))
        })?;

        // Make sure the binary actually runs before anything is staged
        let output = Command::new(&binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(EngineError::Spawn)?;

        if !output.status.success() {
            return Err(EngineError::NotFound(format!(
                "{} -version exited with {}",
                binary.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        tracing::info!(
            "Loaded ffmpeg engine: {}",
            version.lines().next().unwrap_or("unknown version")
        );

        let mut builder = tempfile::Builder::new();
        builder.prefix("vinyl-export-");
        let dir = match &self.config.sandbox_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| EngineError::Io {
            name: "sandbox".to_string(),
            source: e,
        })?;

        tracing::debug!("Engine sandbox at {:?}", dir.path());

        Ok(Sandbox { binary, dir })
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn load(&self) -> Result<(), EngineError> {
        self.sandbox
            .get_or_try_init(|| self.create_sandbox())
            .await
            .map(|_| ())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| EngineError::Io {
                name: name.to_string(),
                source: e,
            })
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.file_path(name)?;
        tokio::fs::read(&path).await.map_err(|e| EngineError::Io {
            name: name.to_string(),
            source: e,
        })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        let path = self.file_path(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| EngineError::Io {
                name: name.to_string(),
                source: e,
            })
    }

    async fn exec(&self, args: &[String]) -> Result<ExecOutput, EngineError> {
        let sandbox = self.sandbox()?;

        tracing::debug!("Running ffmpeg: {:?}", args);

        let output = Command::new(&sandbox.binary)
            .current_dir(sandbox.dir.path())
            .args(["-hide_banner", "-nostdin", "-y"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(EngineError::Spawn)?;

        let log = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(EngineError::ExitStatus {
                status: output.status.code(),
                log,
            });
        }

        Ok(ExecOutput { log })
    }
}
