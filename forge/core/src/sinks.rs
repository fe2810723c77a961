//! External Collaborators
//!
//! Committed artifacts go to a [`FileSink`]; status lines go to a
//! [`LogSink`]. Both are fire-and-forget from the pipeline's point of view: a
//! failing sink is logged and the run carries on.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a file sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// The relative path would escape the output root
    #[error("refusing to write outside the output directory: {0}")]
    UnsafePath(String),

    /// The file could not be written
    #[error("failed to write {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Receives every committed artifact
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Store one generated file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stored. The pipeline logs it
    /// and continues.
    async fn write(&self, file_path: &str, code: &str, language: &str) -> Result<(), SinkError>;
}

/// Writes generated files under a root directory
#[derive(Clone, Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Sink rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `file_path` under the root, rejecting absolute and `..` paths
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::UnsafePath`] for paths that would escape the root.
    pub fn resolve(&self, file_path: &str) -> Result<PathBuf, SinkError> {
        let relative = Path::new(file_path);
        let safe = !file_path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(SinkError::UnsafePath(file_path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn write(&self, file_path: &str, code: &str, language: &str) -> Result<(), SinkError> {
        let target = self.resolve(file_path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SinkError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut contents = code.to_string();
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        tokio::fs::write(&target, contents)
            .await
            .map_err(|source| SinkError::Io {
                path: target.clone(),
                source,
            })?;

        tracing::info!(path = %target.display(), language, "Wrote generated file");
        Ok(())
    }
}

/// Discards files; used when writing is disabled
#[derive(Clone, Copy, Debug, Default)]
pub struct NullFileSink;

#[async_trait]
impl FileSink for NullFileSink {
    async fn write(&self, file_path: &str, _code: &str, language: &str) -> Result<(), SinkError> {
        tracing::debug!(file_path, language, "File writing disabled, skipping");
        Ok(())
    }
}

/// Status line severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Something finished
    Success,
    /// Something failed
    Error,
    /// Informational, including cancellation
    Info,
}

/// Receives short status lines at key transitions
pub trait LogSink: Send + Sync {
    /// Record one status line
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards status lines to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Success => tracing::info!(status = "success", "{message}"),
            LogLevel::Error => tracing::error!(status = "error", "{message}"),
            LogLevel::Info => tracing::info!(status = "info", "{message}"),
        }
    }
}
