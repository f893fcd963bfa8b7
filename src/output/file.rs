//! File sink with size-based rotation.
//!
//! When the file reaches `max_bytes` it is renamed to `<path>.1`, existing
//! backups shift up by one, and anything beyond `backup_count` is dropped.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::monitor::SampleResult;
use crate::output::{DEFAULT_FORMAT, OutputError, OutputSink, render_line};

/// Default rotation threshold (10 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of rotated files kept.
pub const DEFAULT_BACKUP_COUNT: u32 = 5;

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

fn default_backup_count() -> u32 {
    DEFAULT_BACKUP_COUNT
}

/// Configuration for the file sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Output file path.
    pub path: String,
    /// Line format.
    #[serde(default = "default_format")]
    pub format: String,
    /// Rotate once the file reaches this size.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Rotated files to keep.
    #[serde(default = "default_backup_count")]
    pub backup_count: u32,
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: default_format(),
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_backup_count(mut self, backup_count: u32) -> Self {
        self.backup_count = backup_count;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    config: FileConfig,
}

impl FileSink {
    /// Create the sink, creating the parent directory if needed.
    pub fn new(config: FileConfig) -> Result<Self, OutputError> {
        if config.path.trim().is_empty() {
            return Err(OutputError::Config("file path cannot be empty".to_string()));
        }
        let path = PathBuf::from(&config.path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path, config })
    }

    fn backup_path(&self, index: u32) -> PathBuf {
        backup_path(&self.path, index)
    }

    async fn rotate_if_needed(&self) -> Result<(), OutputError> {
        let size = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if size < self.config.max_bytes {
            return Ok(());
        }

        if self.config.backup_count == 0 {
            tokio::fs::remove_file(&self.path).await?;
            return Ok(());
        }

        for index in (1..self.config.backup_count).rev() {
            let from = self.backup_path(index);
            if tokio::fs::try_exists(&from).await? {
                tokio::fs::rename(&from, self.backup_path(index + 1)).await?;
            }
        }
        tokio::fs::rename(&self.path, self.backup_path(1)).await?;
        tracing::debug!(path = %self.path.display(), size, "Output file rotated");
        Ok(())
    }
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

#[async_trait::async_trait]
impl OutputSink for FileSink {
    fn kind(&self) -> &str {
        "file"
    }

    async fn handle(
        &mut self,
        result: &SampleResult,
        target_name: &str,
    ) -> Result<(), OutputError> {
        self.rotate_if_needed().await?;

        let mut line = render_line(&self.config.format, result, target_name);
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
