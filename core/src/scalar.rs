//! Durable scalar: a single "last written" timestamp kept in a local file
//!
//! Backs the write-storage/read-storage endpoints, which external checkers
//! use to verify that a volume still accepts writes and serves them back.

use crate::{CoreError, Result};
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Single-value file store. Assumes this process is the only writer.
#[derive(Debug, Clone, Default)]
pub struct DurableScalar {
    path: Option<PathBuf>,
}

impl DurableScalar {
    /// Create a store; `None` disables it and every call fails
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Configured path, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Overwrite the file with the current UTC time (RFC 3339) and return it
    pub async fn write(&self) -> Result<String> {
        let path = self.path.as_ref().ok_or(CoreError::StoragePathUnset)?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        tokio::fs::write(path, now.as_bytes())
            .await
            .map_err(|e| CoreError::io("error writing to file", e))?;

        debug!("wrote {} to {}", now, path.display());
        Ok(now)
    }

    /// Return the file content verbatim
    pub async fn read(&self) -> Result<String> {
        let path = self.path.as_ref().ok_or(CoreError::StoragePathUnset)?;
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| CoreError::io("error reading from file", e))?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }
}
