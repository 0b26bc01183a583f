//! The uniform JSON envelope returned by every HTTP handler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only error text that ever leaves the process
pub const GENERIC_ERROR: &str = "something went wrong";

/// A remote directory entry as returned by the listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    /// Entry name (not a full path)
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub mtime: DateTime<Utc>,
}

/// Response body shared by all handlers.
///
/// `error` is mutually exclusive with `message` and `files`; the constructors
/// are the intended way to build one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    /// Label of the instance that produced the response
    pub pod: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileEntry>>,
}

impl Envelope {
    /// Successful response carrying a human readable message
    pub fn message(pod: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            error: None,
            message: Some(message.into()),
            files: None,
        }
    }

    /// Successful listing response
    pub fn listing(pod: impl Into<String>, files: Vec<FileEntry>) -> Self {
        Self {
            pod: pod.into(),
            error: None,
            message: None,
            files: Some(files),
        }
    }

    /// Failed response. Only the generic error text is exposed.
    pub fn failure(pod: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            error: Some(GENERIC_ERROR.to_string()),
            message: None,
            files: None,
        }
    }

    /// Whether this envelope reports a failure
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
