//! Core error types and utilities

use crate::nfs::NfsError;
use thiserror::Error;

/// Core-specific error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("no storage path set via STORAGE_PATH env variable")]
    StoragePathUnset,

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Error reading dir {path:?}: {source}")]
    Listing {
        path: String,
        #[source]
        source: NfsError,
    },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CoreError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::ConfigurationError(_) => "CORE001",
            CoreError::StoragePathUnset => "CORE002",
            CoreError::InitializationError(_) => "CORE003",
            CoreError::Listing { .. } => "CORE004",
            CoreError::Store(_) => "CORE005",
            CoreError::Io { .. } => "CORE006",
            CoreError::Task(_) => "CORE999",
        }
    }

    /// Wrap an I/O error with a short description of the failed operation
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors that must abort startup
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoreError::ConfigurationError(_) | CoreError::StoragePathUnset
        )
    }
}

/// Core-specific result type
pub type Result<T> = std::result::Result<T, CoreError>;
