//! Simple daemon error types

use canary_core::CoreError;

#[derive(Debug)]
pub enum DaemonError {
    ServerError(String),
    Core(CoreError),
    Hyper(hyper::Error),
    IoError(std::io::Error),
}

impl std::fmt::Display for DaemonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonError::ServerError(msg) => write!(f, "Server error: {}", msg),
            DaemonError::Core(err) => write!(f, "{} [{}]", err, err.code()),
            DaemonError::Hyper(err) => write!(f, "HTTP server error: {}", err),
            DaemonError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DaemonError::ServerError(_) => None,
            DaemonError::Core(err) => Some(err),
            DaemonError::Hyper(err) => Some(err),
            DaemonError::IoError(err) => Some(err),
        }
    }
}

impl From<CoreError> for DaemonError {
    fn from(err: CoreError) -> Self {
        DaemonError::Core(err)
    }
}

impl From<hyper::Error> for DaemonError {
    fn from(err: hyper::Error) -> Self {
        DaemonError::Hyper(err)
    }
}

impl From<std::io::Error> for DaemonError {
    fn from(err: std::io::Error) -> Self {
        DaemonError::IoError(err)
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;
