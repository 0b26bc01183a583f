//! Core functionality for the canary probe service
//!
//! This crate holds the probe engine: configuration, the remote listing
//! gateway, the durable scalar file, the SQLite probe cycles and the shared
//! shutdown signal. The daemon crate wires these behind an HTTP front door.

pub mod config;
pub mod error;
pub mod nfs;
pub mod probe;
pub mod scalar;
pub mod shutdown;


// Re-export schema types for convenience
pub use schema::*;

pub use config::{LogFormat, ProbeConfig};
pub use error::{CoreError, Result};
pub use nfs::{NfsGateway, RemoteLister};
pub use probe::{ProbeCycles, ProbeStore, ProbeTasks, SqliteProbeStore};
pub use scalar::DurableScalar;
pub use shutdown::Shutdown;

/// Core utilities and helper functions
pub mod utils {
    use crate::config::LogFormat;
    use tracing::info;

    /// Initialize tracing for the application
    ///
    /// `RUST_LOG` takes precedence over `level` when it is set.
    pub fn init_tracing(level: &str, format: LogFormat) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| {
                crate::CoreError::ConfigurationError(format!("invalid log level {level:?}: {e}"))
            })?;

        let installed = match format {
            LogFormat::Text => fmt().with_env_filter(filter).try_init(),
            LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
        };
        installed.map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

        info!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
