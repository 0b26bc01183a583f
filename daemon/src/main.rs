//! canary binary
//!
//! Probes an NFS share on demand and a local SQLite store in the background,
//! reporting over HTTP until SIGTERM or Ctrl+C.

#![allow(unused_crate_dependencies)]

use canary_core::utils::init_tracing;
use canary_core::{ProbeConfig, Shutdown};
use clap::Parser;
use daemon::bootstrap::install_signal_handlers;
use tracing::{error, info};

#[tokio::main]
async fn main() -> daemon::Result<()> {
    let config = ProbeConfig::parse().validate()?;
    init_tracing(&config.log_level, config.log_format)?;

    info!("Starting canary {}", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    install_signal_handlers(shutdown.clone())?;

    let handle = match daemon::bootstrap(config, shutdown).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Daemon failed to start: {}", e);
            return Err(e);
        }
    };

    if let Err(e) = handle.wait().await {
        error!("Daemon failed: {}", e);
        return Err(e);
    }

    info!("Daemon stopped");
    Ok(())
}
