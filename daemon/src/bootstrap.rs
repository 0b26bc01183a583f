//! Daemon bootstrap: wire the probe cycles and the HTTP server to a single
//! shutdown signal
//!
//! ```text
//! Starting ──▶ Running ──▶ Draining ──▶ Stopped
//!   store open    signal or     grace period
//!   listener      serve error   (5s) for in-flight
//!   bound                       requests
//! ```
//!
//! Startup failures (probe store, bind) are returned before the handle
//! exists. After that every outcome is reported by [`BootstrapHandle::wait`].

use crate::http::{self, AppState};
use crate::{DaemonError, Result};
use canary_core::{
    NfsGateway, ProbeConfig, ProbeCycles, ProbeTasks, RemoteLister, Shutdown, SqliteProbeStore,
};
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Time in-flight requests get to finish once shutdown starts
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Lifecycle phase published by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Draining,
    Stopped,
}

/// Handle to the running service
#[derive(Debug)]
pub struct BootstrapHandle {
    /// Address the HTTP listener is bound to
    pub local_addr: SocketAddr,
    phase: watch::Receiver<Phase>,
    shutdown: Shutdown,
    task: JoinHandle<Result<()>>,
}

impl BootstrapHandle {
    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    /// Initiate graceful shutdown. Returns `false` if it was already underway.
    pub fn shutdown(&self) -> bool {
        self.shutdown.trigger()
    }

    /// Wait for the service to stop.
    ///
    /// `Ok` after a requested shutdown, `Err` when the HTTP server failed.
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| DaemonError::ServerError(format!("coordinator task failed: {e}")))?
    }
}

/// Bootstrap the service against the configured NFS server
pub async fn bootstrap(config: ProbeConfig, shutdown: Shutdown) -> Result<BootstrapHandle> {
    let lister = Arc::new(NfsGateway::from_config(&config));
    bootstrap_with(config, lister, shutdown).await
}

/// Bootstrap with an explicit remote lister
pub async fn bootstrap_with(
    config: ProbeConfig,
    lister: Arc<dyn RemoteLister>,
    shutdown: Shutdown,
) -> Result<BootstrapHandle> {
    bootstrap_with_grace(config, lister, shutdown, GRACE_PERIOD).await
}

/// Bootstrap with an explicit remote lister and drain grace period
pub async fn bootstrap_with_grace(
    config: ProbeConfig,
    lister: Arc<dyn RemoteLister>,
    shutdown: Shutdown,
    grace: Duration,
) -> Result<BootstrapHandle> {
    let (phase_tx, phase_rx) = watch::channel(Phase::Starting);
    let span = info_span!("canary", pod_name = %config.pod_name);

    // Probe store first: an unusable database is fatal before anything listens
    let store = match &config.sqlite_storage_path {
        Some(path) => Some(SqliteProbeStore::open(path)?),
        None => {
            info!("SQLITE_STORAGE_PATH not set, probe cycles disabled");
            None
        }
    };

    let builder = Server::try_bind(&config.listen_addr).map_err(|e| {
        DaemonError::ServerError(format!("Failed to bind to {}: {}", config.listen_addr, e))
    })?;

    let state = Arc::new(AppState::from_config(&config, lister));
    let make_svc = make_service_fn(move |_conn| {
        let state = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| http::handle(state.clone(), req))) }
    });

    let server = builder.serve(make_svc);
    let local_addr = server.local_addr();
    let graceful = server.with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.wait().await }
    });
    let server_task = tokio::spawn(graceful.instrument(span.clone()));

    let probes = store.map(|store| {
        span.in_scope(|| {
            ProbeCycles::from_config(Arc::new(store), &config).spawn(shutdown.clone())
        })
    });

    span.in_scope(|| {
        info!(
            nfs_server = %config.nfs_server,
            nfs_share = %config.nfs_share,
            listen = %local_addr,
            "canary listening"
        );
    });
    phase_tx.send_replace(Phase::Running);

    let task = tokio::spawn(
        coordinate(server_task, probes, shutdown.clone(), phase_tx, grace).instrument(span),
    );

    Ok(BootstrapHandle {
        local_addr,
        phase: phase_rx,
        shutdown,
        task,
    })
}

/// Install SIGTERM / Ctrl+C handling that fires `shutdown` once
pub fn install_signal_handlers(shutdown: Shutdown) -> Result<()> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = terminate.recv() => info!("Received SIGTERM, shutting down..."),
                _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        }
        shutdown.trigger();
    });
    Ok(())
}

type ServerTask = JoinHandle<std::result::Result<(), hyper::Error>>;

async fn coordinate(
    mut server_task: ServerTask,
    probes: Option<ProbeTasks>,
    shutdown: Shutdown,
    phase: watch::Sender<Phase>,
    grace: Duration,
) -> Result<()> {
    let early_exit = tokio::select! {
        _ = shutdown.wait() => None,
        res = &mut server_task => Some(res),
    };

    phase.send_replace(Phase::Draining);
    if shutdown.trigger() {
        warn!("HTTP server stopped on its own, shutting down");
    }
    let deadline = Instant::now() + grace;

    let result = match early_exit {
        Some(res) => server_outcome(res),
        None => match tokio::time::timeout_at(deadline, &mut server_task).await {
            Ok(res) => server_outcome(res),
            Err(_) => {
                warn!(
                    "In-flight requests still running after {:?}, abandoning them",
                    grace
                );
                server_task.abort();
                Ok(())
            }
        },
    };

    // Cycles only get whatever is left of the grace period
    if let Some(probes) = probes {
        match tokio::time::timeout_at(deadline, probes.join()).await {
            Ok(Ok((writes, reads))) => debug!(writes, reads, "probe cycles stopped"),
            Ok(Err(e)) => warn!("probe cycle task failed: {}", e),
            Err(_) => warn!("probe cycles did not stop within the grace period"),
        }
    }

    phase.send_replace(Phase::Stopped);
    match &result {
        Ok(()) => info!("shutdown complete"),
        Err(e) => error!("shutdown after server failure: {}", e),
    }
    result
}

fn server_outcome(
    res: std::result::Result<std::result::Result<(), hyper::Error>, tokio::task::JoinError>,
) -> Result<()> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DaemonError::Hyper(e)),
        Err(e) => Err(DaemonError::ServerError(format!("HTTP server task failed: {e}"))),
    }
}
