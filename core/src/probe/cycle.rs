//! Write and read probe cycles

use super::ProbeStore;
use crate::config::ProbeConfig;
use crate::shutdown::Shutdown;
use crate::Result;
use rand::Rng;
use schema::AggregateSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, Instrument};

/// Ticking pair that exercises a [`ProbeStore`]
#[derive(Clone)]
pub struct ProbeCycles {
    store: Arc<dyn ProbeStore>,
    origin: String,
    write_interval: Duration,
    read_interval: Duration,
}

impl std::fmt::Debug for ProbeCycles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeCycles")
            .field("origin", &self.origin)
            .field("write_interval", &self.write_interval)
            .field("read_interval", &self.read_interval)
            .finish_non_exhaustive()
    }
}

/// Join handles of the spawned cycles. Each resolves to its tick count.
#[derive(Debug)]
pub struct ProbeTasks {
    pub write: JoinHandle<u64>,
    pub read: JoinHandle<u64>,
}

impl ProbeTasks {
    /// Wait for both cycles to stop, returning `(write_ticks, read_ticks)`
    pub async fn join(self) -> Result<(u64, u64)> {
        let write = self.write.await?;
        let read = self.read.await?;
        Ok((write, read))
    }
}

impl ProbeCycles {
    pub fn new(
        store: Arc<dyn ProbeStore>,
        origin: impl Into<String>,
        write_interval: Duration,
        read_interval: Duration,
    ) -> Self {
        Self {
            store,
            origin: origin.into(),
            write_interval,
            read_interval,
        }
    }

    pub fn from_config(store: Arc<dyn ProbeStore>, config: &ProbeConfig) -> Self {
        Self::new(
            store,
            config.pod_name.clone(),
            config.write_interval,
            config.read_interval,
        )
    }

    /// Insert one record tagged with this instance's origin
    pub async fn write_tick(&self) -> Result<i64> {
        let payload = random_payload();
        self.store.insert(&self.origin, &payload).await
    }

    /// Take one aggregate snapshot
    pub async fn read_tick(&self) -> Result<AggregateSnapshot> {
        self.store.snapshot().await
    }

    /// Spawn both cycles. They run until `shutdown` fires.
    ///
    /// The write cycle ticks immediately; the read cycle waits one full period
    /// before its first tick.
    pub fn spawn(self, shutdown: Shutdown) -> ProbeTasks {
        let write = tokio::spawn(
            run_write_cycle(self.clone(), shutdown.clone()).in_current_span(),
        );
        let read = tokio::spawn(run_read_cycle(self, shutdown).in_current_span());
        ProbeTasks { write, read }
    }
}

fn random_payload() -> String {
    format!("rand={}", rand::thread_rng().gen_range(0..1000))
}

async fn run_write_cycle(cycles: ProbeCycles, shutdown: Shutdown) -> u64 {
    let mut ticker = interval_at(Instant::now(), cycles.write_interval);
    // A slow store call pushes the next tick back instead of bursting
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }
        ticks += 1;
        match cycles.write_tick().await {
            Ok(id) => debug!(id, "probe record written"),
            Err(e) => error!(error = %e, code = e.code(), "WRITE error"),
        }
    }

    info!("write cycle stopped after {} ticks", ticks);
    ticks
}

async fn run_read_cycle(cycles: ProbeCycles, shutdown: Shutdown) -> u64 {
    let period = cycles.read_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }
        ticks += 1;
        match cycles.read_tick().await {
            Ok(AggregateSnapshot {
                count,
                latest: Some(last),
            }) => info!(
                count,
                last_id = last.id,
                last_pod = %last.pod,
                last_timestamp = %last.ts,
                last_payload = %last.payload,
                "successful read"
            ),
            Ok(_) => info!(count = 0, "successful read, no entries yet"),
            Err(e) => error!(error = %e, code = e.code(), "READ error"),
        }
    }

    info!("read cycle stopped after {} ticks", ticks);
    ticks
}
