//! HTTP front door
//!
//! Routes requests to the listing gateway or the durable scalar and funnels
//! every outcome through [`reply::finalize`].

pub mod reply;
pub mod router;

pub use reply::{finalize, Outcome};
pub use router::handle;

use canary_core::{DurableScalar, ProbeConfig, RemoteLister};
use std::sync::Arc;

/// Shared state behind every request
#[derive(Clone)]
pub struct AppState {
    pub pod: String,
    pub lister: Arc<dyn RemoteLister>,
    pub scalar: DurableScalar,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pod", &self.pod)
            .field("scalar", &self.scalar)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(pod: impl Into<String>, lister: Arc<dyn RemoteLister>, scalar: DurableScalar) -> Self {
        Self {
            pod: pod.into(),
            lister,
            scalar,
        }
    }

    pub fn from_config(config: &ProbeConfig, lister: Arc<dyn RemoteLister>) -> Self {
        Self::new(
            config.pod_name.clone(),
            lister,
            DurableScalar::new(config.storage_path.clone()),
        )
    }
}
