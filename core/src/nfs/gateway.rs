//! Remote listing gateway

use super::{server_address, AuthParams, Nfs4Client, NfsError};
use crate::config::ProbeConfig;
use crate::{CoreError, Result};
use async_trait::async_trait;
use schema::FileEntry;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Anything that can list a directory on the remote share
#[async_trait]
pub trait RemoteLister: Send + Sync {
    /// List `path`. Failures carry the path in [`CoreError::Listing`].
    async fn list(&self, path: &str) -> Result<Vec<FileEntry>>;
}

/// Lists directories over a fresh NFSv4 connection per call.
///
/// Connections are never reused: the endpoint is low frequency and every
/// request should exercise connection setup against the server.
#[derive(Debug, Clone)]
pub struct NfsGateway {
    address: String,
    auth: AuthParams,
    timeout: Duration,
}

impl NfsGateway {
    /// Create a gateway for `server` (`host` or `host:port`)
    pub fn new(server: &str, auth: AuthParams, timeout: Duration) -> Self {
        Self {
            address: server_address(server),
            auth,
            timeout,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(&config.nfs_server, config.auth_params(), config.timeout)
    }

    /// Address the gateway dials
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl RemoteLister for NfsGateway {
    async fn list(&self, path: &str) -> Result<Vec<FileEntry>> {
        let failed = |source: NfsError| CoreError::Listing {
            path: path.to_string(),
            source,
        };

        let connect = Nfs4Client::connect(&self.address, self.auth.clone());
        let mut client = match timeout(self.timeout, connect).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(failed(e)),
            Err(_elapsed) => return Err(failed(NfsError::Timeout(self.timeout))),
        };

        let entries = client.list_dir(path).await.map_err(failed)?;
        debug!("listed {} entries under {:?}", entries.len(), path);
        Ok(entries)
    }
}
