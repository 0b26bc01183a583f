//! Test utilities for integration tests in the daemon crate.

#![allow(dead_code)]

use async_trait::async_trait;
use canary_core::nfs::NfsError;
use canary_core::{CoreError, ProbeConfig, RemoteLister, Result, Shutdown};
use chrono::{TimeZone, Utc};
use daemon::BootstrapHandle;
use hyper::{Body, Client, Method, Request, StatusCode};
use schema::FileEntry;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Run the given future with a timeout, failing the test if it elapses.
pub async fn run_with_timeout<F, T>(duration: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .expect("test timed out")
}

/// Run a future with a default timeout of 30 seconds.
pub async fn run_with_default_timeout<F, T>(fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    run_with_timeout(Duration::from_secs(30), fut).await
}

/// Config bound to an ephemeral loopback port. Flags in `extra` replace the
/// defaults of the same name.
pub fn test_config(extra: &[&str]) -> ProbeConfig {
    let defaults = [
        ("--nfs-server", "10.0.0.1"),
        ("--nfs-share", "/export"),
        ("--uid", "0"),
        ("--gid", "0"),
        ("--port", "127.0.0.1:0"),
    ];
    let mut args = vec!["canary"];
    for (flag, value) in defaults {
        if !extra.contains(&flag) {
            args.extend([flag, value]);
        }
    }
    args.extend_from_slice(extra);
    ProbeConfig::from_args(args).expect("test config should parse")
}

/// Bootstrap with an in-process lister and a fresh shutdown signal
pub async fn start(config: ProbeConfig) -> BootstrapHandle {
    daemon::bootstrap_with(config, Arc::new(RecordingLister::default()), Shutdown::new())
        .await
        .expect("bootstrap should succeed")
}

/// Issue a request and return status plus body text
pub async fn request(
    addr: SocketAddr,
    method: Method,
    path_and_query: &str,
) -> (StatusCode, String) {
    let req = Request::builder()
        .method(method)
        .uri(format!("http://{addr}{path_and_query}"))
        .body(Body::empty())
        .unwrap();
    let response = Client::new().request(req).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn get(addr: SocketAddr, path_and_query: &str) -> (StatusCode, String) {
    request(addr, Method::GET, path_and_query).await
}

/// In-process lister that records requested paths
#[derive(Debug, Default)]
pub struct RecordingLister {
    pub fail: bool,
    pub requested: Mutex<Vec<String>>,
}

impl RecordingLister {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

pub fn sample_entries() -> Vec<FileEntry> {
    vec![
        FileEntry {
            name: "logs".into(),
            is_dir: true,
            size: 4096,
            mtime: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        },
        FileEntry {
            name: "report.csv".into(),
            is_dir: false,
            size: 1234,
            mtime: Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap(),
        },
    ]
}

#[async_trait]
impl RemoteLister for RecordingLister {
    async fn list(&self, path: &str) -> Result<Vec<FileEntry>> {
        self.requested.lock().unwrap().push(path.to_string());
        if self.fail {
            return Err(CoreError::Listing {
                path: path.to_string(),
                source: NfsError::Timeout(Duration::from_millis(10)),
            });
        }
        Ok(sample_entries())
    }
}

/// Lister that takes `delay` before answering with an empty listing
#[derive(Debug)]
pub struct SlowLister {
    pub delay: Duration,
}

#[async_trait]
impl RemoteLister for SlowLister {
    async fn list(&self, _path: &str) -> Result<Vec<FileEntry>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}
