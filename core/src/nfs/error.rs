//! Error types for the NFS client

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to an NFS server
#[derive(Error, Debug)]
pub enum NfsError {
    /// Connection setup did not finish in time
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// Transport failure
    #[error("nfs transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The server refused or could not execute the RPC
    #[error("rpc rejected: {0}")]
    Rpc(String),

    /// An operation inside a COMPOUND failed
    #[error("nfs {op} failed with status {status}")]
    Status {
        /// Operation name, e.g. `LOOKUP`
        op: &'static str,
        /// NFSv4 `nfsstat4` value
        status: u32,
    },

    /// Reply ended before a complete value could be read
    #[error("truncated reply: wanted {wanted} bytes, {available} available")]
    Truncated { wanted: usize, available: usize },

    /// Reply was structurally invalid
    #[error("malformed reply: {0}")]
    Decode(String),

    /// Request could not be encoded
    #[error("cannot encode request: {0}")]
    Encode(String),
}
