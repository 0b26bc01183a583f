//! Remote filesystem access
//!
//! The HTTP front door only needs one operation from the share: list a
//! directory. [`RemoteLister`] is that seam; [`NfsGateway`] implements it by
//! opening a fresh NFSv4 connection per request.
//!
//! ## Types
//!
//! - [`RemoteLister`]: the listing trait used by request handlers
//! - [`NfsGateway`]: per-request connection, one listing call, no pooling
//! - [`Nfs4Client`]: the wire client underneath
//! - [`NfsError`]: transport and protocol failures

pub mod client;
pub mod error;
pub mod gateway;
mod xdr;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{server_address, AuthParams, Nfs4Client, NFS_PORT};
pub use error::NfsError;
pub use gateway::{NfsGateway, RemoteLister};
