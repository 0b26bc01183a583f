//! Schema definitions for Canary
//!
//! Data structures shared by the probe engine and the HTTP daemon: the JSON
//! response envelope, remote directory entries, and the probe records that
//! the background cycles write to and read from the persistent store.

mod envelope;
mod probe;


pub use envelope::{Envelope, FileEntry, GENERIC_ERROR};
pub use probe::{AggregateSnapshot, ProbeRecord};
