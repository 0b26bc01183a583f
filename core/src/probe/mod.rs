//! Background probing of the persistent store
//!
//! Two independent cycles share one store: the write cycle appends a
//! timestamped record on every tick and the read cycle logs an aggregate of
//! what has been written so far.
//!
//! ```text
//! write cycle ──insert──▶ ┌──────────────┐
//!                         │ entries table │
//! read cycle ◀──snapshot─ └──────────────┘
//! ```

pub mod cycle;
pub mod store;

pub use cycle::{ProbeCycles, ProbeTasks};
pub use store::{ProbeStore, SqliteProbeStore};
