//! Probe records written by the background cycles

use serde::{Deserialize, Serialize};

/// One row of the `entries` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeRecord {
    /// Store-assigned, strictly increasing identifier
    pub id: i64,
    /// Label of the instance that wrote the record
    pub pod: String,
    /// Store-generated UTC timestamp (`YYYY-MM-DD HH:MM:SS`)
    pub ts: String,
    /// Opaque payload
    pub payload: String,
}

/// Summary computed by one read cycle tick. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateSnapshot {
    /// Total number of records in the store
    pub count: u64,
    /// Most recent record, `None` while the store is still empty
    pub latest: Option<ProbeRecord>,
}

impl AggregateSnapshot {
    /// True when no record has been written yet
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
