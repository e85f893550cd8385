//! Transaction-related data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Read concern level for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadConcern {
    Local,
    Majority,
    Snapshot,
    Available,
    Linearizable,
}

/// Number of acknowledgements a write waits for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acknowledgment {
    Nodes(u32),
    Majority,
}

/// Write concern for a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteConcern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<Acknowledgment>,
    /// Wait for the write to reach the on-disk journal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<bool>,
}

impl WriteConcern {
    pub fn majority() -> Self {
        Self {
            w: Some(Acknowledgment::Majority),
            journal: None,
        }
    }
}

/// Options for a single transaction invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub read_concern: Option<ReadConcern>,
    pub write_concern: Option<WriteConcern>,
    /// Roll back if the unit of work has not finished after this long
    pub timeout: Option<Duration>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_concern(mut self, read_concern: ReadConcern) -> Self {
        self.read_concern = Some(read_concern);
        self
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = Some(write_concern);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Settlement state of a transaction session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Active,
    Committing,
    RollingBack,
    Committed,
    CommitFailed,
    RolledBack,
}

impl TransactionState {
    /// True once commit or rollback has been attempted.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Metadata about an in-flight transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionMetadata {
    /// Unique transaction identifier
    pub transaction_id: String,
    /// When the transaction started (absolute time)
    pub started_at: DateTime<Utc>,
    /// Seconds since transaction started
    pub duration_secs: u64,
}
