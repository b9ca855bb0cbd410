//! Failure records kept for every failed attempt

use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong during an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Redash refused or failed to create the job
    Submission,
    /// The job ended as failed or cancelled
    Remote,
    /// Network error, timeout or unreadable response
    Transport,
    /// Writing the result to its destination failed
    Persistence,
    /// Unparseable configuration row, or the API rejected the key or query
    InvalidTask,
    /// The task itself crashed
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submission => "submission",
            Self::Remote => "remote",
            Self::Transport => "transport",
            Self::Persistence => "persistence",
            Self::InvalidTask => "invalid_task",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// One failed attempt of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub query_id: u64,
    pub query_name: String,
    /// 1-based, per task
    pub attempt: u32,
    pub kind: FailureKind,
    pub error: String,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Orders records by query id, query name, then attempt
///
/// The sort is stable, so records with equal keys keep their arrival order.
pub fn sort_failures(records: &mut [FailureRecord]) {
    records.sort_by(|a, b| {
        a.query_id
            .cmp(&b.query_id)
            .then_with(|| a.query_name.cmp(&b.query_name))
            .then_with(|| a.attempt.cmp(&b.attempt))
    });
}
