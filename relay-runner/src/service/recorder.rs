//! Failure recorder service
//!
//! Collects the failure records of one batch. Every task gets its own ordered
//! list; the lists are shared by all pollers of the batch and only ever grow.

use relay_core::domain::failure::{FailureKind, FailureRecord, sort_failures};
use relay_core::domain::task::TaskKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Service for recording failed attempts
pub trait FailureRecorder: Send + Sync {
    /// Starts an empty history for a task
    ///
    /// Calling it again for a known task keeps the existing history.
    fn init(&self, key: &TaskKey);

    /// Appends a failure to a task's history
    ///
    /// The attempt number is assigned here: one more than the number of
    /// records the task already has.
    ///
    /// # Returns
    /// The stored record
    fn record(&self, key: &TaskKey, kind: FailureKind, error: String) -> FailureRecord;

    /// All records of one task, oldest first
    fn records(&self, key: &TaskKey) -> Vec<FailureRecord>;

    /// All records of all tasks, sorted by query id, query name and attempt
    fn all(&self) -> Vec<FailureRecord>;
}

/// In-memory implementation of FailureRecorder
///
/// Uses Arc<Mutex<HashMap<..>>> for shared access across tasks.
#[derive(Clone, Default)]
pub struct InMemoryFailureRecorder {
    entries: Arc<Mutex<HashMap<TaskKey, Vec<FailureRecord>>>>,
}

impl InMemoryFailureRecorder {
    /// Creates a new, empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskKey, Vec<FailureRecord>>> {
        // a panicking holder cannot leave a half-written Vec behind
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FailureRecorder for InMemoryFailureRecorder {
    fn init(&self, key: &TaskKey) {
        self.lock().entry(key.clone()).or_default();
    }

    fn record(&self, key: &TaskKey, kind: FailureKind, error: String) -> FailureRecord {
        let mut entries = self.lock();
        let history = entries.entry(key.clone()).or_default();

        let record = FailureRecord {
            query_id: key.query_id,
            query_name: key.query_name.clone(),
            attempt: history.len() as u32 + 1,
            kind,
            error,
            recorded_at: chrono::Utc::now(),
        };
        history.push(record.clone());
        record
    }

    fn records(&self, key: &TaskKey) -> Vec<FailureRecord> {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    fn all(&self) -> Vec<FailureRecord> {
        let mut records: Vec<FailureRecord> = self.lock().values().flatten().cloned().collect();
        sort_failures(&mut records);
        records
    }
}
