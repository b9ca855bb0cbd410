//! Job outcome domain types

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::domain::failure::FailureRecord;
use crate::domain::task::TaskKey;

/// Local view of a task's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecuteStatus {
    Pending,
    Queued,
    Executing,
    Success,
    Failed,
}

impl fmt::Display for ExecuteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Executing => "executing",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one task in a batch
///
/// Starts out failed and is only overwritten by a successful completion, so a
/// task that never finishes still shows up as failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub query_id: u64,
    pub query_name: String,
    pub save_name: String,
    pub status: ExecuteStatus,
    pub query_result_id: u64,
    pub rows_cnt: usize,
    /// Seconds since the batch started
    #[serde(serialize_with = "serialize_secs")]
    pub runtime: f64,
    /// Seconds Redash spent running the query
    #[serde(serialize_with = "serialize_secs")]
    pub execute_time: f64,
    pub execution_started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
    pub failures: Vec<FailureRecord>,
}

impl JobOutcome {
    pub fn new(key: &TaskKey) -> Self {
        Self {
            query_id: key.query_id,
            query_name: key.query_name.clone(),
            save_name: key.save_name.clone(),
            status: ExecuteStatus::Failed,
            query_result_id: 0,
            rows_cnt: 0,
            runtime: 0.0,
            execute_time: 0.0,
            execution_started_at: None,
            error: None,
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecuteStatus::Success
    }

    /// Marks a failed attempt
    pub fn fail(&mut self, error: impl Into<String>, elapsed: Duration) {
        self.status = ExecuteStatus::Failed;
        self.query_result_id = 0;
        self.rows_cnt = 0;
        self.execute_time = 0.0;
        self.runtime = elapsed.as_secs_f64();
        self.error = Some(error.into());
    }

    /// Records a successful completion
    pub fn succeed(
        &mut self,
        query_result_id: u64,
        rows_cnt: usize,
        elapsed: Duration,
        execute_time: f64,
    ) {
        self.status = ExecuteStatus::Success;
        self.query_result_id = query_result_id;
        self.rows_cnt = rows_cnt;
        self.runtime = elapsed.as_secs_f64();
        self.execute_time = execute_time;
        self.error = None;
    }
}

/// Renders seconds with two decimals
pub fn format_secs(secs: f64) -> String {
    format!("{:.2}", secs)
}

fn serialize_secs<S: Serializer>(secs: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((secs * 100.0).round() / 100.0)
}
