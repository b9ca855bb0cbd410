//! Redash API DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::job::{JobState, RemoteStatus};
use crate::domain::result::QueryResult;
use crate::domain::task::Parameters;

/// Body of `POST /api/queries/{id}/results`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteQueryRequest {
    pub apply_auto_limit: bool,
    pub id: u64,
    /// Zero forces a fresh execution instead of a cached result
    pub max_age: u64,
    pub parameters: Parameters,
}

impl ExecuteQueryRequest {
    pub fn fresh(query_id: u64, parameters: Parameters) -> Self {
        Self {
            apply_auto_limit: false,
            id: query_id,
            max_age: 0,
            parameters,
        }
    }
}

/// `{"job": {...}}` wrapper used by the job endpoints
///
/// Error responses share the shape; they carry the error on the job, in a
/// top-level `message`, or both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobEnvelope {
    #[serde(default)]
    pub job: Option<JobPayload>,
    #[serde(default)]
    pub message: Option<String>,
}

impl JobEnvelope {
    /// Job ID, if Redash created a job
    pub fn job_id(&self) -> Option<&str> {
        self.job
            .as_ref()?
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    /// Most specific message available: job error, then top-level message
    pub fn error_message(&self) -> Option<String> {
        self.job
            .as_ref()
            .and_then(JobPayload::error_message)
            .or_else(|| self.message.clone().filter(|m| !m.trim().is_empty()))
    }
}

/// Redash job as returned on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u8>,
    #[serde(default)]
    pub error: Option<JsonValue>,
    #[serde(default)]
    pub query_result_id: Option<u64>,
}

impl JobPayload {
    /// Error message, if Redash attached a non-empty one
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) if s.trim().is_empty() => None,
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Converts the payload into a job state, if the status is known
    pub fn to_state(&self) -> Option<JobState> {
        let status = RemoteStatus::from_code(self.status?)?;
        Some(JobState {
            status,
            query_result_id: self.query_result_id,
            error: self.error_message(),
        })
    }
}

/// `{"query_result": {...}}` wrapper of `GET /api/query_results/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultEnvelope {
    pub query_result: QueryResultPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultPayload {
    #[serde(default)]
    pub runtime: f64,
    pub data: QueryResultData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultData {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub rows: Vec<Map<String, JsonValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
}

impl From<QueryResultPayload> for QueryResult {
    fn from(payload: QueryResultPayload) -> Self {
        Self {
            runtime: payload.runtime,
            columns: payload.data.columns.into_iter().map(|c| c.name).collect(),
            rows: payload.data.rows,
        }
    }
}
