//! Task domain types
//!
//! Rows of the `taskQueries` and `taskMsg` configuration tabs, and the
//! validated [`TaskDescriptor`] a query row becomes before execution.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Query parameters passed to Redash, ordered by name
pub type Parameters = BTreeMap<String, JsonValue>;

/// Returns true when a spreadsheet flag cell holds `expected` (case-insensitive)
pub fn flag_set(value: &str, expected: &str) -> bool {
    value.trim().eq_ignore_ascii_case(expected)
}

/// A configuration row could not be turned into a runnable task
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("invalid params for query {query_id}: {reason}")]
    InvalidParams { query_id: u64, reason: String },
}

/// Identity of one task within a batch
///
/// Two rows with the same query, raw parameters and save name are the same
/// task. The query name is carried along for reporting only and takes no
/// part in equality, hashing or ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskKey {
    pub query_id: u64,
    pub query_name: String,
    pub params: String,
    pub save_name: String,
}

impl TaskKey {
    fn identity(&self) -> (u64, &str, &str) {
        (self.query_id, &self.params, &self.save_name)
    }
}

impl PartialEq for TaskKey {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for TaskKey {}

impl Hash for TaskKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for TaskKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} -> {}", self.query_id, self.query_name, self.save_name)
    }
}

/// One row of the `taskQueries` tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTaskRow {
    pub task_name: String,
    pub query_id: u64,
    #[serde(default)]
    pub query_name: String,
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub query_save_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub active_flag: String,
    #[serde(default)]
    pub run_flag: String,
}

impl QueryTaskRow {
    /// Active and flagged to run
    pub fn is_enabled(&self) -> bool {
        flag_set(&self.active_flag, "y") && flag_set(&self.run_flag, "y")
    }

    /// Identity used for de-duplication and failure tracking
    pub fn key(&self) -> TaskKey {
        TaskKey {
            query_id: self.query_id,
            query_name: self.query_name.clone(),
            params: self.params.trim().to_string(),
            save_name: self.query_save_name.clone(),
        }
    }

    /// Validates the row and builds the descriptor the poller runs
    pub fn to_descriptor(&self) -> Result<TaskDescriptor, TaskError> {
        let parameters = parse_params(&self.params).map_err(|reason| TaskError::InvalidParams {
            query_id: self.query_id,
            reason,
        })?;

        Ok(TaskDescriptor {
            key: self.key(),
            query_id: self.query_id,
            query_name: self.query_name.clone(),
            parameters,
            save_name: self.query_save_name.clone(),
            api_key: self.api_key.clone(),
        })
    }
}

/// Parses the `params` cell
///
/// The sheet holds a JSON object; single quotes are accepted as string
/// delimiters. An empty cell means no parameters.
pub fn parse_params(raw: &str) -> Result<Parameters, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Parameters::new());
    }

    let normalized = raw.replace('\'', "\"");
    match serde_json::from_str::<JsonValue>(&normalized) {
        Ok(JsonValue::Object(map)) => Ok(map.into_iter().collect()),
        Ok(other) => Err(format!("expected a JSON object, got {}", other)),
        Err(e) => Err(e.to_string()),
    }
}

/// A validated query task, immutable for the rest of the batch
#[derive(Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub key: TaskKey,
    pub query_id: u64,
    pub query_name: String,
    pub parameters: Parameters,
    pub save_name: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

// Keeps the API key out of logs
impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("query_id", &self.query_id)
            .field("query_name", &self.query_name)
            .field("parameters", &self.parameters)
            .field("save_name", &self.save_name)
            .finish_non_exhaustive()
    }
}

/// Kind of artifact a message task announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Image,
    File,
}

/// One row of the `taskMsg` tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTaskRow {
    pub task_name: String,
    #[serde(default)]
    pub proceed_flag: String,
    #[serde(default)]
    pub page: String,
    pub report: ReportKind,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub export_name: String,
    #[serde(default)]
    pub msg_content: String,
    #[serde(default)]
    pub hyperlink: String,
    #[serde(default)]
    pub webhook: String,
    #[serde(default)]
    pub send_flag: String,
}

impl MessageTaskRow {
    pub fn should_proceed(&self) -> bool {
        flag_set(&self.proceed_flag, "y")
    }

    pub fn should_send(&self) -> bool {
        flag_set(&self.send_flag, "y")
    }

    /// Chat text announcing this report
    pub fn message_text(&self) -> String {
        let link = self.hyperlink.trim();
        match self.report {
            ReportKind::Image if link.is_empty() => self.msg_content.clone(),
            ReportKind::Image => format!(
                "{}\nFor detailed data, click <{}|*here*>",
                self.msg_content, link
            ),
            ReportKind::File => format!("{}\n{}", self.msg_content, link),
        }
    }
}
