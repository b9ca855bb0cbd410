//! In-memory fakes of the repository traits used by the runner tests

use anyhow::Result;
use async_trait::async_trait;
use relay_client::ClientError;
use relay_core::domain::job::{JobState, RemoteStatus};
use relay_core::domain::result::{HUB_COLUMN, QueryResult, RUN_TIME_COLUMN};
use relay_core::domain::schedule::ScheduleTable;
use relay_core::domain::task::{MessageTaskRow, QueryTaskRow, TaskDescriptor};
use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Duration;

use super::PollPolicy;
use crate::repository::{JobService, Notifier, ResultSink, TaskSource};

/// Millisecond timings so retries do not slow the tests down
pub fn test_policy() -> PollPolicy {
    PollPolicy {
        poll_interval: Duration::from_millis(1),
        max_attempts: 5,
        retry_delay: Duration::from_millis(1),
        task_timeout: Some(Duration::from_secs(5)),
    }
}

pub fn query_row(task_name: &str, query_id: u64, name: &str, save_name: &str, params: &str) -> QueryTaskRow {
    QueryTaskRow {
        task_name: task_name.to_string(),
        query_id,
        query_name: name.to_string(),
        params: params.to_string(),
        query_save_name: save_name.to_string(),
        api_key: "key".to_string(),
        active_flag: "y".to_string(),
        run_flag: "y".to_string(),
    }
}

pub fn descriptor(query_id: u64, name: &str, save_name: &str, params: &str) -> TaskDescriptor {
    query_row("daily", query_id, name, save_name, params)
        .to_descriptor()
        .unwrap()
}

/// What one attempt of a scripted query does
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// The job succeeds with this many rows
    Rows(usize),
    /// Submission answers with this HTTP status
    SubmitStatus(u16),
    /// The job ends failed with this error
    JobFails(&'static str),
    /// The job ends cancelled without an error
    Cancelled,
    /// The job never leaves the executing state
    Hangs,
    /// Submission panics
    Panics,
}

struct FakeJob {
    step: Step,
    polls: u32,
    result_id: u64,
}

/// JobService answering from per-query scripts
///
/// Each submit consumes the next step of the query's script; once the script
/// is exhausted every attempt succeeds with one row. A job is queued on the
/// first poll, executing on the second and terminal on the third.
#[derive(Default)]
pub struct ScriptedJobs {
    scripts: Mutex<HashMap<u64, VecDeque<Step>>>,
    submits: Mutex<HashMap<u64, u32>>,
    jobs: Mutex<HashMap<String, FakeJob>>,
    results: Mutex<HashMap<u64, usize>>,
}

impl ScriptedJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, query_id: u64, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(query_id, steps.into_iter().collect());
        self
    }

    /// Number of submissions seen for a query
    pub fn submits(&self, query_id: u64) -> u32 {
        self.submits
            .lock()
            .unwrap()
            .get(&query_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl JobService for ScriptedJobs {
    async fn submit(&self, task: &TaskDescriptor) -> relay_client::Result<String> {
        let attempt = {
            let mut submits = self.submits.lock().unwrap();
            let count = submits.entry(task.query_id).or_insert(0);
            *count += 1;
            *count
        };
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&task.query_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Rows(1));

        match step {
            Step::SubmitStatus(status) => Err(ClientError::api_error(status, "refused")),
            Step::Panics => panic!("scripted panic for query {}", task.query_id),
            step => {
                let job_id = format!("{}-{}", task.query_id, attempt);
                let result_id = task.query_id * 100 + u64::from(attempt);
                self.jobs.lock().unwrap().insert(
                    job_id.clone(),
                    FakeJob {
                        step,
                        polls: 0,
                        result_id,
                    },
                );
                Ok(job_id)
            }
        }
    }

    async fn poll(&self, _task: &TaskDescriptor, job_id: &str) -> relay_client::Result<JobState> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| ClientError::api_error(404, "no such job"))?;
        job.polls += 1;

        let state = match (job.polls, job.step) {
            (1, _) => JobState::new(RemoteStatus::Queued),
            (_, Step::Hangs) | (2, _) => JobState::new(RemoteStatus::Executing),
            (_, Step::Rows(rows)) => {
                self.results.lock().unwrap().insert(job.result_id, rows);
                JobState::succeeded(job.result_id)
            }
            (_, Step::JobFails(error)) => JobState::failed(error),
            (_, _) => JobState::new(RemoteStatus::Cancelled),
        };
        Ok(state)
    }

    async fn fetch(&self, _task: &TaskDescriptor, query_result_id: u64) -> relay_client::Result<QueryResult> {
        let rows = self
            .results
            .lock()
            .unwrap()
            .get(&query_result_id)
            .copied()
            .ok_or_else(|| ClientError::api_error(404, "no such result"))?;

        let columns = vec![
            RUN_TIME_COLUMN.to_string(),
            HUB_COLUMN.to_string(),
            "orders".to_string(),
        ];
        let rows = (0..rows)
            .map(|idx| {
                let mut row = Map::new();
                row.insert(RUN_TIME_COLUMN.to_string(), JsonValue::from("2024-03-05 08:00"));
                row.insert(HUB_COLUMN.to_string(), JsonValue::from("HN01"));
                row.insert("orders".to_string(), JsonValue::from(idx));
                row
            })
            .collect();

        Ok(QueryResult {
            runtime: 0.25,
            columns,
            rows,
        })
    }
}

/// ResultSink keeping results in memory
#[derive(Default)]
pub struct MemorySink {
    written: Mutex<Vec<(String, QueryResult)>>,
    failures_left: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose first `count` writes fail
    pub fn failing(count: usize) -> Self {
        Self {
            written: Mutex::default(),
            failures_left: AtomicUsize::new(count),
        }
    }

    pub fn written(&self) -> Vec<(String, QueryResult)> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist(&self, save_name: &str, result: &QueryResult) -> Result<PathBuf> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("disk full");
        }

        self.written
            .lock()
            .unwrap()
            .push((save_name.to_string(), result.clone()));
        Ok(PathBuf::from(format!("{}.csv", save_name)))
    }
}

/// TaskSource serving fixed rows
#[derive(Default)]
pub struct FakeSource {
    queries: Vec<QueryTaskRow>,
    messages: Vec<MessageTaskRow>,
    schedule: ScheduleTable,
    broken: bool,
}

impl FakeSource {
    pub fn with_queries(queries: Vec<QueryTaskRow>) -> Self {
        Self {
            queries,
            ..Self::default()
        }
    }

    pub fn with_messages(messages: Vec<MessageTaskRow>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// A source whose every read fails
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl TaskSource for FakeSource {
    async fn query_tasks(&self) -> Result<Vec<QueryTaskRow>> {
        if self.broken {
            anyhow::bail!("sheet unavailable");
        }
        Ok(self.queries.clone())
    }

    async fn message_tasks(&self) -> Result<Vec<MessageTaskRow>> {
        if self.broken {
            anyhow::bail!("sheet unavailable");
        }
        Ok(self.messages.clone())
    }

    async fn schedule(&self) -> Result<ScheduleTable> {
        if self.broken {
            anyhow::bail!("sheet unavailable");
        }
        Ok(self.schedule.clone())
    }
}

/// Notifier keeping every message it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<String>>,
    direct: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Messages sent to the runner's own webhook
    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap().clone()
    }

    /// Messages sent to explicit webhooks, as (webhook, text)
    pub fn direct_messages(&self) -> Vec<(String, String)> {
        self.direct.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        self.notifications.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_to(&self, webhook: &str, text: &str) -> Result<()> {
        self.direct
            .lock()
            .unwrap()
            .push((webhook.to_string(), text.to_string()));
        Ok(())
    }
}
