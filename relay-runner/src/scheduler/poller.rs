//! Query poller
//!
//! Drives one query task to a terminal outcome. An attempt submits the query,
//! polls the job until Redash reports a terminal status, fetches the rows and
//! writes them to the task's destination. Failed attempts are recorded and
//! retried under the configured policy.

use relay_client::ClientError;
use relay_core::domain::failure::FailureKind;
use relay_core::domain::job::RemoteStatus;
use relay_core::domain::outcome::{ExecuteStatus, JobOutcome};
use relay_core::domain::task::{TaskDescriptor, TaskKey};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::repository::{JobService, ResultSink};
use crate::service::FailureRecorder;

/// Polling and retry settings shared by every poller of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two status polls of the same job
    pub poll_interval: Duration,
    /// Attempts per task, the first one included
    pub max_attempts: u32,
    /// Pause between two attempts
    pub retry_delay: Duration,
    /// Upper bound for a single attempt
    pub task_timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 5,
            retry_delay: Duration::from_secs(1),
            task_timeout: Some(Duration::from_secs(1800)),
        }
    }
}

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("submission failed: {0}")]
    Submission(#[source] ClientError),

    #[error("{0}")]
    Remote(String),

    #[error("{0}")]
    Transport(#[source] ClientError),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to persist result: {0:#}")]
    Persistence(anyhow::Error),

    /// Bad API key or unknown query; labelled apart in reports, retried like
    /// any other Redash error
    #[error("rejected by Redash: {0}")]
    Rejected(#[source] ClientError),

    #[error("invalid task: {0}")]
    InvalidTask(String),
}

impl AttemptError {
    /// Classifies an error returned while creating the job
    pub fn submission(err: ClientError) -> Self {
        if err.is_rejected() {
            Self::Rejected(err)
        } else {
            Self::Submission(err)
        }
    }

    /// Classifies an error returned while polling or fetching
    pub fn transport(err: ClientError) -> Self {
        if err.is_rejected() {
            Self::Rejected(err)
        } else {
            Self::Transport(err)
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Submission(_) => FailureKind::Submission,
            Self::Remote(_) => FailureKind::Remote,
            Self::Transport(_) | Self::Timeout(_) => FailureKind::Transport,
            Self::Persistence(_) => FailureKind::Persistence,
            Self::Rejected(_) | Self::InvalidTask(_) => FailureKind::InvalidTask,
        }
    }

    /// Whether another attempt can succeed
    ///
    /// Only a task that cannot even be submitted is final.
    pub fn retryable(&self) -> bool {
        !matches!(self, Self::InvalidTask(_))
    }
}

/// Runs query tasks against the job service
pub struct QueryPoller {
    jobs: Arc<dyn JobService>,
    sink: Arc<dyn ResultSink>,
    recorder: Arc<dyn FailureRecorder>,
    policy: PollPolicy,
}

impl QueryPoller {
    /// Creates a new query poller
    pub fn new(
        jobs: Arc<dyn JobService>,
        sink: Arc<dyn ResultSink>,
        recorder: Arc<dyn FailureRecorder>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            jobs,
            sink,
            recorder,
            policy,
        }
    }

    /// Runs a task until it succeeds, fails fatally or runs out of attempts
    ///
    /// Never returns an error: every failure ends up in the recorder and in
    /// the returned outcome.
    pub async fn run(&self, task: &TaskDescriptor, batch_start: Instant) -> JobOutcome {
        let mut outcome = JobOutcome::new(&task.key);
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let result = match self.policy.task_timeout {
                Some(limit) => {
                    tokio::time::timeout(limit, self.attempt(task, &mut outcome, batch_start))
                        .await
                        .unwrap_or_else(|_| Err(AttemptError::Timeout(limit)))
                }
                None => self.attempt(task, &mut outcome, batch_start).await,
            };

            let err = match result {
                Ok(()) => return outcome,
                Err(err) => err,
            };

            self.record_failure(&task.key, &err, &mut outcome, batch_start);

            if !err.retryable() {
                warn!(
                    "Query {} - {} will not be retried",
                    task.query_id, task.query_name
                );
                break;
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        outcome
    }

    /// Builds the outcome of a task that cannot run at all
    pub fn reject(&self, key: &TaskKey, reason: String, batch_start: Instant) -> JobOutcome {
        let mut outcome = JobOutcome::new(key);
        let err = AttemptError::InvalidTask(reason);
        self.record_failure(key, &err, &mut outcome, batch_start);
        outcome
    }

    fn record_failure(
        &self,
        key: &TaskKey,
        err: &AttemptError,
        outcome: &mut JobOutcome,
        batch_start: Instant,
    ) {
        let message = err.to_string();
        let record = self.recorder.record(key, err.kind(), message.clone());
        error!(
            "Attempt {} failed: Query {} - {}: {}",
            record.attempt, key.query_id, key.query_name, message
        );
        outcome.fail(message, batch_start.elapsed());
    }

    async fn attempt(
        &self,
        task: &TaskDescriptor,
        outcome: &mut JobOutcome,
        batch_start: Instant,
    ) -> Result<(), AttemptError> {
        outcome.status = ExecuteStatus::Pending;
        outcome.execution_started_at = None;

        let job_id = self
            .jobs
            .submit(task)
            .await
            .map_err(AttemptError::submission)?;
        debug!(
            "Query {} - {} submitted as job {}",
            task.query_id, task.query_name, job_id
        );

        let query_result_id = self.wait_for_job(task, &job_id, outcome).await?;

        let mut result = self
            .jobs
            .fetch(task, query_result_id)
            .await
            .map_err(AttemptError::transport)?;

        if result.ensure_placeholder(&task.parameters, chrono::Local::now().naive_local()) {
            info!(
                "Query {} - {} returned no rows, writing a placeholder row",
                task.query_id, task.query_name
            );
        }

        let path = self
            .sink
            .persist(&task.save_name, &result)
            .await
            .map_err(AttemptError::Persistence)?;

        outcome.succeed(
            query_result_id,
            result.rows.len(),
            batch_start.elapsed(),
            result.runtime,
        );

        info!(
            "Query {} - {} completed: {} row(s) written to {}",
            task.query_id,
            task.query_name,
            outcome.rows_cnt,
            path.display()
        );
        Ok(())
    }

    /// Polls a job until it reaches a terminal status
    ///
    /// # Returns
    /// The query result id of the successful job
    async fn wait_for_job(
        &self,
        task: &TaskDescriptor,
        job_id: &str,
        outcome: &mut JobOutcome,
    ) -> Result<u64, AttemptError> {
        loop {
            let state = self
                .jobs
                .poll(task, job_id)
                .await
                .map_err(AttemptError::transport)?;

            match state.status {
                RemoteStatus::Queued => {
                    if outcome.status == ExecuteStatus::Pending {
                        info!("Query {} - {} queued", task.query_id, task.query_name);
                        outcome.status = ExecuteStatus::Queued;
                    }
                }
                RemoteStatus::Executing => {
                    if outcome.status != ExecuteStatus::Executing {
                        info!("Query {} - {} executing", task.query_id, task.query_name);
                        outcome.status = ExecuteStatus::Executing;
                        outcome.execution_started_at = Some(chrono::Utc::now());
                    }
                }
                RemoteStatus::Success => {
                    return state.query_result_id.ok_or_else(|| {
                        AttemptError::Remote(format!("job {} finished without a result", job_id))
                    });
                }
                RemoteStatus::Failed | RemoteStatus::Cancelled => {
                    return Err(AttemptError::Remote(
                        state
                            .error
                            .unwrap_or_else(|| format!("job {} {}", job_id, state.status)),
                    ));
                }
            }

            tokio::time::sleep(self.policy.poll_interval).await;
        }
    }
}
