//! Batch orchestrator
//!
//! Runs every selected query task of a batch concurrently, one poller task
//! each, then reports the consolidated result through the notifier.

use anyhow::{Context, Result};
use relay_core::domain::batch::BatchResult;
use relay_core::domain::failure::FailureKind;
use relay_core::domain::outcome::JobOutcome;
use relay_core::domain::task::{QueryTaskRow, TaskKey};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::poller::{PollPolicy, QueryPoller};
use crate::repository::{JobService, Notifier, ResultSink, TaskSource};
use crate::service::report::{failures_message, results_message};
use crate::service::{FailureRecorder, InMemoryFailureRecorder};

/// Executes batches of query tasks
pub struct BatchOrchestrator {
    source: Arc<dyn TaskSource>,
    jobs: Arc<dyn JobService>,
    sink: Arc<dyn ResultSink>,
    notifier: Arc<dyn Notifier>,
    policy: PollPolicy,
}

impl BatchOrchestrator {
    /// Creates a new batch orchestrator
    pub fn new(
        source: Arc<dyn TaskSource>,
        jobs: Arc<dyn JobService>,
        sink: Arc<dyn ResultSink>,
        notifier: Arc<dyn Notifier>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            source,
            jobs,
            sink,
            notifier,
            policy,
        }
    }

    /// Runs the query tasks belonging to the given task names
    ///
    /// Only a failure to read the task configuration is returned as an error.
    /// Every selected task, failed or not, gets exactly one outcome, listed
    /// in configuration order.
    pub async fn run_batch(&self, task_names: &[String]) -> Result<BatchResult> {
        let rows = self
            .source
            .query_tasks()
            .await
            .context("Failed to read query tasks")?;
        let selected = select_query_tasks(rows, task_names);

        let run_id = Uuid::new_v4();
        let started_at = chrono::Utc::now();
        let batch_start = Instant::now();
        info!("Batch {} started with {} task(s)", run_id, selected.len());

        // one recorder per batch
        let recorder: Arc<dyn FailureRecorder> = Arc::new(InMemoryFailureRecorder::new());
        for row in &selected {
            recorder.init(&row.key());
        }

        let poller = Arc::new(QueryPoller::new(
            Arc::clone(&self.jobs),
            Arc::clone(&self.sink),
            Arc::clone(&recorder),
            self.policy,
        ));

        let handles: Vec<(TaskKey, JoinHandle<JobOutcome>)> = selected
            .into_iter()
            .map(|row| {
                let key = row.key();
                let poller = Arc::clone(&poller);
                let handle = tokio::spawn(async move {
                    match row.to_descriptor() {
                        Ok(task) => poller.run(&task, batch_start).await,
                        Err(e) => poller.reject(&row.key(), e.to_string(), batch_start),
                    }
                });
                (key, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (key, handle) in handles {
            let mut outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Poller for query {} crashed: {}", key, e);
                    let record = recorder.record(&key, FailureKind::Internal, e.to_string());
                    let mut outcome = JobOutcome::new(&key);
                    outcome.fail(record.error, batch_start.elapsed());
                    outcome
                }
            };
            outcome.failures = recorder.records(&key);
            outcomes.push(outcome);
        }

        let result = BatchResult::new(run_id, started_at, outcomes);
        self.report(recorder.as_ref(), &result).await;

        info!(
            "Batch {} finished in {:.2}s: {} succeeded, {} failed",
            run_id,
            batch_start.elapsed().as_secs_f64(),
            result.succeeded(),
            result.failed()
        );
        Ok(result)
    }

    /// Sends the failures table (if any) and the results table
    async fn report(&self, recorder: &dyn FailureRecorder, result: &BatchResult) {
        let failures = recorder.all();
        if !failures.is_empty() {
            if let Err(e) = self.notifier.notify(&failures_message(&failures)).await {
                warn!("Failed to send failures report: {:#}", e);
            }
        }

        if let Err(e) = self.notifier.notify(&results_message(&result.outcomes)).await {
            warn!("Failed to send results report: {:#}", e);
        }
    }
}

/// Keeps the enabled rows of the requested tasks, first occurrence of each
/// task identity only
pub fn select_query_tasks(rows: Vec<QueryTaskRow>, task_names: &[String]) -> Vec<QueryTaskRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| row.is_enabled() && task_names.contains(&row.task_name))
        .filter(|row| seen.insert(row.key()))
        .collect()
}
