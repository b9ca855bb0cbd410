//! Report pipeline
//!
//! One run of the report flow for a set of tasks: refresh the query results,
//! give the result files time to sync, then send the report messages.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

use super::batch::BatchOrchestrator;
use crate::repository::Notifier;
use crate::service::MessageDispatcher;

pub struct Pipeline {
    orchestrator: BatchOrchestrator,
    dispatcher: MessageDispatcher,
    notifier: Arc<dyn Notifier>,
    sync_delay: Duration,
}

impl Pipeline {
    pub fn new(
        orchestrator: BatchOrchestrator,
        dispatcher: MessageDispatcher,
        notifier: Arc<dyn Notifier>,
        sync_delay: Duration,
    ) -> Self {
        Self {
            orchestrator,
            dispatcher,
            notifier,
            sync_delay,
        }
    }

    /// Runs the pipeline for the given tasks
    ///
    /// Errors are logged and posted to the error webhook; they never reach
    /// the caller, so a scheduler keeps going after a failed run.
    ///
    /// # Returns
    /// Whether the run completed without error
    pub async fn run(&self, task_names: &[String], with_queries: bool) -> bool {
        info!("Started send report: {}", task_names.join(", "));

        let ok = match self.execute(task_names, with_queries).await {
            Ok(()) => true,
            Err(e) => {
                error!("Function main failed: {:#}", e);
                if let Err(notify_err) = self
                    .notifier
                    .notify(&format!("Function main failed: {:#}", e))
                    .await
                {
                    warn!("Failed to report pipeline error: {:#}", notify_err);
                }
                false
            }
        };

        info!("Ended send report");
        ok
    }

    async fn execute(&self, task_names: &[String], with_queries: bool) -> Result<()> {
        if with_queries {
            self.orchestrator.run_batch(task_names).await?;
            info!(
                "Redash execution finished. Wait {}s to sync files.",
                self.sync_delay.as_secs()
            );
            tokio::time::sleep(self.sync_delay).await;
        }

        let sent = self
            .dispatcher
            .run(task_names)
            .await
            .context("Send report error")?;
        info!("Sent {} report message(s)", sent);
        Ok(())
    }
}
