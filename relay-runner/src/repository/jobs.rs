//! Jobs repository
//!
//! The remote job lifecycle as the poller sees it:
//! - Submitting a query execution
//! - Polling the job status
//! - Fetching the finished result

use async_trait::async_trait;
use relay_client::{RedashClient, Result};
use relay_core::domain::job::JobState;
use relay_core::domain::result::QueryResult;
use relay_core::domain::task::TaskDescriptor;
use std::sync::Arc;

/// Repository trait for the remote job service
#[async_trait]
pub trait JobService: Send + Sync {
    /// Starts a fresh execution of the task's query
    ///
    /// # Returns
    /// The remote job ID
    async fn submit(&self, task: &TaskDescriptor) -> Result<String>;

    /// Reads the current state of a job
    ///
    /// # Arguments
    /// * `task` - The task the job belongs to
    /// * `job_id` - The job ID returned by [`JobService::submit`]
    async fn poll(&self, task: &TaskDescriptor, job_id: &str) -> Result<JobState>;

    /// Retrieves the rows of a finished job
    ///
    /// # Arguments
    /// * `task` - The task the result belongs to
    /// * `query_result_id` - The result ID reported by the successful job
    async fn fetch(&self, task: &TaskDescriptor, query_result_id: u64) -> Result<QueryResult>;
}

/// Redash implementation of JobService
///
/// All tasks share the same client and therefore one connection pool.
pub struct RedashJobService {
    client: Arc<RedashClient>,
}

impl RedashJobService {
    /// Creates a new Redash job service
    pub fn new(client: Arc<RedashClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobService for RedashJobService {
    async fn submit(&self, task: &TaskDescriptor) -> Result<String> {
        self.client
            .execute_query(&task.api_key, task.query_id, task.parameters.clone())
            .await
    }

    async fn poll(&self, task: &TaskDescriptor, job_id: &str) -> Result<JobState> {
        self.client.get_job(&task.api_key, job_id).await
    }

    async fn fetch(&self, task: &TaskDescriptor, query_result_id: u64) -> Result<QueryResult> {
        self.client
            .get_query_result(&task.api_key, query_result_id)
            .await
    }
}
