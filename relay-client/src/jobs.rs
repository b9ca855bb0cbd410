//! Job status endpoint

use crate::RedashClient;
use crate::error::{ClientError, Result};
use relay_core::domain::job::JobState;
use relay_core::dto::redash::JobEnvelope;

impl RedashClient {
    /// Get the current state of a job
    ///
    /// # Arguments
    /// * `api_key` - API key of the query the job runs
    /// * `job_id` - The job ID returned by [`RedashClient::execute_query`]
    pub async fn get_job(&self, api_key: &str, job_id: &str) -> Result<JobState> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        let response = self
            .authorized(self.client.get(&url), api_key)
            .send()
            .await?;

        let envelope: JobEnvelope = crate::read_json(response).await?;
        let job = envelope.job.unwrap_or_default();
        job.to_state().ok_or_else(|| {
            ClientError::ParseError(format!(
                "unknown status {:?} for job {}",
                job.status, job_id
            ))
        })
    }
}
