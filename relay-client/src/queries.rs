//! Query execution endpoint

use crate::RedashClient;
use crate::error::{ClientError, Result};
use relay_core::domain::task::Parameters;
use relay_core::dto::redash::{ExecuteQueryRequest, JobEnvelope};
use tracing::debug;

impl RedashClient {
    /// Start a fresh execution of a saved query
    ///
    /// # Arguments
    /// * `api_key` - API key of the query
    /// * `query_id` - The saved query ID
    /// * `parameters` - Query parameters
    ///
    /// # Returns
    /// The ID of the job executing the query
    pub async fn execute_query(
        &self,
        api_key: &str,
        query_id: u64,
        parameters: Parameters,
    ) -> Result<String> {
        let url = format!("{}/api/queries/{}/results", self.base_url, query_id);
        let request = self
            .client
            .post(&url)
            .json(&ExecuteQueryRequest::fresh(query_id, parameters));
        let response = self.authorized(request, api_key).send().await?;

        let envelope: JobEnvelope = crate::read_json(response).await?;
        match envelope.job_id() {
            Some(job_id) => {
                debug!("Query {} submitted as job {}", query_id, job_id);
                Ok(job_id.to_string())
            }
            None => Err(ClientError::MissingJob(
                envelope
                    .error_message()
                    .unwrap_or_else(|| format!("no job id returned for query {}", query_id)),
            )),
        }
    }
}
