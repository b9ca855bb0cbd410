//! Query result endpoint

use crate::RedashClient;
use crate::error::Result;
use relay_core::domain::result::QueryResult;
use relay_core::dto::redash::QueryResultEnvelope;

impl RedashClient {
    /// Get the rows of a finished query
    ///
    /// # Arguments
    /// * `api_key` - API key of the query
    /// * `query_result_id` - The result ID reported by a successful job
    pub async fn get_query_result(&self, api_key: &str, query_result_id: u64) -> Result<QueryResult> {
        let url = format!("{}/api/query_results/{}", self.base_url, query_result_id);
        let response = self
            .authorized(self.client.get(&url), api_key)
            .send()
            .await?;

        let envelope: QueryResultEnvelope = crate::read_json(response).await?;
        Ok(envelope.query_result.into())
    }
}
