//! Spreadsheet export client
//!
//! Reads tabs of a Google Sheet through its CSV export endpoint. The sheet
//! must be readable by link.

use crate::error::Result;
use reqwest::Client;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://docs.google.com";

/// Fetches spreadsheet tabs as CSV text
#[derive(Debug, Clone)]
pub struct SheetClient {
    base_url: String,
    client: Client,
}

impl SheetClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Use another export host (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Export URL of one tab
    pub fn tab_url(&self, sheet_id: &str) -> String {
        format!("{}/spreadsheets/d/{}/gviz/tq", self.base_url, sheet_id)
    }

    /// Download one tab as CSV
    ///
    /// # Arguments
    /// * `sheet_id` - The spreadsheet ID
    /// * `tab` - Tab (worksheet) name, e.g. "taskQueries"
    pub async fn fetch_tab_csv(&self, sheet_id: &str, tab: &str) -> Result<String> {
        debug!("Fetching tab {} of sheet {}", tab, sheet_id);

        let response = self
            .client
            .get(self.tab_url(sheet_id))
            .query(&[("tqx", "out:csv"), ("sheet", tab)])
            .send()
            .await?;

        let response = crate::check_status(response).await?;
        Ok(response.text().await?)
    }
}

impl Default for SheetClient {
    fn default() -> Self {
        Self::new()
    }
}
