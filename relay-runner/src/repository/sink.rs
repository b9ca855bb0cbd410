//! Result sink repository
//!
//! Writes finished query results where the BI workbook picks them up.

use anyhow::{Context, Result};
use async_trait::async_trait;
use relay_core::domain::result::QueryResult;
use std::path::PathBuf;
use tracing::debug;

/// Repository trait for persisting query results
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Stores a result under its destination name
    ///
    /// # Arguments
    /// * `save_name` - Destination name from the task configuration
    /// * `result` - The rows to store
    ///
    /// # Returns
    /// Location of the written result
    async fn persist(&self, save_name: &str, result: &QueryResult) -> Result<PathBuf>;
}

/// CSV file implementation of ResultSink
///
/// Each result becomes `<data_path>/<save_name>.csv`, replacing the file from
/// the previous run.
pub struct CsvResultSink {
    data_path: PathBuf,
}

impl CsvResultSink {
    /// Creates a new CSV sink writing below `data_path`
    pub fn new(data_path: PathBuf) -> Self {
        Self { data_path }
    }
}

#[async_trait]
impl ResultSink for CsvResultSink {
    async fn persist(&self, save_name: &str, result: &QueryResult) -> Result<PathBuf> {
        if save_name.trim().is_empty() {
            anyhow::bail!("query_save_name is empty");
        }

        let bytes = render_csv(result)?;

        tokio::fs::create_dir_all(&self.data_path)
            .await
            .with_context(|| format!("Failed to create {}", self.data_path.display()))?;

        let path = self.data_path.join(format!("{}.csv", save_name));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Wrote {} row(s) to {}", result.rows.len(), path.display());
        Ok(path)
    }
}

/// Serializes a result as CSV with a header row
fn render_csv(result: &QueryResult) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&result.columns)
        .context("Failed to write CSV header")?;

    for row in result.text_rows() {
        writer.write_record(&row).context("Failed to write CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))
}
