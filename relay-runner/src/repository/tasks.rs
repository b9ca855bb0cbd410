//! Task configuration repository
//!
//! Reads the control-plane spreadsheet. Three tabs are used:
//! - `taskQueries`: one Redash query per row
//! - `taskMsg`: one report message per row
//! - `taskSchedule`: daily slots and manual selections

use anyhow::{Context, Result};
use async_trait::async_trait;
use relay_client::SheetClient;
use relay_core::domain::schedule::ScheduleTable;
use relay_core::domain::task::{MessageTaskRow, QueryTaskRow};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::TaskLocation;

pub const QUERIES_TAB: &str = "taskQueries";
pub const MESSAGES_TAB: &str = "taskMsg";
pub const SCHEDULE_TAB: &str = "taskSchedule";

/// Repository trait for the task configuration
///
/// Rows are returned in sheet order and unfiltered.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Rows of the `taskQueries` tab
    async fn query_tasks(&self) -> Result<Vec<QueryTaskRow>>;

    /// Rows of the `taskMsg` tab
    async fn message_tasks(&self) -> Result<Vec<MessageTaskRow>>;

    /// The parsed `taskSchedule` tab
    async fn schedule(&self) -> Result<ScheduleTable>;
}

/// Spreadsheet implementation of TaskSource
///
/// Reads the tabs either from the published sheet or from CSV files named
/// after the tabs.
pub struct SpreadsheetTaskSource {
    location: TaskLocation,
    sheets: SheetClient,
}

impl SpreadsheetTaskSource {
    /// Creates a new spreadsheet task source
    pub fn new(location: TaskLocation) -> Self {
        Self {
            location,
            sheets: SheetClient::new(),
        }
    }

    async fn read_tab(&self, tab: &str) -> Result<String> {
        match &self.location {
            TaskLocation::Sheet(sheet_id) => self
                .sheets
                .fetch_tab_csv(sheet_id, tab)
                .await
                .with_context(|| format!("Failed to fetch tab {}", tab)),
            TaskLocation::Dir(dir) => {
                let path = dir.join(format!("{}.csv", tab));
                debug!("Reading tab {} from {}", tab, path.display());
                tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))
            }
        }
    }
}

#[async_trait]
impl TaskSource for SpreadsheetTaskSource {
    async fn query_tasks(&self) -> Result<Vec<QueryTaskRow>> {
        let text = self.read_tab(QUERIES_TAB).await?;
        parse_rows(&text).with_context(|| format!("Invalid {} tab", QUERIES_TAB))
    }

    async fn message_tasks(&self) -> Result<Vec<MessageTaskRow>> {
        let text = self.read_tab(MESSAGES_TAB).await?;
        parse_rows(&text).with_context(|| format!("Invalid {} tab", MESSAGES_TAB))
    }

    async fn schedule(&self) -> Result<ScheduleTable> {
        let text = self.read_tab(SCHEDULE_TAB).await?;
        parse_schedule(&text).with_context(|| format!("Invalid {} tab", SCHEDULE_TAB))
    }
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

/// Deserializes the rows of a tab, skipping blank lines
fn parse_rows<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    let mut reader = reader(text);
    let headers = reader.headers().context("Missing header row")?.clone();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Unreadable row {}", idx + 2))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let row = record
            .deserialize(Some(&headers))
            .with_context(|| format!("Invalid row {}", idx + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

fn parse_schedule(text: &str) -> Result<ScheduleTable> {
    let mut reader = reader(text);
    let headers: Vec<String> = reader
        .headers()
        .context("Missing header row")?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<std::result::Result<Vec<Vec<String>>, _>>()
        .context("Unreadable schedule row")?;

    ScheduleTable::from_rows(&headers, &rows).map_err(anyhow::Error::msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::task::ReportKind;

    const QUERIES: &str = "\
task_name,query_id,query_name,params,query_save_name,api_key,active_flag,run_flag,note
daily,101,orders,\"{'wh_id': 'HN01'}\",orders_hn,key-a,y,y,first
,,,,,,,,
daily,102,stock,,stock_all,key-b,Y,n,
";

    const MESSAGES: &str = "\
task_name,proceed_flag,page,report,folder,export_name,msg_content,hyperlink,webhook,send_flag,page_sleep
daily,y,Overview,image,/tmp,overview.png,Daily overview,https://example.com,https://chat.example.com/a,y,5
daily,n,Detail,file,/tmp,detail.xlsx,Detail,,https://chat.example.com/b,n,
";

    #[test]
    fn test_parse_query_rows() {
        let rows: Vec<QueryTaskRow> = parse_rows(QUERIES).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].query_id, 101);
        assert_eq!(rows[0].params, "{'wh_id': 'HN01'}");
        assert!(rows[0].is_enabled());
        assert_eq!(rows[1].params, "");
        assert!(!rows[1].is_enabled());
    }

    #[test]
    fn test_parse_query_rows_rejects_bad_id() {
        let text = "task_name,query_id\ndaily,abc\n";
        let err = parse_rows::<QueryTaskRow>(text).unwrap_err();
        assert!(format!("{:#}", err).contains("row 2"));
    }

    #[test]
    fn test_parse_message_rows() {
        let rows: Vec<MessageTaskRow> = parse_rows(MESSAGES).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].report, ReportKind::Image);
        assert!(rows[0].should_proceed());
        assert_eq!(rows[1].report, ReportKind::File);
        assert!(!rows[1].should_send());
    }

    #[test]
    fn test_parse_schedule() {
        let text = "task_name,owner,once,quick,08:00\ndaily,ops,x,,x\n";
        let table = parse_schedule(text).unwrap();
        assert_eq!(table.once, vec!["daily".to_string()]);
        assert_eq!(table.slots.len(), 1);
    }

    #[tokio::test]
    async fn test_dir_source_reads_tabs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("taskQueries.csv"), QUERIES).unwrap();
        std::fs::write(dir.path().join("taskMsg.csv"), MESSAGES).unwrap();

        let source = SpreadsheetTaskSource::new(TaskLocation::Dir(dir.path().to_path_buf()));
        assert_eq!(source.query_tasks().await.unwrap().len(), 2);
        assert_eq!(source.message_tasks().await.unwrap().len(), 2);
        assert!(source.schedule().await.is_err());
    }
}
