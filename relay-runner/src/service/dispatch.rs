//! Message dispatch service
//!
//! Announces finished reports in chat. The BI workbook exports its artifacts
//! (images, spreadsheets) on its own; this service checks each artifact is in
//! place and posts the configured message for it.

use anyhow::{Context, Result};
use relay_core::domain::task::MessageTaskRow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::repository::{Notifier, TaskSource};

/// Posts report messages for the requested tasks
pub struct MessageDispatcher {
    source: Arc<dyn TaskSource>,
    notifier: Arc<dyn Notifier>,
}

impl MessageDispatcher {
    /// Creates a new message dispatcher
    pub fn new(source: Arc<dyn TaskSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self { source, notifier }
    }

    /// Processes the message rows of the given tasks, in sheet order
    ///
    /// Stops at the first missing artifact: later rows usually depend on the
    /// same export.
    ///
    /// # Returns
    /// The number of messages sent
    pub async fn run(&self, task_names: &[String]) -> Result<usize> {
        let rows: Vec<MessageTaskRow> = self
            .source
            .message_tasks()
            .await
            .context("Failed to read message tasks")?
            .into_iter()
            .filter(|row| row.should_proceed() && task_names.contains(&row.task_name))
            .collect();

        info!("Processing {} message task(s)", rows.len());

        let mut sent = 0;
        for row in &rows {
            if let Some(path) = artifact_path(row) {
                if !path.exists() {
                    anyhow::bail!(
                        "Export {:?} failed: {} not found",
                        row.report,
                        path.display()
                    );
                }
            }

            if !row.should_send() {
                info!("Message for page '{}' is not flagged to send", row.page);
                continue;
            }

            match self.notifier.send_to(&row.webhook, &row.message_text()).await {
                Ok(()) => {
                    info!("Sent message for page '{}'", row.page);
                    sent += 1;
                }
                Err(e) => warn!("Failed to send message for page '{}': {:#}", row.page, e),
            }
        }

        Ok(sent)
    }
}

/// Local file the message announces, if the row names one
fn artifact_path(row: &MessageTaskRow) -> Option<PathBuf> {
    let name = row.export_name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Path::new(row.folder.trim()).join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::{FakeSource, RecordingNotifier};
    use relay_core::domain::task::ReportKind;

    fn row(task_name: &str, folder: &str, export_name: &str, send: &str) -> MessageTaskRow {
        MessageTaskRow {
            task_name: task_name.to_string(),
            proceed_flag: "y".to_string(),
            page: format!("{} page", task_name),
            report: ReportKind::File,
            folder: folder.to_string(),
            export_name: export_name.to_string(),
            msg_content: format!("{} report", task_name),
            hyperlink: "https://example.com/report".to_string(),
            webhook: format!("https://chat.example.com/{}", task_name),
            send_flag: send.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sends_requested_tasks_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("daily.xlsx"), b"x").unwrap();
        let folder = dir.path().to_string_lossy().to_string();

        let mut skipped = row("daily", &folder, "daily.xlsx", "y");
        skipped.proceed_flag = "n".to_string();
        let source = FakeSource::with_messages(vec![
            row("daily", &folder, "daily.xlsx", "y"),
            row("weekly", &folder, "missing.xlsx", "y"),
            skipped,
            row("daily", "", "", "n"),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = MessageDispatcher::new(Arc::new(source), notifier.clone());

        let sent = dispatcher.run(&["daily".to_string()]).await.unwrap();
        assert_eq!(sent, 1);

        let messages = notifier.direct_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "https://chat.example.com/daily");
        assert_eq!(messages[0].1, "daily report\nhttps://example.com/report");
    }

    #[tokio::test]
    async fn test_missing_artifact_stops_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().to_string_lossy().to_string();
        let source = FakeSource::with_messages(vec![
            row("daily", &folder, "absent.png", "y"),
            row("daily", "", "", "y"),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = MessageDispatcher::new(Arc::new(source), notifier.clone());

        let err = dispatcher.run(&["daily".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("absent.png"));
        assert!(notifier.direct_messages().is_empty());
    }
}
