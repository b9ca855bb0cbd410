//! Batch reports
//!
//! Renders the two chat messages sent after every batch: the failures table
//! (only when something failed) and the results table.

use relay_core::domain::failure::FailureRecord;
use relay_core::domain::outcome::{JobOutcome, format_secs};

const FAILURE_HEADERS: [&str; 5] = ["query_id", "query_name", "attempt", "kind", "error"];
const RESULT_HEADERS: [&str; 7] = [
    "query_id",
    "query_name",
    "execute_status",
    "runtime",
    "execute_time",
    "rows_cnt",
    "query_result_id",
];

/// Message listing every failed attempt
pub fn failures_message(failures: &[FailureRecord]) -> String {
    let rows: Vec<Vec<String>> = failures
        .iter()
        .map(|f| {
            vec![
                f.query_id.to_string(),
                f.query_name.clone(),
                f.attempt.to_string(),
                f.kind.to_string(),
                single_line(&f.error),
            ]
        })
        .collect();

    format!("Redash failed data:\n```{}```", render_table(&FAILURE_HEADERS, &rows))
}

/// Message summarizing every task of the batch
pub fn results_message(outcomes: &[JobOutcome]) -> String {
    let rows: Vec<Vec<String>> = outcomes
        .iter()
        .map(|o| {
            vec![
                o.query_id.to_string(),
                o.query_name.clone(),
                o.status.to_string(),
                format_secs(o.runtime),
                format_secs(o.execute_time),
                o.rows_cnt.to_string(),
                o.query_result_id.to_string(),
            ]
        })
        .collect();

    format!("Redash Results:\n```{}```", render_table(&RESULT_HEADERS, &rows))
}

/// Plain-text table: header, dashed rule, rows
///
/// Numeric columns are right-aligned, everything else left-aligned.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let numeric: Vec<bool> = (0..headers.len())
        .map(|col| {
            let mut cells = rows.iter().filter_map(|row| row.get(col)).peekable();
            cells.peek().is_some() && cells.all(|cell| cell.parse::<f64>().is_ok())
        })
        .collect();

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                if numeric[col] {
                    format!("{:>width$}", cell, width = widths[col])
                } else {
                    format!("{:<width$}", cell, width = widths[col])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(line(headers.iter().map(|h| h.to_string()).collect()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        let cells = (0..headers.len())
            .map(|col| row.get(col).cloned().unwrap_or_default())
            .collect();
        lines.push(line(cells));
    }

    lines.join("\n")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::failure::FailureKind;
    use relay_core::domain::task::TaskKey;
    use std::time::Duration;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_table_alignment() {
        let table = render_table(
            &["id", "name"],
            &[strings(&["7", "orders"]), strings(&["123", "x"])],
        );
        assert_eq!(table, " id  name\n---  ------\n  7  orders\n123  x");
    }

    #[test]
    fn test_render_table_without_rows() {
        assert_eq!(render_table(&["a", "bb"], &[]), "a  bb\n-  --");
    }

    #[test]
    fn test_failures_message() {
        let failures = vec![FailureRecord {
            query_id: 5,
            query_name: "orders".to_string(),
            attempt: 2,
            kind: FailureKind::Remote,
            error: "syntax error\n at line 3".to_string(),
            recorded_at: chrono::Utc::now(),
        }];
        let message = failures_message(&failures);
        assert!(message.starts_with("Redash failed data:\n```query_id"));
        assert!(message.contains("syntax error at line 3"));
        assert!(message.ends_with("```"));
    }

    #[test]
    fn test_results_message() {
        let key = TaskKey {
            query_id: 9,
            query_name: "stock".to_string(),
            params: String::new(),
            save_name: "stock".to_string(),
        };
        let mut ok = JobOutcome::new(&key);
        ok.succeed(321, 4, Duration::from_millis(3456), 1.0);
        let failed = JobOutcome::new(&key);

        let message = results_message(&[ok, failed]);
        assert!(message.starts_with("Redash Results:\n```"));
        assert!(message.contains("success"));
        assert!(message.contains("failed"));
        assert!(message.contains("3.46"));
        assert!(message.contains("321"));
    }
}
