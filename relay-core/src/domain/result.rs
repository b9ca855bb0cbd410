//! Query result domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::task::Parameters;

/// Column stamped with the run time in placeholder rows
pub const RUN_TIME_COLUMN: &str = "datetime_run";
/// Column filled from the `wh_id` parameter in placeholder rows
pub const HUB_COLUMN: &str = "wh_hub_id";
/// Parameter whose value fills [`HUB_COLUMN`]
pub const HUB_PARAMETER: &str = "wh_id";

/// Rows and timing of a finished query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Seconds Redash spent running the query
    pub runtime: f64,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, JsonValue>>,
}

impl QueryResult {
    /// Adds a single placeholder row when the result set is empty
    ///
    /// Downstream report files must never be blank: the placeholder carries the
    /// run time and, when known, the hub the query was run for. Returns true
    /// when a row was added.
    pub fn ensure_placeholder(&mut self, parameters: &Parameters, now: chrono::NaiveDateTime) -> bool {
        if !self.rows.is_empty() {
            return false;
        }

        let row = self
            .columns
            .iter()
            .map(|column| {
                let value = match column.as_str() {
                    RUN_TIME_COLUMN => JsonValue::from(now.format("%Y-%m-%d %H:%M").to_string()),
                    HUB_COLUMN => parameters
                        .get(HUB_PARAMETER)
                        .cloned()
                        .unwrap_or_else(|| JsonValue::from("")),
                    _ => JsonValue::from(""),
                };
                (column.clone(), value)
            })
            .collect();

        self.rows.push(row);
        true
    }

    /// Cells of every row, in column order, as text
    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| row.get(column).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// Renders one cell for tabular output
///
/// This is the only place JSON values become text: strings are written bare,
/// nulls become empty, integral floats lose their trailing `.0`.
pub fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> chrono::NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_placeholder_for_empty_result() {
        let mut result = QueryResult {
            runtime: 0.1,
            columns: columns(&["datetime_run", "wh_hub_id", "orders"]),
            rows: vec![],
        };
        let mut params = Parameters::new();
        params.insert("wh_id".to_string(), json!("HN01"));

        assert!(result.ensure_placeholder(&params, now()));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(
            result.text_rows(),
            vec![vec!["2024-03-05 07:30".to_string(), "HN01".to_string(), String::new()]]
        );
    }

    #[test]
    fn test_placeholder_without_hub_parameter() {
        let mut result = QueryResult {
            runtime: 0.0,
            columns: columns(&["wh_hub_id"]),
            rows: vec![],
        };
        assert!(result.ensure_placeholder(&Parameters::new(), now()));
        assert_eq!(result.text_rows(), vec![vec![String::new()]]);
    }

    #[test]
    fn test_no_placeholder_when_rows_exist() {
        let mut row = Map::new();
        row.insert("orders".to_string(), json!(3));
        let mut result = QueryResult {
            runtime: 0.0,
            columns: columns(&["orders"]),
            rows: vec![row],
        };
        assert!(!result.ensure_placeholder(&Parameters::new(), now()));
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!("abc")), "abc");
        assert_eq!(cell_text(&json!(12)), "12");
        assert_eq!(cell_text(&json!(12.0)), "12");
        assert_eq!(cell_text(&json!(1.5)), "1.5");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_text_rows_missing_cells_are_empty() {
        let mut row = Map::new();
        row.insert("a".to_string(), json!("x"));
        let result = QueryResult {
            runtime: 0.0,
            columns: columns(&["a", "b"]),
            rows: vec![row],
        };
        assert_eq!(result.text_rows(), vec![vec!["x".to_string(), String::new()]]);
    }
}
