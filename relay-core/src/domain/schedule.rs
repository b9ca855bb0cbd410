//! Schedule domain types
//!
//! The `taskSchedule` tab lists one task per row. Columns whose header is a
//! wall-clock time (`HH:MM`) are daily slots; an `x` in a slot column runs the
//! row's task at that time. The `once` and `quick` columns select tasks for
//! manual runs.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::task::flag_set;

/// One daily trigger time and the tasks it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// Header as written in the sheet
    pub label: String,
    pub time: NaiveTime,
    pub task_names: Vec<String>,
}

/// Parsed `taskSchedule` tab
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTable {
    pub slots: Vec<ScheduleSlot>,
    pub once: Vec<String>,
    pub quick: Vec<String>,
}

impl ScheduleTable {
    /// Builds the table from a header row and data rows
    ///
    /// Slots without any marked task are left out.
    pub fn from_rows(headers: &[String], rows: &[Vec<String>]) -> Result<Self, String> {
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let task_col = column("task_name").ok_or("missing task_name column")?;

        let marked = |col: usize| -> Vec<String> {
            rows.iter()
                .filter(|row| row.get(col).is_some_and(|cell| flag_set(cell, "x")))
                .filter_map(|row| row.get(task_col))
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        };

        let slots = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, header)| {
                let label = header.trim();
                NaiveTime::parse_from_str(label, "%H:%M")
                    .ok()
                    .map(|time| (idx, label, time))
            })
            .map(|(idx, label, time)| ScheduleSlot {
                label: label.to_string(),
                time,
                task_names: marked(idx),
            })
            .filter(|slot| !slot.task_names.is_empty())
            .collect();

        Ok(Self {
            slots,
            once: column("once").map(marked).unwrap_or_default(),
            quick: column("quick").map(marked).unwrap_or_default(),
        })
    }
}
