//! Daily schedule loop
//!
//! Fires the slots of the `taskSchedule` tab once per day at their local
//! wall-clock time.

use chrono::{Local, NaiveDate, NaiveDateTime};
use relay_core::domain::schedule::{ScheduleSlot, ScheduleTable};
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::{debug, info};

use super::pipeline::Pipeline;

/// How often the loop checks for due slots
pub const TICK: Duration = Duration::from_secs(20);

/// Tracks which slots already fired on which day
#[derive(Debug, Clone)]
pub struct SlotTracker {
    last_fired: Vec<Option<NaiveDate>>,
}

impl SlotTracker {
    /// Starts tracking at `now`
    ///
    /// Slots whose time has already passed today count as fired, so a restart
    /// in the afternoon does not replay the morning slots.
    pub fn new(slots: &[ScheduleSlot], now: NaiveDateTime) -> Self {
        let last_fired = slots
            .iter()
            .map(|slot| (slot.time < now.time()).then(|| now.date()))
            .collect();
        Self { last_fired }
    }

    /// Indices of the slots due at `now`, marked as fired
    pub fn due(&mut self, slots: &[ScheduleSlot], now: NaiveDateTime) -> Vec<usize> {
        let today = now.date();
        let mut due = Vec::new();
        for (idx, slot) in slots.iter().enumerate() {
            let Some(last_fired) = self.last_fired.get_mut(idx) else {
                continue;
            };
            if slot.time <= now.time() && *last_fired != Some(today) {
                *last_fired = Some(today);
                due.push(idx);
            }
        }
        due
    }
}

/// Runs the pipeline for each slot when it is due
pub struct ScheduleLoop {
    pipeline: Arc<Pipeline>,
    table: ScheduleTable,
    tick: Duration,
}

impl ScheduleLoop {
    pub fn new(pipeline: Arc<Pipeline>, table: ScheduleTable) -> Self {
        Self {
            pipeline,
            table,
            tick: TICK,
        }
    }

    /// Loops forever; a failed run is reported by the pipeline and the loop
    /// carries on
    pub async fn run(&self) {
        let slots = &self.table.slots;
        info!("Scheduler started with {} slot(s)", slots.len());
        for slot in slots {
            info!("  - {}: {}", slot.label, slot.task_names.join(", "));
        }

        let mut tracker = SlotTracker::new(slots, Local::now().naive_local());
        let mut interval = time::interval(self.tick);

        loop {
            interval.tick().await;
            debug!("Checking schedule");

            for idx in tracker.due(slots, Local::now().naive_local()) {
                let slot = &slots[idx];
                info!("Running slot {}", slot.label);
                self.pipeline.run(&slot.task_names, true).await;
            }
        }
    }
}
