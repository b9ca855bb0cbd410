//! Batch result domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::failure::{FailureRecord, sort_failures};
use crate::domain::outcome::JobOutcome;

/// Everything one batch run produced
///
/// Holds exactly one outcome per task, in task order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub run_id: Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub outcomes: Vec<JobOutcome>,
}

impl BatchResult {
    pub fn new(
        run_id: Uuid,
        started_at: chrono::DateTime<chrono::Utc>,
        outcomes: Vec<JobOutcome>,
    ) -> Self {
        Self {
            run_id,
            started_at,
            outcomes,
        }
    }

    /// Every failure record of every task, sorted for reporting
    pub fn failures(&self) -> Vec<FailureRecord> {
        let mut records: Vec<FailureRecord> = self
            .outcomes
            .iter()
            .flat_map(|outcome| outcome.failures.iter().cloned())
            .collect();
        sort_failures(&mut records);
        records
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::failure::FailureKind;
    use crate::domain::task::TaskKey;
    use std::time::Duration;

    fn outcome(query_id: u64, attempts: u32, success: bool) -> JobOutcome {
        let key = TaskKey {
            query_id,
            query_name: format!("q{}", query_id),
            params: String::new(),
            save_name: format!("s{}", query_id),
        };
        let mut outcome = JobOutcome::new(&key);
        // newest first, to check the flattened list gets sorted
        for attempt in (1..=attempts).rev() {
            outcome.failures.push(FailureRecord {
                query_id,
                query_name: key.query_name.clone(),
                attempt,
                kind: FailureKind::Transport,
                error: "timeout".to_string(),
                recorded_at: chrono::Utc::now(),
            });
        }
        if success {
            outcome.succeed(1, 1, Duration::from_secs(1), 0.5);
        }
        outcome
    }

    #[test]
    fn test_failures_are_flattened_and_sorted() {
        let batch = BatchResult::new(
            Uuid::new_v4(),
            chrono::Utc::now(),
            vec![outcome(2, 1, true), outcome(1, 2, false), outcome(3, 0, true)],
        );
        let failures = batch.failures();
        let keys: Vec<_> = failures.iter().map(|r| (r.query_id, r.attempt)).collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);
        assert_eq!(batch.succeeded(), 2);
        assert_eq!(batch.failed(), 1);
    }
}
