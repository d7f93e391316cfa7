use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reaf_types::{CombinationId, OperationId};

/// Lifecycle of a bulk operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Running,
    Completed,
    Failed,
}

impl OperationStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("RUNNING"),
            Self::Completed => f.write_str("COMPLETED"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// Snapshot of a bulk operation's progress.
///
/// Owned and mutated only by the batch task; observers receive clones.
/// At every observed state `completed_items + failed_items ==
/// processed_items <= total_items`, and the counters never decrease.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationProgress {
    pub operation_id: OperationId,
    /// Fixed at start to the number of requested ids.
    pub total_items: usize,
    pub processed_items: usize,
    pub completed_items: usize,
    pub failed_items: usize,
    pub status: OperationStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// `"<id>: <message>"` per failed item, plus any aggregate error.
    pub errors: Vec<String>,
    /// Ids of failed items, in processing order.
    #[serde(default)]
    pub failed_ids: Vec<CombinationId>,
}

impl BulkOperationProgress {
    /// Fresh RUNNING progress for a batch of `total_items`.
    pub fn start(operation_id: OperationId, total_items: usize) -> Self {
        Self {
            operation_id,
            total_items,
            processed_items: 0,
            completed_items: 0,
            failed_items: 0,
            status: OperationStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            errors: Vec::new(),
            failed_ids: Vec::new(),
        }
    }

    /// Count one successfully reaffirmed item.
    pub fn record_success(&mut self) {
        self.completed_items += 1;
        self.processed_items += 1;
    }

    /// Count one failed item and keep its error.
    pub fn record_failure(&mut self, id: &CombinationId, message: &str) {
        self.failed_items += 1;
        self.processed_items += 1;
        self.errors.push(format!("{id}: {message}"));
        self.failed_ids.push(id.clone());
    }

    /// Mark the batch COMPLETED.
    pub fn complete(&mut self) {
        self.status = OperationStatus::Completed;
        self.end_time = Some(Utc::now());
    }

    /// Mark the batch FAILED with an aggregate error.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = OperationStatus::Failed;
        self.end_time = Some(Utc::now());
        self.errors.push(error.into());
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Items not yet processed.
    pub fn remaining(&self) -> usize {
        self.total_items.saturating_sub(self.processed_items)
    }

    /// Processed share in percent, 100 for an empty batch.
    pub fn percent(&self) -> u8 {
        if self.total_items == 0 {
            return 100;
        }
        ((self.processed_items * 100) / self.total_items).min(100) as u8
    }

    /// Wall-clock duration, once the batch has ended.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Check the counter invariants, describing the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.completed_items + self.failed_items != self.processed_items {
            return Err(format!(
                "completed {} + failed {} != processed {}",
                self.completed_items, self.failed_items, self.processed_items
            ));
        }
        if self.processed_items > self.total_items {
            return Err(format!(
                "processed {} exceeds total {}",
                self.processed_items, self.total_items
            ));
        }
        if self.status == OperationStatus::Completed && self.processed_items != self.total_items {
            return Err(format!(
                "completed with {} of {} processed",
                self.processed_items, self.total_items
            ));
        }
        if self.status.is_terminal() != self.end_time.is_some() {
            return Err("end time must be set exactly when terminal".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starts_running_with_zero_counters() {
        let p = BulkOperationProgress::start("op".into(), 4);
        assert_eq!(p.status, OperationStatus::Running);
        assert_eq!(p.processed_items, 0);
        assert_eq!(p.remaining(), 4);
        assert_eq!(p.percent(), 0);
        assert!(p.end_time.is_none());
        assert!(p.check_invariants().is_ok());
    }

    #[test]
    fn failure_is_formatted_with_id() {
        let mut p = BulkOperationProgress::start("op".into(), 2);
        p.record_failure(&"c7".into(), "record locked");
        assert_eq!(p.errors, vec!["c7: record locked".to_string()]);
        assert_eq!(p.failed_ids, vec![CombinationId::from("c7")]);
        assert_eq!(p.percent(), 50);
    }

    #[test]
    fn completing_early_violates_invariant() {
        let mut p = BulkOperationProgress::start("op".into(), 2);
        p.record_success();
        p.complete();
        assert!(p.check_invariants().is_err());
    }

    #[test]
    fn failed_may_stop_short() {
        let mut p = BulkOperationProgress::start("op".into(), 3);
        p.fail("invalid request");
        assert!(p.check_invariants().is_ok());
        assert!(p.elapsed().is_some());
    }

    #[test]
    fn json_shape() {
        let p = BulkOperationProgress::start("op-1".into(), 1);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["operationId"], "op-1");
        assert_eq!(json["totalItems"], 1);
        assert_eq!(json["status"], "RUNNING");
        assert!(json["endTime"].is_null());
    }

    proptest! {
        #[test]
        fn counters_hold_for_any_outcome_sequence(outcomes in prop::collection::vec(any::<bool>(), 0..40)) {
            let mut p = BulkOperationProgress::start("op".into(), outcomes.len());
            for (n, ok) in outcomes.iter().enumerate() {
                if *ok {
                    p.record_success();
                } else {
                    p.record_failure(&format!("c{n}").into(), "boom");
                }
                prop_assert!(p.check_invariants().is_ok());
            }
            p.complete();
            prop_assert!(p.check_invariants().is_ok());
            prop_assert_eq!(p.failed_items, p.errors.len());
        }
    }
}
