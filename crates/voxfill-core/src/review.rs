//! Post-batch classification.

use std::collections::HashSet;

use crate::error::AppError;
use crate::executor::BatchRun;
use crate::models::{FailedItem, Record, RecordId, RecordOutcome};

/// Final report handed to the presentation layer.
///
/// Every input record is counted exactly once across `succeeded`, `skipped`
/// and `failed`.
#[derive(Debug)]
pub enum ReviewReport {
    AllSucceeded {
        succeeded: usize,
        skipped: usize,
    },
    SomeFailed {
        succeeded: usize,
        skipped: usize,
        failed: Vec<FailedItem>,
    },
    /// Cancelled runs list every unprocessed record as `AppError::Cancelled`.
    Cancelled {
        succeeded: usize,
        skipped: usize,
        failed: Vec<FailedItem>,
    },
}

impl ReviewReport {
    pub fn succeeded(&self) -> usize {
        match self {
            ReviewReport::AllSucceeded { succeeded, .. }
            | ReviewReport::SomeFailed { succeeded, .. }
            | ReviewReport::Cancelled { succeeded, .. } => *succeeded,
        }
    }

    pub fn skipped(&self) -> usize {
        match self {
            ReviewReport::AllSucceeded { skipped, .. }
            | ReviewReport::SomeFailed { skipped, .. }
            | ReviewReport::Cancelled { skipped, .. } => *skipped,
        }
    }

    pub fn failed(&self) -> &[FailedItem] {
        match self {
            ReviewReport::AllSucceeded { .. } => &[],
            ReviewReport::SomeFailed { failed, .. } | ReviewReport::Cancelled { failed, .. } => {
                failed
            }
        }
    }

    /// Number of records the report accounts for.
    pub fn accounted(&self) -> usize {
        self.succeeded() + self.skipped() + self.failed().len()
    }

    /// Ids of failed records, in input order, for a follow-up run.
    pub fn retry_ids(&self) -> Vec<RecordId> {
        self.failed().iter().map(|f| f.record.id).collect()
    }

    /// One-line headline for the end of a run.
    pub fn headline(&self) -> String {
        match self {
            ReviewReport::AllSucceeded { skipped: 0, .. } => {
                "All downloads finished successfully!".to_string()
            }
            ReviewReport::AllSucceeded { skipped, .. } => format!(
                "All downloads finished successfully!\n{} cards that already had something \
                 in their audio fields were skipped.",
                skipped
            ),
            ReviewReport::SomeFailed { failed, .. } => {
                format!("{} downloads failed.", failed.len())
            }
            ReviewReport::Cancelled { failed, .. } => format!(
                "Cancelled. {} cards were not downloaded.",
                failed.len()
            ),
        }
    }
}

pub struct ReviewAggregator;

impl ReviewAggregator {
    /// Folds the worker's results into a report covering all of `records`.
    ///
    /// Records the worker never reached are added as `AppError::Cancelled`,
    /// in input order, after the failures the worker recorded itself.
    pub fn aggregate(records: &[Record], run: BatchRun) -> ReviewReport {
        let BatchRun {
            outcomes,
            mut failed,
            cancelled,
            ..
        } = run;

        let reached: HashSet<RecordId> = outcomes.iter().map(|(id, _)| *id).collect();
        let succeeded = outcomes
            .iter()
            .filter(|(_, o)| *o == RecordOutcome::Succeeded)
            .count();
        let skipped = outcomes
            .iter()
            .filter(|(_, o)| *o == RecordOutcome::Skipped)
            .count();

        let before = failed.len();
        failed.extend(
            records
                .iter()
                .filter(|r| !reached.contains(&r.id))
                .map(|r| FailedItem::new(r.to_ref(), AppError::Cancelled)),
        );
        if failed.len() > before && !cancelled {
            tracing::warn!(
                missing = failed.len() - before,
                "Batch ended without reaching every record"
            );
        }

        if cancelled {
            ReviewReport::Cancelled {
                succeeded,
                skipped,
                failed,
            }
        } else if !failed.is_empty() {
            ReviewReport::SomeFailed {
                succeeded,
                skipped,
                failed,
            }
        } else {
            ReviewReport::AllSucceeded { succeeded, skipped }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::{record, DECK_DE};
    use uuid::Uuid;

    fn run(outcomes: Vec<(i64, RecordOutcome)>, cancelled: bool) -> BatchRun {
        let failed = outcomes
            .iter()
            .filter(|(_, o)| *o == RecordOutcome::Failed)
            .map(|(id, _)| {
                FailedItem::new(
                    record(*id, DECK_DE, "w", "").to_ref(),
                    AppError::NoResults("w".into()),
                )
            })
            .collect();
        BatchRun {
            run_id: Uuid::new_v4(),
            skipped: outcomes
                .iter()
                .filter(|(_, o)| *o == RecordOutcome::Skipped)
                .count(),
            outcomes: outcomes
                .into_iter()
                .map(|(id, o)| (RecordId(id), o))
                .collect(),
            failed,
            cancelled,
        }
    }

    fn records(n: i64) -> Vec<Record> {
        (1..=n).map(|i| record(i, DECK_DE, "w", "")).collect()
    }

    #[test]
    fn test_all_succeeded() {
        let report = ReviewAggregator::aggregate(
            &records(2),
            run(
                vec![(1, RecordOutcome::Succeeded), (2, RecordOutcome::Succeeded)],
                false,
            ),
        );
        assert!(matches!(
            report,
            ReviewReport::AllSucceeded {
                succeeded: 2,
                skipped: 0
            }
        ));
        assert_eq!(report.headline(), "All downloads finished successfully!");
    }

    #[test]
    fn test_headline_mentions_skips() {
        let report = ReviewAggregator::aggregate(
            &records(2),
            run(
                vec![(1, RecordOutcome::Skipped), (2, RecordOutcome::Succeeded)],
                false,
            ),
        );
        assert!(report.headline().contains("1 cards that already had something"));
    }

    #[test]
    fn test_some_failed() {
        let report = ReviewAggregator::aggregate(
            &records(3),
            run(
                vec![
                    (1, RecordOutcome::Succeeded),
                    (2, RecordOutcome::Failed),
                    (3, RecordOutcome::Skipped),
                ],
                false,
            ),
        );
        assert!(matches!(report, ReviewReport::SomeFailed { .. }));
        assert_eq!(report.retry_ids(), vec![RecordId(2)]);
        assert_eq!(report.accounted(), 3);
    }

    #[test]
    fn test_cancelled_folds_remainder() {
        let report = ReviewAggregator::aggregate(
            &records(5),
            run(
                vec![(1, RecordOutcome::Failed), (2, RecordOutcome::Succeeded)],
                true,
            ),
        );
        let ReviewReport::Cancelled { failed, .. } = &report else {
            panic!("expected cancelled report");
        };
        assert!(matches!(failed[0].reason, AppError::NoResults(_)));
        let cancelled: Vec<i64> = failed[1..].iter().map(|f| f.record.id.0).collect();
        assert_eq!(cancelled, vec![3, 4, 5]);
        assert!(failed[1..]
            .iter()
            .all(|f| matches!(f.reason, AppError::Cancelled)));
        assert_eq!(report.accounted(), 5);
    }

    #[test]
    fn test_completeness_without_duplicates() {
        let input = records(6);
        let report = ReviewAggregator::aggregate(
            &input,
            run(
                vec![
                    (1, RecordOutcome::Skipped),
                    (2, RecordOutcome::Failed),
                    (3, RecordOutcome::Succeeded),
                ],
                true,
            ),
        );

        let failed_ids: HashSet<RecordId> = report.failed().iter().map(|f| f.record.id).collect();
        assert_eq!(failed_ids.len(), report.failed().len());
        assert_eq!(report.accounted(), input.len());
    }
}
