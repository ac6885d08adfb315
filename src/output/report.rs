//! Frozen summary of a finished run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::model::ProcessingResult;
use crate::engine::RunOutcome;

/// Results of one run, in job order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Number of jobs in the plan
    pub planned: usize,
    pub results: Vec<ProcessingResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    /// Jobs that never started because the run was cancelled
    pub fn not_attempted(&self) -> usize {
        self.planned.saturating_sub(self.results.len())
    }

    pub fn was_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }

    /// Every planned job ran and succeeded
    pub fn all_succeeded(&self) -> bool {
        self.outcome == RunOutcome::Completed
            && self.results.len() == self.planned
            && self.results.iter().all(|r| r.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SegmentId;
    use std::path::PathBuf;

    fn report(outcome: RunOutcome, planned: usize, results: Vec<ProcessingResult>) -> RunReport {
        let now = Utc::now();
        RunReport {
            outcome,
            planned,
            results,
            started_at: now,
            finished_at: now,
            elapsed_secs: 0.0,
        }
    }

    #[test]
    fn test_counts_distinguish_failed_from_not_attempted() {
        let id = SegmentId::new();
        let results = vec![
            ProcessingResult::succeeded(0, id, "A", PathBuf::from("/out/A.mp4")),
            ProcessingResult::failed(1, id, "B", "Failed to compress: boom"),
        ];
        let report = report(RunOutcome::Cancelled, 4, results);

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.not_attempted(), 2);
        assert!(report.was_cancelled());
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_all_succeeded_requires_complete_run() {
        let id = SegmentId::new();
        let results = vec![ProcessingResult::succeeded(0, id, "A", PathBuf::from("/out/A.mp4"))];
        assert!(report(RunOutcome::Completed, 1, results.clone()).all_succeeded());
        assert!(!report(RunOutcome::Cancelled, 1, results).all_succeeded());
    }

    #[test]
    fn test_report_serializes_outcome_lowercase() {
        let json = serde_json::to_value(report(RunOutcome::Completed, 0, vec![])).unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["planned"], 0);
    }
}
