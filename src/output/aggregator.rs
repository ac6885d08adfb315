//! Single subscriber to the engine: latest snapshot plus ordered results

use std::time::Instant;

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::model::{ProcessingResult, SegmentProgress};
use crate::engine::{RunObserver, RunOutcome};
use crate::output::report::RunReport;

/// Forwards progress to a callback, keeps the latest snapshot and collects results
pub struct ResultAggregator<F> {
    planned: usize,
    on_progress: F,
    latest: watch::Sender<Option<SegmentProgress>>,
    results: Vec<ProcessingResult>,
    started_at: chrono::DateTime<Utc>,
    clock: Instant,
}

impl<F> ResultAggregator<F>
where
    F: FnMut(&SegmentProgress) + Send,
{
    /// Returns the aggregator and a receiver for the latest snapshot.
    ///
    /// The receiver observes a closed channel once the aggregator is dropped.
    pub fn new(planned: usize, on_progress: F) -> (Self, watch::Receiver<Option<SegmentProgress>>) {
        let (latest, rx) = watch::channel(None);
        let aggregator = Self {
            planned,
            on_progress,
            latest,
            results: Vec::with_capacity(planned),
            started_at: Utc::now(),
            clock: Instant::now(),
        };
        (aggregator, rx)
    }

    pub fn latest(&self) -> Option<SegmentProgress> {
        self.latest.borrow().clone()
    }

    pub fn results(&self) -> &[ProcessingResult] {
        &self.results
    }

    /// Freeze the collected results into a report
    pub fn finish(self, outcome: RunOutcome) -> RunReport {
        let report = RunReport {
            outcome,
            planned: self.planned,
            results: self.results,
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed_secs: self.clock.elapsed().as_secs_f64(),
        };
        debug!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            not_attempted = report.not_attempted(),
            "Run report frozen"
        );
        report
    }
}

impl<F> RunObserver for ResultAggregator<F>
where
    F: FnMut(&SegmentProgress) + Send,
{
    fn on_progress(&mut self, progress: SegmentProgress) {
        (self.on_progress)(&progress);
        self.latest.send_replace(Some(progress));
    }

    fn on_job_finished(&mut self, result: ProcessingResult) {
        let position = self
            .results
            .partition_point(|existing| existing.index < result.index);
        self.results.insert(position, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{JobStage, SegmentId};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn snapshot(index: usize, status: JobStage, progress: f64) -> SegmentProgress {
        SegmentProgress {
            index,
            total: 2,
            status,
            progress,
            estimated_time: None,
        }
    }

    #[test]
    fn test_forwards_every_snapshot_and_keeps_latest() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (mut aggregator, rx) = ResultAggregator::new(2, move |p: &SegmentProgress| {
            sink.lock().unwrap().push(p.clone())
        });

        aggregator.on_progress(snapshot(0, JobStage::Cutting, 0.0));
        aggregator.on_progress(snapshot(0, JobStage::Cutting, 50.0));

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(aggregator.latest().unwrap().progress, 50.0);
        assert_eq!(rx.borrow().as_ref().unwrap().progress, 50.0);
    }

    #[test]
    fn test_results_are_kept_in_job_order() {
        let (mut aggregator, _rx) = ResultAggregator::new(2, |_: &SegmentProgress| {});
        let id = SegmentId::new();
        aggregator.on_job_finished(ProcessingResult::failed(1, id, "B", "boom"));
        aggregator.on_job_finished(ProcessingResult::succeeded(0, id, "A", PathBuf::from("A.mp4")));

        let report = aggregator.finish(RunOutcome::Completed);
        assert_eq!(report.results[0].index, 0);
        assert_eq!(report.results[1].index, 1);
        assert_eq!(report.planned, 2);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_receiver_closes_when_aggregator_dropped() {
        let (aggregator, mut rx) = ResultAggregator::new(1, |_: &SegmentProgress| {});
        drop(aggregator.finish(RunOutcome::Completed));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        assert!(runtime.block_on(rx.changed()).is_err());
    }
}
