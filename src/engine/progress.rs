//! Progress normalization and run-level ETA estimation

use std::time::Duration;

use crate::domain::model::{JobStage, SegmentProgress};
use crate::ports::BackendProgress;

/// Re-stamps backend events with the owning job and the engine's stage label
#[derive(Debug, Clone)]
pub struct StageProgress {
    index: usize,
    total: usize,
    stage: JobStage,
    /// Estimated time for the jobs after this one
    tail_eta: Option<f64>,
    last_percent: f64,
}

impl StageProgress {
    pub fn new(index: usize, total: usize, stage: JobStage, tail_eta: Option<f64>) -> Self {
        Self {
            index,
            total,
            stage,
            tail_eta,
            last_percent: 0.0,
        }
    }

    /// Snapshot emitted when the stage starts
    pub fn started(&self) -> SegmentProgress {
        SegmentProgress {
            index: self.index,
            total: self.total,
            status: self.stage,
            progress: 0.0,
            estimated_time: self.tail_eta,
        }
    }

    /// Normalize a backend event; percent never moves backwards within a stage
    pub fn stamp(&mut self, event: &BackendProgress) -> SegmentProgress {
        let percent = if event.percent.is_finite() {
            event.percent.clamp(0.0, 100.0)
        } else {
            self.last_percent
        };
        self.last_percent = self.last_percent.max(percent);

        // Backends divide by encode speed, so a stalled encoder reports inf
        let stage_eta = event.eta_seconds.filter(|eta| eta.is_finite());
        let estimated_time = match (stage_eta, self.tail_eta) {
            (Some(stage_eta), Some(tail)) => Some(stage_eta.max(0.0) + tail),
            (Some(stage_eta), None) => Some(stage_eta.max(0.0)),
            (None, tail) => tail,
        }
        .filter(|eta| eta.is_finite());

        SegmentProgress {
            index: self.index,
            total: self.total,
            status: self.stage,
            progress: self.last_percent,
            estimated_time,
        }
    }
}

/// Mean job duration times jobs remaining
#[derive(Debug, Clone, Default)]
pub struct EtaEstimator {
    finished: u32,
    elapsed: Duration,
}

impl EtaEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, job_elapsed: Duration) {
        self.finished += 1;
        self.elapsed += job_elapsed;
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.finished == 0 {
            None
        } else {
            Some(self.elapsed / self.finished)
        }
    }

    /// Seconds left for `remaining_jobs`; unknown until a job has finished
    pub fn remaining(&self, remaining_jobs: usize) -> Option<f64> {
        self.mean()
            .map(|mean| mean.as_secs_f64() * remaining_jobs as f64)
    }
}

/// Terminal snapshot for a job
pub fn terminal(index: usize, total: usize, success: bool, estimated_time: Option<f64>) -> SegmentProgress {
    SegmentProgress {
        index,
        total,
        status: if success {
            JobStage::Completed
        } else {
            JobStage::Failed
        },
        progress: if success { 100.0 } else { 0.0 },
        estimated_time,
    }
}
