//! Execution engine: runs planned jobs against a media backend
//!
//! Jobs run strictly one after another. Each stage is awaited while the
//! stage's progress channel is drained, so observers see a single ordered
//! stream of snapshots for the whole run.

pub mod cancel;
pub mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::planner::{Job, JobPlan};
use crate::ports::{ArtifactRef, MediaBackend, StageContext};

use self::cancel::CancelToken;
use self::progress::{EtaEstimator, StageProgress};

/// Engine tuning knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Upper bound for a single backend stage
    pub stage_timeout: Option<Duration>,
    /// Attempts per stage when it times out
    pub stage_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stage_timeout: None,
            stage_attempts: 2,
        }
    }
}

/// How a run ended when it did not abort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Receives the engine's progress stream and terminal results
pub trait RunObserver: Send {
    fn on_progress(&mut self, progress: SegmentProgress);
    fn on_job_finished(&mut self, result: ProcessingResult);
}

#[derive(Debug, Clone, Copy)]
enum StageOp<'a> {
    Cut {
        source: &'a Path,
        start_time: f64,
        end_time: f64,
    },
    Intro {
        artifact: &'a ArtifactRef,
        intro: &'a Path,
    },
    Compress {
        artifact: &'a ArtifactRef,
        settings: &'a CompressionSettings,
    },
    Write {
        artifact: &'a ArtifactRef,
        output: &'a Path,
    },
}

impl StageOp<'_> {
    fn stage(&self) -> JobStage {
        match self {
            StageOp::Cut { .. } => JobStage::Cutting,
            StageOp::Intro { .. } => JobStage::AddingIntro,
            StageOp::Compress { .. } => JobStage::Compressing,
            StageOp::Write { .. } => JobStage::Writing,
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            StageOp::Cut { .. } => "Failed to cut segment",
            StageOp::Intro { .. } => "Failed to add intro",
            StageOp::Compress { .. } => "Failed to compress",
            StageOp::Write { .. } => "Failed to write output",
        }
    }
}

#[derive(Debug)]
enum JobFailure {
    /// Abandoned; the job is omitted from results
    Cancelled,
    /// Aborts the whole run
    Fatal(DomainError),
    /// Recorded as a failed result
    Failed(String),
}

/// Sequential job runner
pub struct ExecutionEngine {
    backend: Arc<dyn MediaBackend>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(backend: Arc<dyn MediaBackend>, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every job of `plan` in order.
    ///
    /// Per-job failures are reported through `observer` and do not stop the
    /// run. `Err` is returned only when the backend is unreachable when the
    /// first job starts.
    pub async fn run(
        &self,
        plan: &JobPlan,
        cancel: &CancelToken,
        observer: &mut dyn RunObserver,
    ) -> Result<RunOutcome, DomainError> {
        if plan.is_empty() {
            return Err(DomainError::NothingToProcess);
        }

        if let Err(e) = self.backend.check_available().await {
            error!(backend = self.backend.name(), error = %e, "Media backend unavailable");
            return Err(match e {
                DomainError::BackendUnavailable(_) => e,
                other => DomainError::BackendUnavailable(other.to_string()),
            });
        }

        let total = plan.total();
        let mut eta = EtaEstimator::new();
        info!(jobs = total, backend = self.backend.name(), "Starting run");

        for job in &plan.jobs {
            if cancel.is_cancelled() {
                info!(next_job = job.index, "Run cancelled before job start");
                return Ok(RunOutcome::Cancelled);
            }

            let remaining_after = total - job.index - 1;
            let started = Instant::now();
            let outcome = self
                .run_job(job, total, eta.remaining(remaining_after), cancel, observer)
                .await;

            match outcome {
                Ok(output_path) => {
                    eta.record(started.elapsed());
                    observer.on_progress(progress::terminal(
                        job.index,
                        total,
                        true,
                        eta.remaining(remaining_after),
                    ));
                    info!(job = job.index, output = %output_path.display(), "Job completed");
                    observer.on_job_finished(ProcessingResult::succeeded(
                        job.index,
                        job.segment_id,
                        &job.output_name,
                        output_path,
                    ));
                }
                Err(JobFailure::Failed(message)) => {
                    eta.record(started.elapsed());
                    observer.on_progress(progress::terminal(
                        job.index,
                        total,
                        false,
                        eta.remaining(remaining_after),
                    ));
                    warn!(job = job.index, error = %message, "Job failed");
                    observer.on_job_finished(ProcessingResult::failed(
                        job.index,
                        job.segment_id,
                        &job.output_name,
                        message,
                    ));
                }
                Err(JobFailure::Cancelled) => {
                    info!(job = job.index, "Job abandoned after cancellation");
                    return Ok(RunOutcome::Cancelled);
                }
                Err(JobFailure::Fatal(e)) => {
                    error!(job = job.index, error = %e, "Run aborted");
                    return Err(e);
                }
            }
        }

        info!(jobs = total, "Run completed");
        Ok(RunOutcome::Completed)
    }

    async fn run_job(
        &self,
        job: &Job,
        total: usize,
        tail_eta: Option<f64>,
        cancel: &CancelToken,
        observer: &mut dyn RunObserver,
    ) -> Result<PathBuf, JobFailure> {
        let mut intermediates = Vec::new();
        let result = self
            .run_job_stages(job, total, tail_eta, cancel, observer, &mut intermediates)
            .await;

        for artifact in &intermediates {
            self.backend.discard(artifact).await;
        }
        result
    }

    async fn run_job_stages(
        &self,
        job: &Job,
        total: usize,
        tail_eta: Option<f64>,
        cancel: &CancelToken,
        observer: &mut dyn RunObserver,
        intermediates: &mut Vec<ArtifactRef>,
    ) -> Result<PathBuf, JobFailure> {
        let cut = StageOp::Cut {
            source: job.source_path.as_path(),
            start_time: job.start_time,
            end_time: job.end_time,
        };
        let mut current = self
            .artifact_stage(job, total, tail_eta, cancel, observer, cut)
            .await?;
        intermediates.push(current.clone());
        checkpoint(cancel)?;

        if let Some(intro) = &job.intro_path {
            let op = StageOp::Intro {
                artifact: &current,
                intro: intro.as_path(),
            };
            let merged = self
                .artifact_stage(job, total, tail_eta, cancel, observer, op)
                .await?;
            intermediates.push(merged.clone());
            current = merged;
            checkpoint(cancel)?;
        }

        let op = StageOp::Compress {
            artifact: &current,
            settings: &job.settings,
        };
        let compressed = self
            .artifact_stage(job, total, tail_eta, cancel, observer, op)
            .await?;
        intermediates.push(compressed.clone());
        checkpoint(cancel)?;

        let op = StageOp::Write {
            artifact: &compressed,
            output: job.output_path.as_path(),
        };
        self.run_stage(job, total, tail_eta, cancel, observer, op)
            .await?;

        Ok(job.output_path.clone())
    }

    async fn artifact_stage(
        &self,
        job: &Job,
        total: usize,
        tail_eta: Option<f64>,
        cancel: &CancelToken,
        observer: &mut dyn RunObserver,
        op: StageOp<'_>,
    ) -> Result<ArtifactRef, JobFailure> {
        self.run_stage(job, total, tail_eta, cancel, observer, op)
            .await?
            .ok_or_else(|| {
                JobFailure::Failed(format!(
                    "{}: backend produced no artifact",
                    op.failure_prefix()
                ))
            })
    }

    /// Run one stage with timeout retries and classify its failure
    async fn run_stage(
        &self,
        job: &Job,
        total: usize,
        tail_eta: Option<f64>,
        cancel: &CancelToken,
        observer: &mut dyn RunObserver,
        op: StageOp<'_>,
    ) -> Result<Option<ArtifactRef>, JobFailure> {
        let stage = op.stage();
        let mut tracker = StageProgress::new(job.index, total, stage, tail_eta);
        observer.on_progress(tracker.started());

        let attempts = self.config.stage_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(job = job.index, %stage, attempt, "Stage started");
            let result = self
                .attempt_stage(job.index, op, cancel, &mut tracker, observer)
                .await;

            match result {
                Ok(output) => {
                    debug!(job = job.index, %stage, "Stage finished");
                    return Ok(output);
                }
                Err(DomainError::Cancelled) => return Err(JobFailure::Cancelled),
                // A child killed by the same interrupt reports an ordinary error
                Err(e) if cancel.is_cancelled() => {
                    debug!(job = job.index, %stage, error = %e, "Stage error after cancellation");
                    return Err(JobFailure::Cancelled);
                }
                Err(DomainError::Timeout(_)) if attempt < attempts => {
                    warn!(job = job.index, %stage, attempt, attempts, "Stage timed out, retrying");
                    attempt += 1;
                }
                Err(e @ DomainError::Timeout(_)) => {
                    return Err(JobFailure::Failed(format!(
                        "{}: {} after {} attempt(s)",
                        op.failure_prefix(),
                        e,
                        attempt
                    )));
                }
                Err(e) if e.is_fatal() && job.index == 0 && stage == JobStage::Cutting => {
                    return Err(JobFailure::Fatal(e));
                }
                Err(e) => {
                    return Err(JobFailure::Failed(format!("{}: {}", op.failure_prefix(), e)));
                }
            }
        }
    }

    /// One attempt: await the backend while forwarding its progress
    async fn attempt_stage(
        &self,
        job_index: usize,
        op: StageOp<'_>,
        cancel: &CancelToken,
        tracker: &mut StageProgress,
        observer: &mut dyn RunObserver,
    ) -> Result<Option<ArtifactRef>, DomainError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = StageContext::new(job_index, op.stage(), tx, cancel.clone());

        let work = self.invoke_with_timeout(&ctx, op);
        tokio::pin!(work);

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => observer.on_progress(tracker.stamp(&event)),
                result = &mut work => break result,
            }
        };

        while let Ok(event) = rx.try_recv() {
            observer.on_progress(tracker.stamp(&event));
        }
        result
    }

    async fn invoke_with_timeout(
        &self,
        ctx: &StageContext,
        op: StageOp<'_>,
    ) -> Result<Option<ArtifactRef>, DomainError> {
        match self.config.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, self.invoke(ctx, op))
                .await
                .unwrap_or_else(|_| {
                    Err(DomainError::Timeout(format!(
                        "{} exceeded {:.1}s",
                        ctx.stage,
                        limit.as_secs_f64()
                    )))
                }),
            None => self.invoke(ctx, op).await,
        }
    }

    async fn invoke(
        &self,
        ctx: &StageContext,
        op: StageOp<'_>,
    ) -> Result<Option<ArtifactRef>, DomainError> {
        match op {
            StageOp::Cut {
                source,
                start_time,
                end_time,
            } => self
                .backend
                .cut(ctx, source, start_time, end_time)
                .await
                .map(Some),
            StageOp::Intro { artifact, intro } => self
                .backend
                .prepend_intro(ctx, artifact, intro)
                .await
                .map(Some),
            StageOp::Compress { artifact, settings } => self
                .backend
                .compress(ctx, artifact, settings)
                .await
                .map(Some),
            StageOp::Write { artifact, output } => self
                .backend
                .write(ctx, artifact, output)
                .await
                .map(|_| None),
        }
    }
}

fn checkpoint(cancel: &CancelToken) -> Result<(), JobFailure> {
    if cancel.is_cancelled() {
        Err(JobFailure::Cancelled)
    } else {
        Ok(())
    }
}
