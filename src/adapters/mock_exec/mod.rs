//! Deterministic in-memory media backend
//!
//! Produces virtual artifacts, records every call and can be told to fail,
//! hang or stall at specific (job, stage) pairs.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// One recorded backend invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub job_index: usize,
    pub stage: JobStage,
}

/// Scriptable backend for tests and dry runs
#[derive(Debug, Default)]
pub struct MockBackend {
    unavailable: bool,
    unavailable_on_cut: bool,
    failures: HashMap<(usize, JobStage), DomainError>,
    hangs: HashSet<(usize, JobStage)>,
    stalls: Mutex<HashMap<(usize, JobStage), u32>>,
    calls: Mutex<Vec<BackendCall>>,
    written: Mutex<Vec<PathBuf>>,
    discarded: Mutex<Vec<PathBuf>>,
}

impl MockBackend {
    /// Backend where every stage succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// `check_available` fails
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Preflight passes but every cut reports the backend as unreachable
    pub fn unavailable_on_cut(mut self) -> Self {
        self.unavailable_on_cut = true;
        self
    }

    /// Fail `stage` of job `job_index` with a processing error
    pub fn fail_at(self, job_index: usize, stage: JobStage, message: impl Into<String>) -> Self {
        self.fail_with(job_index, stage, DomainError::ProcessingError(message.into()))
    }

    pub fn fail_with(mut self, job_index: usize, stage: JobStage, error: DomainError) -> Self {
        self.failures.insert((job_index, stage), error);
        self
    }

    /// Block `stage` of job `job_index` until cancellation is requested
    pub fn hang_until_cancelled(mut self, job_index: usize, stage: JobStage) -> Self {
        self.hangs.insert((job_index, stage));
        self
    }

    /// The first `attempts` invocations of the stage never finish on their own
    pub fn stall(self, job_index: usize, stage: JobStage, attempts: u32) -> Self {
        lock(&self.stalls).insert((job_index, stage), attempts);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_for(&self, job_index: usize) -> Vec<JobStage> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.job_index == job_index)
            .map(|c| c.stage)
            .collect()
    }

    /// Output paths passed to successful writes
    pub fn written(&self) -> Vec<PathBuf> {
        lock(&self.written).clone()
    }

    pub fn discarded(&self) -> Vec<PathBuf> {
        lock(&self.discarded).clone()
    }

    async fn perform(&self, ctx: &StageContext) -> Result<(), DomainError> {
        let key = (ctx.job_index, ctx.stage);
        lock(&self.calls).push(BackendCall {
            job_index: ctx.job_index,
            stage: ctx.stage,
        });

        if self.hangs.contains(&key) {
            ctx.report(10.0, None);
            ctx.cancel.cancelled().await;
            return Err(DomainError::Cancelled);
        }

        let stalled = {
            let mut stalls = lock(&self.stalls);
            match stalls.get_mut(&key) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        ctx.report(50.0, Some(0.5));
        if let Some(error) = self.failures.get(&key) {
            return Err(error.clone());
        }
        ctx.report(100.0, Some(0.0));
        Ok(())
    }

    fn artifact(ctx: &StageContext, duration: Option<f64>) -> ArtifactRef {
        ArtifactRef::new(
            format!("mock://job{}/{}", ctx.job_index, ctx.stage.label()),
            duration,
        )
    }
}

#[async_trait]
impl MediaBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable {
            Err(DomainError::BackendUnavailable("mock backend offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn cut(
        &self,
        ctx: &StageContext,
        _source_path: &Path,
        start_time: f64,
        end_time: f64,
    ) -> Result<ArtifactRef, DomainError> {
        if self.unavailable_on_cut {
            lock(&self.calls).push(BackendCall {
                job_index: ctx.job_index,
                stage: ctx.stage,
            });
            return Err(DomainError::BackendUnavailable("mock backend went away".to_string()));
        }
        self.perform(ctx).await?;
        Ok(Self::artifact(ctx, Some(end_time - start_time)))
    }

    async fn prepend_intro(
        &self,
        ctx: &StageContext,
        artifact: &ArtifactRef,
        _intro_path: &Path,
    ) -> Result<ArtifactRef, DomainError> {
        self.perform(ctx).await?;
        Ok(Self::artifact(ctx, artifact.duration))
    }

    async fn compress(
        &self,
        ctx: &StageContext,
        artifact: &ArtifactRef,
        _settings: &CompressionSettings,
    ) -> Result<ArtifactRef, DomainError> {
        self.perform(ctx).await?;
        Ok(Self::artifact(ctx, artifact.duration))
    }

    async fn write(
        &self,
        ctx: &StageContext,
        _artifact: &ArtifactRef,
        output_path: &Path,
    ) -> Result<(), DomainError> {
        self.perform(ctx).await?;
        lock(&self.written).push(output_path.to_path_buf());
        Ok(())
    }

    async fn discard(&self, artifact: &ArtifactRef) {
        lock(&self.discarded).push(artifact.path.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
