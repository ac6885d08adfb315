// Process interactor - Plans a session and runs it in the background

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::domain::errors::*;
use crate::domain::model::SegmentProgress;
use crate::engine::cancel::{self, CancelHandle};
use crate::engine::{EngineConfig, ExecutionEngine};
use crate::output::{ResultAggregator, RunReport};
use crate::planner::{JobPlan, JobPlanner};
use crate::ports::MediaBackend;
use crate::store::StoreSnapshot;

/// Everything needed to start a run
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    pub snapshot: StoreSnapshot,
    /// Create `output_dir` instead of rejecting a missing one
    pub create_output_dir: bool,
}

/// A run in progress
pub struct RunHandle {
    latest: watch::Receiver<Option<SegmentProgress>>,
    cancel: CancelHandle,
    task: JoinHandle<Result<RunReport, DomainError>>,
}

impl RunHandle {
    /// Most recent progress snapshot, if any was emitted yet
    pub fn latest(&self) -> Option<SegmentProgress> {
        self.latest.borrow().clone()
    }

    /// Wait for the next snapshot; `None` once the run has stopped emitting
    pub async fn changed(&mut self) -> Option<SegmentProgress> {
        self.latest.changed().await.ok()?;
        self.latest.borrow_and_update().clone()
    }

    /// Request cancellation; the current stage is abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the run to end and take its report
    pub async fn finish(self) -> Result<RunReport, DomainError> {
        self.task
            .await
            .map_err(|e| DomainError::InternalError(format!("run task failed: {}", e)))?
    }
}

/// Interactor for processing all segments of a session
pub struct ProcessInteractor {
    engine: Arc<ExecutionEngine>,
    planner: JobPlanner,
}

impl ProcessInteractor {
    /// Create new process interactor with injected ports
    pub fn new(backend: Arc<dyn MediaBackend>, planner: JobPlanner, config: EngineConfig) -> Self {
        Self {
            engine: Arc::new(ExecutionEngine::new(backend, config)),
            planner,
        }
    }

    pub fn planner(&self) -> &JobPlanner {
        &self.planner
    }

    /// Turn the request into jobs without touching the file system
    pub fn plan(&self, request: &ProcessRequest) -> Result<JobPlan, DomainError> {
        self.planner
            .plan(&request.source_path, &request.snapshot, &request.output_dir)
    }

    /// Plan, check the output directory and start the run in the background.
    ///
    /// Nothing is started when planning or the directory check fails.
    #[instrument(skip(self, request, on_progress), fields(source = %request.source_path.display()))]
    pub async fn start<F>(&self, request: ProcessRequest, on_progress: F) -> Result<RunHandle, DomainError>
    where
        F: FnMut(&SegmentProgress) + Send + 'static,
    {
        let plan = self.plan(&request)?;
        ensure_output_dir(&request).await?;

        let (cancel, token) = cancel::channel();
        let (mut aggregator, latest) = ResultAggregator::new(plan.total(), on_progress);
        let engine = Arc::clone(&self.engine);

        info!(jobs = plan.total(), output_dir = %request.output_dir.display(), "Processing started");
        let task = tokio::spawn(async move {
            let outcome = engine.run(&plan, &token, &mut aggregator).await?;
            Ok(aggregator.finish(outcome))
        });

        Ok(RunHandle {
            latest,
            cancel,
            task,
        })
    }

    /// Start a run and wait for it to finish
    pub async fn plan_and_run<F>(&self, request: ProcessRequest, on_progress: F) -> Result<RunReport, DomainError>
    where
        F: FnMut(&SegmentProgress) + Send + 'static,
    {
        self.start(request, on_progress).await?.finish().await
    }
}

async fn ensure_output_dir(request: &ProcessRequest) -> Result<(), DomainError> {
    let dir = &request.output_dir;
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DomainError::OutputDirectoryMissing(format!(
            "{} is not a directory",
            dir.display()
        ))),
        Err(_) if request.create_output_dir => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| DomainError::FsFail(format!("{}: {}", dir.display(), e)))?;
            debug!(dir = %dir.display(), "Created output directory");
            Ok(())
        }
        Err(_) => Err(DomainError::OutputDirectoryMissing(dir.display().to_string())),
    }
}
