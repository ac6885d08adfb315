// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::cancel::CancelToken;

/// Progress event as emitted by a media backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendProgress {
    pub job_index: usize,
    pub stage_label: String,
    /// 0-100 within the running stage
    pub percent: f64,
    pub eta_seconds: Option<f64>,
}

/// Channel end a backend pushes progress into
pub type ProgressSender = mpsc::UnboundedSender<BackendProgress>;

/// Per-stage context handed to every backend call
#[derive(Debug, Clone)]
pub struct StageContext {
    pub job_index: usize,
    pub stage: JobStage,
    pub cancel: CancelToken,
    progress: ProgressSender,
}

impl StageContext {
    pub fn new(job_index: usize, stage: JobStage, progress: ProgressSender, cancel: CancelToken) -> Self {
        Self {
            job_index,
            stage,
            cancel,
            progress,
        }
    }

    /// Report stage progress; dropped silently once the engine stopped listening
    pub fn report(&self, percent: f64, eta_seconds: Option<f64>) {
        let _ = self.progress.send(BackendProgress {
            job_index: self.job_index,
            stage_label: self.stage.label().to_string(),
            percent,
            eta_seconds,
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Handle to a media artifact produced by a backend stage
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRef {
    pub path: PathBuf,
    /// Media duration in seconds, when known
    pub duration: Option<f64>,
}

impl ArtifactRef {
    pub fn new(path: impl Into<PathBuf>, duration: Option<f64>) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

/// Port for the decode/encode/mux engine
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Fails with `BackendUnavailable` when the backend cannot be used at all
    async fn check_available(&self) -> Result<(), DomainError>;

    /// Extract `[start_time, end_time)` of the source
    async fn cut(
        &self,
        ctx: &StageContext,
        source_path: &Path,
        start_time: f64,
        end_time: f64,
    ) -> Result<ArtifactRef, DomainError>;

    /// Produce `intro + artifact`
    async fn prepend_intro(
        &self,
        ctx: &StageContext,
        artifact: &ArtifactRef,
        intro_path: &Path,
    ) -> Result<ArtifactRef, DomainError>;

    /// Re-encode with the given settings
    async fn compress(
        &self,
        ctx: &StageContext,
        artifact: &ArtifactRef,
        settings: &CompressionSettings,
    ) -> Result<ArtifactRef, DomainError>;

    /// Place the artifact at its final output path
    async fn write(
        &self,
        ctx: &StageContext,
        artifact: &ArtifactRef,
        output_path: &Path,
    ) -> Result<(), DomainError>;

    /// Best-effort removal of an intermediate artifact
    async fn discard(&self, _artifact: &ArtifactRef) {}
}

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Read duration, dimensions, frame rate and codec of a video file
    async fn probe(&self, file_path: &Path) -> Result<VideoMetadata, DomainError>;
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
