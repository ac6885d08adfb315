//! FFmpeg execution adapter
//!
//! Drives the `ffmpeg` executable as a child process. Intermediate files
//! live in a private temporary directory that is removed with the backend.

pub mod command;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapters::toml_config::FfmpegConfig;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::SegmentNaming;
use crate::ports::*;

use self::command::{concat_entry, FfmpegCommand, FfmpegProgress, FfmpegRunner};

/// FFmpeg-based media backend
pub struct FfmpegBackend {
    runner: FfmpegRunner,
    threads: usize,
    audio_bitrate: String,
    container_ext: String,
    work_dir: TempDir,
    prober: Option<Arc<dyn ProbePort>>,
}

impl FfmpegBackend {
    /// Create the backend and its scratch directory
    pub fn new(config: &FfmpegConfig, container_ext: &str) -> Result<Self, DomainError> {
        let work_dir = tempfile::Builder::new()
            .prefix("eddit-")
            .tempdir()
            .map_err(|e| DomainError::FsFail(format!("failed to create work directory: {}", e)))?;
        debug!(work_dir = %work_dir.path().display(), "FFmpeg backend work directory");

        Ok(Self {
            runner: FfmpegRunner::new(&config.ffmpeg_path),
            threads: config.threads.max(1),
            audio_bitrate: config.audio_bitrate.clone(),
            container_ext: SegmentNaming::extension(container_ext),
            work_dir,
            prober: None,
        })
    }

    /// Use a prober to learn intro durations for progress reporting
    pub fn with_prober(mut self, prober: Arc<dyn ProbePort>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    fn scratch_path(&self, job_index: usize, label: &str, ext: &str) -> PathBuf {
        self.work_dir.path().join(format!(
            "job{:03}_{}_{}.{}",
            job_index + 1,
            label,
            Uuid::new_v4().simple(),
            ext
        ))
    }

    /// Run with progress scaled against `expected_secs`
    async fn run_reporting(
        &self,
        ctx: &StageContext,
        cmd: &FfmpegCommand,
        expected_secs: Option<f64>,
    ) -> Result<(), DomainError> {
        let result = self
            .runner
            .run(cmd, &ctx.cancel, |progress: &FfmpegProgress| {
                if let Some(percent) = progress.percent(expected_secs) {
                    ctx.report(percent, progress.eta_seconds(expected_secs));
                }
            })
            .await;

        if result.is_err() {
            remove_quietly(cmd.output_path()).await;
        }
        result
    }

    async fn intro_duration(&self, intro_path: &Path) -> Option<f64> {
        let prober = self.prober.as_ref()?;
        match prober.probe(intro_path).await {
            Ok(metadata) => Some(metadata.duration),
            Err(e) => {
                debug!(intro = %intro_path.display(), error = %e, "Intro duration unknown");
                None
            }
        }
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn check_available(&self) -> Result<(), DomainError> {
        let path = which::which(self.runner.ffmpeg_path()).map_err(|e| {
            DomainError::BackendUnavailable(format!(
                "{} not found: {}",
                self.runner.ffmpeg_path().display(),
                e
            ))
        })?;

        let status = Command::new(&path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| DomainError::BackendUnavailable(format!("{}: {}", path.display(), e)))?;

        if !status.success() {
            return Err(DomainError::BackendUnavailable(format!(
                "{} -version exited with {}",
                path.display(),
                status
            )));
        }
        debug!(ffmpeg = %path.display(), "FFmpeg available");
        Ok(())
    }

    async fn cut(
        &self,
        ctx: &StageContext,
        source_path: &Path,
        start_time: f64,
        end_time: f64,
    ) -> Result<ArtifactRef, DomainError> {
        if !source_path.is_file() {
            return Err(DomainError::FileNotFound(source_path.display().to_string()));
        }

        let duration = end_time - start_time;
        let output = self.scratch_path(ctx.job_index, "cut", &self.container_ext);
        let cmd = FfmpegCommand::new(source_path, &output)
            .seek(start_time)
            .duration(duration)
            .copy_streams()
            .output_args(["-avoid_negative_ts", "make_zero"]);

        self.run_reporting(ctx, &cmd, Some(duration)).await?;
        Ok(ArtifactRef::new(output, Some(duration)))
    }

    async fn prepend_intro(
        &self,
        ctx: &StageContext,
        artifact: &ArtifactRef,
        intro_path: &Path,
    ) -> Result<ArtifactRef, DomainError> {
        if !intro_path.is_file() {
            return Err(DomainError::FileNotFound(intro_path.display().to_string()));
        }

        let list_path = self.scratch_path(ctx.job_index, "concat", "txt");
        let list = format!("{}\n{}\n", concat_entry(intro_path), concat_entry(&artifact.path));
        tokio::fs::write(&list_path, list)
            .await
            .map_err(|e| DomainError::FsFail(format!("failed to write concat list: {}", e)))?;

        let total = match (self.intro_duration(intro_path).await, artifact.duration) {
            (Some(intro), Some(body)) => Some(intro + body),
            _ => None,
        };
        let output = self.scratch_path(ctx.job_index, "intro", &self.container_ext);
        let cmd = FfmpegCommand::new(&list_path, &output)
            .input_args(["-f", "concat", "-safe", "0"])
            .copy_streams();

        let result = self.run_reporting(ctx, &cmd, total).await;
        remove_quietly(&list_path).await;
        result?;
        Ok(ArtifactRef::new(output, total))
    }

    async fn compress(
        &self,
        ctx: &StageContext,
        artifact: &ArtifactRef,
        settings: &CompressionSettings,
    ) -> Result<ArtifactRef, DomainError> {
        let output = self.scratch_path(ctx.job_index, "encoded", &self.container_ext);
        let mut cmd = FfmpegCommand::new(&artifact.path, &output)
            .video_codec(settings.codec.as_str())
            .preset(settings.preset.as_str())
            .crf(settings.quality);
        if settings.codec == Codec::Libx265 {
            cmd = cmd.output_args(["-tag:v", "hvc1"]);
        }
        cmd = cmd
            .audio_codec("aac")
            .audio_bitrate(self.audio_bitrate.clone())
            .threads(self.threads);
        if matches!(self.container_ext.as_str(), "mp4" | "mov" | "m4v") {
            cmd = cmd.output_args(["-movflags", "+faststart"]);
        }

        self.run_reporting(ctx, &cmd, artifact.duration).await?;
        Ok(ArtifactRef::new(output, artifact.duration))
    }

    async fn write(
        &self,
        ctx: &StageContext,
        artifact: &ArtifactRef,
        output_path: &Path,
    ) -> Result<(), DomainError> {
        ctx.report(0.0, None);
        if tokio::fs::rename(&artifact.path, output_path).await.is_err() {
            // Rename fails across file systems
            tokio::fs::copy(&artifact.path, output_path)
                .await
                .map_err(|e| {
                    DomainError::FsFail(format!("{}: {}", output_path.display(), e))
                })?;
            remove_quietly(&artifact.path).await;
        }
        ctx.report(100.0, Some(0.0));
        Ok(())
    }

    async fn discard(&self, artifact: &ArtifactRef) {
        remove_quietly(&artifact.path).await;
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed intermediate"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove intermediate"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cancel::CancelToken;
    use tokio::sync::mpsc;

    fn backend() -> FfmpegBackend {
        let config = FfmpegConfig {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg-binary"),
            ..FfmpegConfig::default()
        };
        FfmpegBackend::new(&config, ".mp4").unwrap()
    }

    fn ctx(stage: JobStage) -> (StageContext, mpsc::UnboundedReceiver<BackendProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (StageContext::new(0, stage, tx, CancelToken::never()), rx)
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let result = backend().check_available().await;
        assert!(matches!(result, Err(DomainError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cut_rejects_missing_source() {
        let (ctx, _rx) = ctx(JobStage::Cutting);
        let result = backend()
            .cut(&ctx, Path::new("/definitely/not/here.mp4"), 0.0, 1.0)
            .await;
        assert!(matches!(result, Err(DomainError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_write_moves_artifact_and_reports() {
        let backend = backend();
        let out_dir = tempfile::tempdir().unwrap();
        let scratch = backend.scratch_path(0, "encoded", "mp4");
        tokio::fs::write(&scratch, b"video").await.unwrap();

        let (ctx, mut rx) = ctx(JobStage::Writing);
        let target = out_dir.path().join("A.mp4");
        backend
            .write(&ctx, &ArtifactRef::new(&scratch, None), &target)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"video");
        assert!(!scratch.exists());
        assert_eq!(rx.recv().await.unwrap().percent, 0.0);
        assert_eq!(rx.recv().await.unwrap().percent, 100.0);
    }

    #[tokio::test]
    async fn test_discard_ignores_missing_files() {
        let backend = backend();
        backend
            .discard(&ArtifactRef::new(backend.work_dir().join("gone.mp4"), None))
            .await;
    }

    #[test]
    fn test_scratch_paths_are_unique() {
        let backend = backend();
        let a = backend.scratch_path(0, "cut", "mp4");
        let b = backend.scratch_path(0, "cut", "mp4");
        assert_ne!(a, b);
        assert!(a.starts_with(backend.work_dir()));
        assert!(a.to_string_lossy().ends_with(".mp4"));
    }
}
