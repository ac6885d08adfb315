//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::engine::cancel::CancelToken;

/// Lines of stderr kept for error messages
const STDERR_TAIL_LINES: usize = 8;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments before -i
    input_args: Vec<String>,
    /// Arguments after -i
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Output-side seek, frame accurate on the demuxed stream
    pub fn seek(self, seconds: f64) -> Self {
        self.output_arg("-ss").output_arg(format!("{:.3}", seconds))
    }

    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Stream copy of every stream
    pub fn copy_streams(self) -> Self {
        self.output_args(["-c", "copy"])
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    pub fn threads(self, threads: usize) -> Self {
        self.output_arg("-threads").output_arg(threads.to_string())
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-hide_banner", "-nostdin", "-v", "error", "-nostats"]
            .into_iter()
            .map(String::from)
            .collect();

        // Machine-readable progress on stdout
        args.push("-progress".to_string());
        args.push("pipe:1".to_string());

        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Progress block reported by `-progress`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    /// Output timestamp in microseconds
    pub out_time_us: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_us.max(0) as f64 / 1_000_000.0
    }

    /// Percent of `expected_secs` written so far
    pub fn percent(&self, expected_secs: Option<f64>) -> Option<f64> {
        if self.is_complete {
            return Some(100.0);
        }
        expected_secs
            .filter(|d| *d > 0.0)
            .map(|d| (self.out_time_secs() / d * 100.0).clamp(0.0, 100.0))
    }

    /// Seconds left at the current speed
    pub fn eta_seconds(&self, expected_secs: Option<f64>) -> Option<f64> {
        if self.is_complete {
            return Some(0.0);
        }
        let expected = expected_secs.filter(|d| *d > 0.0)?;
        if self.speed <= 0.0 {
            return None;
        }
        Some(((expected - self.out_time_secs()).max(0.0)) / self.speed)
    }
}

/// Parse a progress line from FFmpeg's -progress output.
///
/// Returns a snapshot at the end of each block.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms is microseconds too, an old ffmpeg naming bug
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_us = us;
            }
        }
        "speed" => {
            if let Some(speed) = value.trim().strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }
    None
}

/// Runs ffmpeg as a child process with progress parsing and cancellation
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    ffmpeg_path: PathBuf,
}

impl FfmpegRunner {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    /// Run to completion; the child is killed when cancelled or dropped
    pub async fn run<F>(
        &self,
        cmd: &FfmpegCommand,
        cancel: &CancelToken,
        mut on_progress: F,
    ) -> Result<(), DomainError>
    where
        F: FnMut(&FfmpegProgress) + Send,
    {
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.ffmpeg_path.display(), args.join(" "));

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: a terminal Ctrl-C reaches eddit only, which stops the child itself
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => DomainError::BackendUnavailable(
                    format!("cannot execute {}: {}", self.ffmpeg_path.display(), e),
                ),
                _ => DomainError::ProcessingError(format!("failed to spawn ffmpeg: {}", e)),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::InternalError("ffmpeg stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::InternalError("ffmpeg stderr not captured".to_string()))?;
        let stderr_task = tokio::spawn(collect_tail(stderr, STDERR_TAIL_LINES));

        let mut lines = BufReader::new(stdout).lines();
        let mut current = FfmpegProgress::default();
        let mut cancelled = false;
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(progress) = parse_progress_line(&line, &mut current) {
                            on_progress(&progress);
                        }
                    }
                    Ok(None) | Err(_) => break,
                },
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
            }
        }

        let status = if cancelled {
            None
        } else {
            tokio::select! {
                status = child.wait() => Some(status),
                _ = cancel.cancelled() => None,
            }
        };

        let Some(status) = status else {
            info!("FFmpeg cancelled, killing process");
            let _ = child.kill().await;
            stderr_task.abort();
            return Err(DomainError::Cancelled);
        };

        let status = status
            .map_err(|e| DomainError::ProcessingError(format!("failed to wait for ffmpeg: {}", e)))?;
        let tail = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            let detail = if tail.is_empty() {
                String::new()
            } else {
                format!(": {}", tail.join(" | "))
            };
            Err(DomainError::ProcessingError(format!(
                "ffmpeg exited with {}{}",
                status, detail
            )))
        }
    }
}

/// Keep the last `keep` non-empty lines of a stream
async fn collect_tail<R>(reader: R, keep: usize) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut tail = VecDeque::with_capacity(keep);
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if tail.len() == keep {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into_iter().collect()
}

/// Escape a path for an ffmpeg concat list entry
pub fn concat_entry(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', "'\\''"))
}
