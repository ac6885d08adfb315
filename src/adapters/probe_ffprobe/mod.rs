//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json -show_format -show_streams` and maps
//! the first video stream onto [`VideoMetadata`].

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    ffprobe_path: PathBuf,
}

impl FfprobeAdapter {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Map raw ffprobe JSON onto video metadata
    pub fn parse_probe_output(stdout: &[u8]) -> Result<VideoMetadata, DomainError> {
        let output: ProbeOutput = serde_json::from_slice(stdout)
            .map_err(|e| DomainError::ProbeFail(format!("invalid ffprobe output: {}", e)))?;

        let video = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| DomainError::ProbeFail("no video stream found".to_string()))?;

        let duration = output
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .or(video.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| DomainError::ProbeFail("no duration found".to_string()))?;

        let width = video
            .width
            .ok_or_else(|| DomainError::ProbeFail("no width found".to_string()))?;
        let height = video
            .height
            .ok_or_else(|| DomainError::ProbeFail("no height found".to_string()))?;

        let framerate = video
            .r_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| video.avg_frame_rate.as_deref().and_then(parse_frame_rate))
            .ok_or_else(|| DomainError::ProbeFail("no frame rate found".to_string()))?;

        Ok(VideoMetadata {
            duration,
            width,
            height,
            framerate,
            codec: video
                .codec_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// Parse "num/den" or a plain number
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, file_path: &Path) -> Result<VideoMetadata, DomainError> {
        if !file_path.is_file() {
            return Err(DomainError::FileNotFound(file_path.display().to_string()));
        }

        debug!(path = %file_path.display(), "Probing media file");
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(file_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DomainError::ProbeFail(format!(
                    "failed to run {}: {}",
                    self.ffprobe_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(DomainError::ProbeFail(format!(
                "ffprobe exited with {} for {}",
                output.status,
                file_path.display()
            )));
        }

        Self::parse_probe_output(&output.stdout)
    }
}
