// Domain models - Core types and data structures

use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Create a new TimeSpec from hours, minutes, seconds, milliseconds
    pub fn from_components(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        let total_seconds = hours as f64 * 3600.0
            + minutes as f64 * 60.0
            + seconds as f64
            + milliseconds as f64 / 1000.0;
        Self {
            seconds: total_seconds,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse time string in various formats
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        // Plain seconds
        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() {
                return Err(DomainError::BadArgs("Time must be a finite number".to_string()));
            }
            if seconds < 0.0 {
                return Err(DomainError::BadArgs("Time cannot be negative".to_string()));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes = minutes
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs("Invalid minutes format".to_string()))?;
                let seconds = Self::parse_seconds_part(seconds)?;
                Ok(Self::from_seconds(minutes as f64 * 60.0 + seconds))
            }
            [hours, minutes, seconds] => {
                let hours = hours
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs("Invalid hours format".to_string()))?;
                let minutes = minutes
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs("Invalid minutes format".to_string()))?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
                }
                let seconds = Self::parse_seconds_part(seconds)?;
                Ok(Self::from_seconds(
                    hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
                ))
            }
            _ => Err(DomainError::BadArgs(
                "Invalid time format. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)".to_string(),
            )),
        }
    }

    fn parse_seconds_part(value: &str) -> Result<f64, DomainError> {
        let seconds = value
            .parse::<f64>()
            .map_err(|_| DomainError::BadArgs("Invalid seconds format".to_string()))?;
        if !(0.0..60.0).contains(&seconds) {
            return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
        }
        Ok(seconds)
    }

    /// Format as HH:MM:SS.mmm, dropping the hour field when zero
    pub fn format_hms(&self) -> String {
        let total_millis = (self.seconds * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Stable identifier of a segment, assigned once at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(Uuid);

impl SegmentId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex characters, used to disambiguate file names
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user-requested cut of the source video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_path: Option<PathBuf>,
    pub output_name: String,
}

impl Segment {
    /// Length of the segment in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Return a copy with the patch fields merged in
    pub fn merged(&self, patch: &SegmentPatch) -> Segment {
        let mut merged = self.clone();
        if let Some(start) = patch.start_time {
            merged.start_time = start;
        }
        if let Some(end) = patch.end_time {
            merged.end_time = end;
        }
        if let Some(intro) = &patch.intro_path {
            merged.intro_path = intro.clone();
        }
        if let Some(name) = &patch.output_name {
            merged.output_name = name.clone();
        }
        merged
    }
}

/// A segment that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub intro_path: Option<PathBuf>,
    /// Auto-generated (`Segment_<n>`) when absent
    pub output_name: Option<String>,
}

impl NewSegment {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
            intro_path: None,
            output_name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn with_intro(mut self, intro: impl Into<PathBuf>) -> Self {
        self.intro_path = Some(intro.into());
        self
    }
}

/// Partial update of a segment; `None` leaves a field untouched
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentPatch {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    /// `Some(None)` removes the intro
    pub intro_path: Option<Option<PathBuf>>,
    pub output_name: Option<String>,
}

impl SegmentPatch {
    pub fn start(mut self, start_time: f64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn end(mut self, end_time: f64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn intro(mut self, intro: Option<PathBuf>) -> Self {
        self.intro_path = Some(intro);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }
}

/// Encoder speed/efficiency trade-off, ordered fastest to slowest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    /// All presets, fastest first
    pub const ALL: [Preset; 9] = [
        Preset::Ultrafast,
        Preset::Superfast,
        Preset::Veryfast,
        Preset::Faster,
        Preset::Fast,
        Preset::Medium,
        Preset::Slow,
        Preset::Slower,
        Preset::Veryslow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }

    /// Parse preset name (case-insensitive)
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let lowered = value.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|preset| preset.as_str() == lowered)
            .ok_or_else(|| {
                DomainError::BadArgs(format!(
                    "Invalid preset: {}. Valid presets: {}",
                    value,
                    Self::ALL.map(|p| p.as_str()).join(", ")
                ))
            })
    }
}

impl FromStr for Preset {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported video encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Codec {
    #[serde(rename = "libx264")]
    Libx264,
    #[serde(rename = "libx265")]
    Libx265,
}

impl Codec {
    /// Encoder name as understood by ffmpeg
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Libx264 => "libx264",
            Codec::Libx265 => "libx265",
        }
    }

    /// Valid CRF values for this encoder
    pub fn quality_range(&self) -> RangeInclusive<u8> {
        match self {
            Codec::Libx264 => 0..=51,
            Codec::Libx265 => 0..=63,
        }
    }

    pub fn max_quality(&self) -> u8 {
        *self.quality_range().end()
    }

    /// Parse codec name, accepting common aliases
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "libx264" | "x264" | "h264" | "h.264" => Ok(Codec::Libx264),
            "libx265" | "x265" | "h265" | "h.265" | "hevc" => Ok(Codec::Libx265),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid codec: {}. Valid codecs: libx264, libx265",
                value
            ))),
        }
    }
}

impl FromStr for Codec {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global compression settings applied to every segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionSettings {
    /// CRF value; lower is better quality and larger output
    pub quality: u8,
    pub preset: Preset,
    pub codec: Codec,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            quality: 23,
            preset: Preset::Medium,
            codec: Codec::Libx264,
        }
    }
}

impl CompressionSettings {
    /// Shallow merge; quality is not re-clamped when the codec changes
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(quality) = patch.quality {
            self.quality = quality;
        }
        if let Some(preset) = patch.preset {
            self.preset = preset;
        }
        if let Some(codec) = patch.codec {
            self.codec = codec;
        }
    }

    /// Copy with quality clamped into the codec's range
    pub fn clamped(&self) -> Self {
        Self {
            quality: self.quality.min(self.codec.max_quality()),
            ..*self
        }
    }

    /// Check quality against the codec's range
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.codec.quality_range().contains(&self.quality) {
            return Err(DomainError::BadArgs(format!(
                "Quality {} is out of range for {} (0-{})",
                self.quality,
                self.codec,
                self.codec.max_quality()
            )));
        }
        Ok(())
    }
}

/// Partial update of the compression settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub quality: Option<u8>,
    #[serde(default)]
    pub preset: Option<Preset>,
    #[serde(default)]
    pub codec: Option<Codec>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.quality.is_none() && self.preset.is_none() && self.codec.is_none()
    }

    /// Fields of `other` take precedence over fields of `self`
    pub fn overridden_by(self, other: SettingsPatch) -> SettingsPatch {
        SettingsPatch {
            quality: other.quality.or(self.quality),
            preset: other.preset.or(self.preset),
            codec: other.codec.or(self.codec),
        }
    }
}

/// Read-only description of the loaded source video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
    pub codec: String,
}

/// Stage label carried by progress snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Cutting,
    AddingIntro,
    Compressing,
    Writing,
    Completed,
    Failed,
}

impl JobStage {
    pub fn label(&self) -> &'static str {
        match self {
            JobStage::Cutting => "cutting",
            JobStage::AddingIntro => "adding_intro",
            JobStage::Compressing => "compressing",
            JobStage::Writing => "writing",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        }
    }

    /// Whether the label marks the end of a job
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress snapshot of the job currently running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProgress {
    /// 0-based position of the running job
    pub index: usize,
    pub total: usize,
    pub status: JobStage,
    /// 0-100 within the current stage
    pub progress: f64,
    /// Seconds remaining, when known
    pub estimated_time: Option<f64>,
}

/// Terminal outcome of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub index: usize,
    pub segment_id: SegmentId,
    pub output_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProcessingResult {
    pub fn succeeded(
        index: usize,
        segment_id: SegmentId,
        output_name: impl Into<String>,
        output_path: PathBuf,
    ) -> Self {
        Self {
            index,
            segment_id,
            output_name: output_name.into(),
            success: true,
            output_path: Some(output_path),
            error_message: None,
        }
    }

    pub fn failed(
        index: usize,
        segment_id: SegmentId,
        output_name: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            segment_id,
            output_name: output_name.into(),
            success: false,
            output_path: None,
            error_message: Some(error_message.into()),
        }
    }
}
