//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::{Codec, NewSegment, Preset, SettingsPatch, TimeSpec};
use crate::error::{EdditError, EdditResult};

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Source, segments and settings shared by `plan` and `process`
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Input video file path (overrides the project's `source`)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory receiving the output files (overrides the project's `output_dir`)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Project file (.toml, .json, .yaml) describing the session
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Segment as START,END[,NAME[,INTRO]]; may be repeated
    #[arg(short, long = "segment", value_parser = parse_segment_spec)]
    pub segments: Vec<NewSegment>,

    /// Constant Rate Factor (0-51 for libx264, 0-63 for libx265)
    #[arg(short, long, value_parser = parse_quality)]
    pub quality: Option<u8>,

    /// Encoding preset
    #[arg(long)]
    pub preset: Option<Preset>,

    /// Video codec (libx264 or libx265)
    #[arg(long)]
    pub codec: Option<Codec>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl SessionArgs {
    pub fn settings_patch(&self) -> SettingsPatch {
        SettingsPatch {
            quality: self.quality,
            preset: self.preset,
            codec: self.codec,
        }
    }
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Per-stage timeout in seconds
    #[arg(long)]
    pub stage_timeout: Option<u64>,

    /// Create the output directory if it does not exist
    #[arg(long)]
    pub create_output_dir: bool,
}

fn parse_quality(value: &str) -> Result<u8, String> {
    clap_num::number_range(value, 0, 63)
}

/// Parse `START,END[,NAME[,INTRO]]`
pub fn parse_segment_spec(spec: &str) -> EdditResult<NewSegment> {
    let invalid = |message: &str| EdditError::InvalidSegmentSpec {
        spec: spec.to_string(),
        message: message.to_string(),
    };

    let mut parts = spec.splitn(4, ',').map(str::trim);
    let start = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| invalid("missing start time"))?;
    let end = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| invalid("missing end time"))?;

    let parse_time = |text: &str| {
        TimeSpec::parse(text)
            .map(|t| t.as_seconds())
            .map_err(|e| invalid(&e.to_string()))
    };
    let mut segment = NewSegment::new(parse_time(start)?, parse_time(end)?);

    if let Some(name) = parts.next().filter(|s| !s.is_empty()) {
        segment = segment.named(name);
    }
    if let Some(intro) = parts.next().filter(|s| !s.is_empty()) {
        segment = segment.with_intro(intro);
    }
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment_spec_minimal() {
        let segment = parse_segment_spec("0,5").unwrap();
        assert_eq!(segment.start_time, 0.0);
        assert_eq!(segment.end_time, 5.0);
        assert_eq!(segment.output_name, None);
        assert_eq!(segment.intro_path, None);
    }

    #[test]
    fn test_parse_segment_spec_full() {
        let segment = parse_segment_spec("1:00, 01:02:03.5, Goal, intro.mp4").unwrap();
        assert_eq!(segment.start_time, 60.0);
        assert_eq!(segment.end_time, 3723.5);
        assert_eq!(segment.output_name.as_deref(), Some("Goal"));
        assert_eq!(segment.intro_path, Some(PathBuf::from("intro.mp4")));
    }

    #[test]
    fn test_parse_segment_spec_errors() {
        assert!(matches!(
            parse_segment_spec("5"),
            Err(EdditError::InvalidSegmentSpec { .. })
        ));
        assert!(matches!(
            parse_segment_spec("a,b"),
            Err(EdditError::InvalidSegmentSpec { .. })
        ));
        assert!(matches!(
            parse_segment_spec(",3"),
            Err(EdditError::InvalidSegmentSpec { .. })
        ));
    }

    #[test]
    fn test_parse_quality_bounds() {
        assert_eq!(parse_quality("0").unwrap(), 0);
        assert_eq!(parse_quality("63").unwrap(), 63);
        assert!(parse_quality("64").is_err());
        assert!(parse_quality("x").is_err());
    }
}
