//! Project files describing a whole session (source, segments, settings)
//!
//! Format is picked from the extension: `.toml`, `.json`, `.yaml`/`.yml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::{NewSegment, SettingsPatch, TimeSpec};
use crate::error::{EdditError, EdditResult};

/// A segment entry; times accept seconds or `[HH:]MM:SS(.ms)` strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSegment {
    pub start: TimeValue,
    pub end: TimeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<PathBuf>,
}

/// Time given either as a number of seconds or as a time string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl TimeValue {
    pub fn seconds(&self) -> EdditResult<f64> {
        match self {
            TimeValue::Seconds(s) => Ok(*s),
            TimeValue::Text(text) => TimeSpec::parse(text)
                .map(|t| t.as_seconds())
                .map_err(|_| EdditError::InvalidTimeFormat { time: text.clone() }),
        }
    }
}

/// Session description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub settings: SettingsPatch,
    #[serde(default)]
    pub segments: Vec<ProjectSegment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFormat {
    Toml,
    Json,
    Yaml,
}

impl ProjectFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "toml" => Some(ProjectFormat::Toml),
            "json" => Some(ProjectFormat::Json),
            "yaml" | "yml" => Some(ProjectFormat::Yaml),
            _ => None,
        }
    }
}

impl ProjectFile {
    /// Parse content in the given format
    pub fn parse(content: &str, format: ProjectFormat) -> EdditResult<Self> {
        let project = match format {
            ProjectFormat::Toml => toml::from_str(content)?,
            ProjectFormat::Json => serde_json::from_str(content)?,
            ProjectFormat::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(project)
    }

    /// Load a project file; relative paths inside it resolve against its directory
    pub fn load(path: &Path) -> EdditResult<Self> {
        let format = ProjectFormat::from_path(path).ok_or_else(|| EdditError::ProjectError {
            path: path.display().to_string(),
            message: "unsupported extension (expected .toml, .json, .yaml or .yml)".to_string(),
        })?;

        let content = std::fs::read_to_string(path)?;
        let mut project = Self::parse(&content, format)?;
        if let Some(base) = path.parent() {
            project.resolve_relative_to(base);
        }
        debug!(
            path = %path.display(),
            segments = project.segments.len(),
            "Loaded project file"
        );
        Ok(project)
    }

    /// Segments ready for the store, in file order
    pub fn new_segments(&self) -> EdditResult<Vec<NewSegment>> {
        self.segments
            .iter()
            .map(|entry| {
                Ok(NewSegment {
                    start_time: entry.start.seconds()?,
                    end_time: entry.end.seconds()?,
                    intro_path: entry.intro.clone(),
                    output_name: entry.name.clone(),
                })
            })
            .collect()
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(source) = self.source.as_mut() {
            resolve(source);
        }
        if let Some(dir) = self.output_dir.as_mut() {
            resolve(dir);
        }
        for segment in &mut self.segments {
            if let Some(intro) = segment.intro.as_mut() {
                resolve(intro);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Codec, Preset};

    #[test]
    fn test_parse_toml_project() {
        let project = ProjectFile::parse(
            r#"
            source = "match.mp4"
            output_dir = "clips"

            [settings]
            quality = 20
            preset = "slow"

            [[segments]]
            start = 0
            end = "00:05"
            name = "Kickoff"

            [[segments]]
            start = "1:10.5"
            end = 75.0
            intro = "intro.mp4"
            "#,
            ProjectFormat::Toml,
        )
        .unwrap();

        assert_eq!(project.settings.quality, Some(20));
        assert_eq!(project.settings.preset, Some(Preset::Slow));
        let segments = project.new_segments().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end_time, 5.0);
        assert_eq!(segments[0].output_name.as_deref(), Some("Kickoff"));
        assert_eq!(segments[1].start_time, 70.5);
        assert_eq!(segments[1].intro_path, Some(PathBuf::from("intro.mp4")));
    }

    #[test]
    fn test_parse_json_and_yaml_projects() {
        let json = r#"{"segments": [{"start": 1, "end": 2}], "settings": {"codec": "libx265"}}"#;
        let project = ProjectFile::parse(json, ProjectFormat::Json).unwrap();
        assert_eq!(project.settings.codec, Some(Codec::Libx265));
        assert_eq!(project.new_segments().unwrap()[0].output_name, None);

        let yaml = "segments:\n  - start: \"0:30\"\n    end: 45\n    name: Save\n";
        let project = ProjectFile::parse(yaml, ProjectFormat::Yaml).unwrap();
        assert_eq!(project.new_segments().unwrap()[0].start_time, 30.0);
    }

    #[test]
    fn test_bad_time_string_is_reported() {
        let json = r#"{"segments": [{"start": "soon", "end": 2}]}"#;
        let project = ProjectFile::parse(json, ProjectFormat::Json).unwrap();
        assert!(matches!(
            project.new_segments(),
            Err(EdditError::InvalidTimeFormat { .. })
        ));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.yml");
        std::fs::write(
            &path,
            "source: in.mp4\noutput_dir: /abs/out\nsegments:\n  - {start: 0, end: 1, intro: intro.mp4}\n",
        )
        .unwrap();

        let project = ProjectFile::load(&path).unwrap();
        assert_eq!(project.source, Some(dir.path().join("in.mp4")));
        assert_eq!(project.output_dir, Some(PathBuf::from("/abs/out")));
        assert_eq!(project.segments[0].intro, Some(dir.path().join("intro.mp4")));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            ProjectFile::load(&path),
            Err(EdditError::ProjectError { .. })
        ));
    }
}
