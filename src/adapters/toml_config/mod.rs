// TOML config adapter - Typed configuration loaded from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::{CompressionSettings, SettingsPatch};
use crate::domain::rules::{CollisionPolicy, SegmentNaming};
use crate::engine::EngineConfig;
use crate::error::{EdditError, EdditResult};
use crate::ports::LogLevel;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub ffmpeg: FfmpegConfig,
    pub engine: EngineSection,
    pub output: OutputSection,
    /// Defaults for compression settings; unset fields keep built-in defaults
    pub compression: SettingsPatch,
    pub logging: LoggingSection,
}

/// External binaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Encoder threads passed to ffmpeg
    pub threads: usize,
    pub audio_bitrate: String,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            threads: num_cpus::get(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Per-stage timeout in seconds; unset means no limit
    pub stage_timeout_secs: Option<u64>,
    pub stage_attempts: u32,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            stage_timeout_secs: None,
            stage_attempts: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Container extension without the dot
    pub container: String,
    pub collision_policy: CollisionPolicy,
    pub create_missing_dir: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            container: "mp4".to_string(),
            collision_policy: CollisionPolicy::Suffix,
            create_missing_dir: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), DomainError> {
        LogLevel::parse(&self.logging.level)?;

        if self.engine.stage_attempts == 0 {
            return Err(DomainError::BadArgs(
                "engine.stage_attempts must be at least 1".to_string(),
            ));
        }
        if self.engine.stage_timeout_secs == Some(0) {
            return Err(DomainError::BadArgs(
                "engine.stage_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let container = SegmentNaming::extension(&self.output.container);
        let bad_char = |c: char| matches!(c, '/' | '\\') || c.is_whitespace();
        if container.is_empty() || container.contains(bad_char) {
            return Err(DomainError::BadArgs(format!(
                "Invalid output container: '{}'",
                self.output.container
            )));
        }

        if self.ffmpeg.threads == 0 {
            return Err(DomainError::BadArgs(
                "ffmpeg.threads must be at least 1".to_string(),
            ));
        }

        self.compression_defaults().validate()
    }

    /// Built-in defaults with the `[compression]` section applied
    pub fn compression_defaults(&self) -> CompressionSettings {
        let mut settings = CompressionSettings::default();
        settings.apply(&self.compression);
        settings
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            stage_timeout: self.engine.stage_timeout_secs.map(Duration::from_secs),
            stage_attempts: self.engine.stage_attempts,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.logging.level).unwrap_or(LogLevel::Info)
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Per-user config file location
    pub fn default_path() -> Option<PathBuf> {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("eddit").join("config.toml"));
        }
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Some(PathBuf::from(appdata).join("eddit").join("config.toml"));
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config").join("eddit").join("config.toml"))
    }

    /// Files probed when no explicit path is given, in order
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("eddit.toml")];
        paths.extend(Self::default_path());
        paths
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> EdditResult<AppConfig> {
        let config: AppConfig = toml::from_str(content)?;
        config
            .validate()
            .map_err(|e| EdditError::config(e.to_string()))?;
        Ok(config)
    }

    /// Load config file
    pub fn load(path: &Path) -> EdditResult<AppConfig> {
        if !path.exists() {
            return Err(EdditError::config(format!(
                "Config file does not exist: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loaded config file");
        Self::parse(&content)
    }

    /// Load the first candidate file that exists
    pub fn load_first_available() -> EdditResult<Option<(PathBuf, AppConfig)>> {
        for path in Self::candidate_paths() {
            if path.is_file() {
                let config = Self::load(&path)?;
                return Ok(Some((path, config)));
            }
        }
        Ok(None)
    }

    /// Save config file, creating parent directories
    pub fn save(config: &AppConfig, path: &Path) -> EdditResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
