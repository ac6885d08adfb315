//! Configuration initialization and hierarchy management

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::adapters::toml_config::{AppConfig, TomlConfigAdapter};
use crate::domain::model::{Codec, Preset};
use crate::domain::rules::CollisionPolicy;
use crate::error::{EdditError, EdditResult};

/// Values given on the command line that take precedence over everything else
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub json_logs: bool,
    pub stage_timeout_secs: Option<u64>,
    pub create_output_dir: bool,
}

/// Resolved configuration plus where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
    pub env_overrides: usize,
}

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> EdditResult<LoadedConfig> {
    let (source, mut config) = match config_path {
        Some(path) => (Some(path.to_path_buf()), TomlConfigAdapter::load(path)?),
        None => match TomlConfigAdapter::load_first_available()? {
            Some((path, config)) => (Some(path), config),
            None => (None, AppConfig::default()),
        },
    };

    let env_overrides = apply_environment_overrides(&mut config, utf8_vars(std::env::vars_os()))?;
    apply_cli_overrides(&mut config, overrides);

    config
        .validate()
        .map_err(|e| EdditError::config(e.to_string()))?;

    Ok(LoadedConfig {
        config,
        source,
        env_overrides,
    })
}

/// Keep the variables whose name and value are both valid UTF-8
pub fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Apply `EDDIT_*` variables; returns how many were used
pub fn apply_environment_overrides<I>(config: &mut AppConfig, vars: I) -> EdditResult<usize>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = 0;
    for (key, value) in vars {
        let Some(name) = key.strip_prefix("EDDIT_") else {
            continue;
        };
        let value = value.trim();
        match name {
            "LOG_LEVEL" => config.logging.level = value.to_string(),
            "JSON_LOGS" => config.logging.json = parse_bool(&key, value)?,
            "FFMPEG_PATH" => config.ffmpeg.ffmpeg_path = PathBuf::from(value),
            "FFPROBE_PATH" => config.ffmpeg.ffprobe_path = PathBuf::from(value),
            "THREADS" => config.ffmpeg.threads = parse_number(&key, value)?,
            "STAGE_TIMEOUT" => config.engine.stage_timeout_secs = Some(parse_number(&key, value)?),
            "STAGE_ATTEMPTS" => config.engine.stage_attempts = parse_number(&key, value)?,
            "CONTAINER" => config.output.container = value.to_string(),
            "COLLISION_POLICY" => {
                config.output.collision_policy = value
                    .parse::<CollisionPolicy>()
                    .map_err(|e| EdditError::config(format!("{}: {}", key, e)))?
            }
            "CREATE_OUTPUT_DIR" => config.output.create_missing_dir = parse_bool(&key, value)?,
            "QUALITY" => config.compression.quality = Some(parse_number(&key, value)?),
            "PRESET" => {
                config.compression.preset = Some(
                    Preset::parse(value).map_err(|e| EdditError::config(format!("{}: {}", key, e)))?,
                )
            }
            "CODEC" => {
                config.compression.codec = Some(
                    Codec::parse(value).map_err(|e| EdditError::config(format!("{}: {}", key, e)))?,
                )
            }
            _ => continue,
        }
        applied += 1;
    }
    Ok(applied)
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(level) = &overrides.log_level {
        config.logging.level = level.clone();
    }
    if overrides.json_logs {
        config.logging.json = true;
    }
    if let Some(timeout) = overrides.stage_timeout_secs {
        config.engine.stage_timeout_secs = Some(timeout);
    }
    if overrides.create_output_dir {
        config.output.create_missing_dir = true;
    }
}

fn parse_bool(key: &str, value: &str) -> EdditResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EdditError::config(format!(
            "{}: expected a boolean, got '{}'",
            key, value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> EdditResult<T> {
    value
        .parse::<T>()
        .map_err(|_| EdditError::config(format!("{}: expected a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_environment_overrides_apply() {
        let mut config = AppConfig::default();
        let applied = apply_environment_overrides(
            &mut config,
            vars(&[
                ("EDDIT_LOG_LEVEL", "debug"),
                ("EDDIT_STAGE_TIMEOUT", "45"),
                ("EDDIT_CODEC", "hevc"),
                ("EDDIT_COLLISION_POLICY", "error"),
                ("EDDIT_CREATE_OUTPUT_DIR", "yes"),
                ("PATH", "/usr/bin"),
                ("EDDIT_UNKNOWN", "ignored"),
            ]),
        )
        .unwrap();

        assert_eq!(applied, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.engine.stage_timeout_secs, Some(45));
        assert_eq!(config.compression.codec, Some(Codec::Libx265));
        assert_eq!(config.output.collision_policy, CollisionPolicy::Error);
        assert!(config.output.create_missing_dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let raw = vec![
            (OsString::from("JUNK"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from_vec(b"EDDIT_\xff".to_vec()), OsString::from("x")),
            (OsString::from("EDDIT_PRESET"), OsString::from_vec(vec![b's', 0xff])),
            (OsString::from("EDDIT_LOG_LEVEL"), OsString::from("debug")),
        ];

        let mut config = AppConfig::default();
        assert_eq!(apply_environment_overrides(&mut config, utf8_vars(raw)).unwrap(), 1);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.compression.preset, None);
    }

    #[test]
    fn test_environment_override_rejects_garbage() {
        let mut config = AppConfig::default();
        assert!(apply_environment_overrides(&mut config, vars(&[("EDDIT_THREADS", "many")])).is_err());
        assert!(apply_environment_overrides(&mut config, vars(&[("EDDIT_JSON_LOGS", "maybe")])).is_err());
    }

    #[test]
    fn test_cli_overrides_win_over_environment() {
        let mut config = AppConfig::default();
        apply_environment_overrides(
            &mut config,
            vars(&[("EDDIT_LOG_LEVEL", "debug"), ("EDDIT_STAGE_TIMEOUT", "45")]),
        )
        .unwrap();
        apply_cli_overrides(
            &mut config,
            &CliOverrides {
                log_level: Some("warn".to_string()),
                stage_timeout_secs: Some(10),
                ..Default::default()
            },
        );

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.engine.stage_timeout_secs, Some(10));
        assert!(!config.logging.json);
    }

    #[test]
    fn test_explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eddit.toml");
        std::fs::write(&path, "[output]\ncontainer = \"mkv\"\n").unwrap();

        let loaded =
            initialize_configuration_hierarchy(Some(&path), &CliOverrides::default()).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.output.container, "mkv");
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(initialize_configuration_hierarchy(Some(&path), &CliOverrides::default()).is_err());
    }
}
