//! Error handling module for eddit

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for adapter and infrastructure failures
#[derive(Error, Debug)]
pub enum EdditError {
    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// Invalid time format
    #[error("Invalid time format: {time}. Expected HH:MM:SS.ms, MM:SS.ms, or seconds")]
    InvalidTimeFormat { time: String },

    /// Invalid segment specification on the command line
    #[error("Invalid segment '{spec}': {message}")]
    InvalidSegmentSpec { spec: String, message: String },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Project file could not be understood
    #[error("Invalid project file {path}: {message}")]
    ProjectError { path: String, message: String },

    /// Domain or port error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl EdditError {
    pub fn config(message: impl Into<String>) -> Self {
        EdditError::ConfigError {
            message: message.into(),
        }
    }
}

/// Result type alias for eddit operations
pub type EdditResult<T> = std::result::Result<T, EdditError>;
