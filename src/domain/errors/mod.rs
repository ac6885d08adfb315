// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Segment time range violates `0 <= start < end`
    InvalidTimeRange(String),
    /// Planning was requested for an empty segment set
    NothingToProcess,
    /// Output directory is missing or not a directory
    OutputDirectoryMissing(String),
    /// Two jobs resolve to the same output file
    OutputCollision(String),
    /// Store mutation attempted while a run is active
    ProcessingInProgress,
    /// File not found
    FileNotFound(String),
    /// Media probing failed
    ProbeFail(String),
    /// Media backend cannot be reached at all
    BackendUnavailable(String),
    /// Backend stage failed
    ProcessingError(String),
    /// Backend stage exceeded its time budget
    Timeout(String),
    /// Stage interrupted by cancellation
    Cancelled,
    /// File system failure
    FsFail(String),
    /// Internal error
    InternalError(String),
}

impl DomainError {
    /// Errors that abort a whole run instead of a single job
    pub fn is_fatal(&self) -> bool {
        matches!(self, DomainError::BackendUnavailable(_))
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InvalidTimeRange(msg) => write!(f, "Invalid time range: {}", msg),
            DomainError::NothingToProcess => write!(f, "Nothing to process: no segments defined"),
            DomainError::OutputDirectoryMissing(msg) => {
                write!(f, "Output directory missing: {}", msg)
            }
            DomainError::OutputCollision(msg) => write!(f, "Output name collision: {}", msg),
            DomainError::ProcessingInProgress => {
                write!(f, "Segments cannot be changed while processing is in progress")
            }
            DomainError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            DomainError::ProbeFail(msg) => write!(f, "Probe failed: {}", msg),
            DomainError::BackendUnavailable(msg) => {
                write!(f, "Media backend unavailable: {}", msg)
            }
            DomainError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            DomainError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            DomainError::Cancelled => write!(f, "Operation cancelled"),
            DomainError::FsFail(msg) => write!(f, "File system error: {}", msg),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
