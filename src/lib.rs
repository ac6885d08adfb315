//! eddit segment processor library
//!
//! Trims a source video into named segments, optionally prepends an intro
//! clip to each and re-encodes every segment with shared compression
//! settings. Segments live in a [`store::SegmentStore`], are turned into
//! jobs by the [`planner::JobPlanner`], run one after another by the
//! [`engine::ExecutionEngine`] and collected into a [`output::RunReport`].

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod planner;
pub mod ports;
pub mod store;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{
    CompressionSettings, JobStage, NewSegment, ProcessingResult, Segment, SegmentId,
    SegmentProgress, VideoMetadata,
};
pub use error::{EdditError, EdditResult};
pub use output::RunReport;
