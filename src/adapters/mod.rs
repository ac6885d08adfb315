// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod mock_exec;
pub mod probe_ffprobe;
pub mod project_file;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FfmpegBackend;
pub use mock_exec::MockBackend;
pub use probe_ffprobe::FfprobeAdapter;
pub use project_file::ProjectFile;
pub use toml_config::{AppConfig, TomlConfigAdapter};
pub use tracing_log::TracingLogAdapter;
