// Inspect interactor - Loads source video metadata

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Output format for an inspection summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Text,
    Json,
    Yaml,
}

/// Interactor for loading a source video
pub struct InspectInteractor {
    probe_port: Arc<dyn ProbePort>,
}

impl InspectInteractor {
    /// Create new inspect interactor with injected ports
    pub fn new(probe_port: Arc<dyn ProbePort>) -> Self {
        Self { probe_port }
    }

    /// Probe the source and return its metadata
    pub async fn load_video(&self, path: &Path) -> Result<VideoMetadata, DomainError> {
        if !path.exists() {
            return Err(DomainError::FileNotFound(path.display().to_string()));
        }

        let metadata = self.probe_port.probe(path).await?;
        info!(
            path = %path.display(),
            duration = metadata.duration,
            width = metadata.width,
            height = metadata.height,
            codec = %metadata.codec,
            "Video loaded"
        );
        Ok(metadata)
    }

    /// Render metadata for display
    pub fn summarize(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
        format: SummaryFormat,
    ) -> Result<String, DomainError> {
        match format {
            SummaryFormat::Json => serde_json::to_string_pretty(metadata)
                .map_err(|e| DomainError::InternalError(format!("JSON serialization failed: {}", e))),
            SummaryFormat::Yaml => serde_yaml::to_string(metadata)
                .map_err(|e| DomainError::InternalError(format!("YAML serialization failed: {}", e))),
            SummaryFormat::Text => Ok(Self::format_as_text(path, metadata)),
        }
    }

    fn format_as_text(path: &Path, metadata: &VideoMetadata) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("File:       {}\n", path.display()));
        summary.push_str(&format!(
            "Duration:   {} ({:.3}s)\n",
            TimeSpec::from_seconds(metadata.duration),
            metadata.duration
        ));
        summary.push_str(&format!("Resolution: {}x{}\n", metadata.width, metadata.height));
        summary.push_str(&format!("Frame rate: {:.3} fps\n", metadata.framerate));
        summary.push_str(&format!("Codec:      {}\n", metadata.codec));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedProbe;

    #[async_trait]
    impl ProbePort for FixedProbe {
        async fn probe(&self, _file_path: &Path) -> Result<VideoMetadata, DomainError> {
            Ok(VideoMetadata {
                duration: 95.5,
                width: 1280,
                height: 720,
                framerate: 30.0,
                codec: "h264".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_load_video_requires_existing_file() {
        let interactor = InspectInteractor::new(Arc::new(FixedProbe));
        let result = interactor.load_video(Path::new("/no/such/video.mp4")).await;
        assert!(matches!(result, Err(DomainError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_video_and_summarize() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let interactor = InspectInteractor::new(Arc::new(FixedProbe));
        let metadata = interactor.load_video(file.path()).await.unwrap();
        assert_eq!(metadata.width, 1280);

        let text = interactor
            .summarize(file.path(), &metadata, SummaryFormat::Text)
            .unwrap();
        assert!(text.contains("1280x720"));
        assert!(text.contains("01:35.500"));

        let json = interactor
            .summarize(file.path(), &metadata, SummaryFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["codec"], "h264");
    }
}
