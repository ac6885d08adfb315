//! Segment store: user-defined segments plus global compression settings

use serde::Serialize;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::{SegmentNaming, TimeRangeRule};

/// Immutable copy of the store taken when a run begins
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub segments: Vec<Segment>,
    pub settings: CompressionSettings,
    pub metadata: Option<VideoMetadata>,
}

/// Ordered set of segments and the settings shared by all of them
#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    settings: CompressionSettings,
    metadata: Option<VideoMetadata>,
    results: Vec<ProcessingResult>,
    processing: bool,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with non-default compression settings
    pub fn with_settings(settings: CompressionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn settings(&self) -> &CompressionSettings {
        &self.settings
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        self.metadata.as_ref()
    }

    /// Results of the last completed run
    pub fn results(&self) -> &[ProcessingResult] {
        &self.results
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Validate, assign an id and append; returns the new id
    pub fn add(&mut self, segment: NewSegment) -> Result<SegmentId, DomainError> {
        self.ensure_idle()?;
        let (start_time, end_time) =
            TimeRangeRule::validate(segment.start_time, segment.end_time, self.source_duration())?;

        let output_name = segment
            .output_name
            .unwrap_or_else(|| SegmentNaming::auto_name(self.segments.len()));
        let id = SegmentId::new();

        debug!(%id, start_time, end_time, name = %output_name, "Segment added");
        self.segments.push(Segment {
            id,
            start_time,
            end_time,
            intro_path: segment.intro_path,
            output_name,
        });
        Ok(id)
    }

    /// Merge `patch` into the segment with `id`.
    ///
    /// Returns `Ok(false)` when the id is unknown. An update that would
    /// produce an invalid range is rejected and the segment stays unchanged.
    pub fn update(&mut self, id: SegmentId, patch: SegmentPatch) -> Result<bool, DomainError> {
        self.ensure_idle()?;
        let duration = self.source_duration();
        let Some(slot) = self.segments.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };

        let mut merged = slot.merged(&patch);
        let (start_time, end_time) =
            TimeRangeRule::validate(merged.start_time, merged.end_time, duration)?;
        merged.start_time = start_time;
        merged.end_time = end_time;
        *slot = merged;

        debug!(%id, "Segment updated");
        Ok(true)
    }

    /// Delete by id; `Ok(false)` when absent
    pub fn remove(&mut self, id: SegmentId) -> Result<bool, DomainError> {
        self.ensure_idle()?;
        let before = self.segments.len();
        self.segments.retain(|s| s.id != id);
        Ok(self.segments.len() != before)
    }

    /// Shallow-merge compression settings
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<(), DomainError> {
        self.ensure_idle()?;
        self.settings.apply(&patch);
        Ok(())
    }

    /// Record metadata of the loaded source video
    pub fn set_metadata(&mut self, metadata: VideoMetadata) -> Result<(), DomainError> {
        self.ensure_idle()?;
        self.metadata = Some(metadata);
        Ok(())
    }

    /// Clear segments, results and metadata; settings are kept
    pub fn reset(&mut self) -> Result<(), DomainError> {
        self.ensure_idle()?;
        self.segments.clear();
        self.results.clear();
        self.metadata = None;
        Ok(())
    }

    /// Copy of the current state without touching the processing flag
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            segments: self.segments.clone(),
            settings: self.settings,
            metadata: self.metadata.clone(),
        }
    }

    /// Mark the store as processing and hand out the snapshot the run will use
    pub fn begin_run(&mut self) -> Result<StoreSnapshot, DomainError> {
        self.ensure_idle()?;
        if self.segments.is_empty() {
            return Err(DomainError::NothingToProcess);
        }
        self.processing = true;
        self.results.clear();
        Ok(self.snapshot())
    }

    /// Store the results of a run and accept mutations again
    pub fn complete_run(&mut self, results: Vec<ProcessingResult>) {
        self.results = results;
        self.processing = false;
    }

    /// Leave the processing state after a run that produced no results
    pub fn abort_run(&mut self) {
        self.processing = false;
    }

    fn source_duration(&self) -> Option<f64> {
        self.metadata.as_ref().map(|m| m.duration)
    }

    fn ensure_idle(&self) -> Result<(), DomainError> {
        if self.processing {
            Err(DomainError::ProcessingInProgress)
        } else {
            Ok(())
        }
    }
}
