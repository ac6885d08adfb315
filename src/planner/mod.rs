//! Job planning: turns a store snapshot into an ordered list of jobs

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::{CollisionPolicy, CollisionResolver, SegmentNaming, TimeRangeRule};
use crate::store::StoreSnapshot;

/// One unit of work: cut, optional intro, compress, write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub index: usize,
    pub segment_id: SegmentId,
    pub source_path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_path: Option<PathBuf>,
    pub settings: CompressionSettings,
    pub output_name: String,
    pub output_path: PathBuf,
}

impl Job {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Stages this job runs through, in order
    pub fn stages(&self) -> Vec<JobStage> {
        let mut stages = vec![JobStage::Cutting];
        if self.intro_path.is_some() {
            stages.push(JobStage::AddingIntro);
        }
        stages.push(JobStage::Compressing);
        stages.push(JobStage::Writing);
        stages
    }
}

/// Ordered jobs for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPlan {
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    pub jobs: Vec<Job>,
}

impl JobPlan {
    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Pure planner; performs no I/O
#[derive(Debug, Clone)]
pub struct JobPlanner {
    container_ext: String,
    collision_policy: CollisionPolicy,
}

impl Default for JobPlanner {
    fn default() -> Self {
        Self::new("mp4", CollisionPolicy::default())
    }
}

impl JobPlanner {
    pub fn new(container_ext: impl Into<String>, collision_policy: CollisionPolicy) -> Self {
        Self {
            container_ext: SegmentNaming::extension(&container_ext.into()),
            collision_policy,
        }
    }

    pub fn container_ext(&self) -> &str {
        &self.container_ext
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.collision_policy
    }

    /// Build one job per segment in segment order.
    ///
    /// Every segment is validated before any job is created, so a plan is
    /// either complete or not produced at all.
    pub fn plan(
        &self,
        source_path: &Path,
        snapshot: &StoreSnapshot,
        output_dir: &Path,
    ) -> Result<JobPlan, DomainError> {
        if snapshot.segments.is_empty() {
            return Err(DomainError::NothingToProcess);
        }

        let source_duration = snapshot.metadata.as_ref().map(|m| m.duration);
        let mut ranges = Vec::with_capacity(snapshot.segments.len());
        for segment in &snapshot.segments {
            TimeRangeRule::check_segment(segment)?;
            ranges.push(TimeRangeRule::validate(
                segment.start_time,
                segment.end_time,
                source_duration,
            )?);
        }

        let mut resolver = CollisionResolver::new(self.collision_policy);
        let mut jobs = Vec::with_capacity(snapshot.segments.len());
        for (index, (segment, (start_time, end_time))) in
            snapshot.segments.iter().zip(ranges).enumerate()
        {
            let stem = resolver.claim(segment, index)?;
            let output_path = output_dir.join(format!("{}.{}", stem, self.container_ext));
            debug!(index, output = %output_path.display(), "Planned job");

            jobs.push(Job {
                index,
                segment_id: segment.id,
                source_path: source_path.to_path_buf(),
                start_time,
                end_time,
                intro_path: segment.intro_path.clone(),
                settings: snapshot.settings,
                output_name: segment.output_name.clone(),
                output_path,
            });
        }

        info!(
            jobs = jobs.len(),
            output_dir = %output_dir.display(),
            "Job plan created"
        );

        Ok(JobPlan {
            source_path: source_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, name: &str) -> Segment {
        Segment {
            id: SegmentId::new(),
            start_time: start,
            end_time: end,
            intro_path: None,
            output_name: name.to_string(),
        }
    }

    fn snapshot(segments: Vec<Segment>) -> StoreSnapshot {
        StoreSnapshot {
            segments,
            settings: CompressionSettings::default(),
            metadata: None,
        }
    }

    #[test]
    fn test_plan_preserves_segment_order_and_paths() {
        let planner = JobPlanner::default();
        let snap = snapshot(vec![segment(0.0, 5.0, "A"), segment(10.0, 12.0, "B")]);
        let plan = planner
            .plan(Path::new("in.mp4"), &snap, Path::new("/out"))
            .unwrap();

        assert_eq!(plan.total(), 2);
        assert_eq!(plan.jobs[0].index, 0);
        assert_eq!(plan.jobs[0].output_path, PathBuf::from("/out/A.mp4"));
        assert_eq!(plan.jobs[1].output_path, PathBuf::from("/out/B.mp4"));
        assert_eq!(plan.jobs[1].segment_id, snap.segments[1].id);
        assert_eq!(plan.jobs[1].settings, CompressionSettings::default());
    }

    #[test]
    fn test_plan_rejects_empty_snapshot() {
        let planner = JobPlanner::default();
        assert_eq!(
            planner.plan(Path::new("in.mp4"), &snapshot(vec![]), Path::new("/out")),
            Err(DomainError::NothingToProcess)
        );
    }

    #[test]
    fn test_plan_rejects_invalid_range_before_any_job() {
        let planner = JobPlanner::default();
        let snap = snapshot(vec![segment(0.0, 5.0, "A"), segment(8.0, 8.0, "B")]);
        assert!(matches!(
            planner.plan(Path::new("in.mp4"), &snap, Path::new("/out")),
            Err(DomainError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn test_plan_suffixes_duplicate_names() {
        let planner = JobPlanner::default();
        let snap = snapshot(vec![segment(0.0, 1.0, "Clip"), segment(1.0, 2.0, "Clip")]);
        let plan = planner
            .plan(Path::new("in.mp4"), &snap, Path::new("/out"))
            .unwrap();

        let expected = format!("/out/Clip_{}.mp4", snap.segments[1].id.short());
        assert_eq!(plan.jobs[1].output_path, PathBuf::from(expected));
        assert_eq!(plan.jobs[1].output_name, "Clip");
    }

    #[test]
    fn test_plan_error_policy_rejects_duplicates() {
        let planner = JobPlanner::new("mkv", CollisionPolicy::Error);
        let snap = snapshot(vec![segment(0.0, 1.0, "Clip"), segment(1.0, 2.0, "CLIP")]);
        assert!(matches!(
            planner.plan(Path::new("in.mp4"), &snap, Path::new("/out")),
            Err(DomainError::OutputCollision(_))
        ));
    }

    #[test]
    fn test_plan_uses_container_extension_and_fallback_name() {
        let planner = JobPlanner::new(".mkv", CollisionPolicy::Suffix);
        let snap = snapshot(vec![segment(0.0, 1.0, "///")]);
        let plan = planner
            .plan(Path::new("in.mp4"), &snap, Path::new("/out"))
            .unwrap();
        assert_eq!(plan.jobs[0].output_path, PathBuf::from("/out/___.mkv"));

        let snap = snapshot(vec![segment(0.0, 1.0, "  ")]);
        let plan = planner
            .plan(Path::new("in.mp4"), &snap, Path::new("/out"))
            .unwrap();
        assert_eq!(plan.jobs[0].output_path, PathBuf::from("/out/segment_1.mkv"));
    }

    #[test]
    fn test_plan_trims_whitespace_around_container() {
        let snap = snapshot(vec![segment(0.0, 1.0, "A")]);
        for container in [" mkv", "mkv ", " .mkv", "\tmkv\n"] {
            let planner = JobPlanner::new(container, CollisionPolicy::Suffix);
            assert_eq!(planner.container_ext(), "mkv");
            let plan = planner
                .plan(Path::new("in.mp4"), &snap, Path::new("/out"))
                .unwrap();
            assert_eq!(plan.jobs[0].output_path, PathBuf::from("/out/A.mkv"));
        }
    }

    #[test]
    fn test_plan_clamps_to_source_duration() {
        let planner = JobPlanner::default();
        let mut snap = snapshot(vec![segment(5.0, 100.0, "Tail")]);
        snap.metadata = Some(VideoMetadata {
            duration: 30.0,
            width: 640,
            height: 360,
            framerate: 25.0,
            codec: "h264".to_string(),
        });
        let plan = planner
            .plan(Path::new("in.mp4"), &snap, Path::new("/out"))
            .unwrap();
        assert_eq!(plan.jobs[0].end_time, 30.0);
        assert_eq!(plan.jobs[0].duration(), 25.0);
    }

    #[test]
    fn test_job_stages_include_intro_only_when_present() {
        let planner = JobPlanner::default();
        let mut with_intro = segment(0.0, 1.0, "A");
        with_intro.intro_path = Some(PathBuf::from("intro.mp4"));
        let snap = snapshot(vec![with_intro, segment(1.0, 2.0, "B")]);
        let plan = planner
            .plan(Path::new("in.mp4"), &snap, Path::new("/out"))
            .unwrap();

        assert_eq!(
            plan.jobs[0].stages(),
            vec![
                JobStage::Cutting,
                JobStage::AddingIntro,
                JobStage::Compressing,
                JobStage::Writing
            ]
        );
        assert_eq!(plan.jobs[1].stages().len(), 3);
    }
}
