//! Terminal rendering of progress snapshots, plans and run reports

use std::time::Duration;

use serde_json::json;

use crate::domain::model::{JobStage, SegmentProgress, TimeSpec};
use crate::output::RunReport;
use crate::planner::JobPlan;

/// Turns progress snapshots into output lines
#[derive(Debug)]
pub enum ProgressRenderer {
    /// Human-readable lines, one per stage change or 25% step
    Console { last: Option<(usize, JobStage, u8)> },
    /// One JSON event per snapshot
    Json,
}

impl ProgressRenderer {
    pub fn console() -> Self {
        ProgressRenderer::Console { last: None }
    }

    pub fn json() -> Self {
        ProgressRenderer::Json
    }

    /// Line to print for this snapshot, if any
    pub fn render(&mut self, progress: &SegmentProgress) -> Option<String> {
        match self {
            ProgressRenderer::Json => Some(
                json!({
                    "event": "progress",
                    "index": progress.index,
                    "total": progress.total,
                    "status": progress.status,
                    "progress": progress.progress,
                    "estimated_time": progress.estimated_time,
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })
                .to_string(),
            ),
            ProgressRenderer::Console { last } => {
                let step = (progress.progress / 25.0).floor().clamp(0.0, 4.0) as u8;
                let key = (progress.index, progress.status, step);
                if *last == Some(key) {
                    return None;
                }
                *last = Some(key);
                Some(console_line(progress))
            }
        }
    }
}

fn console_line(progress: &SegmentProgress) -> String {
    let bar_length = 20;
    let filled = ((progress.progress / 100.0) * bar_length as f64).round() as usize;
    let filled = filled.min(bar_length);
    let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled);

    let mut line = format!(
        "[{}/{}] [{}] {:>5.1}% {}",
        progress.index + 1,
        progress.total,
        bar,
        progress.progress,
        progress.status.label()
    );
    if let Some(eta) = progress.estimated_time.and_then(seconds) {
        line.push_str(&format!(" (eta {})", format_duration(eta)));
    }
    line
}

/// `None` for values a `Duration` cannot hold
fn seconds(secs: f64) -> Option<Duration> {
    if secs.is_nan() {
        return None;
    }
    Duration::try_from_secs_f64(secs.max(0.0)).ok()
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Human-readable plan listing
pub fn plan_text(plan: &JobPlan) -> String {
    let mut text = format!(
        "Source: {}\nOutput: {}\nJobs:   {}\n",
        plan.source_path.display(),
        plan.output_dir.display(),
        plan.total()
    );
    for job in &plan.jobs {
        let stages: Vec<&str> = job.stages().iter().map(|s| s.label()).collect();
        text.push_str(&format!(
            "  {:>3}. {} -> {}  [{}] {} {} crf={}\n",
            job.index + 1,
            TimeSpec::from_seconds(job.start_time),
            TimeSpec::from_seconds(job.end_time),
            stages.join(" > "),
            job.settings.codec,
            job.settings.preset,
            job.settings.quality
        ));
        text.push_str(&format!("       {}\n", job.output_path.display()));
    }
    text
}

/// Human-readable report summary
pub fn report_text(report: &RunReport) -> String {
    let mut text = String::new();
    for result in &report.results {
        match (&result.output_path, &result.error_message) {
            (Some(path), _) if result.success => {
                text.push_str(&format!("  ok     {:>3}. {}\n", result.index + 1, path.display()));
            }
            (_, message) => {
                text.push_str(&format!(
                    "  failed {:>3}. {}: {}\n",
                    result.index + 1,
                    result.output_name,
                    message.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }
    text.push_str(&format!(
        "{} succeeded, {} failed, {} not attempted in {}",
        report.succeeded(),
        report.failed(),
        report.not_attempted(),
        seconds(report.elapsed_secs).map_or_else(|| "?".to_string(), format_duration)
    ));
    if report.was_cancelled() {
        text.push_str(" (cancelled)");
    }
    text
}

/// Final JSON event for a run
pub fn report_json(report: &RunReport) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(report)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("event".to_string(), json!("report"));
        object.insert("succeeded".to_string(), json!(report.succeeded()));
        object.insert("failed".to_string(), json!(report.failed()));
        object.insert("not_attempted".to_string(), json!(report.not_attempted()));
    }
    serde_json::to_string(&value)
}
