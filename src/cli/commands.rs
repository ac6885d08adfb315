//! Command implementations

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::ProjectFile;
use crate::app::{AppContainer, ProcessRequest, SummaryFormat};
use crate::cli::args::{InspectArgs, PlanArgs, ProcessArgs, SessionArgs};
use crate::cli::render::{self, ProgressRenderer};
use crate::domain::model::{CompressionSettings, SegmentProgress};
use crate::error::EdditError;
use crate::store::SegmentStore;

/// Source, destination and populated store for one invocation
#[derive(Debug)]
pub struct Session {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub store: SegmentStore,
}

/// Merge the project file (if any) with command-line flags.
///
/// Flag segments replace the project's segments; flag settings override
/// project settings, which override `defaults`.
pub fn build_session(args: &SessionArgs, defaults: CompressionSettings) -> Result<Session> {
    let project = match &args.project {
        Some(path) => ProjectFile::load(path)
            .with_context(|| format!("Failed to load project file {}", path.display()))?,
        None => ProjectFile::default(),
    };

    let source = args
        .input
        .clone()
        .or_else(|| project.source.clone())
        .context("No input video: pass --input or set `source` in the project file")?;
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| project.output_dir.clone())
        .context("No output directory: pass --output-dir or set `output_dir` in the project file")?;

    let mut store = SegmentStore::with_settings(defaults);
    store.update_settings(project.settings.overridden_by(args.settings_patch()))?;
    store
        .settings()
        .validate()
        .context("Invalid compression settings")?;

    let segments = if args.segments.is_empty() {
        project.new_segments()?
    } else {
        args.segments.clone()
    };
    for segment in segments {
        store.add(segment).context("Invalid segment")?;
    }

    Ok(Session {
        source,
        output_dir,
        store,
    })
}

/// Execute the inspect command
pub async fn inspect(container: &dyn AppContainer, args: InspectArgs) -> Result<()> {
    info!(input = %args.input.display(), "Starting inspect operation");

    let interactor = container.inspect_interactor();
    let metadata = interactor
        .load_video(&args.input)
        .await
        .context("Failed to inspect input file")?;

    let format = if args.json {
        SummaryFormat::Json
    } else {
        SummaryFormat::Text
    };
    println!("{}", interactor.summarize(&args.input, &metadata, format)?.trim_end());
    Ok(())
}

/// Execute the plan command
pub fn plan(container: &dyn AppContainer, args: PlanArgs, defaults: CompressionSettings) -> Result<()> {
    let session = build_session(&args.session, defaults)?;
    let request = ProcessRequest {
        source_path: session.source,
        output_dir: session.output_dir,
        snapshot: session.store.snapshot(),
        create_output_dir: false,
    };

    let plan = container
        .process_interactor()
        .plan(&request)
        .context("Failed to plan segments")?;

    if args.session.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("Failed to serialize plan to JSON")?
        );
    } else {
        print!("{}", render::plan_text(&plan));
    }
    Ok(())
}

/// Execute the process command; returns whether every segment succeeded
pub async fn process(
    container: &dyn AppContainer,
    args: ProcessArgs,
    defaults: CompressionSettings,
    create_output_dir: bool,
) -> Result<bool> {
    let mut session = build_session(&args.session, defaults)?;
    if !session.source.is_file() {
        return Err(EdditError::InputFileNotFound {
            path: session.source.display().to_string(),
        }
        .into());
    }

    let metadata = container
        .inspect_interactor()
        .load_video(&session.source)
        .await
        .context("Failed to load input video")?;
    session.store.set_metadata(metadata)?;

    let snapshot = session.store.begin_run()?;
    let request = ProcessRequest {
        source_path: session.source.clone(),
        output_dir: session.output_dir.clone(),
        snapshot,
        create_output_dir,
    };

    let mut renderer = if args.session.json {
        ProgressRenderer::json()
    } else {
        ProgressRenderer::console()
    };
    let on_progress = move |progress: &SegmentProgress| {
        if let Some(line) = renderer.render(progress) {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{}", line);
        }
    };

    let handle = match container.process_interactor().start(request, on_progress).await {
        Ok(handle) => handle,
        Err(e) => {
            session.store.abort_run();
            return Err(e).context("Failed to start processing");
        }
    };

    let cancel = handle.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current stage");
            cancel.cancel();
        }
    });

    let outcome = handle.finish().await;
    interrupt.abort();

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            session.store.abort_run();
            return Err(e).context("Processing aborted");
        }
    };
    session.store.complete_run(report.results.clone());

    if args.session.json {
        println!("{}", render::report_json(&report).context("Failed to serialize report")?);
    } else {
        println!("{}", render::report_text(&report));
    }

    if report.all_succeeded() {
        info!(jobs = report.planned, "All segments processed");
    } else {
        warn!(
            failed = report.failed(),
            not_attempted = report.not_attempted(),
            "Some segments were not produced"
        );
    }
    Ok(report.all_succeeded())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::parse_segment_spec;
    use crate::domain::model::{Codec, Preset};

    fn session_args() -> SessionArgs {
        SessionArgs {
            input: Some(PathBuf::from("in.mp4")),
            output_dir: Some(PathBuf::from("/out")),
            project: None,
            segments: vec![parse_segment_spec("0,5,A").unwrap()],
            quality: None,
            preset: None,
            codec: None,
            json: false,
        }
    }

    #[test]
    fn test_build_session_from_flags() {
        let mut args = session_args();
        args.preset = Some(Preset::Slow);
        let session = build_session(&args, CompressionSettings::default()).unwrap();

        assert_eq!(session.source, PathBuf::from("in.mp4"));
        assert_eq!(session.store.len(), 1);
        assert_eq!(session.store.settings().preset, Preset::Slow);
        assert_eq!(session.store.settings().quality, 23);
    }

    #[test]
    fn test_flags_override_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("session.toml");
        std::fs::write(
            &project,
            r#"
            source = "match.mp4"
            output_dir = "clips"

            [settings]
            quality = 30
            codec = "libx265"

            [[segments]]
            start = 0
            end = 1

            [[segments]]
            start = 2
            end = 3
            "#,
        )
        .unwrap();

        let mut args = session_args();
        args.project = Some(project);
        args.input = None;
        args.quality = Some(20);
        let session = build_session(&args, CompressionSettings::default()).unwrap();

        assert_eq!(session.source, dir.path().join("match.mp4"));
        assert_eq!(session.output_dir, PathBuf::from("/out"));
        assert_eq!(session.store.len(), 1);
        assert_eq!(session.store.settings().quality, 20);
        assert_eq!(session.store.settings().codec, Codec::Libx265);
    }

    #[test]
    fn test_build_session_requires_input() {
        let mut args = session_args();
        args.input = None;
        assert!(build_session(&args, CompressionSettings::default()).is_err());
    }

    #[test]
    fn test_quality_checked_against_codec() {
        let mut args = session_args();
        args.quality = Some(60);
        assert!(build_session(&args, CompressionSettings::default()).is_err());

        args.codec = Some(Codec::Libx265);
        assert!(build_session(&args, CompressionSettings::default()).is_ok());
    }

    #[test]
    fn test_invalid_segment_rejected() {
        let mut args = session_args();
        args.segments = vec![parse_segment_spec("5,5").unwrap()];
        assert!(build_session(&args, CompressionSettings::default()).is_err());
    }
}
