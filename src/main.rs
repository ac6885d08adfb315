//! eddit command-line front end
//!
//! ```bash
//! eddit inspect --input match.mp4
//! eddit plan --input match.mp4 --output-dir clips --segment 0:00,0:05,Kickoff
//! eddit process --project session.toml --create-output-dir
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use eddit_cli::adapters::TracingLogAdapter;
use eddit_cli::app::DefaultAppContainer;
use eddit_cli::cli::{commands, Cli, Commands};
use eddit_cli::config_initialization::{initialize_configuration_hierarchy, CliOverrides};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool> {
    let cli = Cli::parse();

    let (stage_timeout_secs, create_output_dir) = match &cli.command {
        Commands::Process(args) => (args.stage_timeout, args.create_output_dir),
        _ => (None, false),
    };
    let overrides = CliOverrides {
        log_level: cli.log_level.clone(),
        json_logs: cli.json_logs,
        stage_timeout_secs,
        create_output_dir,
    };

    let loaded = initialize_configuration_hierarchy(cli.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;
    let config = loaded.config;

    TracingLogAdapter::init(config.log_level(), config.logging.json)?;
    debug!(
        source = ?loaded.source,
        env_overrides = loaded.env_overrides,
        "Configuration loaded"
    );

    let container = DefaultAppContainer::new(&config)?;
    let defaults = config.compression_defaults();

    match cli.command {
        Commands::Inspect(args) => {
            commands::inspect(&container, args).await?;
            Ok(true)
        }
        Commands::Plan(args) => {
            commands::plan(&container, args, defaults)?;
            Ok(true)
        }
        Commands::Process(args) => {
            commands::process(
                &container,
                args,
                defaults,
                config.output.create_missing_dir,
            )
            .await
        }
    }
}
