use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use collector_engine::{BatchError, HttpCollaborator, Orchestrator, RunOutcome};
use engine_logging::{engine_error, engine_info, engine_warn, parse_level};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::logging::{self, LogDestination};
use crate::{render, selection};

#[derive(Debug, Parser)]
#[command(name = "collector")]
#[command(about = "Collect, detect and analyze a batch of video URLs, one at a time")]
#[command(version)]
pub struct Cli {
    /// File with one URL per line (reads stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// RON config file (defaults to ./collector.ron when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Accept the default entity pre-selection without prompting
    #[arg(short, long)]
    pub yes: bool,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    logging::initialize(cli.log, parse_level(&config.log_level));

    let input = read_input(cli.input.as_deref())?;
    let collaborator =
        HttpCollaborator::new(config.client_settings()).context("building HTTP client")?;
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(collaborator),
        config.orchestrator_settings(),
    ));
    engine_info!("Using analysis backend at {}", config.api_base_url);

    let stop_rendering = CancellationToken::new();
    let renderer = tokio::spawn(render::follow(
        orchestrator.subscribe(),
        stop_rendering.clone(),
    ));
    let interrupt = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine_warn!("Interrupted; aborting the batch");
                orchestrator.abort();
            }
        })
    };

    let mut outcome = orchestrator.submit_batch(&input).await?;
    while let RunOutcome::Paused {
        job_id,
        candidates,
        preselected,
    } = outcome
    {
        let choice = selection::prompt(job_id, candidates, preselected, cli.yes).await?;
        outcome = match orchestrator.resume_selection(job_id, choice).await {
            // An interrupt during the prompt already cancelled this job.
            Err(BatchError::Resume(_)) if orchestrator.snapshot().is_aborted() => {
                RunOutcome::Aborted(orchestrator.snapshot().summary())
            }
            other => other?,
        };
    }

    interrupt.abort();
    stop_rendering.cancel();
    if let Err(err) = renderer.await {
        engine_error!("progress renderer stopped unexpectedly: {}", err);
    }

    let (summary, aborted) = match outcome {
        RunOutcome::Finished(summary) => (summary, false),
        RunOutcome::Aborted(summary) => (summary, true),
        RunOutcome::Paused { .. } => (orchestrator.snapshot().summary(), false),
    };
    for line in render::summary_lines(&summary, aborted, Local::now()) {
        println!("{line}");
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading URL list {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("reading URL list from stdin")?;
            Ok(raw)
        }
    }
}
