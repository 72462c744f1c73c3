use ingest_config::PipelineConfig;
use ingest_orchestrator::{run_stage, Context, RunOptions, RunReport, Stage};

use crate::cli::Cli;

/// Build the run options shared by every stage from the global CLI flags.
fn run_options(cli: &Cli) -> RunOptions {
    RunOptions {
        dry_run: cli.dry_run,
        max_files: cli.max_files,
        force_full_sync: cli.force_full_sync,
        retry_failed: cli.retry_failed,
        processor_workers: cli.processor_workers,
        indexer_workers: cli.indexer_workers,
        use_processes: cli.use_processes,
        max_stale_hours: cli.max_stale_hours,
    }
}

pub async fn run(stage: Stage, cli: &Cli, config: PipelineConfig) -> anyhow::Result<RunReport> {
    let ctx = Context::build(config).await?;
    let report = run_stage(&ctx, stage, run_options(cli)).await?;
    Ok(report)
}
