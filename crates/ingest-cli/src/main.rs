mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use ingest_config::PipelineConfig;
use ingest_orchestrator::Stage;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Process-pool workers re-exec this binary with a hidden argument
    // instead of going through clap; intercept it before normal parsing.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some(ingest_extract::WORKER_ARG) {
        return run_extraction_worker().await;
    }

    init_tracing();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return std::process::ExitCode::from(1);
        }
    };

    let cli = Cli::parse();
    let stage = match cli.command {
        Some(Command::Sync) => Stage::Sync,
        Some(Command::Process) => Stage::Process,
        Some(Command::Index) => Stage::Index,
        Some(Command::Full) | None => Stage::Full,
        Some(Command::Migrate) => Stage::Migrate,
        Some(Command::Stats) => Stage::Stats,
        Some(Command::Cleanup) => Stage::Cleanup,
    };

    match commands::run(stage, &cli, config).await {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("failed to serialize report: {e}"),
                }
            } else {
                print!("{}", output::render_report(&report));
            }
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("runtime error: {e:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let verbose = std::env::args().filter(|a| a == "-v" || a == "--verbose").count();
    let default_directive = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)))
        .with_target(false)
        .init();
}

async fn run_extraction_worker() -> std::process::ExitCode {
    init_tracing();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return std::process::ExitCode::from(1);
        }
    };

    let ctx = match ingest_orchestrator::Context::build(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("worker startup error: {e}");
            return std::process::ExitCode::from(2);
        }
    };

    let partitioner = ingest_extract::PartitionerConfig {
        pdftotext_binary: ctx.config.pdftotext_binary.clone(),
        tesseract_binary: ctx.config.tesseract_binary.clone(),
        pandoc_binary: ctx.config.pandoc_binary.clone(),
        ocr_timeout: std::time::Duration::from_secs(ctx.config.ocr_timeout_secs),
        ..ingest_extract::PartitionerConfig::default()
    };

    match ingest_extract::run_worker_stdin_loop(ctx.objects.clone(), ctx.store.clone(), partitioner).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("worker error: {e}");
            std::process::ExitCode::from(2)
        }
    }
}
