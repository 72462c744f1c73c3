use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ingest", about = "Document ingestion pipeline: drive sync, extraction, and vector indexing", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Preview what a stage would do without performing drive/CAS/index writes.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Cap the number of files a single stage processes.
    #[arg(long, global = true)]
    pub max_files: Option<usize>,

    /// Ignore the sync checkpoint and re-enumerate the entire drive folder.
    #[arg(long, global = true)]
    pub force_full_sync: bool,

    /// Re-select rows in `failed_process` alongside `synced` rows for extraction.
    #[arg(long, global = true)]
    pub retry_failed: bool,

    /// Override the configured extraction worker count.
    #[arg(long, global = true)]
    pub processor_workers: Option<usize>,

    /// Override the configured indexing worker count.
    #[arg(long, global = true)]
    pub indexer_workers: Option<usize>,

    /// Run extraction in process-pool mode instead of threads.
    #[arg(long, global = true)]
    pub use_processes: bool,

    /// Override the stale-row threshold, in hours.
    #[arg(long, global = true)]
    pub max_stale_hours: Option<i64>,

    /// Emit the run report as JSON instead of a human-readable summary.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity; repeat for more detail (overridden by RUST_LOG if set).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sync new and changed files from the drive folder into content-addressed storage.
    Sync,
    /// Extract text from synced documents and write derivative bundles.
    Process,
    /// Upload processed documents to the vector service.
    Index,
    /// Run sync, then process, then index (default).
    Full,
    /// One-time reconstruction of state from legacy marker files.
    Migrate,
    /// Print pipeline statistics.
    Stats,
    /// Sweep stale in-flight rows to their failed state.
    Cleanup,
}
