mod error;
mod migrate;
mod orchestrate;
mod report;
mod stale;

pub use error::OrchestratorError;
pub use migrate::{run_migration, MigrationOutcome};
pub use orchestrate::{run_stage, Context, RunOptions};
pub use report::{ExtractionCounts, IndexCounts, RunReport, Stage};
pub use stale::sweep_stale;
