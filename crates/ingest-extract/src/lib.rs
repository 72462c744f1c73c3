mod bundle;
mod error;
mod exec;
mod language;
mod partition;
mod pool;
mod worker;

pub use error::ExtractError;
pub use language::{language_hint, language_list};
pub use partition::PartitionerConfig;
pub use pool::{run_extraction, run_worker_stdin_loop, ExtractionConfig, ExtractionOutcome, PoolMode, WORKER_ARG};
pub use worker::extract_one;
