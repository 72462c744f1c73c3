mod error;
mod mime;
mod sync;

pub use error::SyncError;
pub use sync::{run_sync, SyncConfig, SyncOutcome, CHECKPOINT_NAME};
