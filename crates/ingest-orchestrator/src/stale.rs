use std::sync::Arc;

use ingest_store::StateStore;

use crate::error::OrchestratorError;

/// Transition `processing`/`indexing` rows idle past `max_age` to their
/// `failed_*` sibling with a synthetic `StaleProcessing` error. Returns the
/// number of rows transitioned. Run before each stage selects its eligible
/// rows so a crash mid-transition is self-healed by the next run.
pub async fn sweep_stale(store: &Arc<dyn StateStore>, max_age: chrono::Duration) -> Result<u64, OrchestratorError> {
    let threshold = chrono::Utc::now() - max_age;
    let now = chrono::Utc::now();
    let count = store.mark_stale_failed(threshold, now).await?;
    if count > 0 {
        tracing::warn!(count, "swept stale in-flight rows to failed state");
    }
    Ok(count)
}
