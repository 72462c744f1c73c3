use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ingest_domain::ContentStatus;
use ingest_objectstore::ObjectStore;
use ingest_store::StateStore;
use tokio::sync::Semaphore;

use crate::error::IndexError;
use crate::vector_client::VectorServiceClient;
use crate::worker::index_one;

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub vector_store_id: String,
    pub concurrency: usize,
    pub max_files: Option<usize>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { vector_store_id: String::new(), concurrency: 3, max_files: None }
    }
}

#[derive(Debug, Default)]
pub struct IndexOutcome {
    pub successful: usize,
    pub failed: usize,
}

/// Index every `processed` row (the "full mode" eligibility rule selects
/// all processed rows rather than a filtered set, so prior index failures
/// re-enter naturally once the stale sweep resets them to `processed`).
pub async fn run_indexing(
    objects: Arc<dyn ObjectStore>,
    store: Arc<dyn StateStore>,
    client: Arc<VectorServiceClient>,
    config: IndexConfig,
) -> Result<IndexOutcome, IndexError> {
    let mut rows = store.list_by_status(ContentStatus::Processed, None).await?;
    if let Some(max) = config.max_files {
        rows.truncate(max);
    }

    if rows.is_empty() {
        return Ok(IndexOutcome::default());
    }

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::with_capacity(rows.len());

    for record in rows {
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let objects = objects.clone();
        let store = store.clone();
        let client = client.clone();
        let vector_store_id = config.vector_store_id.clone();
        let successful = successful.clone();
        let failed = failed.clone();

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            match index_one(&objects, &store, &client, &vector_store_id, record).await {
                Ok(_) => {
                    successful.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "indexing failed");
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    Ok(IndexOutcome { successful: successful.load(Ordering::Relaxed), failed: failed.load(Ordering::Relaxed) })
}
