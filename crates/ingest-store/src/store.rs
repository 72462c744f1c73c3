use async_trait::async_trait;
use ingest_domain::{ContentRecord, ContentStatus, Digest, OriginId, OriginMapping, PipelineStatistics};

use crate::error::StoreError;

/// Durable record of every content hash, its lifecycle state, origin
/// mapping, error history, and sync checkpoints. Every mutating operation
/// is a single transaction; the store must tolerate multiple workers
/// transitioning disjoint digests in parallel while serializing transitions
/// on the same digest.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Insert or update a content record. Implementations must preserve
    /// first-success timestamps (`synced_at`/`processed_at`/`indexed_at`) —
    /// callers pass the full desired record and the store must not
    /// overwrite a timestamp that is already set with a null.
    async fn upsert_content(&self, record: &ContentRecord) -> Result<(), StoreError>;

    async fn get_content_by_digest(&self, digest: &Digest) -> Result<Option<ContentRecord>, StoreError>;

    async fn get_content_by_origin_id(&self, origin_id: &OriginId) -> Result<Option<ContentRecord>, StoreError>;

    async fn list_by_status(&self, status: ContentStatus, limit: Option<u32>) -> Result<Vec<ContentRecord>, StoreError>;

    /// Rows in `processing`/`indexing` whose `updated_at` is older than `older_than`.
    async fn list_stale(&self, older_than: chrono::DateTime<chrono::Utc>) -> Result<Vec<ContentRecord>, StoreError>;

    /// Transition stale `processing`/`indexing` rows to their `failed_*`
    /// sibling with a `StaleProcessing` error. Returns the number of rows
    /// transitioned.
    async fn mark_stale_failed(&self, older_than: chrono::DateTime<chrono::Utc>, now: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError>;

    async fn upsert_origin_mapping(&self, mapping: &OriginMapping) -> Result<(), StoreError>;

    async fn get_origin_mapping(&self, origin_id: &OriginId) -> Result<Option<OriginMapping>, StoreError>;

    async fn get_checkpoint(&self, name: &str) -> Result<Option<String>, StoreError>;

    async fn set_checkpoint(&self, name: &str, value: &str, now: chrono::DateTime<chrono::Utc>) -> Result<(), StoreError>;

    async fn statistics(&self) -> Result<PipelineStatistics, StoreError>;
}
