use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ingest_domain::{ContentRecord, ContentStatus, Digest, ErrorKind, OriginId, OriginMapping, PipelineStatistics};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::StateStore;

#[derive(Debug, Default)]
struct Inner {
    content: HashMap<Digest, ContentRecord>,
    origins: HashMap<OriginId, OriginMapping>,
    checkpoints: HashMap<String, String>,
}

/// In-memory implementation of [`StateStore`].
///
/// All data is lost on process exit. Used for tests and `--dry-run`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn upsert_content(&self, record: &ContentRecord) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.content.insert(record.digest.clone(), record.clone());
        Ok(())
    }

    async fn get_content_by_digest(&self, digest: &Digest) -> Result<Option<ContentRecord>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.content.get(digest).cloned())
    }

    async fn get_content_by_origin_id(&self, origin_id: &OriginId) -> Result<Option<ContentRecord>, StoreError> {
        let guard = self.inner.read().await;
        let Some(mapping) = guard.origins.get(origin_id) else {
            return Ok(None);
        };
        Ok(guard.content.get(&mapping.digest).cloned())
    }

    async fn list_by_status(&self, status: ContentStatus, limit: Option<u32>) -> Result<Vec<ContentRecord>, StoreError> {
        let guard = self.inner.read().await;
        let mut rows: Vec<ContentRecord> = guard.content.values().filter(|r| r.status == status).cloned().collect();
        rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        if let Some(limit) = limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn list_stale(&self, older_than: chrono::DateTime<chrono::Utc>) -> Result<Vec<ContentRecord>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .content
            .values()
            .filter(|r| r.status.is_in_flight() && r.updated_at < older_than)
            .cloned()
            .collect())
    }

    async fn mark_stale_failed(&self, older_than: chrono::DateTime<chrono::Utc>, now: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError> {
        let mut guard = self.inner.write().await;
        let mut count = 0u64;
        for record in guard.content.values_mut() {
            if !record.status.is_in_flight() || record.updated_at >= older_than {
                continue;
            }
            let failed = match record.status {
                ContentStatus::Processing => ContentStatus::FailedProcess,
                ContentStatus::Indexing => ContentStatus::FailedIndex,
                _ => unreachable!("filtered to in-flight statuses above"),
            };
            record.mark_failed(failed, ErrorKind::StaleProcessing, "stale: exceeded max processing age", now);
            count += 1;
        }
        Ok(count)
    }

    async fn upsert_origin_mapping(&self, mapping: &OriginMapping) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.origins.insert(mapping.origin_id.clone(), mapping.clone());
        Ok(())
    }

    async fn get_origin_mapping(&self, origin_id: &OriginId) -> Result<Option<OriginMapping>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.origins.get(origin_id).cloned())
    }

    async fn get_checkpoint(&self, name: &str) -> Result<Option<String>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.checkpoints.get(name).cloned())
    }

    async fn set_checkpoint(&self, name: &str, value: &str, _now: chrono::DateTime<chrono::Utc>) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.checkpoints.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn statistics(&self) -> Result<PipelineStatistics, StoreError> {
        let guard = self.inner.read().await;
        let mut stats = PipelineStatistics::default();
        for record in guard.content.values() {
            stats.total += 1;
            *stats.by_status.entry(record.status.as_str().to_string()).or_insert(0) += 1;
            if record.error.message.is_some() {
                stats.with_errors += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_domain::OriginSnapshot;

    fn digest(byte: char) -> Digest {
        Digest::new(byte.to_string().repeat(64)).unwrap()
    }

    #[tokio::test]
    async fn upsert_and_get_by_digest() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        let d = digest('a');
        let record = ContentRecord::new(d.clone(), d.object_key(".txt"), ".txt".into(), OriginSnapshot::default(), now);
        store.upsert_content(&record).await.unwrap();

        let got = store.get_content_by_digest(&d).await.unwrap();
        assert_eq!(got.unwrap().status, ContentStatus::Synced);
    }

    #[tokio::test]
    async fn dedup_via_origin_mapping() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        let d = digest('b');
        let record = ContentRecord::new(d.clone(), d.object_key(".txt"), ".txt".into(), OriginSnapshot::default(), now);
        store.upsert_content(&record).await.unwrap();

        let o1 = OriginId::new("origin-1");
        let o2 = OriginId::new("origin-2");
        store.upsert_origin_mapping(&OriginMapping::new(o1.clone(), d.clone(), OriginSnapshot::default(), now)).await.unwrap();
        store.upsert_origin_mapping(&OriginMapping::new(o2.clone(), d.clone(), OriginSnapshot::default(), now)).await.unwrap();

        assert_eq!(store.get_content_by_origin_id(&o1).await.unwrap().unwrap().digest, d);
        assert_eq!(store.get_content_by_origin_id(&o2).await.unwrap().unwrap().digest, d);
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        let synced = ContentRecord::new(digest('c'), "k1".into(), ".txt".into(), OriginSnapshot::default(), now);
        let mut processing = ContentRecord::new(digest('d'), "k2".into(), ".txt".into(), OriginSnapshot::default(), now);
        processing.mark_processing(now);
        store.upsert_content(&synced).await.unwrap();
        store.upsert_content(&processing).await.unwrap();

        let synced_rows = store.list_by_status(ContentStatus::Synced, None).await.unwrap();
        assert_eq!(synced_rows.len(), 1);
        assert_eq!(synced_rows[0].digest, synced.digest);
    }

    #[tokio::test]
    async fn stale_sweep_transitions_in_flight_rows() {
        let store = InMemoryStore::new();
        let old = chrono::Utc::now() - chrono::Duration::hours(48);
        let mut record = ContentRecord::new(digest('e'), "k".into(), ".txt".into(), OriginSnapshot::default(), old);
        record.mark_processing(old);
        store.upsert_content(&record).await.unwrap();

        let threshold = chrono::Utc::now() - chrono::Duration::hours(24);
        let now = chrono::Utc::now();
        let n = store.mark_stale_failed(threshold, now).await.unwrap();
        assert_eq!(n, 1);

        let got = store.get_content_by_digest(&record.digest).await.unwrap().unwrap();
        assert_eq!(got.status, ContentStatus::FailedProcess);
        assert_eq!(got.error.kind, Some(ErrorKind::StaleProcessing));
    }

    #[tokio::test]
    async fn checkpoint_round_trips() {
        let store = InMemoryStore::new();
        assert!(store.get_checkpoint("drive_sync_last_modified").await.unwrap().is_none());
        store.set_checkpoint("drive_sync_last_modified", "2025-01-01T00:00:00Z", chrono::Utc::now()).await.unwrap();
        assert_eq!(store.get_checkpoint("drive_sync_last_modified").await.unwrap().unwrap(), "2025-01-01T00:00:00Z");
    }
}
