use std::sync::Arc;

use ingest_domain::{ContentRecord, ContentStatus, Digest, OriginId, OriginMapping, OriginSnapshot};
use ingest_objectstore::ObjectStore;
use ingest_store::StateStore;

use crate::error::OrchestratorError;

#[derive(Debug, Default)]
pub struct MigrationOutcome {
    pub scanned: usize,
    pub created: usize,
    pub already_present: usize,
}

/// One-time reconstruction of `ContentRecord`/`OriginMapping` rows from the
/// presence of CAS markers a prior marker-based system would have left
/// behind. Safe to run repeatedly: any digest already present in the state
/// store is left untouched.
pub async fn run_migration(objects: Arc<dyn ObjectStore>, store: Arc<dyn StateStore>) -> Result<MigrationOutcome, OrchestratorError> {
    let mut outcome = MigrationOutcome::default();
    let keys = objects.list("objects/").await?;

    for key in keys {
        outcome.scanned += 1;
        let Some((digest, extension)) = parse_object_key(&key) else {
            tracing::warn!(key, "skipping object key that does not match the CAS layout");
            continue;
        };

        if store.get_content_by_digest(&digest).await?.is_some() {
            outcome.already_present += 1;
            continue;
        }

        let now = chrono::Utc::now();
        let head = objects.head(&key).await?;
        let name = head.user_metadata.get("original-name").cloned().unwrap_or_default();
        let path = head.user_metadata.get("origin-path").cloned().unwrap_or_default();
        let origin_id = head.user_metadata.get("origin-id").cloned();

        let status = reconstruct_status(&objects, &digest).await?;

        let snapshot = OriginSnapshot { name, path, mime: head.content_type.clone(), created_at: None, modified_at: None };
        let mut record = ContentRecord::new(digest.clone(), key.clone(), extension, snapshot.clone(), now);
        apply_status(&mut record, status, now);

        if status == ContentStatus::Indexed {
            if let Some((file_id, vector_store_id)) = read_indexed_marker(&objects, &digest).await? {
                record.openai_file_id = Some(file_id);
                record.vector_store_id = Some(vector_store_id);
            }
        }

        store.upsert_content(&record).await?;

        if let Some(origin_id) = origin_id {
            let mapping = OriginMapping::new(OriginId::new(origin_id), digest, snapshot, now);
            store.upsert_origin_mapping(&mapping).await?;
        }

        outcome.created += 1;
    }

    tracing::info!(scanned = outcome.scanned, created = outcome.created, already_present = outcome.already_present, "migration scan complete");
    Ok(outcome)
}

fn parse_object_key(key: &str) -> Option<(Digest, String)> {
    let file_name = key.rsplit('/').next()?;
    let (digest_hex, extension) = match file_name.split_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    };
    let digest = Digest::new(digest_hex).ok()?;
    Some((digest, extension))
}

async fn reconstruct_status(objects: &Arc<dyn ObjectStore>, digest: &Digest) -> Result<ContentStatus, OrchestratorError> {
    let (a, _) = digest.shard();

    let indexed_marker = format!("indexed/{a}/{}.indexed", digest.as_str());
    if objects.exists(&indexed_marker).await? {
        return Ok(ContentStatus::Indexed);
    }

    let meta_key = format!("{}/meta.json", digest.derivative_prefix());
    if objects.exists(&meta_key).await? {
        return Ok(ContentStatus::Processed);
    }

    let failed_marker = format!("failed/{a}/{}.txt", digest.as_str());
    if objects.exists(&failed_marker).await? {
        return Ok(ContentStatus::FailedProcess);
    }

    Ok(ContentStatus::Synced)
}

/// Legacy `.indexed` markers are a small JSON blob carrying the
/// vector-service file id so migrated rows keep their downstream identity.
async fn read_indexed_marker(objects: &Arc<dyn ObjectStore>, digest: &Digest) -> Result<Option<(String, String)>, OrchestratorError> {
    let (a, _) = digest.shard();
    let key = format!("indexed/{a}/{}.indexed", digest.as_str());
    if !objects.exists(&key).await? {
        return Ok(None);
    }
    let body = objects.get(&key).await?;
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(&body) else {
        return Ok(None);
    };
    let file_id = value.get("openai_file_id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let vector_store_id = value.get("vector_store_id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    Ok(Some((file_id, vector_store_id)))
}

fn apply_status(record: &mut ContentRecord, status: ContentStatus, now: chrono::DateTime<chrono::Utc>) {
    match status {
        ContentStatus::Indexed => {
            record.mark_processed(now, record.processed_text_size.unwrap_or(0));
            record.mark_indexed(now, String::new(), String::new());
        }
        ContentStatus::Processed => {
            record.mark_processed(now, record.processed_text_size.unwrap_or(0));
        }
        ContentStatus::FailedProcess => {
            record.mark_failed(ContentStatus::FailedProcess, ingest_domain::ErrorKind::Permanent, "migrated from legacy failure marker", now);
        }
        ContentStatus::Synced => {}
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sharded_object_key() {
        let digest_hex = "a".repeat(64);
        let key = format!("objects/aa/aa/{digest_hex}.pdf");
        let (digest, ext) = parse_object_key(&key).unwrap();
        assert_eq!(digest.as_str(), digest_hex);
        assert_eq!(ext, ".pdf");
    }

    #[test]
    fn rejects_keys_outside_the_cas_layout() {
        assert!(parse_object_key("not-a-digest/file.pdf").is_none());
    }

    #[tokio::test]
    async fn reconstructs_processed_row_from_derivative_marker_and_is_idempotent() {
        use ingest_store::InMemoryStore;
        use std::collections::HashMap;

        let dir = tempfile::tempdir().unwrap();
        let objects: Arc<dyn ObjectStore> = Arc::new(ingest_objectstore::LocalObjectStore::new(dir.path()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());

        let digest_hex = "b".repeat(64);
        let digest = Digest::new(digest_hex.clone()).unwrap();
        let mut metadata = HashMap::new();
        metadata.insert("original-name".to_string(), "report.pdf".to_string());
        metadata.insert("origin-path".to_string(), "report.pdf".to_string());
        metadata.insert("origin-id".to_string(), "drive-item-1".to_string());
        objects.put(&digest.object_key(".pdf"), b"%PDF-1.4 ...".to_vec(), "application/pdf", metadata).await.unwrap();
        objects.put(&format!("{}/meta.json", digest.derivative_prefix()), b"{}".to_vec(), "application/json", HashMap::new()).await.unwrap();

        let outcome = run_migration(objects.clone(), store.clone()).await.unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.already_present, 0);

        let record = store.get_content_by_digest(&digest).await.unwrap().unwrap();
        assert_eq!(record.status, ContentStatus::Processed);
        assert!(record.processed_at.is_some());

        let second = run_migration(objects, store).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.already_present, 1);
    }
}
