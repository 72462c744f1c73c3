use std::sync::Arc;

use ingest_domain::{ContentRecord, ContentStatus, ErrorKind};
use ingest_objectstore::ObjectStore;
use ingest_store::StateStore;

use crate::error::ExtractError;
use crate::language::{language_hint, language_list};
use crate::partition::{partition_document, PartitionerConfig};

/// Extract a single content record: download its CAS source, partition it,
/// write the derivative bundle, and transition its status. Transient
/// partitioner/backend failures and the empty-content rule both land the
/// row in `failed_process`; the caller decides whether to retry.
pub async fn extract_one(
    objects: &Arc<dyn ObjectStore>,
    store: &Arc<dyn StateStore>,
    config: &PartitionerConfig,
    mut record: ContentRecord,
) -> Result<ContentRecord, ExtractError> {
    let now = chrono::Utc::now();
    record.mark_processing(now);
    store.upsert_content(&record).await?;

    match run_extraction(objects, config, &record).await {
        Ok((text, result)) => {
            let now = chrono::Utc::now();
            record.mark_processed(now, text.len() as i64);
            store.upsert_content(&record).await?;
            tracing::info!(digest = %record.digest, strategy = %result, "extraction complete");
            Ok(record)
        }
        Err(e) => {
            let now = chrono::Utc::now();
            let kind = classify(&e);
            record.mark_failed(ContentStatus::FailedProcess, kind, e.to_string(), now);
            store.upsert_content(&record).await?;
            Err(e)
        }
    }
}

fn classify(err: &ExtractError) -> ErrorKind {
    match err {
        ExtractError::Timeout(_) => ErrorKind::OcrTimeout,
        ExtractError::EmptyContent => ErrorKind::EmptyContent,
        e if e.is_transient() => ErrorKind::TransientBackend,
        _ => ErrorKind::Permanent,
    }
}

async fn run_extraction(
    objects: &Arc<dyn ObjectStore>,
    config: &PartitionerConfig,
    record: &ContentRecord,
) -> Result<(String, ingest_domain::ProcessingStrategy), ExtractError> {
    let payload = objects.get(&record.object_key).await?;

    let dir = tempfile::tempdir().map_err(ExtractError::Io)?;
    let tmp_path = dir.path().join(format!("source{}", record.extension));
    tokio::fs::write(&tmp_path, &payload).await?;

    let hint = language_hint(&record.origin.name);
    let languages = language_list(&hint);

    let outcome = partition_document(&tmp_path, &record.extension, &languages, config).await?;

    let text = crate::bundle::write_bundle(
        objects.as_ref(),
        record,
        &outcome.elements,
        outcome.strategy,
        &hint,
        outcome.page_count,
        None,
        chrono::Utc::now(),
    )
    .await?;

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyContent);
    }

    Ok((text, outcome.strategy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_domain::{Digest, OriginSnapshot};
    use ingest_objectstore::LocalObjectStore;
    use ingest_store::InMemoryStore;
    use std::collections::HashMap;

    fn digest(byte: u8) -> Digest {
        Digest::new(hex::encode([byte; 32])).unwrap()
    }

    mod hex {
        pub fn encode(bytes: [u8; 32]) -> String {
            bytes.iter().map(|b| format!("{:02x}", b)).collect()
        }
    }

    #[tokio::test]
    async fn txt_source_extracts_and_marks_processed() {
        let dir = tempfile::tempdir().unwrap();
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path().to_path_buf()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());

        let digest = digest(7);
        let object_key = digest.object_key(".txt");
        objects
            .put(&object_key, b"Hello world.\n\nSecond paragraph.".to_vec(), "text/plain", HashMap::new())
            .await
            .unwrap();

        let now = chrono::Utc::now();
        let record = ContentRecord::new(
            digest,
            object_key,
            ".txt".to_string(),
            OriginSnapshot { name: "notes.txt".to_string(), path: "/notes.txt".to_string(), ..Default::default() },
            now,
        );

        let result = extract_one(&objects, &store, &PartitionerConfig::default(), record).await.unwrap();
        assert_eq!(result.status, ContentStatus::Processed);
        assert!(result.processed_text_size.unwrap() > 0);
    }

    #[tokio::test]
    async fn empty_document_fails_with_empty_content_kind() {
        let dir = tempfile::tempdir().unwrap();
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path().to_path_buf()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());

        let digest = digest(9);
        let digest_clone = digest.clone();
        let object_key = digest.object_key(".txt");
        objects.put(&object_key, b"   \n\n  ".to_vec(), "text/plain", HashMap::new()).await.unwrap();

        let now = chrono::Utc::now();
        let record = ContentRecord::new(
            digest,
            object_key,
            ".txt".to_string(),
            OriginSnapshot { name: "blank.txt".to_string(), path: "/blank.txt".to_string(), ..Default::default() },
            now,
        );

        let err = extract_one(&objects, &store, &PartitionerConfig::default(), record).await.unwrap_err();
        assert!(matches!(err, ExtractError::EmptyContent));

        let stored = store.get_content_by_digest(&digest_clone).await.unwrap().unwrap();
        assert_eq!(stored.status, ContentStatus::FailedProcess);
        assert_eq!(stored.error.kind, Some(ErrorKind::EmptyContent));
    }
}
