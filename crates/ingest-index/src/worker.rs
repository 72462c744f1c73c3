use std::sync::Arc;

use ingest_domain::{ContentRecord, ContentStatus, ErrorKind};
use ingest_objectstore::ObjectStore;
use ingest_store::StateStore;

use crate::backoff::retry_with_backoff;
use crate::error::IndexError;
use crate::vector_client::VectorServiceClient;

/// Index a single processed record: stream its `text.txt` derivative,
/// upload it to the vector service, attach it to the configured vector
/// store, and persist the resulting ids.
pub async fn index_one(
    objects: &Arc<dyn ObjectStore>,
    store: &Arc<dyn StateStore>,
    client: &VectorServiceClient,
    vector_store_id: &str,
    mut record: ContentRecord,
) -> Result<ContentRecord, IndexError> {
    let now = chrono::Utc::now();
    record.mark_indexing(now);
    store.upsert_content(&record).await?;

    match index_inner(objects, client, vector_store_id, &record).await {
        Ok((file_id, vector_store_id)) => {
            let now = chrono::Utc::now();
            record.mark_indexed(now, file_id, vector_store_id);
            store.upsert_content(&record).await?;
            Ok(record)
        }
        Err(e) => {
            let now = chrono::Utc::now();
            let kind = if e.is_retriable() { ErrorKind::TransientBackend } else { ErrorKind::Permanent };
            record.mark_failed(ContentStatus::FailedIndex, kind, e.to_string(), now);
            store.upsert_content(&record).await?;
            Err(e)
        }
    }
}

async fn index_inner(
    objects: &Arc<dyn ObjectStore>,
    client: &VectorServiceClient,
    vector_store_id: &str,
    record: &ContentRecord,
) -> Result<(String, String), IndexError> {
    let text_key = format!("{}/text.txt", record.digest.derivative_prefix());
    let text = objects.get(&text_key).await?;
    let file_name = format!("{}.txt", record.digest.as_str());

    let file_id = retry_with_backoff(|| client.upload_file(&file_name, text.clone())).await?;
    retry_with_backoff(|| client.attach_to_vector_store(vector_store_id, &file_id)).await?;

    Ok((file_id, vector_store_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_domain::{Digest, OriginSnapshot};
    use ingest_objectstore::LocalObjectStore;
    use ingest_store::InMemoryStore;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn success_path_transitions_to_indexed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex("^/files$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "file-1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex("^/vector_stores/.*/files$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "vsf-1"})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path().to_path_buf()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let client = VectorServiceClient::with_base_url(server.uri(), "sk-test");

        let digest = Digest::new("b".repeat(64)).unwrap();
        let prefix = digest.derivative_prefix();
        objects.put(&format!("{prefix}/text.txt"), b"hello world".to_vec(), "text/plain", HashMap::new()).await.unwrap();

        let now = chrono::Utc::now();
        let mut record = ContentRecord::new(
            digest,
            "objects/bb/bb/whatever.txt".to_string(),
            ".txt".to_string(),
            OriginSnapshot::default(),
            now,
        );
        record.mark_processed(now, 11);

        let result = index_one(&objects, &store, &client, "vs-1", record).await.unwrap();
        assert_eq!(result.status, ContentStatus::Indexed);
        assert_eq!(result.openai_file_id.as_deref(), Some("file-1"));
    }
}
