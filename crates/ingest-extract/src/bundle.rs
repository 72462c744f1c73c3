use std::collections::HashMap;

use ingest_domain::{ContentRecord, DerivativeMeta, Element, ProcessingStrategy};
use ingest_objectstore::ObjectStore;

use crate::error::ExtractError;

/// Write `elements.jsonl`, `text.txt`, `meta.json` under the digest's
/// derivative prefix, in that order. Idempotent: a retry re-uploads the
/// same bytes to the same keys.
pub async fn write_bundle(
    objects: &dyn ObjectStore,
    record: &ContentRecord,
    elements: &[Element],
    strategy: ProcessingStrategy,
    language: &str,
    page_count: Option<u32>,
    title: Option<String>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<String, ExtractError> {
    let prefix = record.digest.derivative_prefix();

    let elements_jsonl = elements
        .iter()
        .map(|e| serde_json::to_string(e).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");
    let text_content = elements.iter().map(|e| e.text.as_str()).collect::<Vec<_>>().join("\n\n");
    let word_count = text_content.split_whitespace().count();

    let meta = DerivativeMeta {
        digest: record.digest.as_str().to_string(),
        original_name: record.origin.name.clone(),
        object_key: record.object_key.clone(),
        extension: record.extension.clone(),
        element_count: elements.len(),
        text_length: text_content.len(),
        word_count,
        page_count,
        title,
        author: None,
        language: language.to_string(),
        synced_at: record.synced_at,
        processed_at: now,
        processing_strategy: strategy,
        origin_id: None,
        origin_path: Some(record.origin.path.clone()),
        origin_created_at: record.origin.created_at,
        origin_modified_at: record.origin.modified_at,
        origin_mime: record.origin.mime.clone(),
    };

    objects
        .put(
            &format!("{prefix}/elements.jsonl"),
            elements_jsonl.into_bytes(),
            "application/jsonl",
            HashMap::new(),
        )
        .await?;

    objects
        .put(
            &format!("{prefix}/text.txt"),
            text_content.clone().into_bytes(),
            "text/plain; charset=utf-8",
            HashMap::new(),
        )
        .await?;

    let meta_json = serde_json::to_vec_pretty(&meta).unwrap_or_default();
    objects
        .put(&format!("{prefix}/meta.json"), meta_json, "application/json", HashMap::new())
        .await?;

    Ok(text_content)
}
