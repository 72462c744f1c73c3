use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ingest_domain::{ContentRecord, Digest, OriginId, OriginMapping, OriginSnapshot};
use ingest_drive::{DriveFile, DriveSource};
use ingest_objectstore::ObjectStore;
use ingest_store::StateStore;
use sha2::{Digest as _, Sha256};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::mime::content_type_for_extension;

pub const CHECKPOINT_NAME: &str = "drive_sync_last_modified";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub folder_id: String,
    pub supported_extensions: Vec<String>,
    pub max_new_uploads: Option<usize>,
    pub force_full_sync: bool,
    pub concurrency: usize,
    pub checkpoint_every: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            folder_id: String::new(),
            supported_extensions: Vec::new(),
            max_new_uploads: None,
            force_full_sync: false,
            concurrency: 10,
            checkpoint_every: 20,
        }
    }
}

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct SyncOutcome {
    pub new_uploads: usize,
    pub dedupe_links: usize,
    pub metadata_updates: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemOutcome {
    Skip,
    MetadataOnly,
    DedupeLink,
    NewUpload,
}

fn snapshot_of(file: &DriveFile) -> OriginSnapshot {
    OriginSnapshot {
        name: file.name.clone(),
        path: file.path.clone(),
        mime: Some(file.mime_type.clone()),
        created_at: chrono::DateTime::parse_from_rfc3339(&file.created_time).ok().map(|t| t.with_timezone(&chrono::Utc)),
        modified_at: chrono::DateTime::parse_from_rfc3339(&file.modified_time).ok().map(|t| t.with_timezone(&chrono::Utc)),
    }
}

/// Runs the four-step sync algorithm over every item `drive` reports under
/// `config.folder_id`, advancing the `drive_sync_last_modified` checkpoint
/// as new uploads land. `max_new_uploads`, if set, bounds state-changing
/// work only — items already skipped or deduped do not count against it.
pub async fn run_sync(
    drive: Arc<dyn DriveSource>,
    objects: Arc<dyn ObjectStore>,
    store: Arc<dyn StateStore>,
    config: SyncConfig,
) -> Result<SyncOutcome, SyncError> {
    let checkpoint = if config.force_full_sync { None } else { store.get_checkpoint(CHECKPOINT_NAME).await?.map(|v| v) };

    info!(folder_id = %config.folder_id, ?checkpoint, force_full = config.force_full_sync, "starting drive sync");

    // `max_new_uploads` bounds state-changing work only (enforced in the
    // loop below); the drive traversal itself must not be capped, or
    // already-synced items ahead of newer ones in listing order would
    // starve the cap before any new upload is ever seen.
    let files = drive.enumerate(&config.folder_id, checkpoint.as_deref(), &config.supported_extensions, None).await?;

    if files.is_empty() {
        info!("no files found to sync");
        return Ok(SyncOutcome::default());
    }

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let new_uploads = Arc::new(AtomicUsize::new(0));
    let outcome = Arc::new(tokio::sync::Mutex::new(SyncOutcome::default()));
    let latest_modified = Arc::new(tokio::sync::Mutex::new(checkpoint.clone()));
    let processed_since_checkpoint = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for file in files {
        if let Some(cap) = config.max_new_uploads {
            if new_uploads.load(Ordering::SeqCst) >= cap {
                break;
            }
        }
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let drive = drive.clone();
        let objects = objects.clone();
        let store = store.clone();
        let new_uploads = new_uploads.clone();
        let outcome = outcome.clone();
        let latest_modified = latest_modified.clone();
        let processed_since_checkpoint = processed_since_checkpoint.clone();
        let checkpoint_every = config.checkpoint_every.max(1);

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            let modified_time = file.modified_time.clone();
            let result = sync_one_item(drive.as_ref(), objects.as_ref(), store.as_ref(), &file).await;

            let mut out = outcome.lock().await;
            match result {
                Ok(ItemOutcome::Skip) => out.skipped += 1,
                Ok(ItemOutcome::MetadataOnly) => out.metadata_updates += 1,
                Ok(ItemOutcome::DedupeLink) => out.dedupe_links += 1,
                Ok(ItemOutcome::NewUpload) => {
                    out.new_uploads += 1;
                    new_uploads.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!(origin_id = %file.id, error = %e, "sync item failed");
                    out.failed += 1;
                    return;
                }
            }
            drop(out);

            let mut latest = latest_modified.lock().await;
            if latest.as_deref().map(|m| modified_time.as_str() > m).unwrap_or(true) {
                *latest = Some(modified_time);
            }
            drop(latest);

            let count = processed_since_checkpoint.fetch_add(1, Ordering::SeqCst) + 1;
            if count % checkpoint_every == 0 {
                if let Some(watermark) = latest_modified.lock().await.clone() {
                    if let Err(e) = store.set_checkpoint(CHECKPOINT_NAME, &watermark, chrono::Utc::now()).await {
                        warn!(error = %e, "failed to persist checkpoint mid-run");
                    }
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    if let Some(watermark) = latest_modified.lock().await.clone() {
        store.set_checkpoint(CHECKPOINT_NAME, &watermark, chrono::Utc::now()).await?;
    }

    let final_outcome = outcome.lock().await.clone();
    info!(
        new = final_outcome.new_uploads,
        dedupe = final_outcome.dedupe_links,
        metadata = final_outcome.metadata_updates,
        skipped = final_outcome.skipped,
        failed = final_outcome.failed,
        "sync complete"
    );
    Ok(final_outcome)
}

async fn sync_one_item(drive: &dyn DriveSource, objects: &dyn ObjectStore, store: &dyn StateStore, file: &DriveFile) -> Result<ItemOutcome, SyncError> {
    let origin_id = OriginId::new(file.id.clone());
    let snapshot = snapshot_of(file);
    let now = chrono::Utc::now();

    // Step 1: origin fast-path.
    if let Some(existing) = store.get_origin_mapping(&origin_id).await? {
        if existing.snapshot == snapshot {
            debug!(origin_id = %origin_id, "already synced, unchanged");
            return Ok(ItemOutcome::Skip);
        }

        debug!(origin_id = %origin_id, "origin renamed or moved, updating metadata only");
        let mut metadata = HashMap::new();
        metadata.insert("digest".to_string(), existing.digest.as_str().to_string());
        metadata.insert("origin-id".to_string(), origin_id.as_str().to_string());
        metadata.insert("original-name".to_string(), snapshot.name.clone());
        metadata.insert("origin-path".to_string(), snapshot.path.clone());
        objects.replace_metadata(&existing.digest.object_key(&extension_of(&file.export_file_name())), metadata).await?;

        let updated = OriginMapping { snapshot, updated_at: now, ..existing };
        store.upsert_origin_mapping(&updated).await?;
        return Ok(ItemOutcome::MetadataOnly);
    }

    // Step 2: download and digest.
    let payload = drive.fetch(file).await?;
    let digest_hex = hex_sha256(&payload);
    let digest = Digest::new(digest_hex)?;
    let extension = extension_of(&file.export_file_name());
    let object_key = digest.object_key(&extension);

    // Step 3: content fast-path.
    if store.get_content_by_digest(&digest).await?.is_some() {
        debug!(origin_id = %origin_id, digest = %digest, "content already present, linking origin");
        let mapping = OriginMapping::new(origin_id, digest, snapshot, now);
        store.upsert_origin_mapping(&mapping).await?;
        return Ok(ItemOutcome::DedupeLink);
    }

    // Step 4: upload.
    let mut metadata = HashMap::new();
    metadata.insert("digest".to_string(), digest.as_str().to_string());
    metadata.insert("origin-id".to_string(), origin_id.as_str().to_string());
    metadata.insert("original-name".to_string(), snapshot.name.clone());
    metadata.insert("origin-path".to_string(), snapshot.path.clone());

    objects.put(&object_key, payload.clone(), content_type_for_extension(&extension), metadata).await?;

    let mut record = ContentRecord::new(digest.clone(), object_key, extension, snapshot.clone(), now);
    record.original_file_size = Some(payload.len() as i64);
    store.upsert_content(&record).await?;

    let mapping = OriginMapping::new(origin_id, digest, snapshot, now);
    store.upsert_origin_mapping(&mapping).await?;

    Ok(ItemOutcome::NewUpload)
}

fn extension_of(name: &str) -> String {
    std::path::Path::new(name).extension().map(|e| format!(".{}", e.to_string_lossy().to_lowercase())).unwrap_or_default()
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_objectstore::LocalObjectStore;
    use ingest_store::InMemoryStore;

    struct FakeDrive {
        files: Vec<DriveFile>,
        content: HashMap<String, Vec<u8>>,
    }

    #[async_trait::async_trait]
    impl DriveSource for FakeDrive {
        async fn enumerate(
            &self,
            _folder_id: &str,
            _modified_after: Option<&str>,
            _extensions: &[String],
            _max_files: Option<usize>,
        ) -> Result<Vec<DriveFile>, ingest_drive::DriveError> {
            Ok(self.files.clone())
        }

        async fn fetch(&self, file: &DriveFile) -> Result<Vec<u8>, ingest_drive::DriveError> {
            Ok(self.content.get(&file.id).cloned().unwrap_or_default())
        }
    }

    fn file(id: &str, name: &str) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: "text/plain".into(),
            path: name.to_string(),
            modified_time: "2026-01-01T00:00:00Z".into(),
            created_time: "2026-01-01T00:00:00Z".into(),
            size: None,
        }
    }

    #[tokio::test]
    async fn new_file_is_uploaded_and_recorded() {
        let drive = Arc::new(FakeDrive { files: vec![file("id-1", "a.txt")], content: HashMap::from([("id-1".to_string(), b"hello".to_vec())]) });
        let dir = tempfile::tempdir().unwrap();
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());

        let outcome = run_sync(drive, objects, store.clone(), SyncConfig { supported_extensions: vec![".txt".into()], ..Default::default() }).await.unwrap();

        assert_eq!(outcome.new_uploads, 1);
        let mapping = store.get_origin_mapping(&OriginId::new("id-1")).await.unwrap().unwrap();
        let record = store.get_content_by_digest(&mapping.digest).await.unwrap().unwrap();
        assert_eq!(record.original_file_size, Some(5));
    }

    #[tokio::test]
    async fn second_run_with_unchanged_snapshot_skips() {
        let drive: Arc<dyn DriveSource> =
            Arc::new(FakeDrive { files: vec![file("id-1", "a.txt")], content: HashMap::from([("id-1".to_string(), b"hello".to_vec())]) });
        let dir = tempfile::tempdir().unwrap();
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());

        let config = SyncConfig { supported_extensions: vec![".txt".into()], force_full_sync: true, ..Default::default() };
        run_sync(drive.clone(), objects.clone(), store.clone(), config.clone()).await.unwrap();
        let second = run_sync(drive, objects, store, config).await.unwrap();

        assert_eq!(second.new_uploads, 0);
        assert_eq!(second.skipped, 1);
    }

    #[tokio::test]
    async fn duplicate_content_from_new_origin_links_without_reupload() {
        let content = HashMap::from([("id-1".to_string(), b"same bytes".to_vec()), ("id-2".to_string(), b"same bytes".to_vec())]);
        let drive: Arc<dyn DriveSource> = Arc::new(FakeDrive { files: vec![file("id-1", "a.txt"), file("id-2", "b.txt")], content });
        let dir = tempfile::tempdir().unwrap();
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());

        let outcome = run_sync(drive, objects, store, SyncConfig { supported_extensions: vec![".txt".into()], concurrency: 1, ..Default::default() }).await.unwrap();

        assert_eq!(outcome.new_uploads, 1);
        assert_eq!(outcome.dedupe_links, 1);
    }
}
