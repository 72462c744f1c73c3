use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::ObjectStoreError;
use crate::store::{ObjectMetadata, ObjectStore, ObjectVersion};

/// Filesystem-backed `ObjectStore` for tests and local runs without a real
/// S3-compatible endpoint. Metadata is sidecar JSON next to each payload
/// file; there is no versioning, so `list_versions` mirrors `list`.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        let mut path = self.payload_path(key).into_os_string();
        path.push(".meta.json");
        PathBuf::from(path)
    }

    async fn write_meta(&self, key: &str, meta: &ObjectMetadata) -> Result<(), ObjectStoreError> {
        let path = self.meta_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec(&StoredMeta::from(meta)).map_err(|e| ObjectStoreError::Permanent(e.to_string()))?;
        fs::write(path, body).await?;
        Ok(())
    }

    async fn read_meta(&self, key: &str) -> Result<ObjectMetadata, ObjectStoreError> {
        let path = self.meta_path(key);
        let body = fs::read(&path).await.map_err(|_| ObjectStoreError::NotFound(key.to_string()))?;
        let stored: StoredMeta = serde_json::from_slice(&body).map_err(|e| ObjectStoreError::Permanent(e.to_string()))?;
        Ok(stored.into())
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredMeta {
    content_type: Option<String>,
    user_metadata: HashMap<String, String>,
}

impl From<&ObjectMetadata> for StoredMeta {
    fn from(m: &ObjectMetadata) -> Self {
        Self { content_type: m.content_type.clone(), user_metadata: m.user_metadata.clone() }
    }
}

impl From<StoredMeta> for ObjectMetadata {
    fn from(m: StoredMeta) -> Self {
        Self { content_type: m.content_type, user_metadata: m.user_metadata }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        Ok(fs::metadata(self.payload_path(key)).await.is_ok())
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata, ObjectStoreError> {
        if !self.exists(key).await? {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        self.read_meta(key).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        fs::read(self.payload_path(key)).await.map_err(|_| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str, user_metadata: HashMap<String, String>) -> Result<(), ObjectStoreError> {
        let path = self.payload_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&path).await?;
        file.write_all(&body).await?;
        self.write_meta(key, &ObjectMetadata { content_type: Some(content_type.to_string()), user_metadata }).await
    }

    async fn replace_metadata(&self, key: &str, user_metadata: HashMap<String, String>) -> Result<(), ObjectStoreError> {
        let mut meta = self.head(key).await?;
        meta.user_metadata = user_metadata;
        self.write_meta(key, &meta).await
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let _ = fs::remove_file(self.payload_path(key)).await;
        let _ = fs::remove_file(self.meta_path(key)).await;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let mut out = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(_) => continue,
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    continue;
                }
                if let Ok(rel) = path.strip_prefix(&self.root) {
                    let key = rel.to_string_lossy().replace('\\', "/");
                    if key.starts_with(prefix) {
                        out.push(key);
                    }
                }
            }
        }
        out.sort();
        Ok(out)
    }

    async fn list_versions(&self, prefix: &str) -> Result<Vec<ObjectVersion>, ObjectStoreError> {
        Ok(self.list(prefix).await?.into_iter().map(|key| ObjectVersion { key, version_id: "null".into(), is_delete_marker: false }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("objects/ab/cd/digest.pdf", b"hello".to_vec(), "application/pdf", HashMap::new()).await.unwrap();
        assert_eq!(store.get("objects/ab/cd/digest.pdf").await.unwrap(), b"hello");
        assert!(store.exists("objects/ab/cd/digest.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn replace_metadata_preserves_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let mut meta = HashMap::new();
        meta.insert("digest".to_string(), "abc".to_string());
        store.put("k", b"payload".to_vec(), "text/plain", meta).await.unwrap();

        let mut updated = HashMap::new();
        updated.insert("digest".to_string(), "abc".to_string());
        updated.insert("origin_name".to_string(), "renamed.txt".to_string());
        store.replace_metadata("k", updated).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), b"payload");
        let head = store.head("k").await.unwrap();
        assert_eq!(head.user_metadata.get("origin_name").unwrap(), "renamed.txt");
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("objects/ab/one", b"1".to_vec(), "text/plain", HashMap::new()).await.unwrap();
        store.put("objects/cd/two", b"2".to_vec(), "text/plain", HashMap::new()).await.unwrap();
        let listed = store.list("objects/ab").await.unwrap();
        assert_eq!(listed, vec!["objects/ab/one".to_string()]);
    }
}
