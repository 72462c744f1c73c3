use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ObjectStoreError;

#[derive(Debug, Clone, Default)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub user_metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub is_delete_marker: bool,
}

/// Content-addressed object store adapter. `put` must be idempotent at the
/// byte level for identical payloads and must not require a read before
/// write. `replace_metadata` must preserve payload bytes and the `digest`
/// user-metadata field callers rely on as a self-describing identity check.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;

    async fn head(&self, key: &str) -> Result<ObjectMetadata, ObjectStoreError>;

    /// Full object payload. Callers needing incremental hashing read this
    /// in bounded-size chunks via `Vec<u8>::chunks`; the backend itself
    /// streams the HTTP response body rather than buffering at the
    /// transport layer.
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        user_metadata: HashMap<String, String>,
    ) -> Result<(), ObjectStoreError>;

    /// Copy-in-place with new metadata. Must preserve the `digest` field.
    async fn replace_metadata(&self, key: &str, user_metadata: HashMap<String, String>) -> Result<(), ObjectStoreError>;

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;

    async fn list_versions(&self, prefix: &str) -> Result<Vec<ObjectVersion>, ObjectStoreError>;
}
