use std::fmt;

use serde::{Deserialize, Serialize};

/// A SHA-256 content digest, always lowercase hex, always 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest(String);

impl Digest {
    pub fn new(hex: impl Into<String>) -> Result<Self, crate::error::DomainError> {
        let hex = hex.into();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::error::DomainError::InvalidDigest(hex));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two-level shard prefix used to derive CAS keys: `digest[0:2]`, `digest[2:4]`.
    pub fn shard(&self) -> (&str, &str) {
        (&self.0[0..2], &self.0[2..4])
    }

    /// `objects/{shard1}/{shard2}/{digest}{ext}`
    pub fn object_key(&self, extension: &str) -> String {
        let (a, b) = self.shard();
        format!("objects/{a}/{b}/{}{extension}", self.0)
    }

    /// `derivatives/{shard1}/{shard2}/{digest}/`
    pub fn derivative_prefix(&self) -> String {
        let (a, b) = self.shard();
        format!("derivatives/{a}/{b}/{}", self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned by the origin drive to a single item. Opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginId(String);

impl OriginId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a `ContentRecord`. Progresses along the directed graph
/// documented alongside the pipeline design: synced -> processing -> processed
/// -> indexing -> indexed, with a `failed_*` sibling reachable from each
/// in-flight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Synced,
    Processing,
    Processed,
    Indexing,
    Indexed,
    FailedSync,
    FailedProcess,
    FailedIndex,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Indexing => "indexing",
            Self::Indexed => "indexed",
            Self::FailedSync => "failed_sync",
            Self::FailedProcess => "failed_process",
            Self::FailedIndex => "failed_index",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::FailedSync | Self::FailedProcess | Self::FailedIndex)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Processing | Self::Indexing)
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentStatus {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "synced" => Self::Synced,
            "processing" => Self::Processing,
            "processed" => Self::Processed,
            "indexing" => Self::Indexing,
            "indexed" => Self::Indexed,
            "failed_sync" => Self::FailedSync,
            "failed_process" => Self::FailedProcess,
            "failed_index" => Self::FailedIndex,
            other => return Err(crate::error::DomainError::InvalidStatus(other.to_string())),
        })
    }
}

/// Strategy the extraction stage used to produce a derivative bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStrategy {
    Native,
    Fast,
    Ocr,
    FastFallback,
}

impl fmt::Display for ProcessingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Native => "native",
            Self::Fast => "fast",
            Self::Ocr => "ocr",
            Self::FastFallback => "fast_fallback",
        };
        f.write_str(s)
    }
}

/// Classification of a failure, independent of any particular error type.
/// Drives retry policy: `TransientBackend` is retried locally with backoff,
/// everything else is terminal for the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransientBackend,
    OcrTimeout,
    EmptyContent,
    StaleProcessing,
    Permanent,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TransientBackend => "TransientBackend",
            Self::OcrTimeout => "OcrTimeout",
            Self::EmptyContent => "EmptyContent",
            Self::StaleProcessing => "StaleProcessing",
            Self::Permanent => "Permanent",
        };
        f.write_str(s)
    }
}

impl ErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::TransientBackend)
    }
}

/// The last recorded error on a `ContentRecord`, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBlock {
    pub message: Option<String>,
    pub kind: Option<ErrorKind>,
    pub retry_count: u32,
    pub last_error_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ErrorBlock {
    pub fn record(&mut self, kind: ErrorKind, message: impl Into<String>, now: chrono::DateTime<chrono::Utc>) {
        self.message = Some(message.into());
        self.kind = Some(kind);
        self.retry_count += 1;
        self.last_error_at = Some(now);
    }

    /// Clear the message/kind on a successful transition. `retry_count` and
    /// `last_error_at` are observability history and are never cleared.
    pub fn clear(&mut self) {
        self.message = None;
        self.kind = None;
    }
}

/// A snapshot of the attributes the origin drive reports for an item, copied
/// onto both `ContentRecord` (most-recently-seen origin) and `OriginMapping`
/// (this origin's own view).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginSnapshot {
    pub name: String,
    pub path: String,
    pub mime: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub modified_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The central entity: one row per distinct content digest, tracking its
/// lifecycle across sync, extraction, and indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub digest: Digest,
    pub object_key: String,
    pub extension: String,
    pub status: ContentStatus,

    pub synced_at: Option<chrono::DateTime<chrono::Utc>>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub indexed_at: Option<chrono::DateTime<chrono::Utc>>,

    pub origin: OriginSnapshot,
    pub original_file_size: Option<i64>,
    pub processed_text_size: Option<i64>,

    pub openai_file_id: Option<String>,
    pub vector_store_id: Option<String>,

    pub error: ErrorBlock,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ContentRecord {
    pub fn new(digest: Digest, object_key: String, extension: String, origin: OriginSnapshot, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            digest,
            object_key,
            extension,
            status: ContentStatus::Synced,
            synced_at: Some(now),
            processed_at: None,
            indexed_at: None,
            origin,
            original_file_size: None,
            processed_text_size: None,
            openai_file_id: None,
            vector_store_id: None,
            error: ErrorBlock::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition into `processing`, clearing any prior error. The guard that
    /// makes retries safe: a reader observing `processing` knows a worker
    /// currently owns this digest.
    pub fn mark_processing(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.status = ContentStatus::Processing;
        self.error.clear();
        self.updated_at = now;
    }

    pub fn mark_processed(&mut self, now: chrono::DateTime<chrono::Utc>, text_size: i64) {
        self.status = ContentStatus::Processed;
        if self.processed_at.is_none() {
            self.processed_at = Some(now);
        }
        self.processed_text_size = Some(text_size);
        self.error.clear();
        self.updated_at = now;
    }

    pub fn mark_indexing(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.status = ContentStatus::Indexing;
        self.error.clear();
        self.updated_at = now;
    }

    pub fn mark_indexed(&mut self, now: chrono::DateTime<chrono::Utc>, openai_file_id: String, vector_store_id: String) {
        self.status = ContentStatus::Indexed;
        if self.indexed_at.is_none() {
            self.indexed_at = Some(now);
        }
        self.openai_file_id = Some(openai_file_id);
        self.vector_store_id = Some(vector_store_id);
        self.error.clear();
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, status: ContentStatus, kind: ErrorKind, message: impl Into<String>, now: chrono::DateTime<chrono::Utc>) {
        debug_assert!(status.is_failed());
        self.status = status;
        self.error.record(kind, message, now);
        self.updated_at = now;
    }

    pub fn touch_origin(&mut self, origin: OriginSnapshot, now: chrono::DateTime<chrono::Utc>) {
        self.origin = origin;
        self.updated_at = now;
    }
}

/// Many-to-one mapping from an origin item to the content it currently
/// resolves to. Decouples origin identity from content identity so renames
/// are free and cross-origin duplicates dedupe onto one `ContentRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginMapping {
    pub origin_id: OriginId,
    pub digest: Digest,
    pub snapshot: OriginSnapshot,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl OriginMapping {
    pub fn new(origin_id: OriginId, digest: Digest, snapshot: OriginSnapshot, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self { origin_id, digest, snapshot, created_at: now, updated_at: now }
    }
}

/// One element produced by the extraction partitioner: a paragraph, heading,
/// table cell, and so on, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub element_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// `derivatives/.../meta.json` — required keys documented alongside the
/// extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivativeMeta {
    pub digest: String,
    pub original_name: String,
    pub object_key: String,
    pub extension: String,
    pub element_count: usize,
    pub text_length: usize,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<chrono::DateTime<chrono::Utc>>,
    pub processed_at: chrono::DateTime<chrono::Utc>,
    pub processing_strategy: ProcessingStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_modified_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_mime: Option<String>,
}

/// Aggregate counts for operational visibility (`stats` subcommand).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStatistics {
    pub total: u64,
    pub by_status: std::collections::BTreeMap<String, u64>,
    pub with_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_rejects_wrong_length() {
        assert!(Digest::new("abc").is_err());
    }

    #[test]
    fn digest_lowercases() {
        let d = Digest::new("A".repeat(64)).unwrap();
        assert_eq!(d.as_str(), "a".repeat(64));
    }

    #[test]
    fn object_key_is_sharded() {
        let d = Digest::new("0123456789abcdef".repeat(4)).unwrap();
        assert_eq!(d.object_key(".txt"), format!("objects/01/23/{}.txt", d.as_str()));
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in ["synced", "processing", "processed", "indexing", "indexed", "failed_sync", "failed_process", "failed_index"] {
            let parsed: ContentStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn error_block_is_additive() {
        let mut e = ErrorBlock::default();
        let t0 = chrono::Utc::now();
        e.record(ErrorKind::TransientBackend, "boom", t0);
        e.record(ErrorKind::TransientBackend, "boom again", t0);
        assert_eq!(e.retry_count, 2);
        e.clear();
        assert!(e.message.is_none());
        assert_eq!(e.retry_count, 2, "retry_count survives a clear");
    }

    #[test]
    fn mark_processed_sets_timestamp_only_once() {
        let snap = OriginSnapshot::default();
        let t0 = chrono::Utc::now();
        let d = Digest::new("f".repeat(64)).unwrap();
        let mut r = ContentRecord::new(d, "objects/f/f/x.txt".into(), ".txt".into(), snap, t0);
        let t1 = t0 + chrono::Duration::seconds(10);
        r.mark_processed(t1, 100);
        assert_eq!(r.processed_at, Some(t1));
        let t2 = t1 + chrono::Duration::seconds(10);
        r.mark_processed(t2, 200);
        assert_eq!(r.processed_at, Some(t1), "first-success timestamp is monotonic");
    }
}
