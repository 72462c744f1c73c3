use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sync,
    Process,
    Index,
    Full,
    Migrate,
    Stats,
    Cleanup,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub synced: Option<ingest_sync::SyncOutcome>,
    pub extracted: Option<ExtractionCounts>,
    pub indexed: Option<IndexCounts>,
    pub stale_swept: u64,
    pub migrated: u64,
    pub stats: Option<ingest_domain::PipelineStatistics>,
    pub errors: Vec<String>,
}

/// Plain-data mirror of `ingest_extract::ExtractionOutcome`, kept Serialize
/// so reports round-trip through JSON for the `stats`/CLI output path.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ExtractionCounts {
    pub successful: usize,
    pub failed: usize,
}

impl From<ingest_extract::ExtractionOutcome> for ExtractionCounts {
    fn from(o: ingest_extract::ExtractionOutcome) -> Self {
        Self { successful: o.successful, failed: o.failed }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IndexCounts {
    pub successful: usize,
    pub failed: usize,
}

impl From<ingest_index::IndexOutcome> for IndexCounts {
    fn from(o: ingest_index::IndexOutcome) -> Self {
        Self { successful: o.successful, failed: o.failed }
    }
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run, ..Default::default() }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
