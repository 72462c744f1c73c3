use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    ObjectStore(#[from] ingest_objectstore::ObjectStoreError),

    #[error(transparent)]
    Store(#[from] ingest_store::StoreError),

    #[error(transparent)]
    Domain(#[from] ingest_domain::DomainError),

    #[error("partitioner '{binary}' failed: {message}")]
    PartitionerFailed { binary: String, message: String },

    #[error("partitioning of '{0}' exceeded its timeout")]
    Timeout(String),

    #[error("no text extracted from document")]
    EmptyContent,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker pool error: {0}")]
    Pool(String),
}

impl ExtractError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ObjectStore(e) if e.is_transient())
    }
}
