use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ingest_config::ConfigError),

    #[error(transparent)]
    Store(#[from] ingest_store::StoreError),

    #[error(transparent)]
    ObjectStore(#[from] ingest_objectstore::ObjectStoreError),

    #[error(transparent)]
    Domain(#[from] ingest_domain::DomainError),

    #[error(transparent)]
    Drive(#[from] ingest_drive::DriveError),

    #[error(transparent)]
    Sync(#[from] ingest_sync::SyncError),

    #[error(transparent)]
    Extract(#[from] ingest_extract::ExtractError),

    #[error(transparent)]
    Index(#[from] ingest_index::IndexError),

    #[error("internal error: {0}")]
    Internal(String),
}
