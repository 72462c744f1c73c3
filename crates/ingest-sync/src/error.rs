use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Drive(#[from] ingest_drive::DriveError),

    #[error(transparent)]
    ObjectStore(#[from] ingest_objectstore::ObjectStoreError),

    #[error(transparent)]
    Store(#[from] ingest_store::StoreError),

    #[error(transparent)]
    Domain(#[from] ingest_domain::DomainError),
}
