use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content record not found for digest: {0}")]
    DigestNotFound(String),

    #[error("origin mapping not found for origin id: {0}")]
    OriginNotFound(String),

    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal store error: {0}")]
    Internal(String),
}
