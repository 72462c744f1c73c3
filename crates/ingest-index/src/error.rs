use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    ObjectStore(#[from] ingest_objectstore::ObjectStoreError),

    #[error(transparent)]
    Store(#[from] ingest_store::StoreError),

    #[error(transparent)]
    Domain(#[from] ingest_domain::DomainError),

    #[error("vector service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vector service returned rate limit (429)")]
    RateLimited,

    #[error("vector service returned server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("vector service returned client error {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("exhausted retries after {0} attempts")]
    RetriesExhausted(u32),
}

impl IndexError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerError { .. })
            || matches!(self, Self::ObjectStore(e) if e.is_transient())
    }
}
