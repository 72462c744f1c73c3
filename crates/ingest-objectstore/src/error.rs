use thiserror::Error;

/// Every object-store operation fails with one of these. `Transient` errors
/// are eligible for the caller's backoff policy; `Permanent` errors should
/// surface immediately.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("permanent backend error: {0}")]
    Permanent(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectStoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
