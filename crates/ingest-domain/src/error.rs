use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("invalid content status: {0}")]
    InvalidStatus(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
