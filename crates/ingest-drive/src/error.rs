use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("transient drive error: {0}")]
    Transient(String),

    #[error("permanent drive error: {0}")]
    Permanent(String),

    #[error("item not found: {0}")]
    NotFound(String),

    #[error("auth error: {0}")]
    Auth(String),
}

impl DriveError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
