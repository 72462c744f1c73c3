use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("domain error: {0}")]
    Domain(#[from] ingest_domain::DomainError),
}
