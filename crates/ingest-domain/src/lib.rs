mod error;
mod types;

pub use error::DomainError;
pub use types::{
    ContentRecord, ContentStatus, DerivativeMeta, Digest, Element, ErrorBlock, ErrorKind,
    OriginId, OriginMapping, OriginSnapshot, PipelineStatistics, ProcessingStrategy,
};
