mod error;
mod local;
mod metadata;
mod s3;
mod store;

pub use error::ObjectStoreError;
pub use local::LocalObjectStore;
pub use metadata::{decode_metadata_value, encode_metadata_value};
pub use s3::{S3Config, S3ObjectStore};
pub use store::{ObjectMetadata, ObjectStore, ObjectVersion};
