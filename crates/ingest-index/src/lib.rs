mod backoff;
mod error;
mod pool;
mod vector_client;
mod worker;

pub use error::IndexError;
pub use pool::{run_indexing, IndexConfig, IndexOutcome};
pub use vector_client::VectorServiceClient;
pub use worker::index_one;
