mod error;
mod google;
mod local;
mod source;

pub use error::DriveError;
pub use google::GoogleDriveSource;
pub use local::LocalDriveSource;
pub use source::{export_mapping, is_folder, DriveFile, DriveSource, GOOGLE_MIME_EXPORTS};
