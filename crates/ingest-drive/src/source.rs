use async_trait::async_trait;

use crate::error::DriveError;

/// Google Workspace MIME types that must be exported to a concrete
/// document format rather than downloaded verbatim, keyed to the export
/// MIME type and the file extension the export should carry.
pub const GOOGLE_MIME_EXPORTS: &[(&str, &str, &str)] = &[
    (
        "application/vnd.google-apps.document",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    (
        "application/vnd.google-apps.presentation",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    (
        "application/vnd.google-apps.spreadsheet",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
];

pub fn export_mapping(mime_type: &str) -> Option<(&'static str, &'static str)> {
    GOOGLE_MIME_EXPORTS.iter().find(|(source, _, _)| *source == mime_type).map(|(_, export_mime, ext)| (*export_mime, *ext))
}

pub fn is_folder(mime_type: &str) -> bool {
    mime_type == "application/vnd.google-apps.folder"
}

#[derive(Debug, Clone)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub path: String,
    pub modified_time: String,
    pub created_time: String,
    pub size: Option<u64>,
}

impl DriveFile {
    /// The filename this item should carry once downloaded, accounting for
    /// Workspace export extensions (e.g. a Google Doc becomes `report.docx`).
    pub fn export_file_name(&self) -> String {
        match export_mapping(&self.mime_type) {
            Some((_, ext)) => {
                let stem = std::path::Path::new(&self.name).file_stem().and_then(|s| s.to_str()).unwrap_or(&self.name);
                format!("{stem}{ext}")
            }
            None => self.name.clone(),
        }
    }
}

/// Adapter over a remote drive-like document source. `enumerate` must
/// recurse through subfolders and filter to files the pipeline can ingest;
/// `fetch` must transparently export Workspace-native documents.
#[async_trait]
pub trait DriveSource: Send + Sync + 'static {
    async fn enumerate(
        &self,
        folder_id: &str,
        modified_after: Option<&str>,
        supported_extensions: &[String],
        max_files: Option<usize>,
    ) -> Result<Vec<DriveFile>, DriveError>;

    async fn fetch(&self, file: &DriveFile) -> Result<Vec<u8>, DriveError>;
}
