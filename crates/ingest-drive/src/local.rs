use async_trait::async_trait;
use tokio::fs;

use crate::error::DriveError;
use crate::source::{DriveFile, DriveSource};

/// Directory-backed `DriveSource` used in tests and local dry runs: walks a
/// filesystem tree instead of calling the Drive API, treating each file's
/// relative path as its Drive "path" and its absolute path as its "id".
pub struct LocalDriveSource {
    root: std::path::PathBuf,
}

impl LocalDriveSource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DriveSource for LocalDriveSource {
    async fn enumerate(
        &self,
        folder_id: &str,
        modified_after: Option<&str>,
        supported_extensions: &[String],
        max_files: Option<usize>,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let start = if folder_id.is_empty() || folder_id == "root" { self.root.clone() } else { self.root.join(folder_id) };
        let mut results = Vec::new();
        let mut stack = vec![(start, String::new())];

        while let Some((dir, path_prefix)) = stack.pop() {
            if let Some(limit) = max_files {
                if results.len() >= limit {
                    break;
                }
            }
            let mut entries = fs::read_dir(&dir).await.map_err(|e| DriveError::Transient(e.to_string()))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| DriveError::Transient(e.to_string()))? {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                let item_path = if path_prefix.is_empty() { name.clone() } else { format!("{path_prefix}/{name}") };
                if path.is_dir() {
                    stack.push((path, item_path));
                    continue;
                }
                let ext = path.extension().map(|e| format!(".{}", e.to_string_lossy().to_lowercase())).unwrap_or_default();
                if !supported_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
                    continue;
                }
                let metadata = fs::metadata(&path).await.map_err(|e| DriveError::Transient(e.to_string()))?;
                let modified_time = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| chrono::DateTime::from_timestamp(d.as_secs() as i64, 0).unwrap_or_default().to_rfc3339())
                    .unwrap_or_default();
                if let Some(cutoff) = modified_after {
                    if modified_time.as_str() <= cutoff {
                        continue;
                    }
                }
                results.push(DriveFile {
                    id: path.to_string_lossy().into_owned(),
                    name,
                    mime_type: "application/octet-stream".into(),
                    path: item_path,
                    modified_time: modified_time.clone(),
                    created_time: modified_time,
                    size: Some(metadata.len()),
                });
            }
        }
        Ok(results)
    }

    async fn fetch(&self, file: &DriveFile) -> Result<Vec<u8>, DriveError> {
        fs::read(&file.id).await.map_err(|e| DriveError::NotFound(format!("{}: {e}", file.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enumerate_finds_nested_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"pdf").unwrap();
        std::fs::write(dir.path().join("sub/b.png"), b"png").unwrap();
        std::fs::write(dir.path().join("sub/c.txt"), b"txt").unwrap();

        let source = LocalDriveSource::new(dir.path());
        let exts = vec![".pdf".to_string(), ".txt".to_string()];
        let mut files = source.enumerate("root", None, &exts, None).await.unwrap();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a.pdf");
        assert_eq!(files[1].name, "c.txt");
    }

    #[tokio::test]
    async fn fetch_reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"payload").unwrap();
        let source = LocalDriveSource::new(dir.path());
        let files = source.enumerate("root", None, &[".pdf".to_string()], None).await.unwrap();
        let bytes = source.fetch(&files[0]).await.unwrap();
        assert_eq!(bytes, b"payload");
    }
}
