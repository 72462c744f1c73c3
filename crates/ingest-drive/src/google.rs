use std::collections::VecDeque;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::DriveError;
use crate::source::{export_mapping, is_folder, DriveFile, DriveSource};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Abstraction over Drive token acquisition — mirrors the object-store and
/// future index-client auth seams so tests never touch a real IdP.
#[async_trait]
trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, DriveError>;
}

struct AdcTokenProvider {
    inner: std::sync::Arc<dyn gcp_auth::TokenProvider>,
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn token(&self) -> Result<String, DriveError> {
        let token = self.inner.token(&[SCOPE]).await.map_err(|e| DriveError::Auth(format!("drive auth failed: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, DriveError> {
        Ok(self.0.clone())
    }
}

pub struct GoogleDriveSource {
    client: reqwest::Client,
    token: Box<dyn TokenProvider>,
    base: String,
}

impl GoogleDriveSource {
    /// Build a client backed by a service-account key file, resolved the
    /// way Application Default Credentials normally would: set
    /// `GOOGLE_APPLICATION_CREDENTIALS` to the configured file path before
    /// calling this constructor.
    pub async fn from_service_account_file(path: &str) -> Result<Self, DriveError> {
        std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", path);
        let inner = gcp_auth::provider().await.map_err(|e| DriveError::Auth(format!("failed to initialize drive credentials: {e}")))?;
        Ok(Self { client: reqwest::Client::new(), token: Box::new(AdcTokenProvider { inner }), base: DRIVE_API_BASE.to_string() })
    }

    #[cfg(test)]
    fn with_static_token(token: &str, base: &str) -> Self {
        Self { client: reqwest::Client::new(), token: Box::new(StaticToken(token.to_string())), base: base.to_string() }
    }

    async fn bearer(&self) -> Result<String, DriveError> {
        self.token.token().await
    }

    async fn list_page(&self, folder_id: &str, modified_after: Option<&str>, page_token: Option<&str>) -> Result<FileListResponse, DriveError> {
        let mut query = format!("'{folder_id}' in parents and trashed=false");
        if let Some(ts) = modified_after {
            query.push_str(&format!(" and modifiedTime > '{ts}'"));
        }
        let token = self.bearer().await?;
        let mut req = self
            .client
            .get(format!("{}/files", self.base))
            .bearer_auth(&token)
            .query(&[
                ("q", query.as_str()),
                ("pageSize", "100"),
                ("fields", "nextPageToken, files(id, name, mimeType, modifiedTime, createdTime, size, parents)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
                ("orderBy", "modifiedTime"),
            ]);
        if let Some(pt) = page_token {
            req = req.query(&[("pageToken", pt)]);
        }
        let resp = req.send().await.map_err(|e| DriveError::Transient(format!("list {folder_id}: {e}")))?;
        if !resp.status().is_success() {
            return Err(classify(resp.status(), &format!("list {folder_id}")));
        }
        resp.json().await.map_err(|e| DriveError::Transient(format!("list {folder_id} decode: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    id: String,
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "modifiedTime")]
    modified_time: String,
    #[serde(default, rename = "createdTime")]
    created_time: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

fn classify(status: reqwest::StatusCode, ctx: &str) -> DriveError {
    if status == reqwest::StatusCode::NOT_FOUND {
        DriveError::NotFound(ctx.to_string())
    } else if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        DriveError::Transient(format!("{ctx}: {status}"))
    } else {
        DriveError::Permanent(format!("{ctx}: {status}"))
    }
}

#[async_trait]
impl DriveSource for GoogleDriveSource {
    async fn enumerate(
        &self,
        folder_id: &str,
        modified_after: Option<&str>,
        supported_extensions: &[String],
        max_files: Option<usize>,
    ) -> Result<Vec<DriveFile>, DriveError> {
        info!(folder_id, ?modified_after, "scanning drive folder");
        let mut results = Vec::new();
        let mut queue: VecDeque<(String, String)> = VecDeque::from([(folder_id.to_string(), String::new())]);

        while let Some((current_folder, path_prefix)) = queue.pop_front() {
            if let Some(limit) = max_files {
                if results.len() >= limit {
                    break;
                }
            }
            let mut page_token = None;
            loop {
                let page = self.list_page(&current_folder, modified_after, page_token.as_deref()).await?;
                for raw in page.files {
                    if let Some(limit) = max_files {
                        if results.len() >= limit {
                            break;
                        }
                    }
                    let item_path = if path_prefix.is_empty() { raw.name.clone() } else { format!("{path_prefix}/{}", raw.name) };
                    if is_folder(&raw.mime_type) {
                        queue.push_back((raw.id, item_path));
                        continue;
                    }
                    let ext = std::path::Path::new(&raw.name).extension().map(|e| format!(".{}", e.to_string_lossy().to_lowercase())).unwrap_or_default();
                    let is_google_doc = export_mapping(&raw.mime_type).is_some();
                    if supported_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) || is_google_doc {
                        results.push(DriveFile {
                            id: raw.id,
                            name: raw.name,
                            mime_type: raw.mime_type,
                            path: item_path,
                            modified_time: raw.modified_time,
                            created_time: raw.created_time.unwrap_or_default(),
                            size: raw.size.and_then(|s| s.parse().ok()),
                        });
                    }
                }
                page_token = page.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }
        }

        debug!(count = results.len(), "drive scan complete");
        Ok(results)
    }

    async fn fetch(&self, file: &DriveFile) -> Result<Vec<u8>, DriveError> {
        let token = self.bearer().await?;
        let url = match export_mapping(&file.mime_type) {
            Some((export_mime, _)) => {
                format!("{}/files/{}/export?mimeType={}", self.base, file.id, urlencode(export_mime))
            }
            None => format!("{}/files/{}?alt=media", self.base, file.id),
        };
        let resp = self.client.get(&url).bearer_auth(&token).send().await.map_err(|e| DriveError::Transient(format!("fetch {}: {e}", file.id)))?;
        if !resp.status().is_success() {
            return Err(classify(resp.status(), &format!("fetch {}", file.id)));
        }
        resp.bytes().await.map(|b| b.to_vec()).map_err(|e| DriveError::Transient(format!("fetch {} body: {e}", file.id)))
    }
}

fn urlencode(s: &str) -> String {
    percent_encode(s)
}

fn percent_encode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exts() -> Vec<String> {
        vec![".pdf".into(), ".docx".into(), ".txt".into()]
    }

    #[tokio::test]
    async fn enumerate_filters_by_extension_and_recurses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [
                    {"id": "f1", "name": "report.pdf", "mimeType": "application/pdf", "modifiedTime": "2026-01-01T00:00:00Z"},
                    {"id": "f2", "name": "image.png", "mimeType": "image/png", "modifiedTime": "2026-01-01T00:00:00Z"},
                ]
            })))
            .mount(&server)
            .await;

        let source = GoogleDriveSource::with_static_token("tok", &server.uri());
        let files = source.enumerate("root", None, &exts(), None).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "report.pdf");
    }

    #[tokio::test]
    async fn enumerate_includes_google_docs_regardless_of_extension() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [
                    {"id": "f1", "name": "Doc", "mimeType": "application/vnd.google-apps.document", "modifiedTime": "2026-01-01T00:00:00Z"},
                ]
            })))
            .mount(&server)
            .await;

        let source = GoogleDriveSource::with_static_token("tok", &server.uri());
        let files = source.enumerate("root", None, &exts(), None).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].export_file_name(), "Doc.docx");
    }

    #[test]
    fn export_file_name_passthrough_for_native_files() {
        let file = DriveFile {
            id: "x".into(),
            name: "notes.txt".into(),
            mime_type: "text/plain".into(),
            path: "notes.txt".into(),
            modified_time: String::new(),
            created_time: String::new(),
            size: None,
        };
        assert_eq!(file.export_file_name(), "notes.txt");
    }
}
