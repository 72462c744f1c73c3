use serde::Deserialize;

use crate::error::IndexError;

/// Thin client for the vector-search service's OpenAI-shaped files and
/// vector-stores API: upload a file, then attach it to a vector store.
/// Matches `original_source`'s two-call `files.create` /
/// `vector_stores.files.create` sequence.
pub struct VectorServiceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct FileUploadResponse {
    id: String,
}

impl VectorServiceClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.openai.com/v1", api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), api_key: api_key.into() }
    }

    /// Upload `content` as a named file with `purpose=assistants`, returning
    /// its file id.
    pub async fn upload_file(&self, file_name: &str, content: Vec<u8>) -> Result<String, IndexError> {
        let part = reqwest::multipart::Part::bytes(content).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().text("purpose", "assistants").part("file", part);

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let response = classify(response).await?;
        let parsed: FileUploadResponse = response.json().await?;
        Ok(parsed.id)
    }

    /// Attach an already-uploaded file to a vector store.
    pub async fn attach_to_vector_store(&self, vector_store_id: &str, file_id: &str) -> Result<(), IndexError> {
        let response = self
            .client
            .post(format!("{}/vector_stores/{vector_store_id}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "file_id": file_id }))
            .send()
            .await?;

        classify(response).await?;
        Ok(())
    }
}

async fn classify(response: reqwest::Response) -> Result<reqwest::Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 429 {
        return Err(IndexError::RateLimited);
    }
    if status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(IndexError::ServerError { status: status.as_u16(), body });
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::ClientError { status: status.as_u16(), body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn upload_file_parses_the_returned_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "file-abc123"})))
            .mount(&server)
            .await;

        let client = VectorServiceClient::with_base_url(server.uri(), "sk-test");
        let id = client.upload_file("doc.txt", b"hello".to_vec()).await.unwrap();
        assert_eq!(id, "file-abc123");
    }

    #[tokio::test]
    async fn rate_limit_response_maps_to_rate_limited_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = VectorServiceClient::with_base_url(server.uri(), "sk-test");
        let err = client.upload_file("doc.txt", b"hello".to_vec()).await.unwrap_err();
        assert!(matches!(err, IndexError::RateLimited));
    }

    #[tokio::test]
    async fn attach_to_vector_store_succeeds_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vector_stores/vs-1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "vsf-1"})))
            .mount(&server)
            .await;

        let client = VectorServiceClient::with_base_url(server.uri(), "sk-test");
        client.attach_to_vector_store("vs-1", "file-abc123").await.unwrap();
    }
}
