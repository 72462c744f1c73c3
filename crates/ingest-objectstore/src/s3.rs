use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest as _, Sha256};
use tracing::debug;

use crate::error::ObjectStoreError;
use crate::metadata::{decode_metadata_value, encode_metadata_value};
use crate::store::{ObjectMetadata, ObjectStore, ObjectVersion};

type HmacSha256 = Hmac<Sha256>;

/// Configuration for an S3-compatible object store, matching the
/// `S3_ENDPOINT`/`S3_ACCESS_KEY`/`S3_SECRET_KEY`/`S3_BUCKET`/`S3_REGION`
/// surface the pipeline is deployed against.
#[derive(Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

/// S3-compatible REST client: AWS Signature Version 4 request signing over
/// `reqwest`, with `ListObjectsV2` XML responses parsed via `quick-xml`.
pub struct S3ObjectStore {
    config: S3Config,
    client: reqwest::Client,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.config.endpoint.trim_end_matches('/'), self.config.bucket, key)
    }

    fn sign(
        &self,
        method: &str,
        canonical_uri: &str,
        canonical_query: &str,
        extra_headers: &[(&str, String)],
        payload_hash: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> (String, Vec<(String, String)>) {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let host = self.host();

        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        for (k, v) in extra_headers {
            headers.push((k.to_lowercase(), v.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_headers: String = headers.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
        let signed_headers = headers.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(";");

        let canonical_request = format!(
            "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );
        let canonical_hash = hex_sha256(canonical_request.as_bytes());

        let credential_scope = format!("{date_stamp}/{}/s3/aws4_request", self.config.region);
        let string_to_sign = format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{canonical_hash}");

        let signing_key = self.signing_key(&date_stamp);
        let signature = hex_hmac(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.config.access_key,
        );

        headers.push(("authorization".to_string(), authorization));
        (amz_date, headers)
    }

    fn signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let k_date = hmac_bytes(format!("AWS4{}", self.config.secret_key).as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_bytes(&k_date, self.config.region.as_bytes());
        let k_service = hmac_bytes(&k_region, b"s3");
        hmac_bytes(&k_service, b"aws4_request")
    }

    fn host(&self) -> String {
        self.config
            .endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string()
    }

    fn build_request(
        &self,
        method: reqwest::Method,
        key: &str,
        query: &str,
        extra_headers: &[(&str, String)],
        payload: &[u8],
    ) -> reqwest::RequestBuilder {
        let now = chrono::Utc::now();
        let payload_hash = hex_sha256(payload);
        let canonical_uri = format!("/{}/{}", self.config.bucket, key);
        let (_, headers) = self.sign(method.as_str(), &canonical_uri, query, extra_headers, &payload_hash, now);

        let url = if query.is_empty() { self.object_url(key) } else { format!("{}?{query}", self.object_url(key)) };
        let mut req = self.client.request(method, url);
        for (k, v) in headers {
            if k == "host" {
                continue; // reqwest sets the Host header itself
            }
            req = req.header(k, v);
        }
        req
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_bytes(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_bytes(key, data))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "ListBucketResult")]
struct ListBucketResult {
    #[serde(rename = "Contents", default)]
    contents: Vec<ObjectEntry>,
    #[serde(rename = "IsTruncated", default)]
    is_truncated: bool,
    #[serde(rename = "NextContinuationToken")]
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    #[serde(rename = "Key")]
    key: String,
}

const METADATA_PREFIX: &str = "x-amz-meta-";

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata, ObjectStoreError> {
        let resp = self
            .build_request(reqwest::Method::HEAD, key, "", &[], b"")
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transient(format!("HEAD {key}: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        if !resp.status().is_success() {
            return Err(classify_status(resp.status(), "HEAD", key));
        }

        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(String::from);
        let mut user_metadata = HashMap::new();
        for (name, value) in resp.headers() {
            if let Some(meta_key) = name.as_str().strip_prefix(METADATA_PREFIX) {
                if let Ok(v) = value.to_str() {
                    user_metadata.insert(meta_key.to_string(), decode_metadata_value(v));
                }
            }
        }
        Ok(ObjectMetadata { content_type, user_metadata })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let resp = self
            .build_request(reqwest::Method::GET, key, "", &[], b"")
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transient(format!("GET {key}: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        if !resp.status().is_success() {
            return Err(classify_status(resp.status(), "GET", key));
        }
        resp.bytes().await.map(|b| b.to_vec()).map_err(|e| ObjectStoreError::Transient(format!("GET {key} body: {e}")))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str, user_metadata: HashMap<String, String>) -> Result<(), ObjectStoreError> {
        let mut extra_headers: Vec<(&str, String)> = vec![("content-type", content_type.to_string())];
        let encoded: Vec<(String, String)> = user_metadata.into_iter().map(|(k, v)| (format!("{METADATA_PREFIX}{k}"), encode_metadata_value(&v))).collect();
        for (k, v) in &encoded {
            extra_headers.push((k.as_str(), v.clone()));
        }

        let resp = self
            .build_request(reqwest::Method::PUT, key, "", &extra_headers, &body)
            .body(body)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transient(format!("PUT {key}: {e}")))?;

        if !resp.status().is_success() {
            return Err(classify_status(resp.status(), "PUT", key));
        }
        debug!(key, "uploaded object");
        Ok(())
    }

    async fn replace_metadata(&self, key: &str, user_metadata: HashMap<String, String>) -> Result<(), ObjectStoreError> {
        let current = self.head(key).await?;
        let mut extra_headers: Vec<(&str, String)> = vec![
            ("x-amz-copy-source", format!("/{}/{}", self.config.bucket, key)),
            ("x-amz-metadata-directive", "REPLACE".to_string()),
        ];
        if let Some(ct) = &current.content_type {
            extra_headers.push(("content-type", ct.clone()));
        }
        let encoded: Vec<(String, String)> = user_metadata.into_iter().map(|(k, v)| (format!("{METADATA_PREFIX}{k}"), encode_metadata_value(&v))).collect();
        for (k, v) in &encoded {
            extra_headers.push((k.as_str(), v.clone()));
        }

        let resp = self
            .build_request(reqwest::Method::PUT, key, "", &extra_headers, b"")
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transient(format!("COPY {key}: {e}")))?;

        if !resp.status().is_success() {
            return Err(classify_status(resp.status(), "COPY", key));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let resp = self
            .build_request(reqwest::Method::DELETE, key, "", &[], b"")
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transient(format!("DELETE {key}: {e}")))?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(classify_status(resp.status(), "DELETE", key));
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut query = format!("list-type=2&prefix={}", urlencoding(prefix));
            if let Some(token) = &continuation {
                query.push_str(&format!("&continuation-token={}", urlencoding(token)));
            }
            let resp = self
                .build_request(reqwest::Method::GET, "", &query, &[], b"")
                .send()
                .await
                .map_err(|e| ObjectStoreError::Transient(format!("LIST {prefix}: {e}")))?;
            if !resp.status().is_success() {
                return Err(classify_status(resp.status(), "LIST", prefix));
            }
            let body = resp.text().await.map_err(|e| ObjectStoreError::Transient(format!("LIST {prefix} body: {e}")))?;
            let parsed: ListBucketResult = quick_xml::de::from_str(&body).map_err(|e| ObjectStoreError::Permanent(format!("LIST {prefix} parse: {e}")))?;
            keys.extend(parsed.contents.into_iter().map(|e| e.key));
            if !parsed.is_truncated {
                break;
            }
            continuation = parsed.next_continuation_token;
            if continuation.is_none() {
                break;
            }
        }
        Ok(keys)
    }

    async fn list_versions(&self, prefix: &str) -> Result<Vec<ObjectVersion>, ObjectStoreError> {
        // CAS objects are never versioned by this pipeline; expose the
        // current listing as a single-version view for callers that only
        // need to enumerate what exists.
        Ok(self.list(prefix).await?.into_iter().map(|key| ObjectVersion { key, version_id: "null".into(), is_delete_marker: false }).collect())
    }
}

fn classify_status(status: reqwest::StatusCode, op: &str, key: &str) -> ObjectStoreError {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ObjectStoreError::Transient(format!("{op} {key}: {status}"))
    } else {
        ObjectStoreError::Permanent(format!("{op} {key}: {status}"))
    }
}

fn urlencoding(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            endpoint: "https://s3.example.com".into(),
            access_key: "AKIDEXAMPLE".into(),
            secret_key: "secret".into(),
            bucket: "bucket".into(),
            region: "us-east-1".into(),
        }
    }

    #[test]
    fn signing_key_is_deterministic() {
        let store = S3ObjectStore::new(config());
        let a = store.signing_key("20250101");
        let b = store.signing_key("20250101");
        assert_eq!(a, b);
        let c = store.signing_key("20250102");
        assert_ne!(a, c);
    }

    #[test]
    fn object_url_joins_bucket_and_key() {
        let store = S3ObjectStore::new(config());
        assert_eq!(store.object_url("objects/ab/cd/deadbeef.txt"), "https://s3.example.com/bucket/objects/ab/cd/deadbeef.txt");
    }
}
