//! Volcengine TOS adapter
//!
//! Speaks the TOS-native HTTP API with V4 signatures. Only upload and delete
//! reach the backend; the inspection capabilities are local stand-ins marked
//! with [`Fidelity::Placeholder`].

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, Response, Url};
use tracing::{debug, error, info};

use super::batch::BatchPolicy;
use super::error::StorageError;
use super::provider::{encode_key, StorageInspector, StorageProvider};
use super::tos_signer::{SigningRequest, TosSigner, CONTENT_SHA256_HEADER, DATE_HEADER};
use super::types::{
    AccessUrl, BucketCheck, Fidelity, ObjectListing, ObjectMetadata, StorageUploadResult,
    UploadFile,
};
use crate::core::config::{TosStorageSettings, TOS_S3_MARKER};

/// Where API requests for the bucket are sent
#[derive(Debug, Clone)]
struct ApiTarget {
    scheme: String,
    /// Host header value (host plus non-default port)
    host: String,
    /// Bucket in the path instead of the host name (IP and localhost endpoints)
    path_style: bool,
}

pub struct TosStorage {
    client: Client,
    signer: TosSigner,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    api: ApiTarget,
}

impl TosStorage {
    pub fn new(settings: &TosStorageSettings) -> Result<Self, StorageError> {
        if settings.access_key_id.trim().is_empty() {
            return Err(StorageError::MissingSetting("TOS_ACCESS_KEY_ID".to_string()));
        }
        if settings.access_key_secret.trim().is_empty() {
            return Err(StorageError::MissingSetting(
                "TOS_ACCESS_KEY_SECRET".to_string(),
            ));
        }
        if settings.bucket.trim().is_empty() {
            return Err(StorageError::MissingSetting("TOS_BUCKET_NAME".to_string()));
        }
        if settings.region.trim().is_empty() {
            return Err(StorageError::MissingSetting("TOS_REGION".to_string()));
        }

        let endpoint = settings
            .endpoint
            .as_deref()
            .map(normalize_endpoint)
            .transpose()?;

        let api = Self::api_target(endpoint.as_deref(), &settings.bucket, &settings.region)?;

        let client = Client::builder()
            .build()
            .map_err(|e| StorageError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "TOS storage client initialized: region={}, bucket={}, endpoint={}",
            settings.region,
            settings.bucket,
            endpoint.as_deref().unwrap_or("default")
        );

        Ok(Self {
            client,
            signer: TosSigner::new(
                settings.access_key_id.clone(),
                settings.access_key_secret.clone(),
                settings.region.clone(),
            ),
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            endpoint,
            api,
        })
    }

    fn api_target(
        endpoint: Option<&str>,
        bucket: &str,
        region: &str,
    ) -> Result<ApiTarget, StorageError> {
        let base = endpoint
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("https://tos-{}.volces.com", region));
        let url = Url::parse(&base)
            .map_err(|e| StorageError::Configuration(format!("Invalid TOS endpoint URL: {}", e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| StorageError::Configuration("TOS endpoint URL has no host".to_string()))?;

        let path_style = host == "localhost" || host.parse::<IpAddr>().is_ok();
        let host = if path_style {
            host.to_string()
        } else {
            format!("{}.{}", bucket, host)
        };
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };

        Ok(ApiTarget {
            scheme: url.scheme().to_string(),
            host,
            path_style,
        })
    }

    /// Absolute request URL and canonical URI for an object
    fn object_location(&self, key: &str) -> (String, String) {
        let canonical_uri = if self.api.path_style {
            format!("/{}/{}", self.bucket, encode_key(key))
        } else {
            format!("/{}", encode_key(key))
        };
        let url = format!("{}://{}{}", self.api.scheme, self.api.host, canonical_uri);
        (url, canonical_uri)
    }

    async fn send_signed(
        &self,
        method: Method,
        key: &str,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<Response, StorageError> {
        let (url, canonical_uri) = self.object_location(key);
        let signed = self.signer.sign(
            &SigningRequest {
                method: method.as_str(),
                host: &self.api.host,
                canonical_uri: &canonical_uri,
                payload: &body,
            },
            Utc::now(),
        )?;

        let mut request = self
            .client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, signed.authorization)
            .header(DATE_HEADER, signed.date)
            .header(CONTENT_SHA256_HEADER, signed.content_sha256)
            .header(reqwest::header::CONTENT_LENGTH, body.len());
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        Ok(request.body(body).send().await?)
    }

    /// TOS error bodies are JSON with a `Message` field
    async fn failure_message(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("Message").and_then(|m| m.as_str()).map(|m| m.to_string()))
            .unwrap_or_else(|| format!("TOS returned HTTP {}: {}", status, body))
    }
}

/// Validate and normalize a TOS endpoint.
///
/// S3-compatible endpoints are refused; accepted ones get an `https://` scheme
/// when none is given and lose trailing slashes.
pub fn normalize_endpoint(endpoint: &str) -> Result<String, StorageError> {
    let endpoint = endpoint.trim();
    if endpoint.contains(TOS_S3_MARKER) {
        return Err(StorageError::Configuration(format!(
            "TOS does not accept S3-compatible endpoints (got '{}'). \
             Use the TOS-native form, e.g. https://tos-cn-guangzhou.volces.com, \
             and update TOS_ENDPOINT accordingly",
            endpoint
        )));
    }

    let with_scheme = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    Ok(with_scheme.trim_end_matches('/').to_string())
}

#[async_trait]
impl StorageProvider for TosStorage {
    fn name(&self) -> &'static str {
        "tos"
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, file: &UploadFile, key: &str) -> StorageUploadResult {
        debug!(
            "Uploading '{}' to TOS bucket '{}' ({} bytes, {})",
            key,
            self.bucket,
            file.size(),
            file.content_type
        );

        let response = self
            .send_signed(Method::PUT, key, Some(&file.content_type), file.data.clone())
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let url = self.public_url(key);
                info!("Uploaded '{}' to TOS: {}", key, url);
                StorageUploadResult::uploaded(key, url, file.size())
            }
            Ok(response) => {
                let message = Self::failure_message(response).await;
                error!("TOS upload of '{}' failed: {}", key, message);
                StorageUploadResult::failed(key, message)
            }
            Err(e) => {
                error!("TOS upload of '{}' failed: {}", key, e);
                StorageUploadResult::failed(key, format!("Upload to TOS failed: {}", e))
            }
        }
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint, self.bucket, key),
            None => format!(
                "https://{}.tos-{}.volces.com/{}",
                self.bucket, self.region, key
            ),
        }
    }

    async fn delete(&self, key: &str) -> bool {
        match self.send_signed(Method::DELETE, key, None, Vec::new()).await {
            Ok(response) if response.status().is_success() => {
                info!("Deleted '{}' from TOS bucket '{}'", key, self.bucket);
                true
            }
            Ok(response) => {
                let message = Self::failure_message(response).await;
                error!("TOS delete of '{}' failed: {}", key, message);
                false
            }
            Err(e) => {
                error!("TOS delete of '{}' failed: {}", key, e);
                false
            }
        }
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::Parallel
    }
}

/// None of these call the backend yet
#[async_trait]
impl StorageInspector for TosStorage {
    async fn object_metadata(&self, _key: &str) -> Result<ObjectMetadata, StorageError> {
        Ok(ObjectMetadata {
            size: Some(0),
            content_type: Some("application/octet-stream".to_string()),
            last_modified: Some(Utc::now()),
            metadata: serde_json::json!({}),
            fidelity: Fidelity::Placeholder,
        })
    }

    async fn list_objects(
        &self,
        _prefix: &str,
        _max_keys: usize,
    ) -> Result<ObjectListing, StorageError> {
        Ok(ObjectListing {
            entries: Vec::new(),
            fidelity: Fidelity::Placeholder,
        })
    }

    async fn signed_url(
        &self,
        key: &str,
        expires_in_secs: u64,
    ) -> Result<AccessUrl, StorageError> {
        Ok(AccessUrl {
            url: self.public_url(key),
            expires_in_secs,
            fidelity: Fidelity::Placeholder,
        })
    }

    async fn bucket_exists(&self) -> Result<BucketCheck, StorageError> {
        Ok(BucketCheck::assumed(true))
    }

    async fn create_bucket_if_not_exists(&self) -> Result<BucketCheck, StorageError> {
        debug!("Assuming TOS bucket '{}' already exists", self.bucket);
        Ok(BucketCheck::assumed(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::batch::tests::RecordingPacer;
    use crate::modules::storage::batch::BatchItem;
    use crate::shared::test_helpers::spawn_stub;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::put,
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    fn settings(endpoint: Option<&str>) -> TosStorageSettings {
        TosStorageSettings {
            region: "cn-beijing".to_string(),
            access_key_id: "AKTEST".to_string(),
            access_key_secret: "secret".to_string(),
            bucket: "b".to_string(),
            endpoint: endpoint.map(|e| e.to_string()),
        }
    }

    #[test]
    fn test_public_url_without_endpoint() {
        let storage = TosStorage::new(&settings(None)).unwrap();
        assert_eq!(storage.public_url("k"), "https://b.tos-cn-beijing.volces.com/k");
    }

    #[test]
    fn test_public_url_with_endpoint() {
        let storage = TosStorage::new(&settings(Some("tos-cn-guangzhou.volces.com/"))).unwrap();
        assert_eq!(
            storage.public_url("0xabc/s1.wav"),
            "https://tos-cn-guangzhou.volces.com/b/0xabc/s1.wav"
        );
        assert_ne!(
            storage.public_url("k"),
            TosStorage::new(&settings(None)).unwrap().public_url("k")
        );
    }

    #[test]
    fn test_rejects_s3_compatible_endpoint() {
        let result = TosStorage::new(&settings(Some("https://tos-s3-cn-beijing.volces.com")));
        match result {
            Err(err @ StorageError::Configuration(_)) => {
                assert!(err.to_string().contains("tos-s3-cn-beijing"));
                assert!(err.is_configuration());
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("S3-compatible endpoint must be rejected"),
        }
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("http://127.0.0.1:9000//").unwrap(),
            "http://127.0.0.1:9000"
        );
        assert_eq!(
            normalize_endpoint(" tos-cn-beijing.volces.com ").unwrap(),
            "https://tos-cn-beijing.volces.com"
        );
        assert!(normalize_endpoint("tos-s3-cn-beijing.volces.com").is_err());
    }

    #[test]
    fn test_missing_credentials() {
        let mut s = settings(None);
        s.access_key_secret = String::new();
        assert!(matches!(
            TosStorage::new(&s),
            Err(StorageError::MissingSetting(key)) if key == "TOS_ACCESS_KEY_SECRET"
        ));
    }

    #[test]
    fn test_virtual_host_addressing() {
        let storage = TosStorage::new(&settings(None)).unwrap();
        let (url, uri) = storage.object_location("0xabc/my file.wav");
        assert_eq!(
            url,
            "https://b.tos-cn-beijing.volces.com/0xabc/my%20file.wav"
        );
        assert_eq!(uri, "/0xabc/my%20file.wav");
    }

    #[tokio::test]
    async fn test_placeholders_are_marked() {
        let storage = TosStorage::new(&settings(None)).unwrap();

        let meta = storage.object_metadata("k").await.unwrap();
        assert_eq!(meta.size, Some(0));
        assert_eq!(meta.content_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(meta.fidelity, Fidelity::Placeholder);

        let listing = storage.list_objects("", 100).await.unwrap();
        assert!(listing.entries.is_empty());
        assert_eq!(listing.fidelity, Fidelity::Placeholder);

        let signed = storage.signed_url("k", 3600).await.unwrap();
        assert_eq!(signed.url, storage.public_url("k"));
        assert_eq!(signed.fidelity, Fidelity::Placeholder);

        let exists = storage.bucket_exists().await.unwrap();
        assert!(exists.ok);
        assert_eq!(exists.fidelity, Fidelity::Placeholder);
    }

    #[tokio::test]
    async fn test_signed_put_against_stub_backend() {
        let seen: Arc<Mutex<Vec<(String, HeaderMap, usize)>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let router = Router::new().route(
            "/{bucket}/{*key}",
            put(
                move |Path((bucket, key)): Path<(String, String)>,
                      headers: HeaderMap,
                      body: axum::body::Bytes| {
                    let captured = Arc::clone(&captured);
                    async move {
                        captured
                            .lock()
                            .unwrap()
                            .push((format!("{}/{}", bucket, key), headers, body.len()));
                        StatusCode::OK
                    }
                },
            ),
        );
        let base = spawn_stub(router).await;
        let storage = TosStorage::new(&settings(Some(&base))).unwrap();
        let file = UploadFile::new("s1.wav", "audio/wav", vec![3u8; 1024]);

        let result = storage.upload(&file, "0xabc/s1.wav").await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.url, format!("{}/b/0xabc/s1.wav", base));
        assert_eq!(result.size, 1024);

        let seen = seen.lock().unwrap();
        let (path, headers, len) = &seen[0];
        assert_eq!(path, "b/0xabc/s1.wav");
        assert_eq!(*len, 1024);
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("");
        assert_eq!(header("content-type"), "audio/wav");
        assert_eq!(header("content-length"), "1024");
        assert!(header("authorization").starts_with("TOS4-HMAC-SHA256 Credential=AKTEST/"));
        assert!(!header("x-tos-date").is_empty());
        assert_eq!(header("x-tos-content-sha256").len(), 64);
    }

    #[tokio::test]
    async fn test_upload_failure_uses_backend_message() {
        let router = Router::new().route(
            "/{bucket}/{*key}",
            put(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(serde_json::json!({
                        "Code": "AccessDenied",
                        "Message": "Access Denied"
                    })),
                )
            }),
        );
        let base = spawn_stub(router).await;
        let storage = TosStorage::new(&settings(Some(&base))).unwrap();
        let file = UploadFile::new("s1.wav", "audio/wav", vec![0u8; 8]);

        let result = storage.upload(&file, "0xabc/s1.wav").await;

        assert!(!result.success);
        assert_eq!(result.url, "");
        assert_eq!(result.size, 0);
        assert_eq!(result.error.as_deref(), Some("Access Denied"));
    }

    #[tokio::test]
    async fn test_delete_reports_failure_as_false() {
        let storage = TosStorage::new(&settings(Some("http://127.0.0.1:1"))).unwrap();
        assert!(!storage.delete("0xabc/s1.wav").await);
    }

    #[tokio::test]
    async fn test_batch_is_parallel() {
        let router = Router::new().route("/{bucket}/{*key}", put(|| async { StatusCode::OK }));
        let base = spawn_stub(router).await;
        let storage = TosStorage::new(&settings(Some(&base))).unwrap();
        let pacer = RecordingPacer::default();
        let items: Vec<_> = (0..4)
            .map(|i| {
                BatchItem::new(
                    UploadFile::new("a.wav", "audio/wav", vec![0u8; 4]),
                    format!("0xabc/{}.wav", i),
                )
            })
            .collect();

        let results = storage.upload_multiple(&items, &pacer).await;

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.success));
        assert!(pacer.pauses.lock().unwrap().is_empty());
    }
}
