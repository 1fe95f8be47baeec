//! Supabase Storage adapter
//!
//! Talks to the Supabase Storage REST API (`{project}/storage/v1`) using the
//! project's anon key for both the `apikey` header and the bearer token.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use super::batch::BatchPolicy;
use super::error::{backend_error, StorageError};
use super::provider::{
    encode_key, split_key, StorageInspector, StorageProvider, DEFAULT_LIST_LIMIT,
};
use super::types::{
    AccessUrl, BucketCheck, Fidelity, ObjectEntry, ObjectListing, ObjectMetadata,
    StorageUploadResult, UploadFile,
};
use crate::core::config::SupabaseStorageSettings;

/// Entry of a Supabase `object/list` response
#[derive(Debug, Deserialize)]
struct SupabaseObject {
    name: String,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl SupabaseObject {
    fn size(&self) -> Option<u64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("size"))
            .and_then(|s| s.as_u64())
    }

    fn mimetype(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("mimetype"))
            .and_then(|s| s.as_str())
            .map(|s| s.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Supabase Storage adapter bound to a single bucket
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    anon_key: String,
    bucket: String,
    batch_delay: Duration,
}

impl SupabaseStorage {
    /// Pause between consecutive uploads of a batch (backend rate limits)
    pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(200);
    const CACHE_CONTROL: &'static str = "max-age=3600";

    pub fn new(settings: &SupabaseStorageSettings) -> Result<Self, StorageError> {
        let base_url = settings.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StorageError::MissingSetting("SUPABASE_URL".to_string()));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StorageError::Configuration(format!(
                "SUPABASE_URL must start with http:// or https://, got '{}'",
                settings.url
            )));
        }
        if settings.anon_key.trim().is_empty() {
            return Err(StorageError::MissingSetting("SUPABASE_ANON_KEY".to_string()));
        }
        if settings.bucket.trim().is_empty() {
            return Err(StorageError::MissingSetting("SUPABASE_BUCKET".to_string()));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| StorageError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Supabase storage client initialized: url={}, bucket={}",
            base_url, settings.bucket
        );

        Ok(Self {
            client,
            base_url,
            anon_key: settings.anon_key.clone(),
            bucket: settings.bucket.clone(),
            batch_delay: Self::DEFAULT_BATCH_DELAY,
        })
    }

    /// Override the pause used between serial batch uploads
    #[allow(dead_code)]
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Prefer the `message`/`error` field of a JSON error body over the raw text
    async fn failure_message(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("Supabase returned HTTP {}", status)
                } else {
                    format!("Supabase returned HTTP {}: {}", status, body)
                }
            })
    }

    async fn list(
        &self,
        prefix: &str,
        limit: usize,
        search: Option<&str>,
    ) -> Result<Vec<SupabaseObject>, StorageError> {
        let mut body = json!({
            "prefix": prefix,
            "limit": limit,
            "offset": 0,
            "sortBy": { "column": "name", "order": "asc" },
        });
        if let Some(search) = search {
            body["search"] = json!(search);
        }

        let response = self
            .authorized(
                self.client
                    .post(self.storage_url(&format!("object/list/{}", self.bucket))),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        response
            .json::<Vec<SupabaseObject>>()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl StorageProvider for SupabaseStorage {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, file: &UploadFile, key: &str) -> StorageUploadResult {
        debug!(
            "Uploading '{}' to Supabase bucket '{}' ({} bytes, {})",
            key,
            self.bucket,
            file.size(),
            file.content_type
        );

        let url = self.storage_url(&format!("object/{}/{}", self.bucket, encode_key(key)));
        let response = self
            .authorized(self.client.post(url))
            .header(reqwest::header::CONTENT_TYPE, &file.content_type)
            .header(reqwest::header::CACHE_CONTROL, Self::CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(file.data.clone())
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let url = self.public_url(key);
                info!("Uploaded '{}' to Supabase: {}", key, url);
                StorageUploadResult::uploaded(key, url, file.size())
            }
            Ok(response) => {
                let message = Self::failure_message(response).await;
                error!("Supabase upload of '{}' failed: {}", key, message);
                StorageUploadResult::failed(key, message)
            }
            Err(e) => {
                error!("Supabase upload of '{}' failed: {}", key, e);
                StorageUploadResult::failed(key, format!("Upload to Supabase failed: {}", e))
            }
        }
    }

    fn public_url(&self, key: &str) -> String {
        self.storage_url(&format!(
            "object/public/{}/{}",
            self.bucket,
            encode_key(key)
        ))
    }

    async fn delete(&self, key: &str) -> bool {
        let response = self
            .authorized(
                self.client
                    .delete(self.storage_url(&format!("object/{}", self.bucket))),
            )
            .json(&json!({ "prefixes": [key] }))
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!("Deleted '{}' from Supabase bucket '{}'", key, self.bucket);
                true
            }
            Ok(response) => {
                let message = Self::failure_message(response).await;
                error!("Supabase delete of '{}' failed: {}", key, message);
                false
            }
            Err(e) => {
                error!("Supabase delete of '{}' failed: {}", key, e);
                false
            }
        }
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::Serial {
            delay: self.batch_delay,
        }
    }
}

#[async_trait]
impl StorageInspector for SupabaseStorage {
    async fn object_metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let (prefix, file_name) = split_key(key);
        let entries = self
            .list(prefix, DEFAULT_LIST_LIMIT, Some(file_name))
            .await?;

        let entry = entries
            .into_iter()
            .find(|e| e.name == file_name)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(ObjectMetadata {
            size: entry.size(),
            content_type: entry.mimetype(),
            last_modified: entry.updated_at,
            metadata: entry.metadata.unwrap_or(serde_json::Value::Null),
            fidelity: Fidelity::Backend,
        })
    }

    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: usize,
    ) -> Result<ObjectListing, StorageError> {
        let entries = self
            .list(prefix, max_keys, None)
            .await?
            .into_iter()
            .map(|e| ObjectEntry {
                size: e.size(),
                content_type: e.mimetype(),
                updated_at: e.updated_at,
                name: e.name,
            })
            .collect();

        Ok(ObjectListing {
            entries,
            fidelity: Fidelity::Backend,
        })
    }

    async fn signed_url(
        &self,
        key: &str,
        expires_in_secs: u64,
    ) -> Result<AccessUrl, StorageError> {
        let response = self
            .authorized(self.client.post(self.storage_url(&format!(
                "object/sign/{}/{}",
                self.bucket,
                encode_key(key)
            ))))
            .json(&json!({ "expiresIn": expires_in_secs }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        Ok(AccessUrl {
            url: format!("{}/storage/v1{}", self.base_url, signed.signed_url),
            expires_in_secs,
            fidelity: Fidelity::Backend,
        })
    }

    async fn bucket_exists(&self) -> Result<BucketCheck, StorageError> {
        let response = self
            .authorized(
                self.client
                    .get(self.storage_url(&format!("bucket/{}", self.bucket))),
            )
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(BucketCheck::backend(true));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(BucketCheck::backend(false));
        }

        // Storage API reports a missing bucket as 400 with a "not found" body
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::BAD_REQUEST && body.to_lowercase().contains("not found") {
            return Ok(BucketCheck::backend(false));
        }

        Err(StorageError::Backend {
            status: status.as_u16(),
            message: body,
        })
    }

    async fn create_bucket_if_not_exists(&self) -> Result<BucketCheck, StorageError> {
        if self.bucket_exists().await?.ok {
            return Ok(BucketCheck::backend(true));
        }

        let response = self
            .authorized(self.client.post(self.storage_url("bucket")))
            .json(&json!({ "id": self.bucket, "name": self.bucket, "public": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        info!("Created Supabase bucket '{}'", self.bucket);
        Ok(BucketCheck::backend(true))
    }
}
