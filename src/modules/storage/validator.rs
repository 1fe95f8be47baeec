//! TOS configuration diagnostics
//!
//! Two on-demand checks: required keys plus bucket inspection, and a live
//! upload / metadata / listing / signed URL / delete round trip. The checks build a [`TosStorage`]
//! directly from the raw settings, without the loader's endpoint rewrite.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::error::StorageError;
use super::provider::{StorageBackend, DEFAULT_LIST_LIMIT, DEFAULT_SIGNED_URL_EXPIRY_SECS};
use super::tos::TosStorage;
use super::types::UploadFile;
use crate::core::config::{EnvLookup, StorageInfo, TosStorageSettings};

pub const REQUIRED_KEYS: [&str; 4] = [
    "TOS_REGION",
    "TOS_ACCESS_KEY_ID",
    "TOS_ACCESS_KEY_SECRET",
    "TOS_BUCKET_NAME",
];

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[schema(value_type = Object)]
    pub info: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestUploadReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl TestUploadReport {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }
}

pub struct TosConfigValidator {
    lookup: EnvLookup,
}

impl TosConfigValidator {
    pub fn new(lookup: EnvLookup) -> Self {
        Self { lookup }
    }

    fn missing_keys(&self) -> Vec<String> {
        REQUIRED_KEYS
            .iter()
            .filter(|&&key| (self.lookup)(key).is_none())
            .map(|key| format!("Missing environment variable: {}", key))
            .collect()
    }

    fn settings(&self) -> TosStorageSettings {
        let get = |key: &str| (self.lookup)(key).unwrap_or_default();
        TosStorageSettings {
            region: get("TOS_REGION"),
            access_key_id: get("TOS_ACCESS_KEY_ID"),
            access_key_secret: get("TOS_ACCESS_KEY_SECRET"),
            bucket: get("TOS_BUCKET_NAME"),
            endpoint: (self.lookup)("TOS_ENDPOINT"),
        }
    }

    /// Built straight from the raw settings, so an S3-style endpoint fails here
    fn build(&self) -> Result<TosStorage, StorageError> {
        TosStorage::new(&self.settings())
    }

    pub async fn validate_configuration(&self) -> ValidationReport {
        let mut errors = self.missing_keys();
        let mut warnings = Vec::new();
        let mut info = Map::new();

        if !errors.is_empty() {
            warn!("TOS configuration incomplete: {}", errors.join(", "));
            return ValidationReport {
                is_valid: false,
                errors,
                warnings,
                info,
            };
        }

        let storage = match self.build() {
            Ok(storage) => storage,
            Err(e) => {
                errors.push(format!("TOS configuration validation failed: {}", e));
                return ValidationReport {
                    is_valid: false,
                    errors,
                    warnings,
                    info,
                };
            }
        };

        info.insert(
            "storageConfig".to_string(),
            json!(StorageInfo::from_lookup(&self.lookup)),
        );
        inspect_bucket(&storage, &mut errors, &mut warnings, &mut info).await;

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            info,
        }
    }

    pub async fn test_upload(&self) -> TestUploadReport {
        match self.build() {
            Ok(storage) => round_trip(&storage).await,
            Err(e) => TestUploadReport::failed(format!("TOS test failed: {}", e)),
        }
    }
}

/// Check the bucket and try to create it when missing.
///
/// Failures are appended to `errors`/`warnings`; nothing short-circuits.
pub async fn inspect_bucket<B>(
    backend: &B,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
    info: &mut Map<String, Value>,
) where
    B: StorageBackend + ?Sized,
{
    let bucket = backend.bucket_name().to_string();

    let exists = match backend.bucket_exists().await {
        Ok(check) => {
            info.insert("bucketExists".to_string(), json!(check.ok));
            info.insert("bucketCheckFidelity".to_string(), json!(check.fidelity));
            check.ok
        }
        Err(e) => {
            errors.push(format!("Failed to check bucket \"{}\": {}", bucket, e));
            return;
        }
    };

    if exists {
        return;
    }

    warnings.push(format!(
        "Bucket \"{}\" does not exist, attempting to create it",
        bucket
    ));

    match backend.create_bucket_if_not_exists().await {
        Ok(check) => {
            info.insert("bucketCreated".to_string(), json!(check.ok));
            if !check.ok {
                errors.push(format!("Unable to create bucket \"{}\"", bucket));
            }
        }
        Err(e) => {
            info.insert("bucketCreated".to_string(), json!(false));
            errors.push(format!("Unable to create bucket \"{}\": {}", bucket, e));
        }
    }
}

/// Upload a small text object, read it back through metadata, listing and a
/// signed URL, then delete it.
///
/// Only the upload and the metadata lookup decide success; listing and signing
/// failures are reported as `null` in the details.
pub async fn round_trip<B>(backend: &B) -> TestUploadReport
where
    B: StorageBackend + ?Sized,
{
    let now = Utc::now();
    let prefix = "test";
    let key = format!("{}/{}-test-file.txt", prefix, now.timestamp_millis());
    let file = UploadFile::new(
        "test-file.txt",
        "text/plain",
        format!("{} storage test file - {}", backend.name(), now.to_rfc3339()).into_bytes(),
    );

    let upload = backend.upload(&file, &key).await;
    if !upload.success {
        return TestUploadReport::failed(format!(
            "Upload test failed: {}",
            upload.error.as_deref().unwrap_or("unknown error")
        ));
    }

    let metadata = backend.object_metadata(&key).await;

    let listing = match backend.list_objects(prefix, DEFAULT_LIST_LIMIT).await {
        Ok(listing) => json!({
            "entries": listing.entries.len(),
            "containsUpload": listing.entries.iter().any(|e| key.ends_with(&e.name)),
            "fidelity": listing.fidelity,
        }),
        Err(e) => {
            warn!("Round-trip listing of '{}' failed: {}", prefix, e);
            Value::Null
        }
    };

    let signed_url = match backend
        .signed_url(&key, DEFAULT_SIGNED_URL_EXPIRY_SECS)
        .await
    {
        Ok(access) => json!(access),
        Err(e) => {
            warn!("Round-trip signed URL for '{}' failed: {}", key, e);
            Value::Null
        }
    };

    let deleted = backend.delete(&key).await;
    if !deleted {
        warn!("Round-trip test object '{}' was not deleted", key);
    }

    let metadata = match metadata {
        Ok(metadata) => json!(metadata),
        Err(e) => {
            return TestUploadReport::failed(format!("Metadata lookup failed: {}", e));
        }
    };

    info!("Storage round trip succeeded for '{}'", key);

    TestUploadReport {
        success: true,
        message: format!("{} storage test succeeded", backend.name().to_uppercase()),
        details: Some(json!({
            "uploadKey": key,
            "uploadUrl": upload.url,
            "fileSize": upload.size,
            "metadata": metadata,
            "listing": listing,
            "signedUrl": signed_url,
            "deleted": deleted,
        })),
    }
}

/// Operator steps for setting up TOS
pub fn configuration_guide() -> Vec<&'static str> {
    vec![
        "1. Create a TOS bucket in the Volcengine console",
        "2. Obtain an access key (Access Key ID and Access Key Secret)",
        "3. Set the following environment variables:",
        "   - TOS_REGION=cn-beijing (or another region)",
        "   - TOS_ACCESS_KEY_ID=your_access_key_id",
        "   - TOS_ACCESS_KEY_SECRET=your_access_key_secret",
        "   - TOS_BUCKET_NAME=your_bucket_name",
        "   - TOS_ENDPOINT=https://tos-cn-beijing.volces.com (optional)",
        "4. Set STORAGE_PROVIDER=tos",
        "5. Make sure the bucket grants the required access permissions",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::batch::BatchPolicy;
    use crate::modules::storage::provider::{StorageInspector, StorageProvider};
    use crate::modules::storage::types::{
        AccessUrl, BucketCheck, Fidelity, ObjectEntry, ObjectListing, ObjectMetadata,
        StorageUploadResult,
    };
    use crate::shared::test_helpers::map_lookup;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory backend with switchable bucket state
    #[derive(Default)]
    struct MemoryBackend {
        objects: Mutex<HashMap<String, UploadFile>>,
        bucket_present: bool,
        can_create: bool,
        fail_uploads: bool,
    }

    #[async_trait]
    impl StorageProvider for MemoryBackend {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn bucket_name(&self) -> &str {
            "mem-bucket"
        }

        async fn upload(&self, file: &UploadFile, key: &str) -> StorageUploadResult {
            if self.fail_uploads {
                return StorageUploadResult::failed(key, "quota exceeded");
            }
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), file.clone());
            StorageUploadResult::uploaded(key, self.public_url(key), file.size())
        }

        fn public_url(&self, key: &str) -> String {
            format!("memory://mem-bucket/{}", key)
        }

        async fn delete(&self, key: &str) -> bool {
            self.objects.lock().unwrap().remove(key).is_some()
        }

        fn batch_policy(&self) -> BatchPolicy {
            BatchPolicy::Parallel
        }
    }

    #[async_trait]
    impl StorageInspector for MemoryBackend {
        async fn object_metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
            let objects = self.objects.lock().unwrap();
            let file = objects
                .get(key)
                .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
            Ok(ObjectMetadata {
                size: Some(file.size()),
                content_type: Some(file.content_type.clone()),
                last_modified: Some(Utc::now()),
                metadata: json!({}),
                fidelity: Fidelity::Backend,
            })
        }

        async fn list_objects(
            &self,
            prefix: &str,
            max_keys: usize,
        ) -> Result<ObjectListing, StorageError> {
            let objects = self.objects.lock().unwrap();
            let entries = objects
                .iter()
                .filter_map(|(key, file)| {
                    let name = key.strip_prefix(prefix)?.trim_start_matches('/');
                    Some(ObjectEntry {
                        name: name.to_string(),
                        size: Some(file.size()),
                        content_type: Some(file.content_type.clone()),
                        updated_at: None,
                    })
                })
                .take(max_keys)
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
            Ok(AccessUrl {
                url: self.public_url(key),
                expires_in_secs,
                fidelity: Fidelity::Backend,
            })
        }

        async fn bucket_exists(&self) -> Result<BucketCheck, StorageError> {
            Ok(BucketCheck::backend(self.bucket_present))
        }

        async fn create_bucket_if_not_exists(&self) -> Result<BucketCheck, StorageError> {
            Ok(BucketCheck::backend(self.bucket_present || self.can_create))
        }
    }

    #[tokio::test]
    async fn test_missing_keys_short_circuit() {
        let validator = TosConfigValidator::new(map_lookup(&[]));

        let report = validator.validate_configuration().await;

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), REQUIRED_KEYS.len());
        for key in REQUIRED_KEYS {
            assert!(report.errors.iter().any(|e| e.ends_with(key)));
        }
        assert!(report.warnings.is_empty());
        assert!(report.info.is_empty());
    }

    #[tokio::test]
    async fn test_partial_keys_report_only_missing_ones() {
        let validator = TosConfigValidator::new(map_lookup(&[
            ("TOS_REGION", "cn-beijing"),
            ("TOS_BUCKET_NAME", "voices"),
        ]));

        let report = validator.validate_configuration().await;

        assert_eq!(
            report.errors,
            vec![
                "Missing environment variable: TOS_ACCESS_KEY_ID".to_string(),
                "Missing environment variable: TOS_ACCESS_KEY_SECRET".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_valid_configuration_reports_assumed_bucket() {
        let validator = TosConfigValidator::new(map_lookup(&[
            ("STORAGE_PROVIDER", "tos"),
            ("TOS_REGION", "cn-beijing"),
            ("TOS_ACCESS_KEY_ID", "ak"),
            ("TOS_ACCESS_KEY_SECRET", "sk"),
            ("TOS_BUCKET_NAME", "voices"),
        ]));

        let report = validator.validate_configuration().await;

        assert!(report.is_valid, "{:?}", report.errors);
        assert_eq!(report.info["bucketExists"], json!(true));
        assert_eq!(report.info["bucketCheckFidelity"], json!("placeholder"));
        assert_eq!(report.info["storageConfig"]["bucketName"], json!("voices"));
    }

    #[tokio::test]
    async fn test_validator_rejects_s3_endpoint_without_rewrite() {
        let validator = TosConfigValidator::new(map_lookup(&[
            ("TOS_REGION", "cn-beijing"),
            ("TOS_ACCESS_KEY_ID", "ak"),
            ("TOS_ACCESS_KEY_SECRET", "sk"),
            ("TOS_BUCKET_NAME", "voices"),
            ("TOS_ENDPOINT", "https://tos-s3-cn-beijing.volces.com"),
        ]));

        let report = validator.validate_configuration().await;
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("S3-compatible"));

        let test = validator.test_upload().await;
        assert!(!test.success);
        assert!(test.details.is_none());
    }

    #[tokio::test]
    async fn test_inspect_bucket_creates_missing_bucket() {
        let backend = MemoryBackend {
            can_create: true,
            ..Default::default()
        };
        let (mut errors, mut warnings, mut info) = (Vec::new(), Vec::new(), Map::new());

        inspect_bucket(&backend, &mut errors, &mut warnings, &mut info).await;

        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mem-bucket"));
        assert_eq!(info["bucketExists"], json!(false));
        assert_eq!(info["bucketCreated"], json!(true));
    }

    #[tokio::test]
    async fn test_inspect_bucket_accumulates_creation_failure() {
        let backend = MemoryBackend::default();
        let (mut errors, mut warnings, mut info) = (Vec::new(), Vec::new(), Map::new());

        inspect_bucket(&backend, &mut errors, &mut warnings, &mut info).await;

        assert_eq!(warnings.len(), 1);
        assert_eq!(errors, vec!["Unable to create bucket \"mem-bucket\"".to_string()]);
        assert_eq!(info["bucketCreated"], json!(false));
    }

    #[tokio::test]
    async fn test_round_trip_cleans_up() {
        let backend = MemoryBackend {
            bucket_present: true,
            ..Default::default()
        };

        let report = round_trip(&backend).await;

        assert!(report.success, "{}", report.message);
        let details = report.details.unwrap();
        let key = details["uploadKey"].as_str().unwrap();
        assert!(key.starts_with("test/") && key.ends_with("-test-file.txt"));
        assert_eq!(details["metadata"]["contentType"], json!("text/plain"));
        assert_eq!(details["metadata"]["size"], details["fileSize"]);
        assert_eq!(details["listing"]["entries"], json!(1));
        assert_eq!(details["listing"]["containsUpload"], json!(true));
        assert_eq!(
            details["signedUrl"]["expiresInSecs"],
            json!(DEFAULT_SIGNED_URL_EXPIRY_SECS)
        );
        assert!(details["signedUrl"]["url"].as_str().unwrap().ends_with(key));
        assert_eq!(details["deleted"], json!(true));
        assert!(backend.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_reports_upload_failure() {
        let backend = MemoryBackend {
            fail_uploads: true,
            ..Default::default()
        };

        let report = round_trip(&backend).await;

        assert!(!report.success);
        assert_eq!(report.message, "Upload test failed: quota exceeded");
        assert!(report.details.is_none());
    }

    #[test]
    fn test_configuration_guide_lists_required_keys() {
        let guide = configuration_guide().join("\n");
        for key in REQUIRED_KEYS {
            assert!(guide.contains(key));
        }
        assert!(!guide.contains("tos-s3-"));
    }
}
