use async_trait::async_trait;

use super::batch::{upload_batch, BatchItem, BatchPolicy, Pacer};
use super::error::StorageError;
use super::types::{
    AccessUrl, BucketCheck, ObjectListing, ObjectMetadata, StorageUploadResult, UploadFile,
};

/// Default lifetime of a signed URL
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 3600;

/// Default page size of a prefix listing
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Object storage contract shared by every backend adapter
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Short backend identifier ("supabase", "tos")
    fn name(&self) -> &'static str;

    /// Bucket this adapter is bound to
    fn bucket_name(&self) -> &str;

    /// Store the file under `key`.
    ///
    /// Transport and backend failures are reported through the returned result
    /// (`success: false` with an `error` message), never as a panic or `Err`.
    async fn upload(&self, file: &UploadFile, key: &str) -> StorageUploadResult;

    /// Derive the public URL of `key` from configuration only (no network call)
    fn public_url(&self, key: &str) -> String;

    /// Best-effort delete; returns `false` on any failure after logging the cause
    async fn delete(&self, key: &str) -> bool;

    /// Pacing used by [`StorageProvider::upload_multiple`]
    #[allow(dead_code)]
    fn batch_policy(&self) -> BatchPolicy;

    /// Upload several files using this backend's batch policy
    #[allow(dead_code)]
    async fn upload_multiple(
        &self,
        items: &[BatchItem],
        pacer: &dyn Pacer,
    ) -> Vec<StorageUploadResult> {
        upload_batch(self, items, self.batch_policy(), pacer).await
    }
}

/// Capabilities beyond the upload/delete contract.
///
/// Every returned value carries a [`Fidelity`](super::types::Fidelity) marker so
/// callers can tell a backend answer from a local stand-in.
#[async_trait]
pub trait StorageInspector: Send + Sync {
    async fn object_metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError>;

    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: usize,
    ) -> Result<ObjectListing, StorageError>;

    async fn signed_url(&self, key: &str, expires_in_secs: u64)
        -> Result<AccessUrl, StorageError>;

    async fn bucket_exists(&self) -> Result<BucketCheck, StorageError>;

    async fn create_bucket_if_not_exists(&self) -> Result<BucketCheck, StorageError>;
}

/// A full adapter: the contract plus the inspection capabilities
pub trait StorageBackend: StorageProvider + StorageInspector {}

impl<T: StorageProvider + StorageInspector> StorageBackend for T {}

/// Split `a/b/c.wav` into (`a/b`, `c.wav`); keys without a slash live at the root
pub(crate) fn split_key(key: &str) -> (&str, &str) {
    key.rsplit_once('/').unwrap_or(("", key))
}

/// Percent-encode each path segment of `key`, keeping the separators
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("0xabc/s1_2024.wav"), ("0xabc", "s1_2024.wav"));
        assert_eq!(split_key("a/b/c.txt"), ("a/b", "c.txt"));
        assert_eq!(split_key("root.txt"), ("", "root.txt"));
    }

    #[test]
    fn test_encode_key_keeps_separators() {
        assert_eq!(encode_key("0xabc/test_001.wav"), "0xabc/test_001.wav");
        assert_eq!(encode_key("dir/my file.wav"), "dir/my%20file.wav");
    }
}
