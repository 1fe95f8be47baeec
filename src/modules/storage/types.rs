use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A file ready to be handed to a storage backend
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original filename as provided by the client
    pub name: String,
    /// MIME type of the file
    pub content_type: String,
    /// File content, read fully into memory
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Size of the file in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Outcome of a single upload attempt, produced for successes and failures alike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StorageUploadResult {
    pub success: bool,
    pub key: String,
    pub url: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StorageUploadResult {
    pub fn uploaded(key: &str, url: String, size: u64) -> Self {
        Self {
            success: true,
            key: key.to_string(),
            url,
            size,
            error: None,
        }
    }

    pub fn failed(key: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            key: key.to_string(),
            url: String::new(),
            size: 0,
            error: Some(error.into()),
        }
    }
}

/// Whether a value came from the backend or is a local stand-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    /// Value was reported by the remote backend
    Backend,
    /// Value is an approximation produced without asking the backend
    Placeholder,
}

/// Metadata of a stored object
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub fidelity: Fidelity,
}

/// A single entry returned by a prefix listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    pub name: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of a prefix listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObjectListing {
    pub entries: Vec<ObjectEntry>,
    pub fidelity: Fidelity,
}

/// A URL that grants access to an object
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessUrl {
    pub url: String,
    pub expires_in_secs: u64,
    pub fidelity: Fidelity,
}

/// Answer to a bucket-level question (existence, creation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BucketCheck {
    pub ok: bool,
    pub fidelity: Fidelity,
}

impl BucketCheck {
    pub fn backend(ok: bool) -> Self {
        Self {
            ok,
            fidelity: Fidelity::Backend,
        }
    }

    pub fn assumed(ok: bool) -> Self {
        Self {
            ok,
            fidelity: Fidelity::Placeholder,
        }
    }
}
