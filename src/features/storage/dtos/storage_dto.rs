use serde::Serialize;
use utoipa::ToSchema;

use crate::core::config::StorageKind;

/// Configured storage backend plus the state of the cached adapter
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfoResponseDto {
    /// Backend selected by configuration
    pub provider: StorageKind,
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    /// Backend of the cached adapter, if one has been built
    pub active_provider: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageResetResponseDto {
    /// Whether an adapter was cached before the reset
    pub was_cached: bool,
    /// Backend the next upload will use
    pub next_provider: StorageKind,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StorageGuideResponseDto {
    pub steps: Vec<String>,
}
