use axum::{extract::State, Json};
use std::sync::Arc;

use crate::core::error::Result;
use crate::features::storage::dtos::{
    StorageGuideResponseDto, StorageInfoResponseDto, StorageResetResponseDto,
};
use crate::features::storage::services::StorageService;
use crate::modules::storage::{TestUploadReport, ValidationReport};
use crate::shared::types::ApiResponse;

/// Validate the TOS configuration
///
/// Checks required keys, then inspects the bucket. Problems are reported in
/// the body; the status is 200 either way.
#[utoipa::path(
    post,
    path = "/api/storage/validate",
    tag = "storage",
    responses(
        (status = 200, description = "Validation report", body = ValidationReport)
    )
)]
pub async fn validate_storage(
    State(service): State<Arc<StorageService>>,
) -> Json<ValidationReport> {
    Json(service.validate().await)
}

/// Upload, inspect and delete a small test object
#[utoipa::path(
    post,
    path = "/api/storage/test",
    tag = "storage",
    responses(
        (status = 200, description = "Round-trip test report", body = TestUploadReport)
    )
)]
pub async fn test_storage(State(service): State<Arc<StorageService>>) -> Json<TestUploadReport> {
    Json(service.test_upload().await)
}

#[utoipa::path(
    get,
    path = "/api/storage/info",
    tag = "storage",
    responses(
        (status = 200, description = "Storage configuration summary", body = ApiResponse<StorageInfoResponseDto>)
    )
)]
pub async fn get_storage_info(
    State(service): State<Arc<StorageService>>,
) -> Result<Json<ApiResponse<StorageInfoResponseDto>>> {
    let info = service.info().await;
    Ok(Json(ApiResponse::success(Some(info), None, None)))
}

/// Clear the cached storage adapter
#[utoipa::path(
    post,
    path = "/api/storage/reset",
    tag = "storage",
    responses(
        (status = 200, description = "Adapter cache cleared", body = ApiResponse<StorageResetResponseDto>)
    )
)]
pub async fn reset_storage(
    State(service): State<Arc<StorageService>>,
) -> Result<Json<ApiResponse<StorageResetResponseDto>>> {
    let result = service.reset().await;
    Ok(Json(ApiResponse::success(
        Some(result),
        Some("Storage provider cache cleared".to_string()),
        None,
    )))
}

#[utoipa::path(
    get,
    path = "/api/storage/guide",
    tag = "storage",
    responses(
        (status = 200, description = "TOS setup steps", body = ApiResponse<StorageGuideResponseDto>)
    )
)]
pub async fn get_storage_guide(
    State(service): State<Arc<StorageService>>,
) -> Result<Json<ApiResponse<StorageGuideResponseDto>>> {
    Ok(Json(ApiResponse::success(Some(service.guide()), None, None)))
}
