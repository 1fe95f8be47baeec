use utoipa::{Modify, OpenApi};

use crate::core::config::StorageKind;
use crate::features::storage::{dtos as storage_dtos, handlers as storage_handlers};
use crate::features::wallet::{
    dtos as wallet_dtos, handlers as wallet_handlers, models as wallet_models,
};
use crate::modules::storage::{TestUploadReport, ValidationReport};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Wallet
        wallet_handlers::record_wallet,
        wallet_handlers::get_wallet_stats,
        wallet_handlers::authenticate_wallet,
        wallet_handlers::get_detailed_stats,
        // Wallet activity
        wallet_handlers::add_recording,
        wallet_handlers::list_recordings,
        wallet_handlers::add_review,
        wallet_handlers::list_reviews,
        wallet_handlers::upload_batch_activities,
        wallet_handlers::list_batches,
        // Audio upload
        wallet_handlers::upload_audio,
        // Storage diagnostics
        storage_handlers::validate_storage,
        storage_handlers::test_storage,
        storage_handlers::get_storage_info,
        storage_handlers::reset_storage,
        storage_handlers::get_storage_guide,
    ),
    components(
        schemas(
            Meta,
            // Wallet
            wallet_dtos::UpsertWalletDto,
            wallet_dtos::WalletAuthDto,
            wallet_dtos::SessionInfoDto,
            wallet_dtos::WalletRecordResponseDto,
            wallet_dtos::WalletAuthResponseDto,
            wallet_dtos::UserStatsResponseDto,
            wallet_dtos::RecentActivityDto,
            wallet_dtos::DetailedStatsResponseDto,
            ApiResponse<wallet_dtos::WalletRecordResponseDto>,
            ApiResponse<wallet_dtos::WalletAuthResponseDto>,
            ApiResponse<wallet_dtos::UserStatsResponseDto>,
            ApiResponse<wallet_dtos::DetailedStatsResponseDto>,
            // Wallet activity
            wallet_dtos::RecordingDataDto,
            wallet_dtos::AddRecordingDto,
            wallet_dtos::ReviewDataDto,
            wallet_dtos::AddReviewDto,
            wallet_dtos::BatchActivitiesDto,
            wallet_dtos::ContributionSummaryDto,
            wallet_dtos::RecordingResponseDto,
            wallet_dtos::ReviewResponseDto,
            wallet_dtos::BatchResultResponseDto,
            wallet_dtos::BatchHistoryResponseDto,
            wallet_models::RecordingContribution,
            wallet_models::ReviewActivity,
            wallet_models::BatchActivity,
            ApiResponse<wallet_dtos::RecordingResponseDto>,
            ApiResponse<wallet_dtos::ReviewResponseDto>,
            ApiResponse<wallet_dtos::BatchResultResponseDto>,
            ApiResponse<wallet_dtos::BatchHistoryResponseDto>,
            ApiResponse<Vec<wallet_models::RecordingContribution>>,
            ApiResponse<Vec<wallet_models::ReviewActivity>>,
            // Audio upload
            wallet_dtos::UploadAudioFormDto,
            wallet_dtos::AudioUploadResponseDto,
            ApiResponse<wallet_dtos::AudioUploadResponseDto>,
            // Storage diagnostics
            StorageKind,
            ValidationReport,
            TestUploadReport,
            storage_dtos::StorageInfoResponseDto,
            storage_dtos::StorageResetResponseDto,
            storage_dtos::StorageGuideResponseDto,
            ApiResponse<storage_dtos::StorageInfoResponseDto>,
            ApiResponse<storage_dtos::StorageResetResponseDto>,
            ApiResponse<storage_dtos::StorageGuideResponseDto>,
        )
    ),
    tags(
        (name = "wallet", description = "Wallet users, contributions and audio uploads"),
        (name = "storage", description = "Object storage configuration and diagnostics"),
    ),
    info(
        title = "Yue Voice API",
        version = "0.1.0",
        description = "API documentation for Yue Voice",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
