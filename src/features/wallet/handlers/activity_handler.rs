use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::wallet::dtos::{
    ActivityListQuery, AddRecordingDto, AddReviewDto, BatchActivitiesDto,
    BatchHistoryResponseDto, BatchResultResponseDto, ContributionSummaryDto,
    RecordingResponseDto, ReviewResponseDto,
};
use crate::features::wallet::models::{
    NewRecordingContribution, NewReviewActivity, RecordingContribution, ReviewActivity,
};
use crate::features::wallet::services::{
    activity_breakdown, batch_id, build_batch_rows, group_by_batch, merge_object, WalletService,
};
use crate::shared::types::{ApiResponse, Meta};

/// Record a recording contribution
#[utoipa::path(
    post,
    path = "/api/wallet/recording",
    tag = "wallet",
    request_body = AddRecordingDto,
    responses(
        (status = 200, description = "Contribution recorded", body = ApiResponse<RecordingResponseDto>),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn add_recording(
    State(service): State<Arc<WalletService>>,
    AppJson(dto): AppJson<AddRecordingDto>,
) -> Result<Json<ApiResponse<RecordingResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    let data = dto.recording_data;

    let mut metadata = json!({
        "type": "recording_contribution",
        "sentenceId": data.sentence_id,
        "duration": data.duration,
        "audioQuality": data.audio_quality,
        "language": data.language,
    });
    merge_object(&mut metadata, dto.metadata.as_ref());
    metadata["uploaded_at"] = json!(now);

    let record = service
        .add_recording_contribution(NewRecordingContribution {
            wallet_address: dto.wallet_address.clone(),
            sentence_id: data.sentence_id,
            sentence_text: data.sentence_text,
            duration: data.duration,
            audio_quality: data.audio_quality,
            language: data.language,
            metadata,
            ..Default::default()
        })
        .await?;

    service
        .upsert_user(
            &dto.wallet_address,
            json!({ "last_recording": now, "total_recordings_increment": 1 }),
        )
        .await?;

    Ok(Json(ApiResponse::success(
        Some(RecordingResponseDto {
            id: record.id,
            wallet_address: record.wallet_address,
            contribution: ContributionSummaryDto {
                sentence_id: record.sentence_id,
                duration: record.duration,
                quality: record.audio_quality,
                language: record.language,
            },
            timestamp: record.created_at,
        }),
        Some("Recording contribution recorded".to_string()),
        None,
    )))
}

/// Newest-first recording contributions of a wallet
#[utoipa::path(
    get,
    path = "/api/wallet/recording",
    tag = "wallet",
    params(ActivityListQuery),
    responses(
        (status = 200, description = "Recording contributions", body = ApiResponse<Vec<RecordingContribution>>),
        (status = 400, description = "Invalid query")
    )
)]
pub async fn list_recordings(
    State(service): State<Arc<WalletService>>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<ApiResponse<Vec<RecordingContribution>>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (records, total) = service
        .list_recording_contributions(&query.wallet_address, query.limit, query.offset)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(records),
        None,
        Some(Meta { total }),
    )))
}

/// Record a review session
#[utoipa::path(
    post,
    path = "/api/wallet/review",
    tag = "wallet",
    request_body = AddReviewDto,
    responses(
        (status = 200, description = "Review recorded", body = ApiResponse<ReviewResponseDto>),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn add_review(
    State(service): State<Arc<WalletService>>,
    AppJson(dto): AppJson<AddReviewDto>,
) -> Result<Json<ApiResponse<ReviewResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    let data = dto.review_data;

    let mut metadata = json!({
        "type": "review_activity",
        "reviewType": data.review_type,
        "itemsReviewed": data.items_reviewed,
        "accuracy": data.accuracy,
    });
    merge_object(&mut metadata, dto.metadata.as_ref());
    metadata["reviewed_at"] = json!(now);

    let record = service
        .add_review_activity(NewReviewActivity {
            wallet_address: dto.wallet_address.clone(),
            review_type: data.review_type,
            items_reviewed: data.items_reviewed,
            accuracy: data.accuracy,
            metadata,
        })
        .await?;

    service
        .upsert_user(
            &dto.wallet_address,
            json!({ "last_review": now, "total_reviews_increment": record.items_reviewed }),
        )
        .await?;

    Ok(Json(ApiResponse::success(
        Some(ReviewResponseDto {
            id: record.id,
            wallet_address: record.wallet_address,
            review_type: record.review_type,
            items_reviewed: record.items_reviewed,
            accuracy: record.accuracy,
            timestamp: record.created_at,
        }),
        Some("Review activity recorded".to_string()),
        None,
    )))
}

/// Newest-first review activities of a wallet
#[utoipa::path(
    get,
    path = "/api/wallet/review",
    tag = "wallet",
    params(ActivityListQuery),
    responses(
        (status = 200, description = "Review activities", body = ApiResponse<Vec<ReviewActivity>>),
        (status = 400, description = "Invalid query")
    )
)]
pub async fn list_reviews(
    State(service): State<Arc<WalletService>>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewActivity>>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (records, total) = service
        .list_review_activities(
            &query.wallet_address,
            query.review_type.as_deref(),
            query.limit,
            query.offset,
        )
        .await?;

    Ok(Json(ApiResponse::success(
        Some(records),
        None,
        Some(Meta { total }),
    )))
}

/// Upload up to 100 activities in one request
#[utoipa::path(
    post,
    path = "/api/wallet/batch",
    tag = "wallet",
    request_body = BatchActivitiesDto,
    responses(
        (status = 200, description = "Batch stored", body = ApiResponse<BatchResultResponseDto>),
        (status = 400, description = "Empty or oversized batch")
    )
)]
pub async fn upload_batch_activities(
    State(service): State<Arc<WalletService>>,
    AppJson(dto): AppJson<BatchActivitiesDto>,
) -> Result<Json<ApiResponse<BatchResultResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    let batch_id = batch_id(&dto.wallet_address, now);
    let rows = build_batch_rows(
        &dto.wallet_address,
        &batch_id,
        &dto.activities,
        dto.metadata.as_ref(),
        now,
    );

    let inserted = service.batch_add_activities(rows).await?;

    service
        .upsert_user(
            &dto.wallet_address,
            json!({ "last_batch_upload": now, "total_batch_activities": dto.activities.len() }),
        )
        .await?;

    let count = inserted.len();
    Ok(Json(ApiResponse::success(
        Some(BatchResultResponseDto {
            batch_id,
            wallet_address: dto.wallet_address,
            processed_count: count,
            activity_breakdown: activity_breakdown(&dto.activities),
            upload_time: now,
        }),
        Some(format!("Uploaded {} activities", count)),
        None,
    )))
}

/// Batch upload history of a wallet, grouped by batch id
#[utoipa::path(
    get,
    path = "/api/wallet/batch",
    tag = "wallet",
    params(ActivityListQuery),
    responses(
        (status = 200, description = "Batch history", body = ApiResponse<BatchHistoryResponseDto>),
        (status = 400, description = "Invalid query")
    )
)]
pub async fn list_batches(
    State(service): State<Arc<WalletService>>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<ApiResponse<BatchHistoryResponseDto>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let rows = service
        .list_batch_activities(&query.wallet_address, query.limit, query.offset)
        .await?;
    let total = rows.len() as i64;
    let batch_groups = group_by_batch(rows);

    Ok(Json(ApiResponse::success(
        Some(BatchHistoryResponseDto {
            total_batches: batch_groups.len(),
            batch_groups,
        }),
        None,
        Some(Meta { total }),
    )))
}
