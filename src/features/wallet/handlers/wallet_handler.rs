use axum::{
    extract::{Query, State},
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, ClientIp};
use crate::features::wallet::dtos::{
    DetailedStatsResponseDto, RecentActivityDto, SessionInfoDto, UpsertWalletDto,
    UserStatsResponseDto, WalletAuthDto, WalletAuthResponseDto, WalletQuery,
    WalletRecordResponseDto,
};
use crate::features::wallet::services::{
    account_age_days, contribution_score, merge_object, WalletService,
};
use crate::shared::types::ApiResponse;

pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Record a wallet connection
#[utoipa::path(
    post,
    path = "/api/wallet",
    tag = "wallet",
    request_body = UpsertWalletDto,
    responses(
        (status = 200, description = "Wallet recorded", body = ApiResponse<WalletRecordResponseDto>),
        (status = 400, description = "Invalid wallet address")
    )
)]
pub async fn record_wallet(
    State(service): State<Arc<WalletService>>,
    ClientIp(ip_address): ClientIp,
    AppJson(dto): AppJson<UpsertWalletDto>,
) -> Result<Json<ApiResponse<WalletRecordResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    let mut user_info = json!({});
    merge_object(&mut user_info, dto.metadata.as_ref());
    user_info["last_access"] = json!(dto.timestamp.unwrap_or(now));
    user_info["ip_address"] = json!(ip_address);

    let user = service.upsert_user(&dto.wallet_address, user_info).await?;

    Ok(Json(ApiResponse::success(
        Some(WalletRecordResponseDto {
            id: user.id,
            wallet_address: user.wallet_address,
            timestamp: now,
        }),
        Some("Wallet address recorded".to_string()),
        None,
    )))
}

/// Lifetime contribution totals for a wallet
#[utoipa::path(
    get,
    path = "/api/wallet",
    tag = "wallet",
    params(WalletQuery),
    responses(
        (status = 200, description = "User statistics", body = ApiResponse<UserStatsResponseDto>),
        (status = 400, description = "Invalid wallet address")
    )
)]
pub async fn get_wallet_stats(
    State(service): State<Arc<WalletService>>,
    Query(query): Query<WalletQuery>,
) -> Result<Json<ApiResponse<UserStatsResponseDto>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let stats = service.get_user_stats(&query.wallet_address).await?;

    Ok(Json(ApiResponse::success(
        Some(UserStatsResponseDto {
            wallet_address: stats.wallet_address,
            total_recordings: stats.total_recordings,
            total_reviews: stats.total_reviews,
            total_contribution_time: stats.total_contribution_time,
            accuracy_score: stats.accuracy_score,
            last_activity: stats.last_activity,
        }),
        None,
        None,
    )))
}

/// Record a wallet authentication with browser session details
#[utoipa::path(
    post,
    path = "/api/wallet/auth",
    tag = "wallet",
    request_body = WalletAuthDto,
    responses(
        (status = 200, description = "Authentication recorded", body = ApiResponse<WalletAuthResponseDto>),
        (status = 400, description = "Invalid wallet address")
    )
)]
pub async fn authenticate_wallet(
    State(service): State<Arc<WalletService>>,
    ClientIp(ip_address): ClientIp,
    headers: HeaderMap,
    AppJson(dto): AppJson<WalletAuthDto>,
) -> Result<Json<ApiResponse<WalletAuthResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    let session = session_info(dto.user_info.as_ref(), dto.metadata.as_ref());

    let mut user_info = json!({
        "type": "authentication",
        "auth_info": {
            "browser": session.browser,
            "language": session.language,
            "platform": session.platform,
            "timestamp": now,
            "ip_address": ip_address,
            "user_agent": user_agent(&headers),
        },
    });
    merge_object(&mut user_info, dto.metadata.as_ref());

    let user = service.upsert_user(&dto.wallet_address, user_info).await?;

    Ok(Json(ApiResponse::success(
        Some(WalletAuthResponseDto {
            id: user.id,
            wallet_address: user.wallet_address,
            auth_time: now,
            session_info: session,
        }),
        Some("Authentication recorded".to_string()),
        None,
    )))
}

/// Session fields from `userInfo`, falling back to same-named metadata fields
fn session_info(
    user_info: Option<&SessionInfoDto>,
    metadata: Option<&serde_json::Value>,
) -> SessionInfoDto {
    let from_metadata = |key: &str| {
        metadata
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    let info = user_info.cloned().unwrap_or_default();

    SessionInfoDto {
        browser: info.browser.or_else(|| from_metadata("browser")),
        language: info.language.or_else(|| from_metadata("language")),
        platform: info.platform.or_else(|| from_metadata("platform")),
    }
}

/// Totals plus recent activity, rank, account age and contribution score
#[utoipa::path(
    get,
    path = "/api/wallet/stats",
    tag = "wallet",
    params(WalletQuery),
    responses(
        (status = 200, description = "Detailed statistics", body = ApiResponse<DetailedStatsResponseDto>),
        (status = 400, description = "Invalid wallet address")
    )
)]
pub async fn get_detailed_stats(
    State(service): State<Arc<WalletService>>,
    Query(query): Query<WalletQuery>,
) -> Result<Json<ApiResponse<DetailedStatsResponseDto>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    let wallet = query.wallet_address.as_str();

    let stats = service.get_user_stats(wallet).await?;
    let recent = service.get_recent_activity(wallet, now).await?;
    let rank = service.get_user_rank(wallet).await?;
    let created_at = service.get_user_created_at(wallet).await?;

    Ok(Json(ApiResponse::success(
        Some(DetailedStatsResponseDto {
            wallet_address: stats.wallet_address,
            total_recordings: stats.total_recordings,
            total_reviews: stats.total_reviews,
            total_contribution_time: stats.total_contribution_time,
            accuracy_score: stats.accuracy_score,
            last_activity: stats.last_activity,
            recent_activity: RecentActivityDto {
                recordings_this_week: recent.recordings,
                reviews_this_week: recent.reviews,
                recording_time_this_week: recent.recording_time,
            },
            user_rank: rank,
            account_age_days: account_age_days(created_at, now),
            contribution_score: contribution_score(stats.total_recordings, stats.total_reviews),
            retrieved_at: now,
        }),
        None,
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_info_prefers_user_info() {
        let user_info = SessionInfoDto {
            browser: Some("Firefox".to_string()),
            language: None,
            platform: None,
        };
        let metadata = json!({"browser": "Chrome", "language": "zh-HK", "platform": 3});

        let session = session_info(Some(&user_info), Some(&metadata));
        assert_eq!(session.browser.as_deref(), Some("Firefox"));
        assert_eq!(session.language.as_deref(), Some("zh-HK"));
        assert_eq!(session.platform, None);

        let empty = session_info(None, None);
        assert!(empty.browser.is_none() && empty.language.is_none());
    }

    #[test]
    fn test_user_agent_defaults_to_unknown() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_agent(&headers), "unknown");

        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        assert_eq!(user_agent(&headers), "Mozilla/5.0");
    }
}
