use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::shared::validation::WALLET_ADDRESS_REGEX;

/// Record a wallet connection
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertWalletDto {
    #[validate(regex(path = *WALLET_ADDRESS_REGEX, message = "Invalid wallet address format"))]
    #[schema(example = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e")]
    pub wallet_address: String,

    /// Client-side access time; defaults to the server time
    pub timestamp: Option<DateTime<Utc>>,

    /// Extra profile fields merged into the user record
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

/// Browser session details sent on wallet authentication
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionInfoDto {
    pub browser: Option<String>,
    pub language: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletAuthDto {
    #[validate(regex(path = *WALLET_ADDRESS_REGEX, message = "Invalid wallet address format"))]
    #[schema(example = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e")]
    pub wallet_address: String,

    pub user_info: Option<SessionInfoDto>,

    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

/// Query identifying a wallet
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct WalletQuery {
    /// Wallet address (0x + 40 hex digits)
    #[validate(regex(path = *WALLET_ADDRESS_REGEX, message = "Invalid wallet address format"))]
    #[param(example = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e")]
    pub wallet_address: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecordResponseDto {
    pub id: Uuid,
    pub wallet_address: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletAuthResponseDto {
    pub id: Uuid,
    pub wallet_address: String,
    pub auth_time: DateTime<Utc>,
    pub session_info: SessionInfoDto,
}

/// Lifetime contribution totals for a wallet
#[derive(Debug, Serialize, ToSchema)]
pub struct UserStatsResponseDto {
    pub wallet_address: String,
    pub total_recordings: i64,
    pub total_reviews: i64,
    /// Sum of recording durations in seconds
    pub total_contribution_time: f64,
    /// Mean review accuracy, missing values counted as 0
    pub accuracy_score: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentActivityDto {
    pub recordings_this_week: i64,
    pub reviews_this_week: i64,
    pub recording_time_this_week: f64,
}

/// Totals plus activity window, rank and score
#[derive(Debug, Serialize, ToSchema)]
pub struct DetailedStatsResponseDto {
    pub wallet_address: String,
    pub total_recordings: i64,
    pub total_reviews: i64,
    pub total_contribution_time: f64,
    pub accuracy_score: f64,
    pub last_activity: Option<DateTime<Utc>>,
    pub recent_activity: RecentActivityDto,
    /// 1-based registration order, 0 when the wallet is unknown
    pub user_rank: i64,
    pub account_age_days: i64,
    pub contribution_score: i64,
    pub retrieved_at: DateTime<Utc>,
}
