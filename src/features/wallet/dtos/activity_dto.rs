use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::wallet::models::BatchActivity;
use crate::shared::constants::DEFAULT_ACTIVITY_LIST_LIMIT;
use crate::shared::validation::WALLET_ADDRESS_REGEX;

fn default_limit() -> i64 {
    DEFAULT_ACTIVITY_LIST_LIMIT
}

fn default_audio_quality() -> String {
    "medium".to_string()
}

fn default_language() -> String {
    "yue".to_string()
}

fn default_review_type() -> String {
    "voice".to_string()
}

fn default_items_reviewed() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDataDto {
    pub sentence_id: Option<String>,
    pub sentence_text: Option<String>,

    /// Seconds
    #[validate(range(min = 0.0, message = "Duration cannot be negative"))]
    pub duration: Option<f64>,

    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddRecordingDto {
    #[validate(regex(path = *WALLET_ADDRESS_REGEX, message = "Invalid wallet address format"))]
    pub wallet_address: String,

    #[serde(default)]
    #[validate(nested)]
    pub recording_data: RecordingDataDto,

    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

impl Default for RecordingDataDto {
    fn default() -> Self {
        Self {
            sentence_id: None,
            sentence_text: None,
            duration: None,
            audio_quality: default_audio_quality(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDataDto {
    #[serde(default = "default_review_type")]
    pub review_type: String,

    #[serde(default = "default_items_reviewed")]
    #[validate(range(min = 1, message = "At least one item must be reviewed"))]
    pub items_reviewed: i32,

    #[serde(default)]
    pub accuracy: f64,
}

impl Default for ReviewDataDto {
    fn default() -> Self {
        Self {
            review_type: default_review_type(),
            items_reviewed: default_items_reviewed(),
            accuracy: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewDto {
    #[validate(regex(path = *WALLET_ADDRESS_REGEX, message = "Invalid wallet address format"))]
    pub wallet_address: String,

    #[serde(default)]
    #[validate(nested)]
    pub review_data: ReviewDataDto,

    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchActivitiesDto {
    #[validate(regex(path = *WALLET_ADDRESS_REGEX, message = "Invalid wallet address format"))]
    pub wallet_address: String,

    /// Activity objects; `type` selects the activity type
    #[validate(length(
        min = 1,
        max = 100,
        message = "Between 1 and 100 activities are allowed per batch"
    ))]
    #[schema(value_type = Vec<Object>)]
    pub activities: Vec<serde_json::Value>,

    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

/// Paginated activity listing for a wallet
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListQuery {
    #[validate(regex(path = *WALLET_ADDRESS_REGEX, message = "Invalid wallet address format"))]
    pub wallet_address: String,

    /// Review type filter (review listing only)
    pub review_type: Option<String>,

    /// Page size (default 10)
    #[param(minimum = 1, maximum = 100)]
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: i64,

    #[param(minimum = 0)]
    #[serde(default)]
    #[validate(range(min = 0, message = "Offset cannot be negative"))]
    pub offset: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContributionSummaryDto {
    #[serde(rename = "sentenceId")]
    pub sentence_id: Option<String>,
    pub duration: Option<f64>,
    pub quality: String,
    pub language: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordingResponseDto {
    pub id: Uuid,
    pub wallet_address: String,
    pub contribution: ContributionSummaryDto,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponseDto {
    pub id: Uuid,
    pub wallet_address: String,
    pub review_type: String,
    pub items_reviewed: i32,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResultResponseDto {
    pub batch_id: String,
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    pub processed_count: usize,
    /// Count of submitted activities per type
    pub activity_breakdown: HashMap<String, usize>,
    pub upload_time: DateTime<Utc>,
}

/// Batch rows grouped by batch id
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchHistoryResponseDto {
    pub batch_groups: BTreeMap<String, Vec<BatchActivity>>,
    pub total_batches: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WALLET: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    #[test]
    fn test_recording_defaults_when_data_missing() {
        let dto: AddRecordingDto =
            serde_json::from_value(json!({ "walletAddress": WALLET })).unwrap();

        assert!(dto.validate().is_ok());
        assert_eq!(dto.recording_data.audio_quality, "medium");
        assert_eq!(dto.recording_data.language, "yue");
        assert!(dto.recording_data.sentence_id.is_none());
    }

    #[test]
    fn test_recording_rejects_negative_duration() {
        let dto: AddRecordingDto = serde_json::from_value(json!({
            "walletAddress": WALLET,
            "recordingData": { "sentenceId": "s-1", "duration": -2.0 }
        }))
        .unwrap();

        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_review_defaults() {
        let dto: AddReviewDto = serde_json::from_value(json!({
            "walletAddress": WALLET,
            "reviewData": { "accuracy": 87.5 }
        }))
        .unwrap();

        assert!(dto.validate().is_ok());
        assert_eq!(dto.review_data.review_type, "voice");
        assert_eq!(dto.review_data.items_reviewed, 1);
        assert_eq!(dto.review_data.accuracy, 87.5);
    }

    #[test]
    fn test_batch_bounds() {
        let batch = |n: usize| BatchActivitiesDto {
            wallet_address: WALLET.to_string(),
            activities: vec![json!({ "type": "recording" }); n],
            metadata: None,
        };

        assert!(batch(0).validate().is_err());
        assert!(batch(1).validate().is_ok());
        assert!(batch(100).validate().is_ok());
        assert!(batch(101).validate().is_err());
    }
}
