use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Database model for wallet users
#[allow(dead_code)]
#[derive(Debug, Clone, FromRow)]
pub struct WalletUser {
    pub id: Uuid,
    pub wallet_address: String,
    pub user_info: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database model for recording contributions
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct RecordingContribution {
    pub id: Uuid,
    pub wallet_address: String,
    pub sentence_id: Option<String>,
    pub sentence_text: Option<String>,
    pub duration: Option<f64>,
    pub audio_quality: String,
    pub language: String,
    pub file_path: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Database model for review activities
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ReviewActivity {
    pub id: Uuid,
    pub wallet_address: String,
    pub review_type: String,
    pub items_reviewed: i32,
    pub accuracy: f64,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Database model for batch-uploaded activities
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct BatchActivity {
    pub id: Uuid,
    pub wallet_address: String,
    pub activity_type: String,
    #[schema(value_type = Object)]
    pub activity_data: serde_json::Value,
    pub sequence_number: i32,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl BatchActivity {
    /// Batch this row was uploaded with
    pub fn batch_id(&self) -> &str {
        self.metadata
            .get("batch_id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

/// Insert payload for `recording_contributions`
#[derive(Debug, Clone, Default)]
pub struct NewRecordingContribution {
    pub wallet_address: String,
    pub sentence_id: Option<String>,
    pub sentence_text: Option<String>,
    pub duration: Option<f64>,
    pub audio_quality: String,
    pub language: String,
    pub file_path: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub metadata: serde_json::Value,
}

/// Insert payload for `review_activities`
#[derive(Debug, Clone)]
pub struct NewReviewActivity {
    pub wallet_address: String,
    pub review_type: String,
    pub items_reviewed: i32,
    pub accuracy: f64,
    pub metadata: serde_json::Value,
}

/// Insert payload for `batch_activities`
#[derive(Debug, Clone)]
pub struct NewBatchActivity {
    pub wallet_address: String,
    pub activity_type: String,
    pub activity_data: serde_json::Value,
    pub sequence_number: i32,
    pub metadata: serde_json::Value,
}

/// Aggregated contribution figures for one wallet
#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub wallet_address: String,
    pub total_recordings: i64,
    pub total_reviews: i64,
    pub total_contribution_time: f64,
    pub accuracy_score: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Activity inside the recent-activity window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentActivity {
    pub recordings: i64,
    pub reviews: i64,
    pub recording_time: f64,
}
