use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::{BTreeMap, HashMap};

use crate::core::error::{AppError, Result};
use crate::features::wallet::models::{
    BatchActivity, NewBatchActivity, NewRecordingContribution, NewReviewActivity,
    RecentActivity, RecordingContribution, ReviewActivity, UserStats, WalletUser,
};
use crate::shared::constants::{
    MAX_BATCH_ACTIVITIES, RECENT_ACTIVITY_DAYS, RECORDING_SCORE, REVIEW_SCORE,
};

/// Service for wallet users and their contribution records
pub struct WalletService {
    pool: PgPool,
}

impl WalletService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== Users ====================

    /// Create the wallet user or merge `user_info` into the existing record
    pub async fn upsert_user(&self, wallet_address: &str, user_info: Value) -> Result<WalletUser> {
        let user = sqlx::query_as::<_, WalletUser>(
            r#"
            INSERT INTO wallet_users (wallet_address, user_info)
            VALUES ($1, $2)
            ON CONFLICT (wallet_address) DO UPDATE
            SET user_info = wallet_users.user_info || EXCLUDED.user_info,
                updated_at = NOW()
            RETURNING id, wallet_address, user_info, created_at, updated_at
            "#,
        )
        .bind(wallet_address)
        .bind(&user_info)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert wallet user {}: {:?}", wallet_address, e);
            AppError::Database(e)
        })?;

        Ok(user)
    }

    /// Registration time of the wallet, if known
    pub async fn get_user_created_at(&self, wallet_address: &str) -> Result<Option<DateTime<Utc>>> {
        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM wallet_users WHERE wallet_address = $1",
        )
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(created_at)
    }

    /// 1-based position of the wallet in registration order, 0 if unknown
    pub async fn get_user_rank(&self, wallet_address: &str) -> Result<i64> {
        let rank = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT ranked.rank
            FROM (
                SELECT wallet_address,
                       ROW_NUMBER() OVER (ORDER BY created_at ASC, id ASC) AS rank
                FROM wallet_users
            ) ranked
            WHERE ranked.wallet_address = $1
            "#,
        )
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rank.unwrap_or(0))
    }

    // ==================== Recordings ====================

    pub async fn add_recording_contribution(
        &self,
        contribution: NewRecordingContribution,
    ) -> Result<RecordingContribution> {
        let record = sqlx::query_as::<_, RecordingContribution>(
            r#"
            INSERT INTO recording_contributions (
                wallet_address, sentence_id, sentence_text, duration, audio_quality, language,
                file_path, file_url, file_size, file_type, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&contribution.wallet_address)
        .bind(&contribution.sentence_id)
        .bind(&contribution.sentence_text)
        .bind(contribution.duration)
        .bind(&contribution.audio_quality)
        .bind(&contribution.language)
        .bind(&contribution.file_path)
        .bind(&contribution.file_url)
        .bind(contribution.file_size)
        .bind(&contribution.file_type)
        .bind(&contribution.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to add recording contribution for {}: {:?}",
                contribution.wallet_address,
                e
            );
            AppError::Database(e)
        })?;

        Ok(record)
    }

    /// Newest-first page of recordings plus the wallet's total count
    pub async fn list_recording_contributions(
        &self,
        wallet_address: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RecordingContribution>, i64)> {
        let records = sqlx::query_as::<_, RecordingContribution>(
            r#"
            SELECT * FROM recording_contributions
            WHERE wallet_address = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(wallet_address)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM recording_contributions WHERE wallet_address = $1",
        )
        .bind(wallet_address)
        .fetch_one(&self.pool)
        .await?;

        Ok((records, total))
    }

    // ==================== Reviews ====================

    pub async fn add_review_activity(&self, review: NewReviewActivity) -> Result<ReviewActivity> {
        let record = sqlx::query_as::<_, ReviewActivity>(
            r#"
            INSERT INTO review_activities (wallet_address, review_type, items_reviewed, accuracy, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&review.wallet_address)
        .bind(&review.review_type)
        .bind(review.items_reviewed)
        .bind(review.accuracy)
        .bind(&review.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to add review activity for {}: {:?}",
                review.wallet_address,
                e
            );
            AppError::Database(e)
        })?;

        Ok(record)
    }

    /// Newest-first page of reviews, optionally of one type, plus the matching total
    pub async fn list_review_activities(
        &self,
        wallet_address: &str,
        review_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewActivity>, i64)> {
        let records = sqlx::query_as::<_, ReviewActivity>(
            r#"
            SELECT * FROM review_activities
            WHERE wallet_address = $1 AND ($2::text IS NULL OR review_type = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(wallet_address)
        .bind(review_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM review_activities
            WHERE wallet_address = $1 AND ($2::text IS NULL OR review_type = $2)
            "#,
        )
        .bind(wallet_address)
        .bind(review_type)
        .fetch_one(&self.pool)
        .await?;

        Ok((records, total))
    }

    // ==================== Batches ====================

    /// Insert all activities of one batch in a single statement
    pub async fn batch_add_activities(
        &self,
        activities: Vec<NewBatchActivity>,
    ) -> Result<Vec<BatchActivity>> {
        if activities.is_empty() || activities.len() > MAX_BATCH_ACTIVITIES {
            return Err(AppError::Validation(format!(
                "Between 1 and {} activities are allowed per batch",
                MAX_BATCH_ACTIVITIES
            )));
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO batch_activities (wallet_address, activity_type, activity_data, sequence_number, metadata) ",
        );
        builder.push_values(activities, |mut row, activity| {
            row.push_bind(activity.wallet_address)
                .push_bind(activity.activity_type)
                .push_bind(activity.activity_data)
                .push_bind(activity.sequence_number)
                .push_bind(activity.metadata);
        });
        builder.push(" RETURNING *");

        let rows = builder
            .build_query_as::<BatchActivity>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert batch activities: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(rows)
    }

    pub async fn list_batch_activities(
        &self,
        wallet_address: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BatchActivity>> {
        let rows = sqlx::query_as::<_, BatchActivity>(
            r#"
            SELECT * FROM batch_activities
            WHERE wallet_address = $1
            ORDER BY created_at DESC, sequence_number ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(wallet_address)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ==================== Statistics ====================

    pub async fn get_user_stats(&self, wallet_address: &str) -> Result<UserStats> {
        let (total_recordings, total_contribution_time, last_activity) =
            sqlx::query_as::<_, (i64, f64, Option<DateTime<Utc>>)>(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(duration), 0)::float8,
                       MAX(created_at)
                FROM recording_contributions
                WHERE wallet_address = $1
                "#,
            )
            .bind(wallet_address)
            .fetch_one(&self.pool)
            .await?;

        let (total_reviews, accuracy_score) = sqlx::query_as::<_, (i64, f64)>(
            r#"
            SELECT COUNT(*), COALESCE(AVG(COALESCE(accuracy, 0)), 0)::float8
            FROM review_activities
            WHERE wallet_address = $1
            "#,
        )
        .bind(wallet_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            wallet_address: wallet_address.to_string(),
            total_recordings,
            total_reviews,
            total_contribution_time,
            accuracy_score,
            last_activity,
        })
    }

    /// Activity since `now - RECENT_ACTIVITY_DAYS`
    pub async fn get_recent_activity(
        &self,
        wallet_address: &str,
        now: DateTime<Utc>,
    ) -> Result<RecentActivity> {
        let since = recent_window_start(now);

        let (recordings, recording_time) = sqlx::query_as::<_, (i64, f64)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(duration), 0)::float8
            FROM recording_contributions
            WHERE wallet_address = $1 AND created_at >= $2
            "#,
        )
        .bind(wallet_address)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let reviews = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM review_activities WHERE wallet_address = $1 AND created_at >= $2",
        )
        .bind(wallet_address)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(RecentActivity {
            recordings,
            reviews,
            recording_time,
        })
    }
}

// ==================== Helpers ====================

pub fn recent_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RECENT_ACTIVITY_DAYS)
}

/// Weighted score: recordings count double a review
pub fn contribution_score(total_recordings: i64, total_reviews: i64) -> i64 {
    total_recordings * RECORDING_SCORE + total_reviews * REVIEW_SCORE
}

/// Whole days since `created_at`, 0 when unknown or in the future
pub fn account_age_days(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    created_at
        .map(|created| (now - created).num_days().max(0))
        .unwrap_or(0)
}

/// `batch_{millis}_{last six characters of the address}`
pub fn batch_id(wallet_address: &str, now: DateTime<Utc>) -> String {
    let start = wallet_address.len().saturating_sub(6);
    let suffix = wallet_address.get(start..).unwrap_or(wallet_address);
    format!("batch_{}_{}", now.timestamp_millis(), suffix)
}

/// Activity type named by the object's `type` field
pub fn activity_type(activity: &Value) -> String {
    activity
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("unknown")
        .to_string()
}

pub fn activity_breakdown(activities: &[Value]) -> HashMap<String, usize> {
    let mut breakdown = HashMap::new();
    for activity in activities {
        *breakdown.entry(activity_type(activity)).or_insert(0) += 1;
    }
    breakdown
}

/// Rows for one batch, numbered from 1 in submission order
pub fn build_batch_rows(
    wallet_address: &str,
    batch_id: &str,
    activities: &[Value],
    metadata: Option<&Value>,
    now: DateTime<Utc>,
) -> Vec<NewBatchActivity> {
    let mut row_metadata = json!({
        "type": "batch_activities",
        "batch_id": batch_id,
        "total_count": activities.len(),
    });
    merge_object(&mut row_metadata, metadata);
    row_metadata["uploaded_at"] = json!(now);

    activities
        .iter()
        .enumerate()
        .map(|(index, activity)| NewBatchActivity {
            wallet_address: wallet_address.to_string(),
            activity_type: activity_type(activity),
            activity_data: activity.clone(),
            sequence_number: index as i32 + 1,
            metadata: row_metadata.clone(),
        })
        .collect()
}

pub fn group_by_batch(rows: Vec<BatchActivity>) -> BTreeMap<String, Vec<BatchActivity>> {
    let mut groups: BTreeMap<String, Vec<BatchActivity>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.batch_id().to_string()).or_default().push(row);
    }
    groups
}

/// Copy the fields of `extra` into `target` when both are objects
pub fn merge_object(target: &mut Value, extra: Option<&Value>) {
    if let (Some(target), Some(Value::Object(extra))) = (target.as_object_mut(), extra) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
}
