use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::error::{AppError, Result};
use crate::features::wallet::dtos::AudioUploadResponseDto;
use crate::features::wallet::models::{NewRecordingContribution, RecordingContribution};
use crate::features::wallet::services::WalletService;
use crate::modules::storage::{
    upload_with_retry, Pacer, RetryPolicy, StorageFactory, TokioPacer, UploadFile,
};
use crate::shared::constants::{
    ALLOWED_AUDIO_TYPES, DEFAULT_AUDIO_EXTENSION, MAX_AUDIO_FILE_SIZE,
};
use crate::shared::validation::is_valid_wallet_address;

/// Persists the contribution row for an uploaded file
#[async_trait]
pub trait ContributionRecorder: Send + Sync {
    async fn record(&self, contribution: NewRecordingContribution) -> Result<RecordingContribution>;
}

#[async_trait]
impl ContributionRecorder for WalletService {
    async fn record(&self, contribution: NewRecordingContribution) -> Result<RecordingContribution> {
        self.add_recording_contribution(contribution).await
    }
}

/// Raw multipart fields of an audio upload
#[derive(Debug, Default)]
pub struct AudioUploadForm {
    pub file: Option<UploadFile>,
    pub wallet_address: Option<String>,
    pub sentence_id: Option<String>,
    pub sentence_text: Option<String>,
    pub duration: Option<String>,
    pub audio_quality: Option<String>,
}

/// Checked audio upload, ready for storage
#[derive(Debug, Clone)]
pub struct AudioUploadRequest {
    pub file: UploadFile,
    pub wallet_address: String,
    pub sentence_id: String,
    pub sentence_text: Option<String>,
    pub duration: f64,
    pub audio_quality: String,
    pub user_agent: String,
}

impl AudioUploadForm {
    /// Check required fields, address format, content type and size
    pub fn into_request(self, user_agent: impl Into<String>) -> Result<AudioUploadRequest> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let (file, wallet_address, sentence_id) = match (
            self.file,
            non_empty(self.wallet_address),
            non_empty(self.sentence_id),
        ) {
            (Some(file), Some(wallet), Some(sentence)) => (file, wallet, sentence),
            _ => {
                return Err(AppError::BadRequest(
                    "Missing required fields: audioFile, walletAddress, sentenceId".to_string(),
                ))
            }
        };

        if !is_valid_wallet_address(&wallet_address) {
            return Err(AppError::Validation(
                "Invalid wallet address format".to_string(),
            ));
        }

        if !is_allowed_audio_type(&file.content_type) {
            return Err(AppError::Validation(format!(
                "Unsupported audio format '{}'. Allowed: {}",
                file.content_type,
                ALLOWED_AUDIO_TYPES.join(", ")
            )));
        }

        if file.size() > MAX_AUDIO_FILE_SIZE {
            return Err(AppError::Validation(
                "File size exceeds the 10MB limit".to_string(),
            ));
        }

        let duration = match non_empty(self.duration) {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d >= 0.0)
                .ok_or_else(|| {
                    AppError::Validation("Duration must be a non-negative number".to_string())
                })?,
            None => 0.0,
        };

        Ok(AudioUploadRequest {
            file,
            wallet_address,
            sentence_id,
            sentence_text: non_empty(self.sentence_text),
            duration,
            audio_quality: non_empty(self.audio_quality).unwrap_or_else(|| "medium".to_string()),
            user_agent: user_agent.into(),
        })
    }
}

/// Compare the MIME essence, so `audio/webm;codecs=opus` counts as `audio/webm`
pub fn is_allowed_audio_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_AUDIO_TYPES.contains(&essence.as_str())
}

/// Extension after the last dot of `file_name`, or the default extension
pub fn file_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => DEFAULT_AUDIO_EXTENSION,
    }
}

/// `{wallet}/{sentence}_{timestamp}.{ext}` with `:` and `.` in the timestamp replaced by `-`
pub fn build_audio_key(
    wallet_address: &str,
    sentence_id: &str,
    file_name: &str,
    now: DateTime<Utc>,
) -> String {
    let timestamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!(
        "{}/{}_{}.{}",
        wallet_address,
        sentence_id,
        timestamp,
        file_extension(file_name)
    )
}

/// Stores audio through the active storage backend and records the contribution
pub struct AudioUploadService {
    factory: Arc<StorageFactory>,
    recorder: Arc<dyn ContributionRecorder>,
    retry: RetryPolicy,
    pacer: Arc<dyn Pacer>,
}

impl AudioUploadService {
    pub fn new(
        factory: Arc<StorageFactory>,
        recorder: Arc<dyn ContributionRecorder>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            factory,
            recorder,
            retry,
            pacer: Arc::new(TokioPacer),
        }
    }

    #[allow(dead_code)]
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub async fn upload(&self, request: AudioUploadRequest) -> Result<AudioUploadResponseDto> {
        let backend = self.factory.get().await?;
        let now = Utc::now();
        let key = build_audio_key(
            &request.wallet_address,
            &request.sentence_id,
            &request.file.name,
            now,
        );

        info!(
            "Uploading audio '{}' ({} bytes, {}) via {}",
            key,
            request.file.size(),
            request.file.content_type,
            backend.name()
        );

        let result = upload_with_retry(
            backend.as_ref(),
            &request.file,
            &key,
            &self.retry,
            self.pacer.as_ref(),
        )
        .await;

        if !result.success {
            return Err(AppError::Storage(format!(
                "File upload failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            )));
        }

        let contribution = NewRecordingContribution {
            wallet_address: request.wallet_address.clone(),
            sentence_id: Some(request.sentence_id.clone()),
            sentence_text: request.sentence_text.clone(),
            duration: Some(request.duration),
            audio_quality: request.audio_quality.clone(),
            language: "yue".to_string(),
            file_path: Some(result.key.clone()),
            file_url: Some(result.url.clone()),
            file_size: Some(result.size as i64),
            file_type: Some(request.file.content_type.clone()),
            metadata: json!({
                "type": "audio_upload",
                "original_filename": request.file.name,
                "uploaded_at": now,
                "user_agent": request.user_agent,
                "storage_provider": backend.name(),
                "upload_method": "unified_api",
            }),
        };

        let record = match self.recorder.record(contribution).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Recording contribution for '{}' failed, removing stored object",
                    result.key
                );
                if !backend.delete(&result.key).await {
                    error!("Orphaned object '{}' could not be removed", result.key);
                }
                return Err(e);
            }
        };

        Ok(AudioUploadResponseDto {
            id: record.id,
            wallet_address: request.wallet_address,
            sentence_id: request.sentence_id,
            file_name: result.key,
            file_url: result.url,
            file_size: result.size,
            duration: request.duration,
            upload_time: now,
            storage_provider: backend.name().to_string(),
        })
    }
}
