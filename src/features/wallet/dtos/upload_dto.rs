use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Audio upload form for OpenAPI documentation
/// The handler reads the fields with axum's Multipart extractor.
#[derive(Debug, ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UploadAudioFormDto {
    /// Audio file (audio/wav, audio/webm, audio/mp3 or audio/ogg, at most 10MB)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub audio_file: String,
    #[schema(example = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e")]
    pub wallet_address: String,
    pub sentence_id: String,
    pub sentence_text: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    #[schema(example = "medium")]
    pub audio_quality: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioUploadResponseDto {
    pub id: Uuid,
    pub wallet_address: String,
    pub sentence_id: String,
    /// Object key the audio was stored under
    pub file_name: String,
    pub file_url: String,
    pub file_size: u64,
    pub duration: f64,
    pub upload_time: DateTime<Utc>,
    pub storage_provider: String,
}
