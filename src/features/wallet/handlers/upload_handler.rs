use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::wallet::dtos::{AudioUploadResponseDto, UploadAudioFormDto};
use crate::features::wallet::handlers::wallet_handler::user_agent;
use crate::features::wallet::services::{AudioUploadForm, AudioUploadService};
use crate::modules::storage::UploadFile;
use crate::shared::types::ApiResponse;

/// Upload a recorded audio file
///
/// Accepts multipart/form-data with:
/// - `audioFile`: the audio file (required)
/// - `walletAddress`, `sentenceId` (required)
/// - `sentenceText`, `duration`, `audioQuality` (optional)
#[utoipa::path(
    post,
    path = "/api/wallet/upload-audio",
    tag = "wallet",
    request_body(
        content = UploadAudioFormDto,
        content_type = "multipart/form-data",
        description = "Audio file plus the wallet and sentence it belongs to",
    ),
    responses(
        (status = 200, description = "Audio stored and recorded", body = ApiResponse<AudioUploadResponseDto>),
        (status = 400, description = "Missing fields, invalid address, unsupported type or file too large"),
        (status = 500, description = "Storage upload failed")
    )
)]
pub async fn upload_audio(
    State(service): State<Arc<AudioUploadService>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ApiResponse<AudioUploadResponseDto>>> {
    let form = read_form(multipart).await?;
    let request = form.into_request(user_agent(&headers))?;

    let uploaded = service.upload(request).await?;

    Ok(Json(ApiResponse::success(
        Some(uploaded),
        Some("Audio file uploaded".to_string()),
        None,
    )))
}

async fn read_form(mut multipart: Multipart) -> Result<AudioUploadForm> {
    let mut form = AudioUploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "audioFile" => {
                let name = field.file_name().unwrap_or("audio").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read audio file: {}", e))
                })?;
                form.file = Some(UploadFile::new(name, content_type, data.to_vec()));
            }
            "walletAddress" => form.wallet_address = Some(text(field).await?),
            "sentenceId" => form.sentence_id = Some(text(field).await?),
            "sentenceText" => form.sentence_text = Some(text(field).await?),
            "duration" => form.duration = Some(text(field).await?),
            "audioQuality" => form.audio_quality = Some(text(field).await?),
            _ => {
                debug!("Ignoring unknown multipart field: {}", field_name);
            }
        }
    }

    Ok(form)
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {}", e)))
}
