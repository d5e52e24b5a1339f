use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{DetectEmotionRequest, EmotionResponse};
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

pub fn emotion_routes() -> Router<Arc<AppState>> {
    Router::new().route("/detect-emotion", post(detect_emotion))
}

/// Accepts either JSON `{"image": "<data URL or base64>"}` or a multipart upload in field `image`.
async fn detect_emotion(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<EmotionResponse>> {
    let classifier = state.emotion_classifier.clone().ok_or_else(|| {
        AppError::CapabilityUnavailable("Emotion detection is not configured".to_string())
    })?;

    let image = read_image(request).await?;
    tracing::debug!("Classifying image of {} bytes", image.len());

    let emotion = classifier.classify(&image).await?;
    tracing::info!("Detected emotion: {}", emotion);

    Ok(Json(EmotionResponse { emotion }))
}

async fn read_image(request: Request) -> Result<Vec<u8>> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let Json(body) = Json::<DetectEmotionRequest>::from_request(request, &())
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let data = body
            .image
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| AppError::Validation("No image data received".to_string()))?;

        return decode_image_data(&data);
    }

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            if field.name() == Some("image") {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                if bytes.is_empty() {
                    break;
                }
                return Ok(bytes.to_vec());
            }
        }
    }

    Err(AppError::Validation("No valid image data received".to_string()))
}

/// Decode base64 image data, stripping a `data:<mime>;base64,` prefix if present
fn decode_image_data(data: &str) -> Result<Vec<u8>> {
    let encoded = data.split_once(',').map(|(_, b)| b).unwrap_or(data).trim();

    general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| AppError::Validation(format!("Invalid base64 image data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let bytes = decode_image_data("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_bare_base64() {
        assert_eq!(decode_image_data("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_image_data("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
