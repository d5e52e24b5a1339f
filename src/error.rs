use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Error in emotion detection: {0}")]
    Classification(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Spotify error: {0}")]
    Catalog(String),

    #[error("Spotify authorization failed: {0}")]
    CatalogAuth(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// Coarse classification of an [`AppError`], reported to clients next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The request itself was unusable; nothing external was called.
    Input,
    /// An external capability (classifier, generator, catalog) failed.
    Capability,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::Unauthorized => ErrorKind::Input,
            AppError::Classification(_)
            | AppError::Generation(_)
            | AppError::Catalog(_)
            | AppError::CatalogAuth(_)
            | AppError::CapabilityUnavailable(_) => ErrorKind::Capability,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether repeating the same request later could succeed.
    ///
    /// A classification failure is tied to the submitted image and an auth
    /// failure needs a fresh credential, so neither is worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Generation(_) | AppError::Catalog(_) | AppError::CapabilityUnavailable(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let retryable = self.is_retryable();

        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Classification(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::Generation(msg) => {
                tracing::error!("Generation error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::Catalog(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::CatalogAuth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::CapabilityUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
            "retryable": retryable,
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
