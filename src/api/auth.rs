use crate::api::middleware::ApiJson;
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{AuthUrlResponse, CallbackRequest, TokenInfo};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/spotify", get(spotify_auth_url))
        .route("/auth/callback", post(spotify_callback))
}

async fn spotify_auth_url(State(state): State<Arc<AppState>>) -> Result<Json<AuthUrlResponse>> {
    let auth_url = state.oauth.authorize_url()?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

async fn spotify_callback(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CallbackRequest>,
) -> Result<Json<TokenInfo>> {
    let code = req
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let token = state.oauth.exchange_code(&code).await?;
    tracing::info!("Spotify authorization completed");

    Ok(Json(token))
}
