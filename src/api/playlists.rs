use crate::api::middleware::{ApiJson, BearerToken};
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{CreatePlaylistRequest, CreatedPlaylist, GenerateSongsRequest, GenerateSongsResponse};
use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;
use validator::Validate;

pub fn playlist_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-songs", post(generate_songs))
        .route("/create-playlist", post(create_playlist))
}

async fn generate_songs(
    State(state): State<Arc<AppState>>,
    BearerToken(access_token): BearerToken,
    ApiJson(req): ApiJson<GenerateSongsRequest>,
) -> Result<Json<GenerateSongsResponse>> {
    let request = req.into_playlist_request(access_token)?;

    let songs = state.playlist_assembler.generate(&request).await?;

    Ok(Json(GenerateSongsResponse { songs }))
}

async fn create_playlist(
    State(state): State<Arc<AppState>>,
    BearerToken(access_token): BearerToken,
    ApiJson(req): ApiJson<CreatePlaylistRequest>,
) -> Result<Json<CreatedPlaylist>> {
    let req = req.normalized();
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let playlist = state
        .playlist_assembler
        .create_playlist(&access_token, &req.name, &req.songs)
        .await?;

    Ok(Json(playlist))
}
