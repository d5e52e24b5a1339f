pub mod auth;
pub mod emotion;
pub mod health;
pub mod middleware;
pub mod playlists;

pub use auth::auth_routes;
pub use emotion::emotion_routes;
pub use playlists::playlist_routes;

use crate::services::{EmotionClassifier, PlaylistAssembler, SpotifyOAuth};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

pub struct AppState {
    pub playlist_assembler: Arc<PlaylistAssembler>,
    pub oauth: Arc<SpotifyOAuth>,
    /// `None` when no emotion model is configured
    pub emotion_classifier: Option<Arc<dyn EmotionClassifier>>,
    pub max_upload_bytes: usize,
}

/// All `/api` routes, with upload limit and no-cache headers applied
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/health", get(health::health))
                .merge(auth_routes())
                .merge(emotion_routes())
                .merge(playlist_routes()),
        )
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(
                "no-store, no-cache, must-revalidate, post-check=0, pre-check=0, max-age=0",
            ),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("-1"),
        ))
}
