mod api;
mod config;
mod error;
mod models;
mod services;

use crate::api::AppState;
use crate::config::Config;
use crate::services::{
    EmotionClassifier, EmotionClassifierConfig, GeminiClient, OnnxEmotionClassifier,
    PlaylistAssembler, SpotifyClient, SpotifyOAuth,
};
use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,moodlist=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Initialize services
    let spotify_client = Arc::new(SpotifyClient::new(config.spotify_api_url.clone()));
    let gemini_client = Arc::new(GeminiClient::new(&config));
    let playlist_assembler = Arc::new(PlaylistAssembler::new(
        gemini_client,
        spotify_client,
        config.resolver_concurrency,
    ));
    let oauth = Arc::new(SpotifyOAuth::new(&config));

    let emotion_classifier = match (&config.emotion_model_path, &config.face_detector_model_path) {
        (Some(model), Some(detector)) => {
            match OnnxEmotionClassifier::load(EmotionClassifierConfig::new(model.clone(), detector.clone())) {
                Ok(classifier) => Some(Arc::new(classifier)),
                Err(e) => {
                    tracing::error!("Failed to load emotion models, emotion detection disabled: {}", e);
                    None
                }
            }
        }
        _ => {
            tracing::warn!(
                "EMOTION_MODEL_PATH or FACE_DETECTOR_MODEL_PATH not set, emotion detection disabled"
            );
            None
        }
    };

    let app_state = Arc::new(AppState {
        playlist_assembler,
        oauth,
        emotion_classifier: emotion_classifier
            .clone()
            .map(|c| c as Arc<dyn EmotionClassifier>),
        max_upload_bytes: config.max_upload_bytes,
    });

    // Build router
    let app = api::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(classifier) = emotion_classifier {
        classifier.shutdown();
    }
    tracing::info!("Server stopped");

    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
