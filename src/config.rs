use std::env;
use std::path::PathBuf;

const DEFAULT_SPOTIFY_SCOPE: &str = "playlist-modify-public playlist-modify-private";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub spotify_scope: String,
    /// Base URL of the Spotify Web API (without trailing slash)
    pub spotify_api_url: String,
    /// Base URL of the Spotify accounts service used for OAuth
    pub spotify_accounts_url: String,
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
    /// Path to the ONNX facial emotion model. Emotion detection is disabled when unset.
    pub emotion_model_path: Option<PathBuf>,
    /// Path to the ONNX face detector used before emotion classification
    pub face_detector_model_path: Option<PathBuf>,
    /// How many song suggestions are searched on Spotify at the same time
    pub resolver_concurrency: usize,
    pub server_host: String,
    pub server_port: u16,
    /// Allowed CORS origins (comma-separated). Use "*" for any origin (development only).
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable must be set", key))
        };

        let resolver_concurrency = match lookup("RESOLVER_CONCURRENCY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("RESOLVER_CONCURRENCY is not a number: {}", e))?,
            None => 1,
        };
        if resolver_concurrency == 0 {
            return Err(anyhow::anyhow!("RESOLVER_CONCURRENCY must be at least 1"));
        }

        Ok(Config {
            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            spotify_redirect_uri: required("SPOTIFY_REDIRECT_URI")?,
            spotify_scope: lookup("SPOTIFY_SCOPE").unwrap_or_else(|| DEFAULT_SPOTIFY_SCOPE.to_string()),
            spotify_api_url: lookup("SPOTIFY_API_URL")
                .unwrap_or_else(|| "https://api.spotify.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            spotify_accounts_url: lookup("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|| "https://accounts.spotify.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_api_url: lookup("GEMINI_API_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string())
                .trim_end_matches('/')
                .to_string(),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| "gemini-pro".to_string()),
            emotion_model_path: lookup("EMOTION_MODEL_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            face_detector_model_path: lookup("FACE_DETECTOR_MODEL_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            resolver_concurrency,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: lookup("SERVER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            cors_origins: parse_origins(
                &lookup("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:3001".to_string()),
            ),
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
