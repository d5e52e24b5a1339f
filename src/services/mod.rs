pub mod auth;
pub mod emotion;
pub mod face_detector;
pub mod gemini;
pub mod playlist_assembler;
pub mod song_lines;
pub mod song_resolver;
pub mod spotify;

pub use auth::SpotifyOAuth;
pub use emotion::{EmotionClassifier, EmotionClassifierConfig, OnnxEmotionClassifier};
pub use gemini::{GeminiClient, TextGenerator};
pub use playlist_assembler::PlaylistAssembler;
pub use spotify::{MusicCatalog, SpotifyClient};
