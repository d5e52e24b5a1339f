use crate::error::AppError;
use crate::models::{EmotionLabel, ResolvedTrack};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of a song generation request as sent by the client
#[derive(Debug, Default, Deserialize)]
pub struct GenerateSongsRequest {
    pub prompt: Option<String>,
    pub emotion: Option<String>,
    pub language: Option<String>,
    pub artist: Option<String>,
}

/// What drives the generated playlist
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistSource {
    Emotion {
        emotion: EmotionLabel,
        language: Option<String>,
        artist: Option<String>,
    },
    Prompt(String),
}

#[derive(Debug, Clone)]
pub struct PlaylistRequest {
    pub source: PlaylistSource,
    pub access_token: String,
}

impl GenerateSongsRequest {
    /// Validate the body and pair it with the caller's Spotify token.
    ///
    /// An emotion wins over a prompt when both are given; blank fields count as missing.
    pub fn into_playlist_request(
        self,
        access_token: String,
    ) -> crate::error::Result<PlaylistRequest> {
        let source = match non_blank(self.emotion) {
            Some(emotion) => PlaylistSource::Emotion {
                emotion: emotion.parse::<EmotionLabel>().map_err(AppError::Validation)?,
                language: non_blank(self.language),
                artist: non_blank(self.artist),
            },
            None => match non_blank(self.prompt) {
                Some(prompt) => PlaylistSource::Prompt(prompt),
                None => {
                    return Err(AppError::Validation(
                        "Either an emotion or a prompt is required".to_string(),
                    ))
                }
            },
        };

        Ok(PlaylistRequest {
            source,
            access_token,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateSongsResponse {
    pub songs: Vec<ResolvedTrack>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlaylistRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Spotify track URIs in playlist order
    #[serde(default)]
    #[validate(length(max = 100))]
    pub songs: Vec<String>,
}

impl CreatePlaylistRequest {
    /// Trim the name so that a whitespace-only name fails validation.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.name.trim();
        if trimmed.len() != self.name.len() {
            self.name = trimmed.to_string();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub playlist_id: String,
    pub external_url: String,
}
