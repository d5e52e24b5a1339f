use crate::error::Result;
use crate::models::{CreatedPlaylist, EmotionLabel, PlaylistRequest, PlaylistSource, ResolvedTrack};
use crate::services::gemini::TextGenerator;
use crate::services::song_lines::parse_song_lines;
use crate::services::song_resolver::{split_song_entry, SongResolver};
use crate::services::spotify::MusicCatalog;
use std::sync::Arc;
use tracing::info;

/// Number of songs requested from the generator for every playlist
pub const SONGS_PER_PLAYLIST: usize = 10;

const OUTPUT_FORMAT: &str = "For each song, provide it in exactly this format:
Song Name by Artist Name

Only provide the song and artist names, one per line, nothing else.";

/// Runs the generate → parse → resolve pipeline and creates playlists
pub struct PlaylistAssembler {
    generator: Arc<dyn TextGenerator>,
    catalog: Arc<dyn MusicCatalog>,
    resolver: SongResolver,
}

impl PlaylistAssembler {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        catalog: Arc<dyn MusicCatalog>,
        resolver_concurrency: usize,
    ) -> Self {
        Self {
            resolver: SongResolver::new(catalog.clone(), resolver_concurrency),
            generator,
            catalog,
        }
    }

    /// Ask the generator for songs matching the request and resolve them on Spotify.
    pub async fn generate(&self, request: &PlaylistRequest) -> Result<Vec<ResolvedTrack>> {
        let prompt = build_prompt(&request.source);

        let text = self.generator.generate(&prompt).await?;

        // Preamble and commentary lines must not take a slot from a real song
        let entries: Vec<String> = parse_song_lines(&text)
            .into_iter()
            .filter(|line| split_song_entry(line).is_some())
            .take(SONGS_PER_PLAYLIST)
            .collect();
        info!("Generator suggested {} songs", entries.len());

        let tracks = self.resolver.resolve(&entries, &request.access_token).await;
        info!("Resolved {} of {} suggestions on Spotify", tracks.len(), entries.len());

        Ok(tracks)
    }

    /// Create a playlist for the token's owner, adding `uris` in order when there are any.
    pub async fn create_playlist(
        &self,
        access_token: &str,
        name: &str,
        uris: &[String],
    ) -> Result<CreatedPlaylist> {
        let user_id = self.catalog.current_user_id(access_token).await?;

        let playlist = self
            .catalog
            .create_playlist(access_token, &user_id, name)
            .await?;
        info!("Created playlist '{}' ({}) for user {}", name, playlist.id, user_id);

        if !uris.is_empty() {
            self.catalog
                .add_tracks(access_token, &playlist.id, uris)
                .await?;
            info!("Added {} tracks to playlist {}", uris.len(), playlist.id);
        }

        Ok(CreatedPlaylist {
            playlist_id: playlist.id,
            external_url: playlist.external_url,
        })
    }
}

pub fn build_prompt(source: &PlaylistSource) -> String {
    match source {
        PlaylistSource::Emotion {
            emotion,
            language,
            artist,
        } => emotion_prompt(*emotion, language.as_deref(), artist.as_deref()),
        PlaylistSource::Prompt(description) => format!(
            "Generate a playlist of {} songs based on this description: {}\n{}",
            SONGS_PER_PLAYLIST, description, OUTPUT_FORMAT
        ),
    }
}

fn emotion_prompt(emotion: EmotionLabel, language: Option<&str>, artist: Option<&str>) -> String {
    let mut base = format!(
        "Generate a playlist of {} songs that reflect a {} mood",
        SONGS_PER_PLAYLIST, emotion
    );
    if let Some(language) = language {
        base.push_str(&format!(" in {} language", language));
    }
    if let Some(artist) = artist {
        base.push_str(&format!(", similar to the style of {}", artist));
    }

    format!(
        "{}.\nThe songs should match the emotional tone and energy level associated with {}.\n{}",
        base, emotion, OUTPUT_FORMAT
    )
}
