use crate::error::{AppError, Result};
use crate::models::{CatalogPlaylist, CatalogTrack};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Track search and playlist management on behalf of a user
#[async_trait]
pub trait MusicCatalog: Send + Sync {
    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>>;

    async fn current_user_id(&self, access_token: &str) -> Result<String>;

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
    ) -> Result<CatalogPlaylist>;

    async fn add_tracks(&self, access_token: &str, playlist_id: &str, uris: &[String]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: SearchTracks,
}

#[derive(Debug, Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyUser {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreatePlaylistBody<'a> {
    name: &'a str,
    public: bool,
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylist {
    id: String,
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: String,
}

#[derive(Debug, Serialize)]
struct AddTracksBody<'a> {
    uris: &'a [String],
}

impl SpotifyClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    /// API URL with each segment percent-encoded, so ids cannot alter the path
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid Spotify API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Spotify API URL cannot be a base")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Catalog(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("Spotify API error: {} - {}", status, body);

        match status {
            StatusCode::UNAUTHORIZED => Err(AppError::CatalogAuth(format!(
                "Spotify rejected the access token: {}",
                body
            ))),
            _ => Err(AppError::Catalog(format!(
                "API returned status: {} - {}",
                status, body
            ))),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Catalog(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&text).map_err(|e| {
            AppError::Catalog(format!(
                "Failed to parse response: {} - Response: {}",
                e,
                text.chars().take(200).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl MusicCatalog for SpotifyClient {
    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>> {
        let url = format!("{}/search", self.base_url);

        tracing::debug!("Searching Spotify with query: {}", query);

        let limit = limit.to_string();
        let request = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())]);

        let data: SearchResponse = self.send_json(request).await?;

        tracing::debug!("Found {} tracks in response", data.tracks.items.len());

        Ok(data
            .tracks
            .items
            .into_iter()
            .map(|track| CatalogTrack {
                id: track.id,
                name: track.name,
                artists: track.artists.into_iter().map(|a| a.name).collect(),
                uri: track.uri,
            })
            .collect())
    }

    async fn current_user_id(&self, access_token: &str) -> Result<String> {
        let url = format!("{}/me", self.base_url);
        let user: SpotifyUser = self
            .send_json(self.client.get(&url).bearer_auth(access_token))
            .await?;
        Ok(user.id)
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
    ) -> Result<CatalogPlaylist> {
        let url = self.endpoint(&["users", user_id, "playlists"])?;
        let request = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&CreatePlaylistBody { name, public: true });

        let playlist: SpotifyPlaylist = self.send_json(request).await?;

        Ok(CatalogPlaylist {
            id: playlist.id,
            external_url: playlist.external_urls.spotify,
        })
    }

    async fn add_tracks(&self, access_token: &str, playlist_id: &str, uris: &[String]) -> Result<()> {
        let url = self.endpoint(&["playlists", playlist_id, "tracks"])?;
        let request = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&AddTracksBody { uris });

        self.send(request).await?;
        Ok(())
    }
}
