use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::TokenInfo;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use uuid::Uuid;

/// Spotify authorization-code flow
pub struct SpotifyOAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
    accounts_url: String,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    #[serde(default)]
    scope: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl SpotifyOAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
            scope: config.spotify_scope.clone(),
            accounts_url: config.spotify_accounts_url.clone(),
            http_client: Client::new(),
        }
    }

    /// URL the user visits to grant this app access to their playlists
    pub fn authorize_url(&self) -> Result<String> {
        let state = Uuid::new_v4().simple().to_string();

        let url = Url::parse_with_params(
            &format!("{}/authorize", self.accounts_url),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scope.as_str()),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid Spotify accounts URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenInfo> {
        let response = self
            .http_client
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Catalog(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                })
                .unwrap_or(body);

            tracing::warn!("Spotify token exchange failed: {} - {}", status, reason);

            return Err(if status.is_client_error() {
                AppError::CatalogAuth(reason)
            } else {
                AppError::Catalog(format!("Token endpoint returned {}: {}", status, reason))
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Catalog(format!("Failed to parse token response: {}", e)))?;

        Ok(token_info(token, Utc::now().timestamp()))
    }
}

fn token_info(token: TokenResponse, now: i64) -> TokenInfo {
    TokenInfo {
        expires_at: now + token.expires_in,
        access_token: token.access_token,
        token_type: token.token_type,
        scope: token.scope,
        expires_in: token.expires_in,
        refresh_token: token.refresh_token,
    }
}
