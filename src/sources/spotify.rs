use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::{CatalogProvider, CatalogTrack};
use crate::config::SpotifyCredentials;
use crate::error::ResolveError;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const TRACKS_URL: &str = "https://api.spotify.com/v1/tracks";

/// Margen antes de la expiración en el que el token se considera vencido
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    name: String,
    artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Cliente de la Web API de Spotify (flujo client credentials)
pub struct SpotifyClient {
    credentials: SpotifyCredentials,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ResolveError::MetadataLookupFailed(e.to_string()))?;

        Ok(Self {
            credentials,
            client,
            token: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<String> {
        let token = self.token.lock();
        token
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| t.value.clone())
    }
}

#[async_trait]
impl CatalogProvider for SpotifyClient {
    async fn fetch_credential(&self) -> Result<String, ResolveError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        debug!("🔑 Solicitando token de Spotify");

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ResolveError::MetadataLookupFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            error!("❌ Spotify token error: {}", status);
            return Err(ResolveError::MetadataLookupFailed(format!("token: {}", status)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::MetadataLookupFailed(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.token.lock() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn lookup_track(&self, id: &str, credential: &str) -> Result<CatalogTrack, ResolveError> {
        debug!("🎼 Consultando track de Spotify: {}", id);

        let response = self
            .client
            .get(format!("{}/{}", TRACKS_URL, id))
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| ResolveError::MetadataLookupFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            error!("❌ Spotify API error para {}: {}", id, status);
            return Err(ResolveError::MetadataLookupFailed(format!("track {}: {}", id, status)));
        }

        let track: SpotifyTrack = response
            .json()
            .await
            .map_err(|e| ResolveError::MetadataLookupFailed(e.to_string()))?;

        Ok(track.into())
    }
}

impl From<SpotifyTrack> for CatalogTrack {
    fn from(track: SpotifyTrack) -> Self {
        Self {
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            name: track.name,
        }
    }
}
