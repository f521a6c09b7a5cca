use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Credenciales de la Web API de Spotify (client credentials)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Búsqueda
    pub search_limit: usize,
    pub spotify: Option<SpotifyCredentials>,

    // Audio
    pub default_volume: f32,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let spotify = match (
            std::env::var("SPOTIFY_CLIENT_ID").ok().filter(|s| !s.trim().is_empty()),
            std::env::var("SPOTIFY_CLIENT_SECRET").ok().filter(|s| !s.trim().is_empty()),
        ) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN")?,
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "/".to_string()),

            search_limit: std::env::var("SEARCH_LIMIT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            spotify,

            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Discord token must not be empty
    /// - Command prefix must not be empty or contain whitespace
    /// - Search limit must be between 1 and 50
    /// - Volume must be between 0.0 and 2.0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN is empty");
        }

        if self.command_prefix.is_empty() || self.command_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("Command prefix must be non-empty and without spaces, got: '{}'", self.command_prefix);
        }

        if self.search_limit == 0 || self.search_limit > 50 {
            anyhow::bail!("Search limit must be between 1 and 50, got: {}", self.search_limit);
        }

        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!("Default volume must be between 0.0 and 2.0, got: {}", self.default_volume);
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Tokens and secrets are never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Commands: prefix '{}'\n  \
            Search: {} results, Spotify={}\n  \
            Audio: {}% vol",
            self.command_prefix,
            self.search_limit,
            if self.spotify.is_some() { "enabled" } else { "disabled" },
            (self.default_volume * 100.0) as u32,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (el token no tiene default)
            discord_token: String::new(),
            command_prefix: "/".to_string(),

            search_limit: 5,
            spotify: None,

            default_volume: 0.5,
        }
    }
}
