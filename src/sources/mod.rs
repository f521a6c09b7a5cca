//! # Sources Module
//!
//! Turns what a user typed after `play` into a [`Track`] the player can
//! render. Two backends take part:
//!
//! - [`youtube`] answers free-text searches through `yt-dlp`
//! - [`spotify`] looks up catalog track links so they can be re-searched by
//!   artist and title
//!
//! [`QueryResolver`] combines them behind the single [`TrackResolver`] seam
//! used by the bot layer.

pub mod resolver;
pub mod spotify;
pub mod youtube;

use async_trait::async_trait;

use crate::error::ResolveError;

pub use resolver::QueryResolver;
pub use spotify::SpotifyClient;
pub use youtube::YouTubeClient;

/// Representa un track reproducible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub url: String,
}

impl Track {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Un resultado de búsqueda de texto
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    /// `false` para canales, playlists o emisiones que no se pueden reproducir
    pub playable: bool,
}

/// Metadatos de un track del catálogo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub artists: Vec<String>,
    pub name: String,
}

impl CatalogTrack {
    /// `"<primer artista> - <nombre>"`, o solo el nombre si no hay artistas.
    pub fn display_title(&self) -> String {
        match self.artists.first() {
            Some(artist) => format!("{} - {}", artist, self.name),
            None => self.name.clone(),
        }
    }
}

/// Trait común para los backends de búsqueda por texto
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Devuelve hasta `limit` resultados en el orden del backend
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>, ResolveError>;
}

/// Trait común para catálogos de música que requieren credenciales
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Obtiene un token de acceso de corta duración
    async fn fetch_credential(&self) -> Result<String, ResolveError>;

    /// Obtiene los metadatos de un track por su ID de catálogo
    async fn lookup_track(&self, id: &str, credential: &str) -> Result<CatalogTrack, ResolveError>;
}

/// Resuelve una consulta de usuario (URL o texto) a un track reproducible
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError>;
}
