//! Error types shared by the audio core and the track sources.
//!
//! Both enums are recoverable per command: the bot layer turns them into a
//! reply and the session/registry is left exactly as it was.

use thiserror::Error;

/// Failures of the playback core.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The voice connection could not be established; no session was created.
    #[error("no se pudo conectar al canal de voz: {0}")]
    TransportUnavailable(String),

    /// The guild has no active session.
    #[error("no hay una sesión activa en este servidor")]
    EmptySession,

    /// The transport refused to render a track (stream or player failure).
    #[error("error de reproducción: {0}")]
    Playback(String),
}

/// Failures while turning a user query into a [`Track`](crate::sources::Track).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no se encontró ningún resultado reproducible para '{0}'")]
    NoPlayableResultFound(String),

    #[error("falló la consulta de metadatos del catálogo: {0}")]
    MetadataLookupFailed(String),

    #[error("falló la búsqueda: {0}")]
    SearchFailed(String),
}
