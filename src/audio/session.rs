use serenity::model::id::{ChannelId, GuildId};
use std::collections::VecDeque;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::transport::VoiceConnection;
use crate::{error::QueueError, sources::Track};

/// Estado de reproducción de una guild.
///
/// Todo el estado mutable vive detrás de un único mutex, así que enqueue,
/// skip, pause, resume, stop y el avance de cola nunca se intercalan dentro
/// de la misma sesión. Sesiones de guilds distintas no comparten nada.
pub struct PlaybackSession {
    guild_id: GuildId,
    voice_channel: ChannelId,
    reply_channel: ChannelId,
    state: Mutex<SessionState>,
    shutdown: CancellationToken,
}

/// Campos mutables de la sesión, accesibles solo con el lock tomado
pub(crate) struct SessionState {
    queue: VecDeque<Track>,
    current: Option<Track>,
    connection: Option<Box<dyn VoiceConnection>>,
    playing: Option<u64>,
    next_play_id: u64,
    closed: bool,
}

/// Snapshot de solo lectura de una sesión
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub current: Option<Track>,
    pub queue: Vec<Track>,
}

impl PlaybackSession {
    pub(crate) fn new(
        guild_id: GuildId,
        voice_channel: ChannelId,
        reply_channel: ChannelId,
        connection: Box<dyn VoiceConnection>,
    ) -> Self {
        Self {
            guild_id,
            voice_channel,
            reply_channel,
            state: Mutex::new(SessionState {
                queue: VecDeque::new(),
                current: None,
                connection: Some(connection),
                playing: None,
                next_play_id: 1,
                closed: false,
            }),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn voice_channel(&self) -> ChannelId {
        self.voice_channel
    }

    pub fn reply_channel(&self) -> ChannelId {
        self.reply_channel
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        SessionStatus {
            current: state.current.clone(),
            queue: state.queue.iter().cloned().collect(),
        }
    }

    /// Pausa la reproducción actual
    pub async fn pause(&self) -> Result<(), QueueError> {
        let state = self.state.lock().await;
        state.connection()?.pause()?;
        info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        Ok(())
    }

    /// Reanuda la reproducción
    pub async fn resume(&self) -> Result<(), QueueError> {
        let state = self.state.lock().await;
        state.connection()?.resume()?;
        info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
        Ok(())
    }

    /// Detiene el track actual. El avance ocurre cuando el transporte
    /// reporta la inactividad. Devuelve el track saltado, si había uno.
    pub async fn skip(&self) -> Result<Option<Track>, QueueError> {
        let state = self.state.lock().await;
        let connection = state.connection()?;

        let Some(current) = state.current.clone() else {
            return Ok(None);
        };

        connection.stop()?;
        info!("⏭️ Saltando '{}' en guild {}", current.title, self.guild_id);
        Ok(Some(current))
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub(crate) fn signal_shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl SessionState {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Agrega al final de la cola (FIFO)
    pub(crate) fn push(&mut self, track: Track) -> usize {
        debug!("➕ Agregado a la cola: {}", track.title);
        self.queue.push_back(track);
        self.queue.len()
    }

    pub(crate) fn pop_next(&mut self) -> Option<Track> {
        self.queue.pop_front()
    }

    /// `true` si el evento corresponde a la reproducción en curso
    pub(crate) fn is_current_play(&self, play_id: u64) -> bool {
        self.playing == Some(play_id)
    }

    /// Olvida el track actual antes de avanzar
    pub(crate) fn finish_current(&mut self) -> Option<Track> {
        self.playing = None;
        self.current.take()
    }

    /// Pide al transporte reproducir `track` y lo marca como actual
    pub(crate) async fn start(&mut self, track: Track) -> Result<(), QueueError> {
        let play_id = self.next_play_id;
        self.next_play_id += 1;

        let connection = self
            .connection
            .as_mut()
            .ok_or(QueueError::EmptySession)?;
        connection.play(&track, play_id).await?;

        self.current = Some(track);
        self.playing = Some(play_id);
        Ok(())
    }

    /// Vacía la sesión y libera el transporte. Solo tiene efecto una vez.
    pub(crate) async fn release(&mut self) -> usize {
        let discarded = self.queue.len();
        self.closed = true;
        self.queue.clear();
        self.current = None;
        self.playing = None;

        if let Some(connection) = self.connection.take() {
            let _ = connection.stop();
            connection.disconnect().await;
        }

        discarded
    }

    pub(crate) async fn is_connected(&self) -> bool {
        match self.connection() {
            Ok(connection) => connection.is_connected().await,
            Err(_) => false,
        }
    }

    fn connection(&self) -> Result<&dyn VoiceConnection, QueueError> {
        if self.closed {
            return Err(QueueError::EmptySession);
        }
        self.connection.as_deref().ok_or(QueueError::EmptySession)
    }
}
