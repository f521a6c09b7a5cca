use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{Input, YoutubeDl},
    tracks::TrackHandle,
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::transport::{IdleCause, IdleNotifier, VoiceConnection, VoiceTransport};
use crate::{error::QueueError, sources::Track};

/// Transporte de voz sobre songbird; los streams se abren con yt-dlp
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    volume: f32,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, volume: f32) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            volume,
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        idle: IdleNotifier,
    ) -> Result<Box<dyn VoiceConnection>, QueueError> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| QueueError::TransportUnavailable(e.to_string()))?;

        info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);

        Ok(Box::new(SongbirdConnection {
            guild_id,
            manager: Arc::clone(&self.manager),
            call,
            http: self.http.clone(),
            volume: self.volume,
            idle,
            track: None,
        }))
    }
}

/// Conexión de una guild: la llamada de songbird y el track en curso
struct SongbirdConnection {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
    volume: f32,
    idle: IdleNotifier,
    track: Option<TrackHandle>,
}

impl SongbirdConnection {
    fn current(&self) -> Option<&TrackHandle> {
        self.track.as_ref()
    }
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn play(&mut self, track: &Track, play_id: u64) -> Result<(), QueueError> {
        // Solo audio: yt-dlp elige el mejor formato bestaudio
        let input: Input = YoutubeDl::new(self.http.clone(), track.url.clone()).into();

        if let Some(previous) = self.track.take() {
            let _ = previous.stop();
        }

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        let _ = handle.set_volume(self.volume);

        for (event, cause) in [
            (TrackEvent::End, IdleCause::Finished),
            (TrackEvent::Error, IdleCause::Errored),
        ] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackIdleHandler {
                        idle: self.idle.clone(),
                        play_id,
                        cause,
                    },
                )
                .map_err(|e| QueueError::Playback(format!("error al registrar evento: {}", e)))?;
        }

        debug!("▶️ Track {} iniciado en guild {}", play_id, self.guild_id);
        self.track = Some(handle);
        Ok(())
    }

    fn pause(&self) -> Result<(), QueueError> {
        match self.current() {
            Some(track) => track.pause().map_err(|e| QueueError::Playback(e.to_string())),
            None => Ok(()),
        }
    }

    fn resume(&self) -> Result<(), QueueError> {
        match self.current() {
            Some(track) => track.play().map_err(|e| QueueError::Playback(e.to_string())),
            None => Ok(()),
        }
    }

    fn stop(&self) -> Result<(), QueueError> {
        match self.current() {
            Some(track) => track.stop().map_err(|e| QueueError::Playback(e.to_string())),
            None => Ok(()),
        }
    }

    async fn is_connected(&self) -> bool {
        // songbird limpia el canal de la llamada al recibir nuestra salida
        self.call.lock().await.current_channel().is_some()
    }

    async fn disconnect(self: Box<Self>) {
        if let Some(track) = &self.track {
            let _ = track.stop();
        }

        if let Err(e) = self.manager.remove(self.guild_id).await {
            warn!("⚠️ Error al salir del canal de voz en guild {}: {:?}", self.guild_id, e);
        } else {
            info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
        }
    }
}

/// Reenvía el fin o error de un track al canal de inactividad de la sesión
struct TrackIdleHandler {
    idle: IdleNotifier,
    play_id: u64,
    cause: IdleCause,
}

#[async_trait]
impl VoiceEventHandler for TrackIdleHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        debug!("Track {} inactivo ({:?})", self.play_id, self.cause);
        self.idle.notify(self.play_id, self.cause);
        None
    }
}
