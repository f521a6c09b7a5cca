//! In-memory transport and notifier used by the audio and bot tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use super::transport::{IdleCause, IdleNotifier, Notice, StatusNotifier, VoiceConnection, VoiceTransport};
use crate::{error::QueueError, sources::Track};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect(GuildId),
    Play(GuildId, String, u64),
    Pause(GuildId),
    Resume(GuildId),
    Stop(GuildId),
    Disconnect(GuildId),
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<TransportCall>>,
    failing_urls: Mutex<HashSet<String>>,
    // Último play de cada guild y su canal de inactividad
    playing: Mutex<HashMap<GuildId, (IdleNotifier, Option<u64>)>>,
    // Guilds cuya conexión se cortó desde fuera
    dropped: Mutex<HashSet<GuildId>>,
}

impl Shared {
    fn record(&self, call: TransportCall) {
        self.calls.lock().push(call);
    }
}

/// Transporte falso: registra cada llamada y emite inactividad al detener,
/// igual que songbird al parar un track.
#[derive(Default)]
pub struct FakeTransport {
    shared: Arc<Shared>,
    fail_connect: Mutex<bool>,
}

impl FakeTransport {
    pub fn fail_connect(&self, fail: bool) {
        *self.fail_connect.lock() = fail;
    }

    pub fn fail_url(&self, url: &str) {
        self.shared.failing_urls.lock().insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.shared.calls.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        self.shared.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Simula que alguien desconectó al bot del canal de voz
    pub fn drop_connection(&self, guild_id: GuildId) {
        self.shared.dropped.lock().insert(guild_id);
    }

    /// Simula que el track actual de la guild terminó o falló
    pub fn emit_idle(&self, guild_id: GuildId, cause: IdleCause) {
        let playing = self.shared.playing.lock();
        if let Some((idle, Some(play_id))) = playing.get(&guild_id) {
            idle.notify(*play_id, cause);
        }
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn connect(
        &self,
        guild_id: GuildId,
        _channel_id: ChannelId,
        idle: IdleNotifier,
    ) -> Result<Box<dyn VoiceConnection>, QueueError> {
        if *self.fail_connect.lock() {
            return Err(QueueError::TransportUnavailable("canal lleno".into()));
        }

        self.shared.record(TransportCall::Connect(guild_id));
        self.shared.playing.lock().insert(guild_id, (idle, None));
        self.shared.dropped.lock().remove(&guild_id);

        Ok(Box::new(FakeConnection {
            guild_id,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakeConnection {
    guild_id: GuildId,
    shared: Arc<Shared>,
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn play(&mut self, track: &Track, play_id: u64) -> Result<(), QueueError> {
        self.shared
            .record(TransportCall::Play(self.guild_id, track.url.clone(), play_id));

        if self.shared.failing_urls.lock().contains(&track.url) {
            return Err(QueueError::Playback(format!("stream no disponible: {}", track.url)));
        }

        if let Some((_, current)) = self.shared.playing.lock().get_mut(&self.guild_id) {
            *current = Some(play_id);
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), QueueError> {
        self.shared.record(TransportCall::Pause(self.guild_id));
        Ok(())
    }

    fn resume(&self) -> Result<(), QueueError> {
        self.shared.record(TransportCall::Resume(self.guild_id));
        Ok(())
    }

    fn stop(&self) -> Result<(), QueueError> {
        self.shared.record(TransportCall::Stop(self.guild_id));
        if let Some((idle, Some(play_id))) = self.shared.playing.lock().get(&self.guild_id) {
            idle.notify(*play_id, IdleCause::Finished);
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        !self.shared.dropped.lock().contains(&self.guild_id)
    }

    async fn disconnect(self: Box<Self>) {
        self.shared.record(TransportCall::Disconnect(self.guild_id));
        self.shared.playing.lock().remove(&self.guild_id);
    }
}

/// Notificador que guarda los mensajes en memoria
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(ChannelId, Notice)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(ChannelId, Notice)> {
        self.notices.lock().clone()
    }
}

impl StatusNotifier for RecordingNotifier {
    fn notify(&self, channel_id: ChannelId, notice: Notice) {
        self.notices.lock().push((channel_id, notice));
    }
}

/// Espera hasta un segundo a que se cumpla la condición
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("la condición no se cumplió a tiempo");
}
