//! Seams between the playback core and the outside world: the voice
//! transport, the idle notification channel it reports through, and the
//! status notifier used to announce tracks.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc;

use crate::{error::QueueError, sources::Track};

/// Por qué el transporte dejó de reproducir un track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleCause {
    /// El track terminó o fue detenido
    Finished,
    /// El stream falló durante la reproducción
    Errored,
}

/// Notificación de que el reproductor quedó inactivo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleEvent {
    /// Secuencia de la reproducción que terminó
    pub play_id: u64,
    pub cause: IdleCause,
}

/// Extremo emisor del canal de inactividad de una sesión
#[derive(Debug, Clone)]
pub struct IdleNotifier {
    tx: mpsc::UnboundedSender<IdleEvent>,
}

impl IdleNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<IdleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Entrega el evento; se descarta si la sesión ya no existe
    pub fn notify(&self, play_id: u64, cause: IdleCause) {
        let _ = self.tx.send(IdleEvent { play_id, cause });
    }
}

/// Abre conexiones de voz
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Se une al canal y asocia un reproductor de audio a la conexión.
    /// Cada track que termine o falle se reporta por `idle`.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        idle: IdleNotifier,
    ) -> Result<Box<dyn VoiceConnection>, QueueError>;
}

/// Conexión de voz con su reproductor, propiedad exclusiva de una sesión
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Abre el stream de audio del track y lo reproduce, reemplazando lo que
    /// estuviera sonando. `play_id` viaja en el [`IdleEvent`] correspondiente.
    async fn play(&mut self, track: &Track, play_id: u64) -> Result<(), QueueError>;

    fn pause(&self) -> Result<(), QueueError>;

    fn resume(&self) -> Result<(), QueueError>;

    /// Detiene el track actual; el transporte reporta la inactividad
    fn stop(&self) -> Result<(), QueueError>;

    /// `false` si el bot ya no está en el canal (por ejemplo, lo desconectó
    /// un moderador)
    async fn is_connected(&self) -> bool;

    /// Sale del canal de voz y libera el reproductor
    async fn disconnect(self: Box<Self>);
}

/// Mensajes de estado que el core envía al canal de texto de la sesión
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NowPlaying(Track),
    PlaybackFailed(Track),
}

/// Envía mensajes de estado sin bloquear la sesión
pub trait StatusNotifier: Send + Sync {
    fn notify(&self, channel_id: ChannelId, notice: Notice);
}
