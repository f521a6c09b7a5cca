use serenity::model::id::{ChannelId, GuildId};
use tracing::{error, info, warn};

use super::commands::Command;
use crate::{
    audio::player::{AudioPlayer, SessionTarget},
    error::QueueError,
    sources::TrackResolver,
    ui::messages,
};

/// Contexto de un comando, ya extraído del mensaje de Discord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest {
    pub guild_id: GuildId,
    pub reply_channel: ChannelId,
    /// Canal de voz del autor, si está en uno
    pub voice_channel: Option<ChannelId>,
}

/// Ejecuta un comando y devuelve el texto de respuesta.
///
/// Ningún error sale de aquí: cada fallo se convierte en un mensaje para el
/// usuario y la sesión queda como estaba.
pub async fn handle_command(
    player: &AudioPlayer,
    resolver: &dyn TrackResolver,
    request: CommandRequest,
    command: Command,
) -> String {
    match command {
        Command::Play(query) => handle_play(player, resolver, request, &query).await,
        Command::Skip => match player.skip(request.guild_id).await {
            Ok(Some(_)) => messages::SKIPPED.to_string(),
            Ok(None) | Err(QueueError::EmptySession) => messages::NOTHING_TO_SKIP.to_string(),
            Err(e) => control_failed("skip", request, e),
        },
        Command::Pause => match player.pause(request.guild_id).await {
            Ok(()) => messages::PAUSED.to_string(),
            Err(QueueError::EmptySession) => messages::NOTHING_PLAYING.to_string(),
            Err(e) => control_failed("pause", request, e),
        },
        Command::Resume => match player.resume(request.guild_id).await {
            Ok(()) => messages::RESUMED.to_string(),
            Err(QueueError::EmptySession) => messages::NOTHING_TO_RESUME.to_string(),
            Err(e) => control_failed("resume", request, e),
        },
        Command::Stop => match player.stop(request.guild_id).await {
            Ok(_) => messages::STOPPED.to_string(),
            Err(QueueError::EmptySession) => messages::NOTHING_PLAYING.to_string(),
            Err(e) => control_failed("stop", request, e),
        },
        Command::Queue => match player.status(request.guild_id).await {
            Ok(status) => messages::queue_listing(&status),
            Err(_) => messages::QUEUE_EMPTY.to_string(),
        },
        Command::NowPlaying => match player.status(request.guild_id).await {
            Ok(status) => match status.current {
                Some(track) => messages::now_playing(&track),
                None => messages::NOTHING_CURRENTLY_PLAYING.to_string(),
            },
            Err(_) => messages::NOTHING_CURRENTLY_PLAYING.to_string(),
        },
    }
}

async fn handle_play(
    player: &AudioPlayer,
    resolver: &dyn TrackResolver,
    request: CommandRequest,
    query: &str,
) -> String {
    let Some(voice_channel) = request.voice_channel else {
        return messages::JOIN_VOICE_FIRST.to_string();
    };

    if query.trim().is_empty() {
        return messages::UNABLE_TO_ADD.to_string();
    }

    // La resolución termina antes de tocar la sesión
    let track = match resolver.resolve(query).await {
        Ok(track) => track,
        Err(e) => {
            error!("Error resolviendo '{}' en guild {}: {}", query, request.guild_id, e);
            return messages::UNABLE_TO_ADD.to_string();
        }
    };

    let target = SessionTarget {
        guild_id: request.guild_id,
        voice_channel,
        reply_channel: request.reply_channel,
    };

    match player.enqueue(target, track.clone()).await {
        Ok(enqueued) => {
            info!("➕ '{}' agregado en guild {}", track.title, request.guild_id);
            messages::added_to_queue(&track, enqueued)
        }
        Err(QueueError::TransportUnavailable(reason)) => {
            error!("Error al conectar en guild {}: {}", request.guild_id, reason);
            messages::voice_unavailable()
        }
        Err(e) => {
            error!("Error agregando '{}' en guild {}: {}", track.title, request.guild_id, e);
            messages::UNABLE_TO_ADD.to_string()
        }
    }
}

fn control_failed(action: &str, request: CommandRequest, error: QueueError) -> String {
    warn!("⚠️ Falló {} en guild {}: {}", action, request.guild_id, error);
    format!("❌ {}", error)
}
