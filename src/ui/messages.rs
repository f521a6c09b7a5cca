//! Textos de respuesta del bot.

use crate::{
    audio::{player::Enqueued, session::SessionStatus, transport::Notice},
    sources::Track,
};

/// Pendientes que se listan antes de resumir el resto
const MAX_LISTED_TRACKS: usize = 15;

pub const JOIN_VOICE_FIRST: &str = "🔊 Únete a un canal de voz primero.";
pub const UNABLE_TO_ADD: &str = "❌ No se pudo agregar ese track.";
pub const NOTHING_TO_SKIP: &str = "⚠️ No hay nada para saltar.";
pub const SKIPPED: &str = "⏭️ Se saltó el track actual.";
pub const NOTHING_PLAYING: &str = "⚠️ No se está reproduciendo nada.";
pub const PAUSED: &str = "⏸️ Reproducción pausada.";
pub const NOTHING_TO_RESUME: &str = "⚠️ No hay nada para reanudar.";
pub const RESUMED: &str = "▶️ Reproducción reanudada.";
pub const STOPPED: &str = "🛑 Reproducción detenida y cola limpiada.";
pub const QUEUE_EMPTY: &str = "📭 La cola está vacía.";
pub const NOTHING_CURRENTLY_PLAYING: &str = "ℹ️ No se está reproduciendo nada en este momento.";

pub fn voice_unavailable() -> String {
    "❌ No me pude conectar a tu canal de voz.".to_string()
}

pub fn added_to_queue(track: &Track, enqueued: Enqueued) -> String {
    match enqueued {
        Enqueued::Started => format!("➕ Agregado a la cola: **{}**", track.title),
        Enqueued::Queued(position) => format!("➕ Agregado a la cola: **{}** (posición {})", track.title, position),
    }
}

pub fn now_playing(track: &Track) -> String {
    format!("▶️ Reproduciendo ahora: **{}**", track.title)
}

pub fn playback_failed(track: &Track) -> String {
    format!("❌ No se pudo reproducir **{}**, pasando al siguiente.", track.title)
}

pub fn notice(notice: &Notice) -> String {
    match notice {
        Notice::NowPlaying(track) => now_playing(track),
        Notice::PlaybackFailed(track) => playback_failed(track),
    }
}

/// Track actual seguido de la lista numerada de pendientes
pub fn queue_listing(status: &SessionStatus) -> String {
    if status.current.is_none() && status.queue.is_empty() {
        return QUEUE_EMPTY.to_string();
    }

    let mut lines = Vec::new();
    if let Some(current) = &status.current {
        lines.push(format!("Reproduciendo ahora: **{}**", current.title));
    }

    lines.extend(
        status
            .queue
            .iter()
            .take(MAX_LISTED_TRACKS)
            .enumerate()
            .map(|(i, track)| format!("{}. {}", i + 1, track.title)),
    );

    if status.queue.len() > MAX_LISTED_TRACKS {
        lines.push(format!("... y {} más", status.queue.len() - MAX_LISTED_TRACKS));
    }

    lines.join("\n")
}
