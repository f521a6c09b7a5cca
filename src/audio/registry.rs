use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::session::PlaybackSession;

/// Mapa de sesiones activas por guild.
///
/// Es la única estructura compartida entre guilds; `DashMap` reparte las
/// entradas en shards y las operaciones nunca retienen un shard a través de
/// un `.await`, así que una guild no bloquea a otra.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
    // Serializa la creación de sesiones de una misma guild
    creation_gates: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(&guild_id).map(|s| Arc::clone(s.value()))
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Guilds con sesión activa
    pub fn guilds(&self) -> Vec<GuildId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub(crate) fn insert(&self, session: Arc<PlaybackSession>) {
        debug!("🆕 Sesión registrada para guild {}", session.guild_id());
        self.sessions.insert(session.guild_id(), session);
    }

    /// Quita la sesión solo si sigue siendo la registrada para su guild
    pub(crate) fn remove(&self, session: &Arc<PlaybackSession>) -> bool {
        let removed = self
            .sessions
            .remove_if(&session.guild_id(), |_, registered| Arc::ptr_eq(registered, session))
            .is_some();

        if removed {
            debug!("🗑️ Sesión eliminada para guild {}", session.guild_id());
        }
        removed
    }

    pub(crate) fn creation_gate(&self, guild_id: GuildId) -> Arc<Mutex<()>> {
        Arc::clone(self.creation_gates.entry(guild_id).or_default().value())
    }
}
