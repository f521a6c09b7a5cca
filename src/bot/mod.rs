//! # Bot Module
//!
//! Discord gateway glue for the queue bot.
//!
//! This module contains the thin command layer, including:
//! - Prefix command parsing ([`commands`])
//! - Mapping each command onto the [`AudioPlayer`] ([`handlers`])
//! - Status messages posted to the session's text channel ([`events`])
//!
//! ## Architecture
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`]. It owns no playback
//! state itself: the [`AudioPlayer`] and the track resolver are created once
//! in `main` and passed in through [`JukeboxBot::new`].

use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Message, Ready, UserId, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{audio::player::AudioPlayer, config::Config, sources::TrackResolver};
use handlers::CommandRequest;

/// Main Discord event handler.
///
/// ## Fields
///
/// - `config`: Bot configuration (prefix, limits)
/// - `player`: Playback core shared by every guild
/// - `resolver`: Turns `play` queries into tracks
pub struct JukeboxBot {
    config: Arc<Config>,
    player: Arc<AudioPlayer>,
    resolver: Arc<dyn TrackResolver>,
}

impl JukeboxBot {
    pub fn new(config: Arc<Config>, player: Arc<AudioPlayer>, resolver: Arc<dyn TrackResolver>) -> Self {
        Self {
            config,
            player,
            resolver,
        }
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
    }

    /// Handles prefix commands.
    ///
    /// Messages from bots, outside a guild, or without the configured prefix
    /// are ignored. Every recognised command gets exactly one reply.
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let Some(command) = commands::parse(&msg.content, &self.config.command_prefix) else {
            return;
        };

        info!(
            "📝 Comando {:?} usado por {} en guild {}",
            command, msg.author.name, guild_id
        );

        let request = CommandRequest {
            guild_id,
            reply_channel: msg.channel_id,
            voice_channel: author_voice_channel(&ctx, guild_id, msg.author.id),
        };

        let reply = handlers::handle_command(&self.player, self.resolver.as_ref(), request, command).await;

        if let Err(e) = msg.reply(&ctx, reply).await {
            error!("Error al responder comando: {:?}", e);
        }
    }

    /// Cleans up when the bot is disconnected from voice by someone else.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.channel_id.is_some() {
            return;
        }

        let (Some(guild_id), Some(channel_id)) = (new.guild_id, old.and_then(|o| o.channel_id)) else {
            return;
        };

        info!("🔌 Bot salió del canal {} en guild {}", channel_id, guild_id);
        match self.player.handle_disconnect(guild_id, channel_id).await {
            Ok(Some(discarded)) => debug!("{} tracks descartados en guild {}", discarded, guild_id),
            Ok(None) => {}
            Err(e) => debug!("Sin sesión que limpiar en guild {}: {}", guild_id, e),
        }
    }
}

/// Canal de voz en el que está el autor, según la caché
fn author_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
