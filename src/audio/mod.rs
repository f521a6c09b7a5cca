//! # Audio Module
//!
//! Per-guild playback core for the bot.
//!
//! ## Architecture
//!
//! ### [`session`] - Playback Session
//! - Owns one guild's FIFO queue, the current track and the voice connection
//! - Every transition runs under the session's own lock
//!
//! ### [`registry`] - Session Registry
//! - `GuildId` → session map; a guild has an entry iff something is playing
//!   or queued
//!
//! ### [`advance`] - Advancement Controller
//! - Reacts to idle notifications from the transport and starts the next
//!   track, or tears the session down when the queue is empty
//!
//! ### [`player`] - Audio Player
//! - The API the command layer talks to (`enqueue`, `skip`, `pause`,
//!   `resume`, `stop`, `status`)
//!
//! ### [`transport`] / [`voice`]
//! - The voice transport seam and its songbird implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use jukebox::audio::player::{AudioPlayer, SessionTarget};
//! use jukebox::sources::Track;
//! use serenity::all::{ChannelId, GuildId};
//! # use std::sync::Arc;
//!
//! # async fn example(player: Arc<AudioPlayer>) -> anyhow::Result<()> {
//! let target = SessionTarget {
//!     guild_id: GuildId::new(123456789),
//!     voice_channel: ChannelId::new(1),
//!     reply_channel: ChannelId::new(2),
//! };
//!
//! player.enqueue(target, Track::new("Artist - Song", "https://www.youtube.com/watch?v=x")).await?;
//! player.pause(target.guild_id).await?;
//! player.resume(target.guild_id).await?;
//! player.skip(target.guild_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod advance;
pub mod player;
pub mod registry;
pub mod session;
pub mod transport;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;
