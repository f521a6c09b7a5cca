//! # Jukebox
//!
//! Per-guild music queue bot for Discord voice channels.
//!
//! - [`audio`]: playback sessions, the session registry and queue advancement
//! - [`sources`]: resolution of `play` queries (text search, catalog links)
//! - [`bot`]: prefix commands over the Serenity gateway
//! - [`config`]: environment configuration

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod ui;
