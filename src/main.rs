use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

use jukebox::{
    audio::{player::AudioPlayer, voice::SongbirdTransport},
    bot::{events::ChannelNotifier, JukeboxBot},
    config::Config,
    sources::{QueryResolver, SpotifyClient, TrackResolver, YouTubeClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    // Resolución de tracks: búsqueda en YouTube + catálogo de Spotify opcional
    let spotify = match &config.spotify {
        Some(credentials) => Some(SpotifyClient::new(credentials.clone())?),
        None => {
            warn!("⚠️ Spotify no configurado, los links de catálogo no se podrán resolver");
            None
        }
    };
    let resolver: Arc<dyn TrackResolver> = Arc::new(QueryResolver::new(
        YouTubeClient::new(),
        spotify,
        config.search_limit,
    ));

    // Core de reproducción
    let songbird = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(songbird.clone(), config.default_volume));
    let notifier = Arc::new(ChannelNotifier::new());
    let player = Arc::new(AudioPlayer::new(transport, notifier.clone()));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = JukeboxBot::new(config.clone(), player.clone(), resolver);

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Los avisos comparten el cliente HTTP (y sus rate limits) con el bot
    notifier.attach(client.http.clone());

    // Manejar shutdown graceful: salir de todos los canales de voz
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        player.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    // yt-dlp es necesario tanto para buscar como para abrir los streams
    let version = YouTubeClient::verify_installed().await?;
    println!("OK (yt-dlp {})", version);
    Ok(())
}
