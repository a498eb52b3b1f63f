use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod sources;
mod ui;

use crate::audio::{playback::SongbirdPlayback, queue::QueueStore};
use crate::bot::StreamerBot;
use crate::config::Config;
use crate::sources::{SoundCloudClient, TrackResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("streamer=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Streamer v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    // Colas en memoria, una por guild
    let store = Arc::new(QueueStore::new());

    let voice = Songbird::serenity();
    // Sin timeout total: el cuerpo de un stream dura lo que dura el track
    let audio_http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    let playback = Arc::new(SongbirdPlayback::new(voice.clone(), audio_http));

    let resolver: Option<Arc<dyn TrackResolver>> = match &config.soundcloud_client_id {
        Some(client_id) => {
            let client = SoundCloudClient::new(client_id.clone())?;
            Some(Arc::new(client) as Arc<dyn TrackResolver>)
        }
        None => {
            warn!("⚠️ SOUNDCLOUD_CLIENT_ID no configurado, el comando play queda deshabilitado");
            None
        }
    };

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.discord_token.clone();
    let handler = StreamerBot::new(config, store, playback, resolver, voice.clone());

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird_with(voice)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
