use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod sources;
mod ui;

use crate::bot::{ActiveJukebox, JukeboxBot};
use crate::config::Config;
use crate::sources::YtDlpFetcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Open Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let fetcher = Arc::new(YtDlpFetcher::new(
        config.ytdlp_path.clone(),
        config.cache_dir.clone(),
        config.max_filesize.clone(),
    ));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        fetcher.verify_dependencies().await?;
        println!("OK");
        return Ok(());
    }

    // Restos de una ejecución anterior
    match fetcher.purge_cache().await {
        Ok(0) => {}
        Ok(count) => info!("🧹 {} archivos viejos eliminados de la caché", count),
        Err(e) => warn!("⚠️ No se pudo limpiar la caché: {}", e),
    }

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let active = ActiveJukebox::default();
    let handler = JukeboxBot::new(config.clone(), fetcher.clone(), active.clone())?;

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird()
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");

        if let Some(jukebox) = active.take() {
            jukebox.shutdown().await;
        }
        if let Err(e) = fetcher.purge_cache().await {
            warn!("⚠️ No se pudo limpiar la caché: {}", e);
        }

        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
