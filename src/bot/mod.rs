//! # Bot Module
//!
//! Handler de Discord del jukebox.
//!
//! Al conectarse, el bot entra al canal de voz configurado y arranca un
//! [`Jukebox`] sobre esa llamada. Después sólo escucha comandos de texto en
//! el servidor (y canal, si se configuró) y los traduce a operaciones del
//! jukebox.
//!
//! - [`commands`]: parser de comandos con prefijo
//! - [`handlers`]: ejecución de comandos y respuestas
//! - [`events`]: eventos de voz y anuncios del jukebox

use anyhow::Result;
use parking_lot::Mutex;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{
    audio::{Jukebox, SongbirdBackend},
    config::Config,
    sources::YtDlpFetcher,
};
use commands::CommandParser;

/// Jukebox en uso, compartido entre el handler y el proceso principal
#[derive(Clone, Default)]
pub struct ActiveJukebox(Arc<Mutex<Option<Arc<Jukebox>>>>);

impl ActiveJukebox {
    pub fn get(&self) -> Option<Arc<Jukebox>> {
        self.0.lock().clone()
    }

    pub fn take(&self) -> Option<Arc<Jukebox>> {
        self.0.lock().take()
    }

    fn replace(&self, jukebox: Arc<Jukebox>) -> Option<Arc<Jukebox>> {
        self.0.lock().replace(jukebox)
    }
}

pub struct JukeboxBot {
    config: Arc<Config>,
    parser: CommandParser,
    fetcher: Arc<YtDlpFetcher>,
    active: ActiveJukebox,
}

impl JukeboxBot {
    pub fn new(config: Config, fetcher: Arc<YtDlpFetcher>, active: ActiveJukebox) -> Result<Self> {
        let parser = CommandParser::new(config.command_prefix.clone())?;

        Ok(Self {
            config: Arc::new(config),
            parser,
            fetcher,
            active,
        })
    }

    pub fn command_prefix(&self) -> &str {
        self.parser.prefix()
    }

    /// Jukebox activo, si el bot está en el canal de voz
    pub fn active_jukebox(&self) -> Option<Arc<Jukebox>> {
        self.active.get().filter(|jukebox| !jukebox.is_stopped())
    }

    /// Conecta el bot a un canal de voz
    pub async fn join_voice_channel(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<tokio::sync::Mutex<songbird::Call>>> {
        let manager = songbird::get(ctx)
            .await
            .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

        match manager.join(guild_id, channel_id).await {
            Ok(call) => {
                info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
                Ok(call)
            }
            Err(e) => {
                error!("Error al obtener handler de voz: {:?}", e);
                Err(anyhow::anyhow!("Error al conectar al canal de voz"))
            }
        }
    }

    /// Entra al canal de voz y arranca un jukebox nuevo sobre la llamada
    async fn start_jukebox(&self, ctx: &Context) -> Result<()> {
        let guild_id = GuildId::new(self.config.guild_id);
        let channel_id = ChannelId::new(self.config.voice_channel_id);

        let call = self.join_voice_channel(ctx, guild_id, channel_id).await?;
        let backend = Arc::new(SongbirdBackend::new(call.clone()));
        let (jukebox, jukebox_events) =
            Jukebox::start(self.fetcher.clone(), backend, self.config.jukebox_settings());

        events::register_voice_events(&call, &jukebox).await;
        tokio::spawn(events::announce_events(
            ctx.http.clone(),
            jukebox_events,
            self.config.text_channel_id.map(ChannelId::new),
        ));

        if let Some(previous) = self.active.replace(jukebox) {
            previous.shutdown().await;
        }

        info!("🎶 Jukebox listo en guild {}", guild_id);
        Ok(())
    }

    /// Mensajes del servidor y canal configurados, de usuarios humanos
    fn accepts(&self, msg: &Message) -> bool {
        if msg.author.bot {
            return false;
        }
        if msg.guild_id.map(|id| id.get()) != Some(self.config.guild_id) {
            return false;
        }
        self.config
            .text_channel_id
            .map_or(true, |channel| msg.channel_id.get() == channel)
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);

        if self.active_jukebox().is_some() {
            info!("♻️ Reconexión al gateway, el jukebox sigue activo");
            return;
        }

        if let Err(e) = self.start_jukebox(&ctx).await {
            error!("❌ No se pudo iniciar el jukebox: {:?}", e);
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if !self.accepts(&msg) {
            return;
        }

        let Some(command) = self.parser.parse(&msg.content) else {
            return;
        };

        if let Err(e) = handlers::handle_command(&ctx, &msg, command, self).await {
            error!("Error manejando comando: {:?}", e);
        }
    }

    /// Si alguien saca al bot del canal de voz, el jukebox se detiene
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.guild_id.map(|id| id.get()) != Some(self.config.guild_id) {
            return;
        }

        if old.is_some() && new.channel_id.is_none() {
            warn!("🔌 Bot desconectado del canal de voz");
            if let Some(jukebox) = self.active.take() {
                jukebox.shutdown().await;
            }
        }
    }
}
