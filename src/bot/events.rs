use serenity::{async_trait, builder::CreateMessage, http::Http, model::id::ChannelId};
use songbird::{
    events::CoreEvent, Call, Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler,
};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::{
    audio::{AssetSummary, Jukebox, JukeboxEvent},
    ui::embeds,
};

/// Handler para cuando el driver de voz pierde la conexión.
/// No mantiene vivo al jukebox: uno ya detenido se libera aunque la llamada
/// siga existiendo.
pub struct DriverDisconnectHandler {
    jukebox: Weak<Jukebox>,
}

impl DriverDisconnectHandler {
    pub fn new(jukebox: &Arc<Jukebox>) -> Self {
        Self {
            jukebox: Arc::downgrade(jukebox),
        }
    }
}

#[async_trait]
impl VoiceEventHandler for DriverDisconnectHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::DriverDisconnect(data) = ctx {
            warn!(
                "🔌 Conexión de voz perdida en canal {:?}: {:?}",
                data.channel_id, data.reason
            );
        }

        let jukebox = self.jukebox.upgrade()?;

        // No bloquear el hilo de eventos de songbird mientras cierran los workers
        tokio::spawn(async move {
            jukebox.shutdown().await;
        });

        None
    }
}

/// Registra los event handlers de la llamada para un jukebox
pub async fn register_voice_events(call: &Arc<Mutex<Call>>, jukebox: &Arc<Jukebox>) {
    let mut handler = call.lock().await;
    // La llamada sobrevive a los jukeboxes: sólo el último recibe eventos
    handler.remove_all_global_events();
    handler.add_global_event(
        VoiceEvent::Core(CoreEvent::DriverDisconnect),
        DriverDisconnectHandler::new(jukebox),
    );
}

/// Publica los eventos del jukebox en el canal de texto de quien pidió la
/// canción. Termina cuando el jukebox se detiene y se cierra el canal.
pub async fn announce_events(
    http: Arc<Http>,
    mut events: mpsc::UnboundedReceiver<JukeboxEvent>,
    fallback: Option<ChannelId>,
) {
    let mut last_channel = fallback;

    while let Some(event) = events.recv().await {
        let (channel, embed) = match &event {
            JukeboxEvent::Started(asset) => {
                last_channel = reply_channel(asset).or(last_channel);
                (last_channel, embeds::create_now_playing_embed(asset))
            }
            JukeboxEvent::Finished(asset) => {
                debug!("✅ Terminó: {}", asset.display_title());
                continue;
            }
            JukeboxEvent::FetchFailed { asset, error } => (
                reply_channel(asset).or(last_channel),
                embeds::create_fetch_failed_embed(asset, error.user_message()),
            ),
            JukeboxEvent::Halted(reason) => (
                last_channel,
                embeds::create_error_embed("Jukebox detenido", reason),
            ),
        };

        let Some(channel) = channel else {
            debug!("Sin canal para anunciar {:?}", event);
            continue;
        };

        if let Err(e) = channel
            .send_message(&http, CreateMessage::new().embed(embed))
            .await
        {
            warn!("⚠️ No se pudo enviar el anuncio: {:?}", e);
        }
    }

    info!("📪 Canal de eventos del jukebox cerrado");
}

fn reply_channel(asset: &AssetSummary) -> Option<ChannelId> {
    asset.submitter.as_ref().map(|s| s.channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        testing::{FakeBackend, FakeFetcher},
        JukeboxSettings,
    };

    #[tokio::test]
    async fn disconnect_handler_releases_a_stopped_jukebox() {
        let (jukebox, _events) =
            Jukebox::start(FakeFetcher::new(), FakeBackend::manual(), JukeboxSettings::default());
        let handler = DriverDisconnectHandler::new(&jukebox);
        assert!(handler.jukebox.upgrade().is_some());

        jukebox.shutdown().await;
        drop(jukebox);

        assert!(handler.jukebox.upgrade().is_none());
    }
}
