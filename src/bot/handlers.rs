use anyhow::Result;
use serenity::{
    builder::{CreateEmbed, CreateMessage},
    model::channel::Message,
    prelude::Context,
};
use tracing::info;

use super::{commands::Command, JukeboxBot};
use crate::{
    audio::{Jukebox, Submitter},
    ui::embeds,
};

/// Maneja un comando de texto y responde en el mismo canal
pub async fn handle_command(
    ctx: &Context,
    msg: &Message,
    command: Command,
    bot: &JukeboxBot,
) -> Result<()> {
    info!(
        "📝 Comando {:?} usado por {} en canal {}",
        command, msg.author.name, msg.channel_id
    );

    let embed = match bot.active_jukebox() {
        Some(jukebox) => {
            let submitter = Submitter {
                user_id: msg.author.id,
                name: msg.author.name.clone(),
                channel_id: msg.channel_id,
            };
            respond(&jukebox, command, submitter, bot.command_prefix()).await
        }
        None if command == Command::Help => embeds::create_help_embed(bot.command_prefix()),
        None => embeds::create_error_embed(
            "Jukebox no disponible",
            "El bot no está conectado al canal de voz",
        ),
    };

    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;

    Ok(())
}

/// Ejecuta el comando sobre el jukebox y arma la respuesta
pub async fn respond(
    jukebox: &Jukebox,
    command: Command,
    submitter: Submitter,
    prefix: &str,
) -> CreateEmbed {
    match command {
        Command::Add { links, unsupported } => {
            let mut added = Vec::new();
            let mut rejected: Vec<(String, String)> = unsupported
                .into_iter()
                .map(|link| (link, "Enlace no soportado".to_string()))
                .collect();

            for link in links {
                match jukebox.add(link.clone(), Some(submitter.clone())) {
                    Ok(_) => added.push(link),
                    Err(e) => rejected.push((link, e.to_string())),
                }
            }

            embeds::create_tracks_added_embed(&added, &rejected)
        }
        Command::Play => {
            if jukebox.play() {
                embeds::create_success_embed("Reanudado", "▶️ Reproducción reanudada")
            } else {
                embeds::create_info_embed("Sin cambios", "No hay nada pausado")
            }
        }
        Command::Pause => {
            if jukebox.pause() {
                embeds::create_success_embed("Pausado", "⏸️ Reproducción pausada")
            } else {
                embeds::create_info_embed("Sin cambios", "No hay nada sonando")
            }
        }
        Command::Volume(None) => embeds::create_volume_embed(jukebox.volume()),
        Command::Volume(Some(volume)) => match jukebox.set_volume(volume) {
            Ok(()) => embeds::create_volume_embed(volume),
            Err(e) => embeds::create_error_embed("Volumen inválido", &e.to_string()),
        },
        Command::Skip => {
            if jukebox.skip() {
                embeds::create_success_embed("Saltada", "⏭️ Pasando a la siguiente canción")
            } else {
                embeds::create_info_embed("Sin cambios", "No hay nada sonando")
            }
        }
        Command::Clear => {
            let discarded = jukebox.clear().await;
            embeds::create_success_embed(
                "Cola limpiada",
                &format!("🗑️ {} canciones descartadas", discarded),
            )
        }
        Command::Queue => {
            let (now_playing, queue) = jukebox.list_queue();
            embeds::create_queue_embed(&queue, now_playing.as_ref())
        }
        Command::Help => embeds::create_help_embed(prefix),
        Command::Invalid { command, reason } => embeds::create_error_embed(
            &format!("Uso incorrecto de {}{}", prefix, command),
            &reason,
        ),
        Command::Unknown(name) => embeds::create_error_embed(
            "Comando no reconocido",
            &format!("`{}{}` no existe. Usa `{}help`", prefix, name, prefix),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        testing::{started, FakeBackend, FakeFetcher},
        JukeboxSettings,
    };
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use serenity::model::id::{ChannelId, UserId};

    fn submitter() -> Submitter {
        Submitter {
            user_id: UserId::new(10),
            name: "bob".to_string(),
            channel_id: ChannelId::new(20),
        }
    }

    fn title(embed: &CreateEmbed) -> String {
        let json: Value = serde_json::to_value(embed).unwrap();
        json["title"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn add_reports_rejected_links() {
        let settings = JukeboxSettings {
            download_capacity: Some(1),
            ..JukeboxSettings::default()
        };
        let fetcher = FakeFetcher::new();
        let _gate = fetcher.gate("https://youtu.be/a");
        let (jukebox, _events) = Jukebox::start(fetcher, FakeBackend::manual(), settings);

        let embed = respond(
            &jukebox,
            Command::Add {
                links: vec!["https://youtu.be/a".to_string(), "https://youtu.be/b".to_string()],
                unsupported: vec!["https://example.com/x".to_string()],
            },
            submitter(),
            "/",
        )
        .await;

        let json: Value = serde_json::to_value(&embed).unwrap();
        let rejected = json["fields"][0]["value"].as_str().unwrap();
        assert!(rejected.contains("https://example.com/x - Enlace no soportado"));
        assert!(rejected.contains("https://youtu.be/b - La cola de descargas está llena"));
        let (_, queue) = jukebox.list_queue();
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue[0].submitter.as_ref().map(|s| s.name.as_str()),
            Some("bob")
        );

        jukebox.shutdown().await;
    }

    #[tokio::test]
    async fn controls_answer_according_to_state() {
        let fetcher = FakeFetcher::new();
        let (jukebox, mut events) =
            Jukebox::start(fetcher, FakeBackend::manual(), JukeboxSettings::default());

        let embed = respond(&jukebox, Command::Skip, submitter(), "/").await;
        assert_eq!(title(&embed), "ℹ️ Sin cambios");

        jukebox.add("https://youtu.be/a", None).unwrap();
        started(&mut events, "https://youtu.be/a").await;

        let embed = respond(&jukebox, Command::Pause, submitter(), "/").await;
        assert_eq!(title(&embed), "✅ Pausado");

        let embed = respond(&jukebox, Command::Volume(Some(1.5)), submitter(), "/").await;
        assert_eq!(title(&embed), "❌ Volumen inválido");
        assert_eq!(jukebox.volume(), 1.0);

        let embed = respond(&jukebox, Command::Clear, submitter(), "/").await;
        assert_eq!(title(&embed), "✅ Cola limpiada");

        jukebox.shutdown().await;
    }
}
