use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::audio::AssetSummary;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Open Jukebox";

/// Entradas visibles en el listado de la cola
const QUEUE_PAGE_SIZE: usize = 10;

fn requested_by(asset: &AssetSummary) -> String {
    asset
        .submitter
        .as_ref()
        .map_or("Desconocido".to_string(), |s| format!("<@{}>", s.user_id))
}

/// Embed de "reproduciendo ahora"
pub fn create_now_playing_embed(asset: &AssetSummary) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", asset.display_title()))
        .color(colors::SUCCESS_GREEN);

    if let Some(duration) = asset.duration {
        embed = embed.field("⏱️ Duración", format_duration(duration), true);
    }

    embed
        .field("👤 Solicitado por", requested_by(asset), true)
        .url(&asset.source)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Embed de canciones agregadas a la cola de descargas
pub fn create_tracks_added_embed(added: &[String], rejected: &[(String, String)]) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(if added.len() == 1 {
            "✅ Canción Agregada".to_string()
        } else {
            format!("✅ {} Canciones Agregadas", added.len())
        })
        .color(if added.is_empty() {
            colors::WARNING_ORANGE
        } else {
            colors::SUCCESS_GREEN
        });

    if !added.is_empty() {
        embed = embed.description(
            added
                .iter()
                .map(|link| format!("• {}", link))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    if !rejected.is_empty() {
        embed = embed.field(
            "⚠️ No agregadas",
            rejected
                .iter()
                .map(|(link, reason)| format!("• {} - {}", link, reason))
                .collect::<Vec<_>>()
                .join("\n"),
            false,
        );
    }

    embed
        .footer(CreateEmbedFooter::new(
            "🎵 Se reproducirán en orden cuando terminen de descargarse",
        ))
        .timestamp(Timestamp::now())
}

/// Embed con la cola completa: lo que suena primero, después lo pendiente
pub fn create_queue_embed(queue: &[AssetSummary], now_playing: Option<&AssetSummary>) -> CreateEmbed {
    let embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if queue.is_empty() {
        return embed
            .description("😴 **La cola está vacía**")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    let mut lines: Vec<String> = queue
        .iter()
        .take(QUEUE_PAGE_SIZE)
        .enumerate()
        .map(|(i, asset)| {
            let marker = if now_playing.is_some_and(|current| current.id == asset.id) {
                "▶️".to_string()
            } else {
                format!("`{}.`", i + 1)
            };
            match asset.duration {
                Some(duration) => format!(
                    "{} **{}** ({})",
                    marker,
                    asset.display_title(),
                    format_duration(duration)
                ),
                None => format!("{} **{}**", marker, asset.display_title()),
            }
        })
        .collect();

    if queue.len() > QUEUE_PAGE_SIZE {
        lines.push(format!("... y {} más", queue.len() - QUEUE_PAGE_SIZE));
    }

    embed
        .description(lines.join("\n"))
        .field("📊 Total", queue.len().to_string(), true)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Embed de ayuda con el prefijo configurado
pub fn create_help_embed(prefix: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("🎵 Open Jukebox - Comandos")
        .color(colors::INFO_BLUE)
        .description("Las canciones suenan en el orden en que se pidieron")
        .field(
            "🎵 Reproducción",
            format!(
                "• `{p}add <enlaces>` - Agrega canciones a la cola\n\
                • `{p}play` - Reanuda la reproducción\n\
                • `{p}pause` - Pausa la reproducción\n\
                • `{p}skip` - Salta la canción actual",
                p = prefix
            ),
            false,
        )
        .field(
            "📜 Cola",
            format!(
                "• `{p}queue` - Muestra la cola\n\
                • `{p}clear` - Vacía la cola y detiene la canción actual",
                p = prefix
            ),
            false,
        )
        .field(
            "🎛️ Audio",
            format!("• `{p}volume <0-1>` - Ajusta el volumen", p = prefix),
            false,
        )
        .field("🎵 Fuentes Soportadas", "• YouTube / YouTube Music\n• SoundCloud", false)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Embed de volumen con indicador visual
pub fn create_volume_embed(volume: f32) -> CreateEmbed {
    let volume_percent = (volume * 100.0).round() as u8;
    let status_emoji = if volume_percent == 0 {
        "🔈"
    } else if volume_percent <= 50 {
        "🔉"
    } else {
        "🔊"
    };

    CreateEmbed::default()
        .title(format!("{} Control de Volumen", status_emoji))
        .description(format!("**Volumen actual: {}%**", volume_percent))
        .field("📊 Nivel", create_volume_bar(volume), false)
        .color(colors::INFO_BLUE)
        .timestamp(Timestamp::now())
}

/// Embed para una descarga fallida
pub fn create_fetch_failed_embed(asset: &AssetSummary, reason: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("❌ No se pudo descargar")
        .description(format!("{}\n\n{}", asset.source, reason))
        .field("👤 Solicitado por", requested_by(asset), true)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de error
pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de éxito
pub fn create_success_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("✅ {}", title))
        .description(description)
        .color(colors::SUCCESS_GREEN)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de información
pub fn create_info_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("ℹ️ {}", title))
        .description(description)
        .color(colors::MUSIC_PURPLE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea una barra visual de volumen
fn create_volume_bar(volume: f32) -> String {
    let segments = 20;
    let filled = ((volume.clamp(0.0, 1.0) * segments as f32).round() as usize).min(segments);
    let empty = segments - filled;

    let bar = "█".repeat(filled) + &"▒".repeat(empty);
    format!("`[{}]`", bar)
}

/// Formatea una duración en formato legible
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
