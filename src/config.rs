use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::JukeboxSettings;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: u64,
    pub voice_channel_id: u64,
    pub text_channel_id: Option<u64>, // Sin valor = cualquier canal del servidor
    pub command_prefix: String,

    // Audio
    pub default_volume: f32,
    pub max_queue_size: usize,   // Cola de descargas, 0 = sin límite
    pub max_cached_songs: usize, // Canciones descargadas esperando turno

    // Descargas
    pub max_filesize: String,
    pub cache_dir: PathBuf,
    pub ytdlp_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            guild_id: std::env::var("GUILD_ID")?.parse()?,
            voice_channel_id: std::env::var("VOICE_CHANNEL_ID")?.parse()?,
            text_channel_id: match std::env::var("TEXT_CHANNEL_ID") {
                Ok(val) if !val.trim().is_empty() => Some(val.parse()?),
                _ => None,
            },
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "/".to_string()),

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()?,
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            max_cached_songs: std::env::var("MAX_CACHED_SONGS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            // Descargas
            max_filesize: std::env::var("MAX_FILESIZE").unwrap_or_else(|_| "100m".to_string()),
            cache_dir: std::env::var("CACHE_DIR")
                .unwrap_or_else(|_| "/app/cache".to_string())
                .into(),
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
        };

        config.validate()?;
        std::fs::create_dir_all(&config.cache_dir)?;

        Ok(config)
    }

    /// Valida los valores de configuración.
    ///
    /// - Ids de Discord distintos de cero
    /// - Volumen entre 0.0 y 1.0
    /// - Al menos una canción descargada en espera
    /// - Prefijo y límite de tamaño no vacíos
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN no puede estar vacío");
        }

        if self.guild_id == 0 || self.voice_channel_id == 0 || self.text_channel_id == Some(0) {
            anyhow::bail!("GUILD_ID, VOICE_CHANNEL_ID y TEXT_CHANNEL_ID deben ser ids válidos");
        }

        if !(0.0..=1.0).contains(&self.default_volume) {
            anyhow::bail!(
                "El volumen por defecto debe estar entre 0.0 y 1.0, se recibió: {}",
                self.default_volume
            );
        }

        if self.max_cached_songs == 0 {
            anyhow::bail!("MAX_CACHED_SONGS debe ser mayor que 0");
        }

        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("COMMAND_PREFIX no puede estar vacío");
        }

        if self.max_filesize.trim().is_empty() {
            anyhow::bail!("MAX_FILESIZE no puede estar vacío");
        }

        Ok(())
    }

    /// Límites del jukebox derivados de la configuración
    pub fn jukebox_settings(&self) -> JukeboxSettings {
        JukeboxSettings {
            default_volume: self.default_volume,
            download_capacity: (self.max_queue_size > 0).then_some(self.max_queue_size),
            play_capacity: self.max_cached_songs,
        }
    }

    /// Resumen para logs, sin el token
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: Guild {} / Voz {} / Texto {} (prefijo '{}')\n  \
            Audio: {}% vol\n  \
            Colas: {} descargas, {} canciones en caché\n  \
            Descargas: {} (máx {}) en {}",
            self.guild_id,
            self.voice_channel_id,
            self.text_channel_id.map_or("cualquiera".to_string(), |id| id.to_string()),
            self.command_prefix,
            (self.default_volume * 100.0) as u32,
            if self.max_queue_size == 0 {
                "sin límite".to_string()
            } else {
                self.max_queue_size.to_string()
            },
            self.max_cached_songs,
            self.ytdlp_path,
            self.max_filesize,
            self.cache_dir.display()
        )
    }
}

/// Valores por defecto; las credenciales e ids no tienen.
impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            guild_id: 0,
            voice_channel_id: 0,
            text_channel_id: None,
            command_prefix: "/".to_string(),

            default_volume: 1.0,
            max_queue_size: 50,
            max_cached_songs: 10,

            max_filesize: "100m".to_string(),
            cache_dir: "/app/cache".into(),
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid() -> Config {
        Config {
            discord_token: "token".to_string(),
            guild_id: 1,
            voice_channel_id: 2,
            ..Config::default()
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_volume_out_of_range() {
        let config = Config {
            default_volume: 1.5,
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = Config {
            default_volume: -0.1,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_cached_songs_and_empty_token() {
        let config = Config {
            max_cached_songs: 0,
            ..valid()
        };
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn rejects_zero_ids() {
        let config = Config {
            voice_channel_id: 0,
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = Config {
            text_channel_id: Some(0),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_queue_size_means_unbounded() {
        let config = Config {
            max_queue_size: 0,
            max_cached_songs: 3,
            default_volume: 0.4,
            ..valid()
        };
        let settings = config.jukebox_settings();

        assert_eq!(settings.download_capacity, None);
        assert_eq!(settings.play_capacity, 3);
        assert_eq!(settings.default_volume, 0.4);
        assert_eq!(valid().jukebox_settings().download_capacity, Some(50));
    }

    #[test]
    fn summary_hides_token() {
        let config = Config {
            discord_token: "super-secret".to_string(),
            ..valid()
        };
        let summary = config.summary();

        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("Guild 1"));
    }
}
