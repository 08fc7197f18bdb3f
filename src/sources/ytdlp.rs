use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{FetchError, FetchedAsset, Fetcher};
use crate::audio::asset::StoredAsset;

/// Hosts aceptados por `/add`
const SUPPORTED_HOSTS: &[&str] = &[
    "youtube.com",
    "music.youtube.com",
    "youtu.be",
    "soundcloud.com",
    "snd.sc",
];

/// Descarga el audio con yt-dlp a un archivo mp3 en el directorio de caché
pub struct YtDlpFetcher {
    binary: String,
    cache_dir: PathBuf,
    max_filesize: String,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<String>, cache_dir: PathBuf, max_filesize: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            cache_dir,
            max_filesize: max_filesize.into(),
        }
    }

    /// Verifica que yt-dlp y ffmpeg estén disponibles
    pub async fn verify_dependencies(&self) -> Result<()> {
        let ytdlp_check = tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await;

        match ytdlp_check {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("✅ yt-dlp versión: {}", version.trim());
            }
            _ => {
                error!("❌ yt-dlp no encontrado. Instala con: pip install yt-dlp");
                anyhow::bail!("yt-dlp no disponible");
            }
        }

        // --extract-audio necesita ffmpeg
        let ffmpeg_check = tokio::process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .await;

        match ffmpeg_check {
            Ok(output) if output.status.success() => {
                info!("✅ ffmpeg disponible");
            }
            _ => {
                error!("❌ ffmpeg no encontrado. Instala con: sudo apt install ffmpeg");
                anyhow::bail!("ffmpeg no disponible");
            }
        }

        Ok(())
    }

    /// Verifica si el enlace apunta a una fuente soportada (YouTube o SoundCloud)
    pub fn is_supported_url(link: &str) -> bool {
        let Ok(parsed) = url::Url::parse(link) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }

        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host
            .strip_prefix("www.")
            .or_else(|| host.strip_prefix("m."))
            .unwrap_or(host);

        SUPPORTED_HOSTS.contains(&host)
    }

    /// Elimina archivos sobrantes del directorio de caché (descargas
    /// interrumpidas o canciones que nunca se reprodujeron)
    pub async fn purge_cache(&self) -> std::io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!("🧹 Caché de audio limpiada: {} archivos eliminados", removed);
        }
        Ok(removed)
    }

    /// Busca archivo de cookies disponible
    async fn find_cookies_file(&self) -> Option<String> {
        let cookies_paths = vec![
            format!("{}/.config/yt-dlp/cookies.txt", std::env::var("HOME").unwrap_or_default()),
            "/app/.config/yt-dlp/cookies.txt".to_string(),
            "./cookies.txt".to_string(),
        ];

        for path in cookies_paths {
            if tokio::fs::metadata(&path).await.is_ok() {
                debug!("🍪 Cookies encontradas en: {}", path);
                return Some(path);
            }
        }

        None
    }

    /// Borra lo que haya quedado de una descarga fallida
    async fn discard_partial(&self, id: &str) {
        let Ok(mut entries) = tokio::fs::read_dir(&self.cache_dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with(id) {
                if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                    warn!("⚠️ No se pudo borrar descarga parcial {}: {}", entry.path().display(), e);
                }
            }
        }
    }

    async fn download(&self, id: &str, link: &str) -> Result<FetchedAsset, FetchError> {
        let template = self.cache_dir.join(format!("{id}.%(ext)s"));
        let audio = self.cache_dir.join(format!("{id}.mp3"));
        let info = self.cache_dir.join(format!("{id}.info.json"));

        debug!("📁 El audio se guardará en: {}", audio.display());

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args([
            "--extract-audio",
            "--no-playlist",
            "--write-info-json",
            "--audio-format", "mp3",
            "--audio-quality", "0",
            "--max-filesize", self.max_filesize.as_str(),
            "--quiet",
            "--no-warnings",
        ]);

        if let Some(cookies) = self.find_cookies_file().await {
            cmd.args(["--cookies", cookies.as_str()]);
        }

        cmd.arg("-o").arg(&template).arg(link);
        cmd.kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .map_err(|e| FetchError::Internal(format!("no se pudo ejecutar {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp falló para {}: {}", link, stderr.trim());
            return Err(FetchError::Unavailable(stderr.trim().to_string()));
        }

        // --max-filesize hace que yt-dlp termine con éxito sin escribir nada
        if tokio::fs::metadata(&audio).await.is_err() {
            return Err(FetchError::Unavailable(
                "yt-dlp no produjo ningún archivo (¿demasiado grande?)".to_string(),
            ));
        }

        let blob = tokio::fs::read(&info)
            .await
            .map_err(|e| FetchError::Internal(format!("sidecar {}: {}", info.display(), e)))?;
        let (title, duration) = parse_info(&blob)?;

        Ok(FetchedAsset {
            stored: StoredAsset::new(audio, Some(info)),
            title,
            duration,
        })
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, source: &str) -> Result<FetchedAsset, FetchError> {
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| FetchError::Internal(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        info!("⬇️ Descargando: {}", source);

        match self.download(&id, source).await {
            Ok(fetched) => {
                info!(
                    "✅ Descarga completa: {}",
                    fetched.title.as_deref().unwrap_or(source)
                );
                Ok(fetched)
            }
            Err(e) => {
                self.discard_partial(&id).await;
                Err(e)
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Campos del `.info.json` que nos interesan
#[derive(Debug, Deserialize)]
struct InfoSidecar {
    title: Option<String>,
    duration: Option<f64>,
}

fn parse_info(blob: &[u8]) -> Result<(Option<String>, Option<Duration>), FetchError> {
    let info: InfoSidecar = serde_json::from_slice(blob)
        .map_err(|e| FetchError::Internal(format!("metadata inválida: {}", e)))?;

    let duration = info
        .duration
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    Ok((info.title, duration))
}
