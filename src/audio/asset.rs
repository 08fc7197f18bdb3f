use chrono::{DateTime, Utc};
use serenity::model::id::{ChannelId, UserId};
use std::{
    fmt,
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::{debug, warn};

use crate::sources::FetchedAsset;

static NEXT_ASSET_ID: AtomicU64 = AtomicU64::new(1);

/// Identificador único de un asset dentro del proceso
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    fn next() -> Self {
        Self(NEXT_ASSET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Quién pidió la canción y dónde contestarle
#[derive(Debug, Clone, PartialEq)]
pub struct Submitter {
    pub user_id: UserId,
    pub name: String,
    pub channel_id: ChannelId,
}

/// Archivos locales producidos por una descarga exitosa.
///
/// Mientras exista un `StoredAsset` los archivos se consideran vivos; `release`
/// los consume y los borra del disco.
#[derive(Debug, PartialEq)]
pub struct StoredAsset {
    audio: PathBuf,
    info: Option<PathBuf>,
}

impl StoredAsset {
    pub fn new(audio: PathBuf, info: Option<PathBuf>) -> Self {
        Self { audio, info }
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio
    }

    /// Borra el audio y el sidecar. Un archivo que ya no existe no es error.
    pub async fn release(self) -> io::Result<()> {
        remove_if_present(&self.audio).await?;
        if let Some(info) = &self.info {
            remove_if_present(info).await?;
        }
        debug!("🗑️ Archivos liberados: {}", self.audio.display());
        Ok(())
    }
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("⚠️ Archivo ya eliminado: {}", path.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Una canción en cualquier punto de su ciclo de vida
#[derive(Debug)]
pub struct Asset {
    id: AssetId,
    source: String,
    submitter: Option<Submitter>,
    submitted_at: DateTime<Utc>,
    stored: Option<StoredAsset>,
    title: Option<String>,
    duration: Option<Duration>,
}

impl Asset {
    pub fn new(source: impl Into<String>, submitter: Option<Submitter>) -> Self {
        Self {
            id: AssetId::next(),
            source: source.into(),
            submitter,
            submitted_at: Utc::now(),
            stored: None,
            title: None,
            duration: None,
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn audio_path(&self) -> Option<&Path> {
        self.stored.as_ref().map(StoredAsset::audio_path)
    }

    #[cfg(test)]
    pub fn is_stored(&self) -> bool {
        self.stored.is_some()
    }

    /// Incorpora el resultado de una descarga exitosa
    pub fn attach(&mut self, fetched: FetchedAsset) {
        self.stored = Some(fetched.stored);
        self.title = fetched.title;
        self.duration = fetched.duration;
    }

    /// Libera los archivos locales, si los hay. Consume el asset: después de
    /// esto la canción ya no existe en ninguna cola.
    pub async fn release(mut self) -> io::Result<()> {
        match self.stored.take() {
            Some(stored) => stored.release().await,
            None => Ok(()),
        }
    }

    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            id: self.id,
            source: self.source.clone(),
            submitter: self.submitter.clone(),
            submitted_at: self.submitted_at,
            title: self.title.clone(),
            duration: self.duration,
        }
    }
}

/// Copia inmutable de un asset para listados y eventos
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSummary {
    pub id: AssetId,
    pub source: String,
    pub submitter: Option<Submitter>,
    pub submitted_at: DateTime<Utc>,
    pub title: Option<String>,
    pub duration: Option<Duration>,
}

impl AssetSummary {
    /// Título si ya se conoce, si no el enlace
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.source)
    }
}

impl fmt::Display for AssetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "Title: {}", title)?;
        }
        if let Some(duration) = self.duration {
            let whole = Duration::from_secs(duration.as_secs());
            writeln!(f, "Duration: {}", humantime::format_duration(whole))?;
        }
        if let Some(submitter) = &self.submitter {
            writeln!(f, "Sender: {}", submitter.name)?;
        }
        write!(f, "URL: {}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fetched(dir: &Path, name: &str) -> FetchedAsset {
        let audio = dir.join(format!("{name}.mp3"));
        let info = dir.join(format!("{name}.info.json"));
        std::fs::write(&audio, b"audio").unwrap();
        std::fs::write(&info, b"{}").unwrap();
        FetchedAsset {
            stored: StoredAsset::new(audio, Some(info)),
            title: Some("Never Gonna Give You Up".to_string()),
            duration: Some(Duration::from_secs_f64(212.4)),
        }
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = Asset::new("https://youtu.be/a", None);
        let b = Asset::new("https://youtu.be/b", None);
        assert!(b.id() > a.id());
    }

    #[test]
    fn attach_populates_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mut asset = Asset::new("https://youtu.be/dQw4w9WgXcQ", None);
        assert!(!asset.is_stored());
        assert_eq!(asset.summary().display_title(), "https://youtu.be/dQw4w9WgXcQ");

        asset.attach(fetched(dir.path(), "song"));

        assert!(asset.is_stored());
        assert_eq!(asset.audio_path(), Some(dir.path().join("song.mp3").as_path()));
        assert_eq!(asset.summary().display_title(), "Never Gonna Give You Up");
    }

    #[tokio::test]
    async fn release_removes_files_and_tolerates_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let mut asset = Asset::new("https://youtu.be/dQw4w9WgXcQ", None);
        asset.attach(fetched(dir.path(), "song"));

        // Alguien ya borró el audio
        std::fs::remove_file(dir.path().join("song.mp3")).unwrap();

        asset.release().await.unwrap();
        assert!(!dir.path().join("song.info.json").exists());
    }

    #[test]
    fn summary_display_lists_known_fields() {
        let summary = AssetSummary {
            id: AssetId(7),
            source: "https://youtu.be/x".to_string(),
            submitter: Some(Submitter {
                user_id: UserId::new(1),
                name: "alice".to_string(),
                channel_id: ChannelId::new(2),
            }),
            submitted_at: Utc::now(),
            title: Some("Song".to_string()),
            duration: Some(Duration::from_millis(212_400)),
        };

        assert_eq!(
            summary.to_string(),
            "Title: Song\nDuration: 3m 32s\nSender: alice\nURL: https://youtu.be/x"
        );
    }
}
