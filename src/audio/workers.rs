use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    asset::{Asset, AssetId, AssetSummary},
    error::PlayerError,
    jukebox::{Jukebox, JukeboxEvent, Slot},
    player::PlaybackHandle,
};
use crate::sources::{FetchError, FetchedAsset};

/// Worker de descargas: toma el frente de la cola de descargas, lo descarga
/// fuera del lock y lo pasa a la cola de reproducción. Nunca descarga si la
/// cola de reproducción (más lo que suena) está llena.
pub(super) async fn download_worker(jukebox: Arc<Jukebox>) {
    info!("⬇️ Worker de descargas iniciado");

    loop {
        let (id, source) = tokio::select! {
            _ = jukebox.shutdown.cancelled() => break,
            next = jukebox.next_download() => next,
        };

        debug!("⬇️ Descargando {} {}", id, source);
        // Al cancelar se suelta el future y yt-dlp muere con él
        let result = tokio::select! {
            _ = jukebox.shutdown.cancelled() => break,
            result = jukebox.fetcher.fetch(&source) => result,
        };

        jukebox.commit_download(id, result).await;
    }

    info!("⬇️ Worker de descargas detenido");
}

/// Worker de reproducción: una canción a la vez, en orden
pub(super) async fn play_worker(jukebox: Arc<Jukebox>) {
    info!("🎧 Worker de reproducción iniciado");

    loop {
        let (asset, volume) = tokio::select! {
            _ = jukebox.shutdown.cancelled() => break,
            next = jukebox.next_track() => next,
        };

        if let Err(e) = jukebox.play_track(asset, volume).await {
            error!("💥 Reproductor inutilizable: {}", e);
            jukebox.emit(JukeboxEvent::Halted(e.to_string()));
            jukebox.wind_down().await;
            break;
        }
    }

    info!("🎧 Worker de reproducción detenido");
}

enum Commit {
    Queued(AssetSummary),
    Failed(AssetSummary, FetchError),
    /// La canción salió de la cola mientras se descargaba
    Orphaned(Option<FetchedAsset>),
}

impl Jukebox {
    /// Espera lugar en la cola de reproducción y algo para descargar.
    /// Devuelve el frente sin sacarlo: sigue visible en `list_queue`.
    async fn next_download(&self) -> (AssetId, String) {
        loop {
            let signal = {
                let state = self.state.lock();
                if state.outstanding() >= self.play_capacity {
                    debug!("⏳ Cola de reproducción llena, esperando lugar");
                    &self.room_ready
                } else if let Some(asset) = state.downloads.front() {
                    return (asset.id(), asset.source().to_owned());
                } else {
                    &self.downloads_ready
                }
            };
            // Notify guarda el permiso si la señal llegó antes de esperar
            signal.notified().await;
        }
    }

    async fn commit_download(&self, id: AssetId, result: Result<FetchedAsset, FetchError>) {
        let commit = {
            let mut state = self.state.lock();
            let is_front = state.downloads.front().is_some_and(|asset| asset.id() == id);

            if state.stopped || !is_front {
                Commit::Orphaned(result.ok())
            } else if let Some(mut asset) = state.downloads.pop_front() {
                match result {
                    Ok(fetched) => {
                        asset.attach(fetched);
                        let summary = asset.summary();
                        state.playlist.push_unchecked(asset);
                        if state.playlist.len() == 1 {
                            self.playlist_ready.notify_one();
                        }
                        Commit::Queued(summary)
                    }
                    Err(error) => Commit::Failed(asset.summary(), error),
                }
            } else {
                Commit::Orphaned(result.ok())
            }
        };

        match commit {
            Commit::Queued(summary) => {
                info!("✅ Descargado: {}", summary.display_title());
            }
            Commit::Failed(summary, error) => {
                match &error {
                    FetchError::Unavailable(reason) => {
                        warn!("⚠️ No se pudo descargar {}: {}", summary.source, reason)
                    }
                    FetchError::Internal(reason) => {
                        error!("❌ Error interno descargando {}: {}", summary.source, reason)
                    }
                }
                self.emit(JukeboxEvent::FetchFailed {
                    asset: summary,
                    error,
                });
            }
            Commit::Orphaned(fetched) => {
                debug!("🗑️ Descarga {} descartada: ya no está en cola", id);
                if let Some(fetched) = fetched {
                    if let Err(e) = fetched.stored.release().await {
                        error!("❌ Error interno liberando descarga huérfana: {}", e);
                    }
                }
            }
        }
    }

    /// Saca la siguiente canción y ocupa el slot de reproducción con ella
    async fn next_track(&self) -> (Asset, f32) {
        loop {
            {
                let mut state = self.state.lock();
                if !state.stopped {
                    if let Some(asset) = state.playlist.pop_front() {
                        state.now_playing = Slot::Loading {
                            asset: asset.summary(),
                            cancelled: false,
                        };
                        return (asset, state.volume);
                    }
                }
            }
            self.playlist_ready.notified().await;
        }
    }

    /// Reproduce una canción hasta el final (o hasta que la detengan) y la
    /// libera. Sólo devuelve error si el reproductor quedó inutilizable.
    async fn play_track(&self, asset: Asset, volume: f32) -> Result<(), PlayerError> {
        let summary = asset.summary();
        let outcome = self.stream(&asset, &summary, volume).await;

        // Pase lo que pase, el archivo se borra antes de soltar el slot
        if let Err(e) = asset.release().await {
            error!("❌ Error interno liberando {}: {}", summary.source, e);
        }
        self.finish_track(&summary);

        match outcome {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("⚠️ Falló la reproducción de {}: {}", summary.display_title(), e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    async fn stream(
        &self,
        asset: &Asset,
        summary: &AssetSummary,
        volume: f32,
    ) -> Result<(), PlayerError> {
        let Some(audio) = asset.audio_path() else {
            return Err(PlayerError::Track(format!(
                "{} no tiene archivo local",
                summary.source
            )));
        };

        let handle = self.backend.load(audio, volume).await?;

        if !self.install(summary, &handle, volume)? {
            info!("⏭️ {} descartada antes de empezar", summary.display_title());
            stop_track(handle.as_ref());
            return Ok(());
        }

        info!("🎵 Reproduciendo: {}", summary.display_title());
        self.emit(JukeboxEvent::Started(summary.clone()));

        tokio::select! {
            _ = handle.finished() => {}
            _ = self.shutdown.cancelled() => stop_track(handle.as_ref()),
        }
        Ok(())
    }

    /// Arranca el track y lo deja visible para los controles, bajo el lock.
    /// `false` si lo saltaron mientras cargaba.
    fn install(
        &self,
        summary: &AssetSummary,
        handle: &Arc<dyn PlaybackHandle>,
        loaded_volume: f32,
    ) -> Result<bool, PlayerError> {
        let mut state = self.state.lock();
        if state.stopped || matches!(state.now_playing, Slot::Loading { cancelled: true, .. }) {
            return Ok(false);
        }

        // El volumen pudo cambiar durante la carga
        if state.volume != loaded_volume {
            handle.set_volume(state.volume)?;
        }
        handle.play()?;

        state.now_playing = Slot::Active {
            asset: summary.clone(),
            handle: handle.clone(),
        };
        Ok(true)
    }

    fn finish_track(&self, summary: &AssetSummary) {
        {
            let mut state = self.state.lock();
            let was_full = state.outstanding() >= self.play_capacity;
            state.now_playing = Slot::Idle;
            if was_full {
                self.room_ready.notify_one();
            }
        }

        debug!("✅ Terminó: {}", summary.display_title());
        self.emit(JukeboxEvent::Finished(summary.clone()));
    }
}

fn stop_track(handle: &dyn PlaybackHandle) {
    if let Err(e) = handle.stop() {
        warn!("⚠️ Error al detener el track: {}", e);
    }
}
