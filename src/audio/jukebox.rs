use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, Notify},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{
    asset::{Asset, AssetId, AssetSummary, Submitter},
    error::JukeboxError,
    player::{PlaybackHandle, PlaybackState, PlayerBackend},
    queue::BoundedQueue,
    workers,
};
use crate::sources::{FetchError, Fetcher};

/// Límites y valores iniciales del jukebox
#[derive(Debug, Clone)]
pub struct JukeboxSettings {
    pub default_volume: f32,
    /// `None` = cola de descargas sin límite
    pub download_capacity: Option<usize>,
    /// Canciones descargadas pendientes (en cola + sonando)
    pub play_capacity: usize,
}

impl Default for JukeboxSettings {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            download_capacity: Some(50),
            play_capacity: 10,
        }
    }
}

/// Notificaciones del ciclo de vida de las canciones
#[derive(Debug, Clone, PartialEq)]
pub enum JukeboxEvent {
    Started(AssetSummary),
    Finished(AssetSummary),
    FetchFailed {
        asset: AssetSummary,
        error: FetchError,
    },
    /// El jukebox se detuvo por un error fatal
    Halted(String),
}

/// Lo que está sonando (o por sonar): una cola de tamaño uno
pub(super) enum Slot {
    Idle,
    Loading {
        asset: AssetSummary,
        cancelled: bool,
    },
    Active {
        asset: AssetSummary,
        handle: Arc<dyn PlaybackHandle>,
    },
}

impl Slot {
    pub(super) fn is_occupied(&self) -> bool {
        !matches!(self, Slot::Idle)
    }

    fn summary(&self) -> Option<&AssetSummary> {
        match self {
            Slot::Idle => None,
            Slot::Loading { asset, .. } | Slot::Active { asset, .. } => Some(asset),
        }
    }

    fn handle(&self) -> Option<&Arc<dyn PlaybackHandle>> {
        match self {
            Slot::Active { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Detiene lo que suena, o marca la carga en curso para que no arranque
    fn interrupt(&mut self) -> bool {
        match self {
            Slot::Idle => false,
            Slot::Loading { cancelled, .. } => {
                *cancelled = true;
                true
            }
            Slot::Active { handle, .. } => {
                if handle.state() == PlaybackState::Stopped {
                    return false;
                }
                if let Err(e) = handle.stop() {
                    warn!("⚠️ Error al detener el track: {}", e);
                }
                true
            }
        }
    }
}

pub(super) struct JukeboxState {
    pub(super) volume: f32,
    pub(super) downloads: BoundedQueue<Asset>,
    pub(super) playlist: BoundedQueue<Asset>,
    pub(super) now_playing: Slot,
    pub(super) stopped: bool,
}

impl JukeboxState {
    /// Canciones descargadas que todavía no terminaron de sonar
    pub(super) fn outstanding(&self) -> usize {
        self.playlist.len() + usize::from(self.now_playing.is_occupied())
    }
}

/// Coordina la cola de descargas, la cola de reproducción y el reproductor.
///
/// Todo el estado mutable vive detrás de un único lock que nunca se retiene a
/// través de un `.await`. Dos workers en segundo plano drenan las colas:
/// el de descargas (que respeta la capacidad de la cola de reproducción) y el
/// de reproducción (estrictamente una canción a la vez).
pub struct Jukebox {
    pub(super) state: Mutex<JukeboxState>,
    pub(super) play_capacity: usize,
    /// Hay algo en la cola de descargas
    pub(super) downloads_ready: Notify,
    /// Se liberó lugar en la cola de reproducción
    pub(super) room_ready: Notify,
    /// Hay algo en la cola de reproducción
    pub(super) playlist_ready: Notify,
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) backend: Arc<dyn PlayerBackend>,
    pub(super) shutdown: CancellationToken,
    events: mpsc::UnboundedSender<JukeboxEvent>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Jukebox {
    /// Crea el jukebox y lanza sus dos workers
    pub fn start(
        fetcher: Arc<dyn Fetcher>,
        backend: Arc<dyn PlayerBackend>,
        settings: JukeboxSettings,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<JukeboxEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let play_capacity = settings.play_capacity.max(1);

        info!(
            "🎵 Iniciando jukebox (fuente: {}, descargas: {}, reproducción: {})",
            fetcher.source_name(),
            settings
                .download_capacity
                .map_or("sin límite".to_string(), |c| c.to_string()),
            play_capacity
        );

        let jukebox = Arc::new(Self {
            state: Mutex::new(JukeboxState {
                volume: settings.default_volume.clamp(0.0, 1.0),
                downloads: BoundedQueue::new(settings.download_capacity),
                playlist: BoundedQueue::new(None),
                now_playing: Slot::Idle,
                stopped: false,
            }),
            play_capacity,
            downloads_ready: Notify::new(),
            room_ready: Notify::new(),
            playlist_ready: Notify::new(),
            fetcher,
            backend,
            shutdown: CancellationToken::new(),
            events,
            workers: Mutex::new(Vec::new()),
        });

        let download = tokio::spawn(workers::download_worker(jukebox.clone()));
        let play = tokio::spawn(workers::play_worker(jukebox.clone()));
        jukebox.workers.lock().extend([download, play]);

        (jukebox, receiver)
    }

    /// Agrega una canción a la cola de descargas
    pub fn add(
        &self,
        source: impl Into<String>,
        submitter: Option<Submitter>,
    ) -> Result<AssetId, JukeboxError> {
        let asset = Asset::new(source, submitter);
        let id = asset.id();
        let link = asset.source().to_owned();

        let mut state = self.state.lock();
        if state.stopped {
            return Err(JukeboxError::Stopped);
        }
        state.downloads.push_back(asset)?;

        // Sólo la transición vacía -> un elemento despierta al worker
        if state.downloads.len() == 1 {
            self.downloads_ready.notify_one();
        }

        info!("➕ Agregado a la cola de descargas: {} {}", id, link);
        Ok(id)
    }

    /// Reanuda la reproducción pausada
    pub fn play(&self) -> bool {
        let state = self.state.lock();
        match state.now_playing.handle() {
            Some(handle) if handle.state() == PlaybackState::Paused => match handle.play() {
                Ok(()) => {
                    info!("▶️ Reproducción reanudada");
                    true
                }
                Err(e) => {
                    warn!("⚠️ No se pudo reanudar: {}", e);
                    false
                }
            },
            _ => false,
        }
    }

    /// Pausa la reproducción actual
    pub fn pause(&self) -> bool {
        let state = self.state.lock();
        match state.now_playing.handle() {
            Some(handle) if handle.state() == PlaybackState::Playing => match handle.pause() {
                Ok(()) => {
                    info!("⏸️ Reproducción pausada");
                    true
                }
                Err(e) => {
                    warn!("⚠️ No se pudo pausar: {}", e);
                    false
                }
            },
            _ => false,
        }
    }

    /// Ajusta el volumen (entre 0 y 1)
    pub fn set_volume(&self, volume: f32) -> Result<(), JukeboxError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(JukeboxError::VolumeOutOfRange(volume));
        }

        let mut state = self.state.lock();
        state.volume = volume;

        if let Some(handle) = state.now_playing.handle() {
            // Cambiar el volumen con el buffer en marcha produce un salto audible
            let result = if handle.state() == PlaybackState::Playing {
                handle
                    .pause()
                    .and_then(|_| handle.set_volume(volume))
                    .and_then(|_| handle.play())
            } else {
                handle.set_volume(volume)
            };

            if let Err(e) = result {
                warn!("⚠️ No se pudo aplicar el volumen al track actual: {}", e);
            }
        }

        info!("🔊 Volumen ajustado a {}%", (volume * 100.0).round() as u8);
        Ok(())
    }

    /// Salta la canción actual; el worker pasa sola a la siguiente
    pub fn skip(&self) -> bool {
        let skipped = self.state.lock().now_playing.interrupt();
        if skipped {
            info!("⏭️ Canción saltada");
        }
        skipped
    }

    /// Vacía la cola de reproducción y detiene la canción actual.
    ///
    /// La cola de descargas no se toca: lo que está pendiente o en curso
    /// termina de descargarse y aterriza en la cola ya vacía.
    pub async fn clear(&self) -> usize {
        let drained = {
            let mut state = self.state.lock();
            let was_full = state.outstanding() >= self.play_capacity;

            let drained = state.playlist.drain();
            state.now_playing.interrupt();

            if was_full && state.outstanding() < self.play_capacity {
                self.room_ready.notify_one();
            }
            drained
        };

        let count = drained.len();
        release_all(drained).await;

        info!("🗑️ Cola limpiada: {} canciones descartadas", count);
        count
    }

    /// Copia de la cola bajo un único lock: lo que suena (si hay algo) y la
    /// lista completa, que empieza por eso mismo, sigue con la cola de
    /// reproducción y termina con la de descargas
    pub fn list_queue(&self) -> (Option<AssetSummary>, Vec<AssetSummary>) {
        let state = self.state.lock();
        let now_playing = state.now_playing.summary().cloned();
        let entries = now_playing
            .iter()
            .cloned()
            .chain(state.playlist.iter().map(Asset::summary))
            .chain(state.downloads.iter().map(Asset::summary))
            .collect();
        (now_playing, entries)
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Detiene los workers y borra todos los archivos pendientes
    pub async fn shutdown(&self) {
        self.wind_down().await;

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            if let Err(e) = worker.await {
                error!("❌ Worker terminó con error: {:?}", e);
            }
        }

        info!("👋 Jukebox detenido");
    }

    /// Marca el jukebox como detenido, cancela los workers y libera lo que
    /// quedaba en cola. No espera a los workers.
    pub(super) async fn wind_down(&self) {
        let drained = {
            let mut state = self.state.lock();
            if state.stopped {
                Vec::new()
            } else {
                state.stopped = true;
                state.now_playing.interrupt();
                let mut drained = state.playlist.drain();
                drained.extend(state.downloads.drain());
                drained
            }
        };

        self.shutdown.cancel();
        release_all(drained).await;
    }

    pub(super) fn emit(&self, event: JukeboxEvent) {
        // Nadie escuchando no es un error
        let _ = self.events.send(event);
    }
}

/// Libera los archivos de canciones descartadas
pub(super) async fn release_all(assets: Vec<Asset>) {
    let releases = assets.into_iter().map(|asset| async move {
        let source = asset.source().to_owned();
        if let Err(e) = asset.release().await {
            error!("❌ Error interno liberando {}: {}", source, e);
        }
    });
    join_all(releases).await;
}
