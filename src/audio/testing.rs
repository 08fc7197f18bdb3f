//! Dobles de prueba del jukebox: una fuente que escribe archivos falsos y un
//! reproductor que sólo registra lo que le piden.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, watch, Semaphore};

use super::{
    asset::{AssetSummary, StoredAsset},
    error::PlayerError,
    jukebox::JukeboxEvent,
    player::{PlaybackHandle, PlaybackState, PlayerBackend},
};
use crate::sources::{FetchError, FetchedAsset, Fetcher};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn expect_event(events: &mut mpsc::UnboundedReceiver<JukeboxEvent>) -> JukeboxEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timeout esperando evento del jukebox")
        .expect("canal de eventos cerrado")
}

/// Espera el próximo `Started` y verifica que sea `source`
pub async fn started(
    events: &mut mpsc::UnboundedReceiver<JukeboxEvent>,
    source: &str,
) -> AssetSummary {
    loop {
        if let JukeboxEvent::Started(asset) = expect_event(events).await {
            assert_eq!(asset.source, source, "arrancó otra canción");
            return asset;
        }
    }
}

/// Espera el próximo `Finished` y verifica que sea `source`
pub async fn finished(
    events: &mut mpsc::UnboundedReceiver<JukeboxEvent>,
    source: &str,
) -> AssetSummary {
    loop {
        if let JukeboxEvent::Finished(asset) = expect_event(events).await {
            assert_eq!(asset.source, source, "terminó otra canción");
            return asset;
        }
    }
}

fn file_stem(source: &str) -> &str {
    source.rsplit('/').next().unwrap_or(source)
}

/// Fuente falsa: escribe `<id>.mp3` + sidecar en un directorio temporal.
/// Cada enlace puede tener una compuerta que retiene la descarga.
pub struct FakeFetcher {
    dir: TempDir,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: watch::Sender<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dir: tempfile::tempdir().expect("tempdir"),
            gates: Mutex::new(HashMap::new()),
            calls: watch::channel(Vec::new()).0,
        })
    }

    /// Retiene la descarga de `source` hasta que se agregue un permiso
    pub fn gate(&self, source: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().insert(source.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub async fn wait_fetch_started(&self, source: &str) {
        let mut calls = self.calls.subscribe();
        tokio::time::timeout(EVENT_TIMEOUT, async {
            let _ = calls.wait_for(|calls| calls.iter().any(|c| c == source)).await;
        })
        .await
        .expect("timeout esperando la descarga");
    }

    pub fn path_of(&self, source: &str) -> PathBuf {
        self.dir.path().join(format!("{}.mp3", file_stem(source)))
    }

    pub fn files_on_disk(&self) -> usize {
        std::fs::read_dir(self.dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, source: &str) -> Result<FetchedAsset, FetchError> {
        self.calls.send_modify(|calls| calls.push(source.to_string()));

        let gate = self.gates.lock().get(source).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| FetchError::Internal(e.to_string()))?
                .forget();
        }

        let audio = self.path_of(source);
        let info = audio.with_extension("info.json");
        write(&audio, b"audio")?;
        write(&info, b"{}")?;

        Ok(FetchedAsset {
            stored: StoredAsset::new(audio, Some(info)),
            title: Some(file_stem(source).to_uppercase()),
            duration: Some(Duration::from_secs(180)),
        })
    }

    fn source_name(&self) -> &'static str {
        "fake"
    }
}

fn write(path: &Path, contents: &[u8]) -> Result<(), FetchError> {
    std::fs::write(path, contents).map_err(|e| FetchError::Internal(e.to_string()))
}

/// Reproductor falso. Lleva la cuenta de cuántos tracks suenan a la vez.
pub struct FakeBackend {
    auto_finish: Option<Duration>,
    disconnected: bool,
    load_gate: Option<Semaphore>,
    load_calls: watch::Sender<usize>,
    loaded: Mutex<Vec<PathBuf>>,
    handles: Mutex<Vec<Arc<FakeHandle>>>,
    playing: Arc<AtomicUsize>,
    max_playing: Arc<AtomicUsize>,
}

impl FakeBackend {
    fn build(auto_finish: Option<Duration>, disconnected: bool, gated: bool) -> Arc<Self> {
        Arc::new(Self {
            auto_finish,
            disconnected,
            load_gate: gated.then(|| Semaphore::new(0)),
            load_calls: watch::channel(0).0,
            loaded: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            playing: Arc::new(AtomicUsize::new(0)),
            max_playing: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Los tracks suenan hasta que alguien los detiene
    pub fn manual() -> Arc<Self> {
        Self::build(None, false, false)
    }

    /// Cada track termina solo después de `after`
    pub fn auto_finish(after: Duration) -> Arc<Self> {
        Self::build(Some(after), false, false)
    }

    /// Toda carga falla como si se hubiera caído la conexión de voz
    pub fn disconnected() -> Arc<Self> {
        Self::build(None, true, false)
    }

    /// Como `manual`, pero cada carga queda retenida hasta `release_load`
    pub fn gated() -> Arc<Self> {
        Self::build(None, false, true)
    }

    pub fn release_load(&self) {
        if let Some(gate) = &self.load_gate {
            gate.add_permits(1);
        }
    }

    /// Espera a que empiecen `count` cargas (retenidas o no)
    pub async fn wait_load_started(&self, count: usize) {
        let mut calls = self.load_calls.subscribe();
        tokio::time::timeout(EVENT_TIMEOUT, async {
            let _ = calls.wait_for(|started| *started >= count).await;
        })
        .await
        .expect("timeout esperando la carga");
    }

    pub fn loaded(&self) -> Vec<PathBuf> {
        self.loaded.lock().clone()
    }

    pub fn handle(&self, index: usize) -> Arc<FakeHandle> {
        self.handles.lock()[index].clone()
    }

    pub fn max_playing(&self) -> usize {
        self.max_playing.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerBackend for FakeBackend {
    async fn load(&self, audio: &Path, volume: f32) -> Result<Arc<dyn PlaybackHandle>, PlayerError> {
        if self.disconnected {
            return Err(PlayerError::Disconnected);
        }
        assert!(audio.exists(), "el archivo debe existir al cargarlo");

        self.load_calls.send_modify(|started| *started += 1);
        if let Some(gate) = &self.load_gate {
            gate.acquire()
                .await
                .map_err(|e| PlayerError::Track(e.to_string()))?
                .forget();
        }

        let handle = Arc::new(FakeHandle {
            initial_volume: volume,
            auto_finish: self.auto_finish,
            state: watch::channel(PlaybackState::Paused).0,
            ops: Mutex::new(Vec::new()),
            playing: self.playing.clone(),
            max_playing: self.max_playing.clone(),
        });

        self.loaded.lock().push(audio.to_path_buf());
        self.handles.lock().push(handle.clone());
        Ok(handle)
    }
}

pub struct FakeHandle {
    initial_volume: f32,
    auto_finish: Option<Duration>,
    state: watch::Sender<PlaybackState>,
    ops: Mutex<Vec<String>>,
    playing: Arc<AtomicUsize>,
    max_playing: Arc<AtomicUsize>,
}

impl FakeHandle {
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().clone()
    }

    pub fn initial_volume(&self) -> f32 {
        self.initial_volume
    }

    fn transition(&self, next: PlaybackState) {
        self.state.send_if_modified(|current| {
            if *current == next || *current == PlaybackState::Stopped {
                return false;
            }
            if *current == PlaybackState::Playing {
                self.playing.fetch_sub(1, Ordering::SeqCst);
            }
            if next == PlaybackState::Playing {
                let now = self.playing.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_playing.fetch_max(now, Ordering::SeqCst);
            }
            *current = next;
            true
        });
    }

    fn record(&self, op: String) {
        self.ops.lock().push(op);
    }
}

#[async_trait]
impl PlaybackHandle for FakeHandle {
    fn play(&self) -> Result<(), PlayerError> {
        self.record("play".to_string());
        self.transition(PlaybackState::Playing);
        Ok(())
    }

    fn pause(&self) -> Result<(), PlayerError> {
        self.record("pause".to_string());
        self.transition(PlaybackState::Paused);
        Ok(())
    }

    fn stop(&self) -> Result<(), PlayerError> {
        self.record("stop".to_string());
        self.transition(PlaybackState::Stopped);
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        self.record(format!("volume {volume}"));
        Ok(())
    }

    fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    async fn finished(&self) {
        let mut rx = self.state.subscribe();
        let stopped = async {
            let _ = rx.wait_for(|state| *state == PlaybackState::Stopped).await;
        };

        match self.auto_finish {
            Some(after) => tokio::select! {
                _ = tokio::time::sleep(after) => self.transition(PlaybackState::Stopped),
                _ = stopped => {}
            },
            None => stopped.await,
        }
    }
}
