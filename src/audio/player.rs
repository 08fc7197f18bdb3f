use async_trait::async_trait;
use songbird::{
    input::{File as FileInput, Input},
    tracks::{Track, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use std::{path::Path, sync::Arc};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};

use super::error::PlayerError;

/// Estado observable de una sesión de reproducción
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// Sesión de reproducción viva, ligada a un único archivo.
///
/// Los métodos de control no bloquean: sólo encolan el comando en el driver,
/// por eso se pueden llamar con el lock del jukebox tomado. `finished` es el
/// único punto de espera y retorna tanto al terminar el audio como tras `stop`.
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Inicia o reanuda
    fn play(&self) -> Result<(), PlayerError>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn stop(&self) -> Result<(), PlayerError>;
    fn set_volume(&self, volume: f32) -> Result<(), PlayerError>;
    fn state(&self) -> PlaybackState;
    async fn finished(&self);
}

/// Crea sesiones de reproducción sobre la conexión de voz
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    /// Carga el archivo en pausa con el volumen indicado
    async fn load(&self, audio: &Path, volume: f32) -> Result<Arc<dyn PlaybackHandle>, PlayerError>;
}

/// Backend sobre una llamada de voz de songbird
pub struct SongbirdBackend {
    call: Arc<Mutex<Call>>,
}

impl SongbirdBackend {
    pub fn new(call: Arc<Mutex<Call>>) -> Self {
        Self { call }
    }
}

#[async_trait]
impl PlayerBackend for SongbirdBackend {
    async fn load(&self, audio: &Path, volume: f32) -> Result<Arc<dyn PlaybackHandle>, PlayerError> {
        let input = Input::from(FileInput::new(audio.to_path_buf()));
        let track = Track::new(input).volume(volume).pause();

        let track_handle = {
            let mut call = self.call.lock().await;
            if call.current_connection().is_none() {
                error!("❌ La llamada de voz no tiene conexión activa");
                return Err(PlayerError::Disconnected);
            }
            call.play(track)
        };

        let (state_tx, _) = watch::channel(PlaybackState::Paused);
        let state = Arc::new(state_tx);

        // Registrar event handlers para detectar el final del track
        for event in [TrackEvent::End, TrackEvent::Error] {
            track_handle
                .add_event(
                    Event::Track(event),
                    TrackStopHandler {
                        state: state.clone(),
                    },
                )
                .map_err(|e| PlayerError::Track(format!("Error al agregar event handler: {}", e)))?;
        }

        debug!("🎼 Track cargado: {}", audio.display());
        Ok(Arc::new(SongbirdHandle {
            track: track_handle,
            state,
        }))
    }
}

struct SongbirdHandle {
    track: TrackHandle,
    state: Arc<watch::Sender<PlaybackState>>,
}

impl SongbirdHandle {
    /// Cambia el estado salvo que el track ya haya terminado
    fn transition(&self, next: PlaybackState) {
        self.state.send_if_modified(|current| {
            if *current == PlaybackState::Stopped || *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[async_trait]
impl PlaybackHandle for SongbirdHandle {
    fn play(&self) -> Result<(), PlayerError> {
        self.track
            .play()
            .map_err(|e| PlayerError::Track(e.to_string()))?;
        self.transition(PlaybackState::Playing);
        Ok(())
    }

    fn pause(&self) -> Result<(), PlayerError> {
        self.track
            .pause()
            .map_err(|e| PlayerError::Track(e.to_string()))?;
        self.transition(PlaybackState::Paused);
        Ok(())
    }

    fn stop(&self) -> Result<(), PlayerError> {
        // Un track que ya terminó no acepta comandos; igual queda detenido
        let result = self.track.stop().map_err(|e| PlayerError::Track(e.to_string()));
        self.state.send_replace(PlaybackState::Stopped);
        result
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        self.track
            .set_volume(volume)
            .map_err(|e| PlayerError::Track(e.to_string()))
    }

    fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    async fn finished(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == PlaybackState::Stopped).await;
    }
}

/// Handler para cuando termina (o falla) un track
struct TrackStopHandler {
    state: Arc<watch::Sender<PlaybackState>>,
}

#[async_trait]
impl VoiceEventHandler for TrackStopHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                debug!("Track terminado: {:?}", state.playing);
            }
        }

        self.state.send_replace(PlaybackState::Stopped);
        info!("⏹️ Track finalizado");

        None
    }
}
