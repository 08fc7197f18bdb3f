use thiserror::Error;

/// Errores de las operaciones de control del jukebox
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JukeboxError {
    #[error("La cola de descargas está llena (máximo {capacity} canciones)")]
    QueueFull { capacity: usize },

    #[error("El volumen debe estar entre 0 y 1, se recibió {0}")]
    VolumeOutOfRange(f32),

    #[error("El jukebox está detenido")]
    Stopped,
}

/// Errores del reproductor de voz
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlayerError {
    /// La conexión de voz se perdió; nada de lo que quede en cola podrá sonar.
    #[error("Conexión de voz perdida")]
    Disconnected,

    #[error("Error del track: {0}")]
    Track(String),
}

impl PlayerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlayerError::Disconnected)
    }
}
