pub mod ytdlp;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::audio::asset::StoredAsset;

pub use ytdlp::YtDlpFetcher;

/// Resultado de una descarga exitosa
#[derive(Debug, PartialEq)]
pub struct FetchedAsset {
    pub stored: StoredAsset,
    pub title: Option<String>,
    pub duration: Option<Duration>,
}

/// Por qué no se pudo obtener una canción
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    /// La herramienta externa falló o rechazó el enlace (no disponible,
    /// demasiado grande, formato no soportado...)
    #[error("No se pudo obtener audio del enlace: {0}")]
    Unavailable(String),

    /// Fallo nuestro: metadata ilegible, error de disco...
    #[error("Error interno: {0}")]
    Internal(String),
}

impl FetchError {
    /// Mensaje apto para mostrar al usuario
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Unavailable(_) => "No se pudo obtener audio del enlace indicado.",
            FetchError::Internal(_) => "Ocurrió un error interno procesando la canción.",
        }
    }
}

/// Convierte una referencia (enlace) en un archivo local reproducible
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &str) -> Result<FetchedAsset, FetchError>;

    /// Nombre de la fuente
    fn source_name(&self) -> &'static str;
}
