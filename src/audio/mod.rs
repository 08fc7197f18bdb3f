//! # Audio Module
//!
//! Cola de reproducción del jukebox: una sola conexión de voz, una canción a
//! la vez, en el orden en que se pidieron.
//!
//! ## Architecture
//!
//! Cada canción pasa por dos colas antes de sonar:
//!
//! ```text
//! add ──> [descargas] ──worker de descargas──> [reproducción] ──worker de reproducción──> 🔊
//! ```
//!
//! ### [`jukebox`] - Coordinador
//! - Dueño de ambas colas y del track actual, detrás de un único lock
//! - Expone los controles: add, play, pause, volume, skip, clear
//!
//! ### [`workers`] - Tareas en segundo plano
//! - Descargas con backpressure: nunca más de `play_capacity` canciones
//!   descargadas esperando
//! - Reproducción estrictamente secuencial; cada archivo se borra al terminar
//!
//! ### [`player`] - Reproductor
//! - Abstracción sobre songbird para poder probar el coordinador sin Discord
//!
//! ### [`asset`] / [`queue`]
//! - La canción con sus archivos locales y la cola FIFO acotada

pub mod asset;
pub mod error;
pub mod jukebox;
pub mod player;
pub mod queue;
mod workers;

#[cfg(test)]
pub(crate) mod testing;

pub use asset::{AssetSummary, Submitter};
pub use jukebox::{Jukebox, JukeboxEvent, JukeboxSettings};
pub use player::SongbirdBackend;
