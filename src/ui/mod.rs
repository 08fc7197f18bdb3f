//! Respuestas visuales del bot (embeds de Discord)

pub mod embeds;
