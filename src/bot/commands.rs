use anyhow::Result;
use regex::Regex;

use crate::sources::YtDlpFetcher;

/// Comando de texto ya interpretado
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add {
        links: Vec<String>,
        unsupported: Vec<String>,
    },
    Play,
    Pause,
    /// Sin argumento muestra el volumen actual
    Volume(Option<f32>),
    Skip,
    Clear,
    Queue,
    Help,
    /// Comando conocido con argumentos inválidos
    Invalid { command: &'static str, reason: String },
    Unknown(String),
}

/// Interpreta mensajes que empiezan con el prefijo configurado
pub struct CommandParser {
    prefix: String,
    link_regex: Regex,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        Ok(Self {
            prefix: prefix.into(),
            // Discord permite `<url>` para no generar vista previa
            link_regex: Regex::new(r"https?://[^\s<>]+")?,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `None` si el mensaje no es un comando
    pub fn parse(&self, content: &str) -> Option<Command> {
        let body = content.trim().strip_prefix(&self.prefix)?;
        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body, ""),
        };

        if name.is_empty() {
            return None;
        }

        let command = match name.to_lowercase().as_str() {
            "add" => self.parse_add(args),
            "play" => Command::Play,
            "pause" => Command::Pause,
            "volume" => parse_volume(args),
            "skip" => Command::Skip,
            "clear" => Command::Clear,
            "queue" => Command::Queue,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        };

        Some(command)
    }

    fn parse_add(&self, args: &str) -> Command {
        let (links, unsupported): (Vec<String>, Vec<String>) = self
            .link_regex
            .find_iter(args)
            .map(|m| m.as_str().to_string())
            .partition(|link| YtDlpFetcher::is_supported_url(link));

        if links.is_empty() && unsupported.is_empty() {
            return Command::Invalid {
                command: "add",
                reason: "No se encontraron enlaces en el mensaje".to_string(),
            };
        }

        Command::Add { links, unsupported }
    }
}

fn parse_volume(args: &str) -> Command {
    if args.is_empty() {
        return Command::Volume(None);
    }

    match args.parse::<f32>() {
        Ok(volume) => Command::Volume(Some(volume)),
        Err(_) => Command::Invalid {
            command: "volume",
            reason: format!("`{}` no es un número", args),
        },
    }
}
