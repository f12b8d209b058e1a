//! Error types surfaced by the engine.
//!
//! Rule violations are not errors: a command that breaks a game rule is
//! dropped and the caller gets the previous snapshot back. The variants here
//! cover structural misuse and configuration problems only.

use thiserror::Error;

/// Structural misuse of the command interface.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("the game is not in setup")]
    NotInSetup,

    #[error("there is no setup step to advance")]
    NoBlock,

    #[error("only the host ({host}) may advance setup")]
    NotHost { host: String },

    #[error("still waiting on {waiting} player(s) before setup can advance")]
    StillWaiting { waiting: usize },

    #[error("the game is over")]
    GameOver,

    #[error("unknown player '{0}'")]
    UnknownPlayer(String),

    #[error("invalid lobby: {0}")]
    InvalidLobby(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure to load or validate configuration and catalog data.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Clone for ConfigError {
    fn clone(&self) -> Self {
        match self {
            ConfigError::Io { path, source } => ConfigError::Io {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            ConfigError::Json(e) => ConfigError::Invalid(e.to_string()),
            ConfigError::Invalid(msg) => ConfigError::Invalid(msg.clone()),
        }
    }
}

impl PartialEq for ConfigError {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for ConfigError {}
