use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlockError {
    #[error("flock must contain at least one agent")]
    EmptyFlock,

    #[error("invalid flock config: `{field}` {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    #[error("invalid spawn volume: {reason}")]
    InvalidSpawn { reason: &'static str },

    #[error("agent {index} has a non-finite position or velocity")]
    NonFiniteAgent { index: usize },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

pub type Result<T> = std::result::Result<T, FlockError>;
