use thiserror::Error;

#[derive(Debug, Error)]
pub enum DroverError {
    #[error("talk not found: {0}")]
    TalkNotFound(String),

    #[error("talk already exists: {0}")]
    TalkExists(String),

    #[error("invalid request kind: {0}")]
    InvalidKind(String),

    #[error("talk store fault: {0}")]
    Storage(String),

    #[error("invalid profile: {0}")]
    Profile(String),

    #[error("container runtime: {0}")]
    Runtime(String),

    #[error("tick history unavailable: {0}")]
    Pulse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DroverError>;
