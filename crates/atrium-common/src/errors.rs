use thiserror::Error;

/// Top-level error for the host application. Lower crates define their own
/// focused enums; this wraps them at the façade boundary.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("event error: {0}")]
    Event(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("update error: {0}")]
    Update(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
