/// Failures of a single remote call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed rpc message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Remote(String),
    #[error("connection to debugger server closed")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, Error>;
