use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("origin `{0}` has no host")]
    MissingHost(String),

    #[error("unsupported scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("no async runtime to drive the socket: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    #[error("transport is closed")]
    TransportClosed,

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
