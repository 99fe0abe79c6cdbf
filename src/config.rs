use std::path::PathBuf;

use clap::Parser;
use url::Url;

use crate::endpoint::{derive_ws_url, DEFAULT_PATH};
use crate::error::ClientError;

#[derive(Debug, Clone, Parser)]
#[command(name = "wsdemo", version, about = "Terminal WebSocket demo client")]
pub struct Config {
    /// Page origin the socket endpoint is derived from (https gives wss).
    #[arg(long, env = "WSDEMO_ORIGIN", default_value = "http://localhost:8000")]
    pub origin: Url,

    /// Endpoint path on the origin host.
    #[arg(long, env = "WSDEMO_PATH", default_value = DEFAULT_PATH)]
    pub path: String,

    /// Connect once at startup instead of waiting for `c`.
    #[arg(long, env = "WSDEMO_AUTO_CONNECT")]
    pub auto_connect: bool,

    /// Write diagnostics here. Without it they are discarded.
    #[arg(long, env = "WSDEMO_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn endpoint(&self) -> Result<Url, ClientError> {
        derive_ws_url(&self.origin, &self.path)
    }
}
