//! Server configuration from command-line flags and `CRM_*` environment variables.

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "clinic-crm-server", version, about = "Clinic CRM records server")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CRM_BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Directory holding the CSV data files
    #[arg(long, env = "CRM_DATA_DIR", default_value = "./clinic-data")]
    pub data_dir: PathBuf,

    /// Timeout for each step of a cascade delete, in milliseconds
    #[arg(long, env = "CRM_CALL_TIMEOUT_MS", default_value_t = 10_000)]
    pub call_timeout_ms: u64,

    /// Origin allowed to call the API from a browser
    #[arg(long, env = "CRM_CORS_ORIGIN", default_value = "http://localhost:8080")]
    pub cors_origin: String,

    /// Symbol prefixed to formatted report totals
    #[arg(long, env = "CRM_CURRENCY_SYMBOL", default_value = "₹")]
    pub currency_symbol: String,
}

impl Config {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn cors_origin_header(&self) -> Result<HeaderValue> {
        self.cors_origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {}", self.cors_origin))
    }
}
