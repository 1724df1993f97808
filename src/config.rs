//! Configuration loading from `.env` files.

use std::{env, net::SocketAddr, path::Path};

use anyhow::{Context, Result};

/// WebSocket bind address used when `BIND_WS` is unset.
pub const DEFAULT_BIND_WS: &str = "127.0.0.1:4001";

/// Runtime settings derived from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// WebSocket bind address, e.g. `127.0.0.1:4001`.
    pub bind_ws: String,
    /// Optional HTTP bind address for `/healthz` and relay info.
    pub bind_http: Option<String>,
    /// Name advertised in the relay information document.
    pub relay_name: String,
    pub relay_description: String,
}

impl Settings {
    /// Load settings from the specified `.env` file, if it exists, layered
    /// over the process environment.
    pub fn from_env(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path).context("reading env file")?;
        }
        let bind_ws = non_empty(env::var("BIND_WS").ok()).unwrap_or_else(|| DEFAULT_BIND_WS.into());
        let bind_http = non_empty(env::var("BIND_HTTP").ok());
        let relay_name =
            non_empty(env::var("RELAY_NAME").ok()).unwrap_or_else(|| env!("CARGO_PKG_NAME").into());
        let relay_description = env::var("RELAY_DESCRIPTION").unwrap_or_default();
        Ok(Self {
            bind_ws,
            bind_http,
            relay_name,
            relay_description,
        })
    }

    /// Parsed WebSocket address, with the port replaced by `port` if given.
    pub fn ws_addr(&self, port: Option<u16>) -> Result<SocketAddr> {
        let mut addr: SocketAddr = self
            .bind_ws
            .parse()
            .with_context(|| format!("invalid BIND_WS address {:?}", self.bind_ws))?;
        if let Some(port) = port {
            addr.set_port(port);
        }
        Ok(addr)
    }

    /// Parsed HTTP address, if one is configured.
    pub fn http_addr(&self) -> Result<Option<SocketAddr>> {
        self.bind_http
            .as_deref()
            .map(|s| {
                s.parse::<SocketAddr>()
                    .with_context(|| format!("invalid BIND_HTTP address {s:?}"))
            })
            .transpose()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
