//! Command line entry point for the relay. Serves NIP-01 over WebSocket from
//! an in-memory event log, plus optional HTTP health and relay info
//! endpoints.

mod config;
mod connection;
mod error;
mod event;
mod filter;
mod message;
mod relay;
mod server;
mod storage;
mod subscription;
mod ws;

use std::sync::Arc;

use clap::Parser;
use config::Settings;
use futures_util::FutureExt;
use relay::Relay;
use server::RelayInfo;
use tracing::info;

/// Command line interface entry point.
#[derive(Parser, Debug)]
#[command(name = "relaylite", author, version, about = "In-memory Nostr relay")]
struct Cli {
    /// Path to the `.env` configuration file.
    #[arg(long, default_value = ".env")]
    env: String,
    /// WebSocket port; overrides the port of `BIND_WS`.
    #[arg(short, long)]
    port: Option<u16>,
}

/// Load settings and serve until Ctrl-C.
#[cfg(not(test))]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = Settings::from_env(&cli.env)?;
    serve(cfg, cli.port).await
}

async fn serve(cfg: Settings, port: Option<u16>) -> anyhow::Result<()> {
    let ws_addr = cfg.ws_addr(port)?;
    let http_addr = cfg.http_addr()?;
    let relay = Arc::new(Relay::new());

    let relay_shutdown = relay.clone();
    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
        relay_shutdown.shutdown();
    }
    .shared();

    match http_addr {
        Some(http_addr) => {
            let info = RelayInfo::new(cfg.relay_name.clone(), cfg.relay_description.clone());
            tokio::try_join!(
                server::serve_http(http_addr, relay.clone(), info, shutdown.clone()),
                ws::serve_ws(ws_addr, relay, shutdown)
            )?;
        }
        None => ws::serve_ws(ws_addr, relay, shutdown).await?,
    }
    Ok(())
}

#[cfg(not(test))]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["relaylite"]).unwrap();
        assert_eq!(cli.env, ".env");
        assert!(cli.port.is_none());
    }

    #[test]
    fn cli_port_flags() {
        let cli = Cli::try_parse_from(["relaylite", "-p", "4100"]).unwrap();
        assert_eq!(cli.port, Some(4100));
        let cli = Cli::try_parse_from(["relaylite", "--port", "4200", "--env", "x.env"]).unwrap();
        assert_eq!(cli.port, Some(4200));
        assert_eq!(cli.env, "x.env");
    }

    #[test]
    fn cli_rejects_bad_port() {
        assert!(Cli::try_parse_from(["relaylite", "--port", "http"]).is_err());
        assert!(Cli::try_parse_from(["relaylite", "--port", "70000"]).is_err());
    }

    fn settings(bind_ws: &str, bind_http: Option<&str>) -> Settings {
        Settings {
            bind_ws: bind_ws.into(),
            bind_http: bind_http.map(Into::into),
            relay_name: "r".into(),
            relay_description: String::new(),
        }
    }

    #[tokio::test]
    async fn serve_fails_when_ws_port_is_taken() {
        let busy = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = busy.local_addr().unwrap().port();
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            serve(settings("127.0.0.1:0", None), Some(port)),
        )
        .await
        .expect("serve did not return");
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn serve_fails_when_http_port_is_taken() {
        let busy = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let http = busy.local_addr().unwrap().to_string();
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            serve(settings("127.0.0.1:0", Some(&http)), None),
        )
        .await
        .expect("serve did not return");
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn serve_rejects_invalid_address() {
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            serve(settings("nowhere", None), None),
        )
        .await
        .expect("serve did not return");
        assert!(res.is_err());
    }
}
