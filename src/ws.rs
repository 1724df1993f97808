//! NIP-01 WebSocket transport.

use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{connection::Outbound, relay::Relay};

/// Start a WebSocket server feeding every connection into `relay`.
pub async fn serve_ws(
    addr: SocketAddr,
    relay: Arc<Relay>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "websocket relay listening");
    axum::serve(listener, router(relay).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn router(relay: Arc<Relay>) -> Router {
    Router::new().route("/", get(handler)).with_state(relay)
}

/// Handle the HTTP upgrade and spawn the connection processor.
async fn handler(ws: WebSocketUpgrade, State(relay): State<Arc<Relay>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move { process(socket, relay).await })
}

/// Adapts a socket's writer task to the relay's `Outbound` capability.
struct WsOutbound {
    tx: mpsc::UnboundedSender<Message>,
}

impl Outbound for WsOutbound {
    fn send(&self, text: String) {
        // The receiver is gone only once the writer has stopped.
        let _ = self.tx.send(Message::Text(text));
    }

    fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}

/// Pump frames between one socket and the relay until either side hangs up.
async fn process(socket: WebSocket, relay: Arc<Relay>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let conn = relay.on_connection_open(Box::new(WsOutbound { tx }));

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(txt) => {
                if let Err(e) = relay.on_message(conn, &txt) {
                    warn!(conn = %conn, "dropping frame: {e}");
                    if !e.is_parse_error() {
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Dropping the handler drops the sender, which ends the writer.
    relay.on_connection_close(conn);
    let _ = writer.await;
}
