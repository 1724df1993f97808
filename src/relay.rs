//! Server-level orchestration: the shared event log, the table of live
//! connections, and cross-connection fan-out.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    connection::{ConnectionHandler, ConnectionId, Dispatch, Outbound},
    error::RelayError,
    event::Event,
    storage::EventStore,
};

/// Point-in-time counters reported by `/healthz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub connections: usize,
    pub subscriptions: usize,
    pub events: usize,
}

#[derive(Default)]
struct RelayState {
    store: EventStore,
    connections: HashMap<ConnectionId, ConnectionHandler>,
    next_id: u64,
}

/// Owns the event log and every connection handler.
///
/// All dispatch happens under one lock, so a `REQ` replay and the fan-out
/// of an `EVENT` never interleave. A subscription sees each matching event
/// exactly once: from replay if it was stored before the `REQ` took the
/// lock, from fan-out otherwise.
#[derive(Default)]
pub struct Relay {
    state: Mutex<RelayState>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection whose frames go to `outbound`.
    pub fn on_connection_open(&self, outbound: Box<dyn Outbound>) -> ConnectionId {
        let mut state = self.state.lock();
        let id = ConnectionId(state.next_id);
        state.next_id += 1;
        state
            .connections
            .insert(id, ConnectionHandler::new(id, outbound));
        info!(conn = %id, live = state.connections.len(), "connection opened");
        id
    }

    /// Dispatch one raw frame received on connection `id`.
    pub fn on_message(&self, id: ConnectionId, raw: &str) -> Result<(), RelayError> {
        let mut state = self.state.lock();
        let RelayState {
            store, connections, ..
        } = &mut *state;
        let handler = connections
            .get_mut(&id)
            .ok_or(RelayError::ConnectionClosed(id))?;
        debug!(conn = %id, frame = raw, "frame received");
        if let Dispatch::Published(event) = handler.dispatch(raw, store)? {
            on_event_published(connections, &event);
        }
        Ok(())
    }

    /// Tear down and forget connection `id`. Unknown ids are ignored.
    pub fn on_connection_close(&self, id: ConnectionId) {
        let mut state = self.state.lock();
        if let Some(mut handler) = state.connections.remove(&id) {
            handler.on_close();
            info!(conn = %handler.id(), live = state.connections.len(), "connection closed");
        }
    }

    /// Ask every transport to close and drop all connections.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        let count = state.connections.len();
        for (_, mut handler) in state.connections.drain() {
            handler.close();
            handler.on_close();
        }
        info!(closed = count, "relay shut down");
    }

    pub fn stats(&self) -> RelayStats {
        let state = self.state.lock();
        RelayStats {
            connections: state.connections.len(),
            subscriptions: state
                .connections
                .values()
                .map(ConnectionHandler::subscription_count)
                .sum(),
            events: state.store.len(),
        }
    }
}

/// Deliver a freshly stored event to every matching subscription on every
/// live connection, the publisher included.
fn on_event_published(connections: &HashMap<ConnectionId, ConnectionHandler>, event: &Event) {
    let delivered: usize = connections
        .values()
        .map(|handler| handler.deliver(event))
        .sum();
    debug!(id = %event.id, delivered, "event fanned out");
}
