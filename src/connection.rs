//! Per-connection protocol state machine.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    error::RelayError,
    event::Event,
    message::{eose_frame, event_frame, ClientMessage},
    storage::EventStore,
    subscription::SubscriptionRegistry,
};

/// Relay-allocated identifier for a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability to push frames to one client, implemented by the transport.
///
/// Both calls must return without waiting on the peer: they run while the
/// relay state is locked.
pub trait Outbound: Send {
    /// Queue a text frame.
    fn send(&self, text: String);
    /// Ask the transport to close the connection.
    fn close(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// What a dispatched frame did.
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    /// A `REQ` was registered and replayed.
    Subscribed,
    /// A `CLOSE` was processed.
    Unsubscribed,
    /// A new event was appended and must be fanned out to every connection.
    Published(Arc<Event>),
    /// Unknown message type.
    Ignored,
}

/// Protocol handler for one client connection.
pub struct ConnectionHandler {
    id: ConnectionId,
    registry: SubscriptionRegistry,
    outbound: Box<dyn Outbound>,
    state: ConnectionState,
}

impl ConnectionHandler {
    pub fn new(id: ConnectionId, outbound: Box<dyn Outbound>) -> Self {
        Self {
            id,
            registry: SubscriptionRegistry::new(),
            outbound,
            state: ConnectionState::Open,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[cfg(test)]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Process one raw client frame against the shared store.
    pub fn dispatch(&mut self, raw: &str, store: &mut EventStore) -> Result<Dispatch, RelayError> {
        if self.state == ConnectionState::Closed {
            return Err(RelayError::ConnectionClosed(self.id));
        }
        match ClientMessage::parse(raw)? {
            ClientMessage::Req { sub_id, filters } => {
                let filters = self.registry.add(sub_id.clone(), filters);
                let mut replayed = 0usize;
                for event in store.query(filters) {
                    self.outbound.send(event_frame(&sub_id, event));
                    replayed += 1;
                }
                self.outbound.send(eose_frame(&sub_id));
                debug!(
                    conn = %self.id,
                    sub = %sub_id,
                    filters = filters.len(),
                    replayed,
                    "subscription registered"
                );
                Ok(Dispatch::Subscribed)
            }
            ClientMessage::Event(event) => {
                let event = store.append(event);
                debug!(conn = %self.id, id = %event.id, kind = event.kind, "event stored");
                Ok(Dispatch::Published(event))
            }
            ClientMessage::Close(sub_id) => {
                let existed = self.registry.remove(&sub_id);
                debug!(conn = %self.id, sub = %sub_id, existed, "subscription closed");
                Ok(Dispatch::Unsubscribed)
            }
            ClientMessage::Unknown(kind) => {
                debug!(conn = %self.id, kind = %kind, "ignoring unknown message type");
                Ok(Dispatch::Ignored)
            }
        }
    }

    /// Send `event` to every subscription on this connection that matches
    /// it. Returns the number of frames sent.
    pub fn deliver(&self, event: &Event) -> usize {
        if self.state == ConnectionState::Closed {
            return 0;
        }
        let mut sent = 0;
        for sub_id in self.registry.matching_sub_ids(event) {
            self.outbound.send(event_frame(sub_id, event));
            sent += 1;
        }
        sent
    }

    /// Ask the transport to hang up.
    pub fn close(&self) {
        self.outbound.close();
    }

    /// Drop all subscriptions and refuse further frames.
    pub fn on_close(&mut self) {
        self.registry.teardown();
        self.state = ConnectionState::Closed;
    }
}
