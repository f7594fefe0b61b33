//! Render transport: the live bidirectional channel between client and server
//!
//! The transport is best-effort and order-preserving per channel: events with
//! no registered listener are dropped silently (they may belong to a request
//! that already timed out), and delivery order matches send order on each
//! direction. The renderer holds an `Option<Arc<dyn Transport>>`; `None` is
//! the explicit "absent" variant for non-dev builds, in which case sends must
//! fail synchronously.

use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handler invoked with the payload of a named event
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Bidirectional, best-effort message channel carrying named JSON events
pub trait Transport: Send + Sync {
    /// Register a handler for a named event
    fn on(&self, event: &str, handler: EventHandler);

    /// Send a named event to the peer. Best-effort: a missing listener on the
    /// other side is not an error.
    fn send(&self, event: &str, payload: Value) -> Result<()>;
}

type HandlerTable = Arc<Mutex<HashMap<String, Vec<EventHandler>>>>;

fn table_guard(table: &HandlerTable) -> MutexGuard<'_, HashMap<String, Vec<EventHandler>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process transport endpoint; created in connected pairs.
///
/// Delivery is synchronous on the sender's thread, which preserves per-channel
/// ordering. Handlers are invoked outside the registry lock so a handler may
/// itself send events or register listeners without deadlocking.
pub struct ChannelTransport {
    local: HandlerTable,
    peer: HandlerTable,
}

impl ChannelTransport {
    /// Create two connected endpoints (client side, server side)
    pub fn pair() -> (Arc<ChannelTransport>, Arc<ChannelTransport>) {
        let a: HandlerTable = Arc::new(Mutex::new(HashMap::new()));
        let b: HandlerTable = Arc::new(Mutex::new(HashMap::new()));
        let client = Arc::new(ChannelTransport {
            local: Arc::clone(&a),
            peer: Arc::clone(&b),
        });
        let server = Arc::new(ChannelTransport { local: b, peer: a });
        (client, server)
    }
}

impl Transport for ChannelTransport {
    fn on(&self, event: &str, handler: EventHandler) {
        table_guard(&self.local)
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn send(&self, event: &str, payload: Value) -> Result<()> {
        let handlers: Vec<EventHandler> = table_guard(&self.peer)
            .get(event)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            log::debug!("no listener for event {event:?}; dropped");
            return Ok(());
        }

        for handler in handlers {
            handler(&payload);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pair_delivers_events_to_the_peer() {
        let (client, server) = ChannelTransport::pair();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        server.on(
            "ping",
            Arc::new(move |payload| {
                seen_clone.lock().unwrap().push(payload.clone());
            }),
        );

        client.send("ping", json!({ "n": 1 })).unwrap();
        client.send("ping", json!({ "n": 2 })).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        // Order-preserving per channel
        assert_eq!(seen[0]["n"], 1);
        assert_eq!(seen[1]["n"], 2);
    }

    #[test]
    fn events_without_listener_are_dropped_silently() {
        let (client, _server) = ChannelTransport::pair();
        assert!(client.send("nobody-home", json!({})).is_ok());
    }

    #[test]
    fn handler_may_send_back_on_its_own_endpoint() {
        let (client, server) = ChannelTransport::pair();

        let server_out = Arc::clone(&server);
        server.on(
            "ping",
            Arc::new(move |_payload| {
                server_out.send("pong", json!({})).unwrap();
            }),
        );

        let ponged = Arc::new(Mutex::new(false));
        let ponged_clone = Arc::clone(&ponged);
        client.on(
            "pong",
            Arc::new(move |_payload| {
                *ponged_clone.lock().unwrap() = true;
            }),
        );

        client.send("ping", json!({})).unwrap();
        assert!(*ponged.lock().unwrap());
    }
}
