//! Request correlator: id-keyed matching of render requests to responses
//!
//! The correlator owns the table of in-flight requests. Each entry holds the
//! continuation for exactly one request; whichever outcome fires first
//! (response, timeout, or absent transport) removes the entry before the
//! continuation runs, so the other outcomes become no-ops by construction.

use crate::protocol::{RenderRequest, RenderResponse, RENDER_RESPONSE_EVENT};
use crate::transport::Transport;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default render timeout in milliseconds
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 10_000;

// Bookkeeping for one in-flight request. At most one entry exists per id;
// it is removed the instant the request resolves, times out, or fails to send.
struct PendingRequest {
    resolve: mpsc::Sender<RenderResponse>,
}

/// Id-keyed request/response matcher over the render transport
pub struct RequestCorrelator {
    transport: Option<Arc<dyn Transport>>,
    pending: Arc<Mutex<HashMap<String, PendingRequest>>>,
    next_id: AtomicU64,
    timeout_ms: u64,
}

fn pending_guard(
    pending: &Mutex<HashMap<String, PendingRequest>>,
) -> MutexGuard<'_, HashMap<String, PendingRequest>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RequestCorrelator {
    /// Create a correlator and register its response listener on the
    /// transport when one is present. `None` models the non-dev build where
    /// no live-reload channel exists.
    pub fn new(transport: Option<Arc<dyn Transport>>, timeout_ms: u64) -> Arc<Self> {
        let correlator = Arc::new(Self {
            transport: transport.clone(),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            timeout_ms,
        });

        if let Some(transport) = transport {
            let pending = Arc::clone(&correlator.pending);
            transport.on(
                RENDER_RESPONSE_EVENT,
                Arc::new(move |payload| {
                    match serde_json::from_value::<RenderResponse>(payload.clone()) {
                        Ok(response) => resolve_pending(&pending, response),
                        Err(err) => log::warn!("malformed render response: {err}"),
                    }
                }),
            );
        }

        correlator
    }

    /// Send a render request and wait for its outcome.
    ///
    /// Exactly one of three things happens: the matching response arrives and
    /// is returned; the timeout elapses first and `Error::Timeout` names the
    /// configured duration; or no transport is attached and the request is
    /// rejected immediately without arming a timeout.
    pub fn send(&self, mut request: RenderRequest) -> Result<RenderResponse> {
        let transport = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => return Err(Error::TransportUnavailable),
        };

        let id = self.next_request_id();
        request.id = id.clone();

        let (tx, rx) = mpsc::channel();
        pending_guard(&self.pending).insert(id.clone(), PendingRequest { resolve: tx });
        log::debug!("render request {id} -> {}", request.component);

        let payload = serde_json::to_value(&request)?;
        if let Err(err) = transport.send(crate::protocol::RENDER_REQUEST_EVENT, payload) {
            pending_guard(&self.pending).remove(&id);
            return Err(err);
        }

        match rx.recv_timeout(Duration::from_millis(self.timeout_ms)) {
            Ok(response) => Ok(response),
            Err(_) => {
                // Pop the entry so a late response becomes a silent no-op
                pending_guard(&self.pending).remove(&id);
                Err(Error::Timeout(self.timeout_ms))
            }
        }
    }

    /// Deliver a response to its waiting request, if any. Unmatched ids are
    /// dropped without error; they may belong to already-timed-out requests.
    pub fn resolve(&self, response: RenderResponse) {
        resolve_pending(&self.pending, response);
    }

    /// Number of requests currently awaiting an outcome
    pub fn pending_len(&self) -> usize {
        pending_guard(&self.pending).len()
    }

    // Session-unique; a plain counter suffices since ids never leave the session.
    fn next_request_id(&self) -> String {
        format!("r{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn resolve_pending(pending: &Mutex<HashMap<String, PendingRequest>>, response: RenderResponse) {
    // Pop-then-resolve: removing first guarantees at most one resolution per id
    let entry = pending_guard(pending).remove(&response.id);
    match entry {
        Some(entry) => {
            // The receiver may already be gone if the caller timed out between
            // our pop and this send; that request's outcome was the timeout.
            let _ = entry.resolve.send(response);
        }
        None => log::debug!("dropping unmatched render response id={}", response.id),
    }
}
