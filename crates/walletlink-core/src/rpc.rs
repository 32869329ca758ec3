//! JSON-RPC request correlation.
//!
//! Requests written to the stream get a fresh numeric id and a oneshot
//! receiver. The provider's reader completes the receiver when a response
//! with that id comes back.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use walletlink_proto::JsonRpcResponse;

struct Pending {
    method: String,
    sender: oneshot::Sender<JsonRpcResponse>,
}

/// Store of requests awaiting a response.
pub struct PendingRequests {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, Pending>>,
}

impl PendingRequests {
    /// Create an empty store. Ids start at 1.
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), pending: Mutex::new(HashMap::new()) }
    }

    /// Register a request and get its id and response receiver.
    pub fn register(&self, method: &str) -> (u64, oneshot::Receiver<JsonRpcResponse>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().insert(id, Pending { method: method.to_owned(), sender });

        debug!(id, method, "registered pending request");
        (id, receiver)
    }

    /// Hand a response to its waiting request.
    ///
    /// Returns false if no request with that id is pending.
    pub fn complete(&self, response: JsonRpcResponse) -> bool {
        let id = response.id;
        let Some(pending) = self.pending.lock().remove(&id) else {
            warn!(id, "response for unknown request");
            return false;
        };

        if pending.sender.send(response).is_err() {
            debug!(id, method = %pending.method, "requester went away before response");
            return false;
        }

        debug!(id, method = %pending.method, "completed pending request");
        true
    }

    /// Guard that forgets request `id` when dropped.
    ///
    /// Held across the wait for a response so a cancelled requester leaves
    /// nothing behind. Removing an already completed id is a no-op.
    pub fn guard(&self, id: u64) -> PendingGuard<'_> {
        PendingGuard { store: self, id }
    }

    /// Number of requests awaiting a response.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no request is awaiting a response.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes its request from a [`PendingRequests`] on drop.
#[must_use = "the request is forgotten as soon as the guard drops"]
pub struct PendingGuard<'a> {
    store: &'a PendingRequests,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.store.pending.lock().remove(&self.id).is_some() {
            debug!(id = self.id, "dropped unanswered request");
        }
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}
