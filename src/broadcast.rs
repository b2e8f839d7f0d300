//! Fan-out of change events to live WebSocket subscribers.
//!
//! The hub owns a registry of per-connection channels. `publish` serializes
//! an event once and pushes the text frame to every registered channel; the
//! actual socket write happens in each connection's own task, so one slow
//! peer never delays the others. Delivery is fire-and-forget, at-most-once,
//! with no backfill for late subscribers.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

/// Opaque handle identifying one subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of live subscriber channels.
pub struct BroadcastHub {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<String>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Add a subscriber channel; returns the handle used to remove it.
    pub async fn register(&self, sender: mpsc::UnboundedSender<String>) -> SubscriberId {
        let id = SubscriberId::new();
        self.subscribers.write().await.insert(id, sender);
        debug!(subscriber = %id, "subscriber registered");
        id
    }

    /// Remove a subscriber; safe to call for an already-removed handle.
    pub async fn unregister(&self, id: &SubscriberId) {
        if self.subscribers.write().await.remove(id).is_some() {
            debug!(subscriber = %id, "subscriber unregistered");
        }
    }

    /// Serialize `event` once and send it to every registered subscriber.
    ///
    /// A failed send means the receiving connection task is gone; those
    /// subscribers are dropped from the registry after the fan-out. This
    /// never fails and never blocks on a peer.
    pub async fn publish<T: Serialize>(&self, event: &T) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to serialize broadcast event: {}", e);
                return;
            }
        };

        let mut dead = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            for (id, sender) in subscribers.iter() {
                if sender.send(payload.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in dead {
                subscribers.remove(&id);
                debug!(subscriber = %id, "dropped unreachable subscriber");
            }
        }
    }

    /// Number of currently registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
