//! Live-connection registry: the single source of truth for "is this user
//! currently reachable". Purely in-memory, per process — a cache of liveness,
//! never authoritative relationship data.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::trace;
use uuid::Uuid;

use spark_types::events::GatewayEvent;

/// Per-connection outbound queue depth. A slow or dead client fills its queue
/// and further pushes are dropped rather than stalling the sender.
const CONNECTION_QUEUE_DEPTH: usize = 64;

/// Maps authenticated users to their live connections. A user may hold
/// several at once (two open tabs, phone plus laptop); online means the set
/// is non-empty. Constructed once at server start and injected into handlers.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    connections: RwLock<HashMap<Uuid, HashMap<Uuid, mpsc::Sender<GatewayEvent>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live connection for a user. Returns the connection id, the
    /// receiving end of its outbound queue, and whether this was the user's
    /// first connection (the offline -> online transition).
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::Receiver<GatewayEvent>, bool) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_DEPTH);

        let mut connections = self.inner.connections.write().await;
        let entry = connections.entry(user_id).or_default();
        let came_online = entry.is_empty();
        entry.insert(conn_id, tx);

        (conn_id, rx, came_online)
    }

    /// Remove one connection. Returns true when it was the user's last and
    /// they transitioned to offline.
    pub async fn unregister(&self, user_id: Uuid, conn_id: Uuid) -> bool {
        let mut connections = self.inner.connections.write().await;
        let Some(entry) = connections.get_mut(&user_id) else {
            return false;
        };
        entry.remove(&conn_id);
        if entry.is_empty() {
            connections.remove(&user_id);
            true
        } else {
            false
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.connections.read().await.contains_key(&user_id)
    }

    /// Best-effort push to every live connection of a user. Returns true when
    /// at least one connection accepted the event. False means "not reachable"
    /// — the expected case for offline users, never an error. A full queue
    /// counts as unreachable for that connection; the event is dropped there.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> bool {
        let connections = self.inner.connections.read().await;
        let Some(entry) = connections.get(&user_id) else {
            return false;
        };

        let mut delivered = false;
        for (conn_id, tx) in entry {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered = true,
                Err(_) => {
                    trace!("dropping event for {user_id} conn {conn_id}: queue full or closed");
                }
            }
        }
        delivered
    }
}
