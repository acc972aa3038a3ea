//! Per-board connection registry
//!
//! [`Broadcaster`] maps each board to the set of live connections watching
//! it. Each connection is the sending half of a bounded
//! `tokio::sync::mpsc` channel; the transport task owns the receiver and
//! forwards events to its client.
//!
//! # Delivery
//!
//! Delivery never waits. A connection whose channel is closed (client
//! gone) or full (client too slow) is dropped from the registry and the
//! remaining connections still get the event. Mutation callers never see
//! delivery failures.
//!
//! # Example
//!
//! ```
//! use taskboard_shared::events::BoardEvent;
//! use taskboard_shared::live::Broadcaster;
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let broadcaster = Broadcaster::new(16);
//! let board_id = Uuid::new_v4();
//!
//! let mut subscription = broadcaster.register(board_id).await;
//! let event = BoardEvent::CardDeleted { card_id: Uuid::new_v4() };
//! assert_eq!(broadcaster.broadcast(board_id, &event, None).await, 1);
//! assert_eq!(subscription.receiver.recv().await, Some(event));
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::events::BoardEvent;

/// Process-unique identifier of one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Receiving side handed to the transport on registration
#[derive(Debug)]
pub struct LiveSubscription {
    pub id: ConnectionId,
    pub board_id: Uuid,
    pub receiver: mpsc::Receiver<BoardEvent>,
}

type Connections = HashMap<ConnectionId, mpsc::Sender<BoardEvent>>;

#[derive(Debug)]
struct Registry {
    boards: RwLock<HashMap<Uuid, Connections>>,
    next_id: AtomicU64,
    capacity: usize,
    closed: AtomicBool,
}

/// Live connection registry with per-board fan-out
///
/// Cloning is cheap; clones share one registry. Constructed once at startup
/// and passed to whoever needs it.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    /// Creates a registry whose connections buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                boards: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Adds a new connection to the board's set
    ///
    /// After [`Broadcaster::shutdown`] the returned receiver is already closed.
    pub async fn register(&self, board_id: Uuid) -> LiveSubscription {
        let id = ConnectionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.registry.capacity);

        if self.registry.closed.load(Ordering::Acquire) {
            debug!(board_id = %board_id, connection = %id, "Registry closed, connection not registered");
        } else {
            let mut boards = self.registry.boards.write().await;
            boards.entry(board_id).or_default().insert(id, sender);
            debug!(board_id = %board_id, connection = %id, "Live connection registered");
        }

        LiveSubscription {
            id,
            board_id,
            receiver,
        }
    }

    /// Removes a connection; the board entry goes away with its last connection
    ///
    /// Returns false if the connection was not registered (already removed).
    pub async fn unregister(&self, board_id: Uuid, id: ConnectionId) -> bool {
        let mut boards = self.registry.boards.write().await;

        let Some(connections) = boards.get_mut(&board_id) else {
            return false;
        };

        let removed = connections.remove(&id).is_some();
        if connections.is_empty() {
            boards.remove(&board_id);
        }

        if removed {
            debug!(board_id = %board_id, connection = %id, "Live connection unregistered");
        }
        removed
    }

    /// Delivers `event` to every connection on the board except `exclude`
    ///
    /// Returns the number of connections that accepted the event. Failed
    /// connections are unregistered.
    pub async fn broadcast(
        &self,
        board_id: Uuid,
        event: &BoardEvent,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();

        {
            let boards = self.registry.boards.read().await;
            let Some(connections) = boards.get(&board_id) else {
                return 0;
            };

            for (id, sender) in connections {
                if Some(*id) == exclude {
                    continue;
                }

                match sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        debug!(
                            board_id = %board_id,
                            connection = %id,
                            error = %err,
                            "Dropping live connection after failed delivery"
                        );
                        failed.push(*id);
                    }
                }
            }
        }

        for id in failed {
            self.unregister(board_id, id).await;
        }

        debug!(board_id = %board_id, kind = event.kind(), delivered, "Board event broadcast");
        delivered
    }

    /// Live connections currently registered for a board
    pub async fn connection_count(&self, board_id: Uuid) -> usize {
        let boards = self.registry.boards.read().await;
        boards.get(&board_id).map_or(0, HashMap::len)
    }

    /// Boards with at least one live connection
    pub async fn board_count(&self) -> usize {
        self.registry.boards.read().await.len()
    }

    /// Drops every connection and refuses new ones
    ///
    /// Transport tasks see their receivers close and end their sessions.
    pub async fn shutdown(&self) {
        self.registry.closed.store(true, Ordering::Release);

        let mut boards = self.registry.boards.write().await;
        let connections: usize = boards.values().map(HashMap::len).sum();
        boards.clear();

        info!(connections, "Live update registry shut down");
    }
}
