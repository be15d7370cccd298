//! Live connections per drawing and the join/publish protocol.
//!
//! Every operation runs inside one critical section that guards both the
//! drawing histories and the connection sets. A join takes its history
//! snapshot and enters the live set without any publish in between, so a
//! connection sees each shape exactly once and in append order: either in
//! its replay or through fan-out, never both and never neither.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::connection::{Connection, ConnectionId, TransmitError};
use crate::protocol::{DEFAULT_SSE_LOCATION, ServerMessage};
use crate::shapes::Shape;
use crate::store::{Drawing, DrawingId, DrawingStore};

/// Default number of consecutive failed sends before a connection is evicted.
pub const DEFAULT_MAX_SEND_FAILURES: u32 = 3;

/// Hub settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Event-stream location announced in the session setup message.
    pub sse_location: String,
    /// Consecutive failed sends tolerated before eviction. `None` never
    /// evicts on failures; a closed connection is always evicted.
    pub max_send_failures: Option<u32>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            sse_location: DEFAULT_SSE_LOCATION.to_string(),
            max_send_failures: Some(DEFAULT_MAX_SEND_FAILURES),
        }
    }
}

struct Subscriber {
    connection: Arc<dyn Connection>,
    /// Consecutive failed sends; reset by any successful one.
    failures: u32,
}

#[derive(Default)]
struct HubState {
    store: DrawingStore,
    subscribers: HashMap<DrawingId, Vec<Subscriber>>,
}

/// Shared drawing state plus the clients watching it.
pub struct BroadcastHub {
    config: HubConfig,
    state: Mutex<HubState>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HubState::default()),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // State is left consistent at every point a send could panic, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join `connection` to drawing `id`.
    ///
    /// The connection receives the session setup message followed by the
    /// drawing's full history, then every shape published afterwards.
    /// If the replay cannot be delivered in full the connection is closed
    /// and never becomes live.
    pub fn register(&self, id: DrawingId, connection: Arc<dyn Connection>) {
        let mut state = self.lock();
        let HubState { store, subscribers } = &mut *state;

        let conn_id = connection.id();
        let live = subscribers.entry(id).or_default();
        if live.iter().any(|s| s.connection.id() == conn_id) {
            log::warn!("connection {conn_id} is already registered to drawing {id}");
            return;
        }

        let history = store.snapshot(id);
        let replayed = history.len();
        let mut batch = Vec::with_capacity(replayed + 1);
        batch.push(ServerMessage::session(self.config.sse_location.as_str()));
        batch.extend(history.into_iter().map(ServerMessage::Shape));

        match connection.send_batch(batch) {
            Ok(()) => {
                live.push(Subscriber {
                    connection,
                    failures: 0,
                });
                log::debug!(
                    "connection {conn_id} joined drawing {id} ({replayed} replayed, {} live)",
                    live.len()
                );
            }
            Err(err) => {
                log::warn!("connection {conn_id} failed to join drawing {id}: {err}");
                connection.close();
                if live.is_empty() {
                    subscribers.remove(&id);
                }
            }
        }
    }

    /// Remove a connection from drawing `id`.
    ///
    /// Returns whether it was registered. Removing an unknown connection is
    /// a no-op, since disconnects can race with eviction.
    pub fn deregister(&self, id: DrawingId, connection: ConnectionId) -> bool {
        let mut state = self.lock();
        let Some(live) = state.subscribers.get_mut(&id) else {
            return false;
        };

        let Some(index) = live.iter().position(|s| s.connection.id() == connection) else {
            return false;
        };
        live.remove(index).connection.close();
        if live.is_empty() {
            state.subscribers.remove(&id);
        }
        log::debug!("connection {connection} left drawing {id}");
        true
    }

    /// Append `shape` to drawing `id` and send it to every live connection.
    ///
    /// A failed send is logged and does not stop delivery to the others.
    /// Returns whether the drawing accepted the shape, which is always the
    /// case as drawings are created on demand.
    pub fn publish(&self, id: DrawingId, shape: Shape) -> bool {
        let mut state = self.lock();
        let HubState { store, subscribers } = &mut *state;

        store.append(id, shape.clone());

        if let Some(live) = subscribers.get_mut(&id) {
            let message = ServerMessage::Shape(shape);
            live.retain_mut(|subscriber| {
                let result = subscriber.connection.send(&message);
                self.record(id, subscriber, result)
            });
            if live.is_empty() {
                subscribers.remove(&id);
            }
        }
        true
    }

    /// Request-facing name for [`publish`](Self::publish).
    pub fn add_shape(&self, id: DrawingId, shape: Shape) -> bool {
        self.publish(id, shape)
    }

    /// Current state of drawing `id`, created empty if unknown.
    pub fn get_drawing(&self, id: DrawingId) -> Drawing {
        self.lock().store.get_or_create(id).clone()
    }

    /// IDs of every drawing referenced so far, ascending.
    pub fn drawing_ids(&self) -> Vec<DrawingId> {
        self.lock().store.drawing_ids()
    }

    /// Number of live connections on drawing `id`.
    pub fn connection_count(&self, id: DrawingId) -> usize {
        self.lock().subscribers.get(&id).map_or(0, Vec::len)
    }

    /// Apply the failure policy to one send result. Returns whether the
    /// subscriber stays registered; an evicted subscriber is closed.
    fn record(
        &self,
        id: DrawingId,
        subscriber: &mut Subscriber,
        result: Result<(), TransmitError>,
    ) -> bool {
        let conn_id = subscriber.connection.id();
        match result {
            Ok(()) => {
                subscriber.failures = 0;
                true
            }
            Err(TransmitError::Closed) => {
                log::warn!("connection {conn_id} on drawing {id} is closed, evicting");
                subscriber.connection.close();
                false
            }
            Err(err) => {
                subscriber.failures += 1;
                log::warn!(
                    "send to connection {conn_id} on drawing {id} failed ({} in a row): {err}",
                    subscriber.failures
                );
                match self.config.max_send_failures {
                    Some(max) if subscriber.failures >= max => {
                        log::warn!("evicting connection {conn_id} from drawing {id}");
                        subscriber.connection.close();
                        false
                    }
                    _ => true,
                }
            }
        }
    }
}
