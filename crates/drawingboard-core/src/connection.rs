//! Outbound channels to connected clients.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Per-connection outbound queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Unique identifier of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Failure to hand a message to one connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmitError {
    #[error("connection closed")]
    Closed,
    #[error("outbound queue full")]
    Backpressure,
}

/// A live channel to one client.
///
/// `send` is called while the hub holds its lock, so it must return promptly:
/// enqueue the message or fail, never wait on the peer.
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    fn send(&self, message: &ServerMessage) -> Result<(), TransmitError>;

    /// Send several messages as one unit, in order.
    ///
    /// Used for the join-time replay, which may be longer than the
    /// connection's queue.
    fn send_batch(&self, messages: Vec<ServerMessage>) -> Result<(), TransmitError> {
        messages.iter().try_for_each(|message| self.send(message))
    }

    /// Stop accepting messages; the client sees its channel end once
    /// anything already queued has been written.
    fn close(&self) {}
}

/// One queued item for a [`ChannelConnection`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMessage),
    Batch(Vec<ServerMessage>),
}

impl Outbound {
    /// Flatten into the messages to write, in order.
    pub fn into_messages(self) -> Vec<ServerMessage> {
        match self {
            Outbound::Message(message) => vec![message],
            Outbound::Batch(messages) => messages,
        }
    }
}

/// [`Connection`] backed by a bounded queue.
///
/// The transport drains the paired receiver and writes each message to the
/// socket; a full queue means the client is not keeping up. Closing drops
/// the only sender, so the receiver ends even while other handles to the
/// connection are alive.
#[derive(Debug)]
pub struct ChannelConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::Sender<Outbound>>>,
}

impl ChannelConnection {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let connection = Self {
            id: ConnectionId::new(),
            tx: Mutex::new(Some(tx)),
        };
        (connection, rx)
    }

    fn enqueue(&self, item: Outbound) -> Result<(), TransmitError> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(TransmitError::Closed);
        };
        tx.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransmitError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => TransmitError::Closed,
        })
    }
}

impl Connection for ChannelConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, message: &ServerMessage) -> Result<(), TransmitError> {
        self.enqueue(Outbound::Message(message.clone()))
    }

    fn send_batch(&self, messages: Vec<ServerMessage>) -> Result<(), TransmitError> {
        self.enqueue(Outbound::Batch(messages))
    }

    fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_send_enqueues() {
        let (conn, mut rx) = ChannelConnection::new(4);
        conn.send(&ServerMessage::session("a:1")).unwrap();
        assert_eq!(
            rx.try_recv().unwrap().into_messages(),
            vec![ServerMessage::session("a:1")]
        );
    }

    #[test]
    fn test_batch_takes_one_slot() {
        let (conn, mut rx) = ChannelConnection::new(1);
        let batch = vec![
            ServerMessage::session("a:1"),
            ServerMessage::error("x"),
            ServerMessage::error("y"),
        ];
        conn.send_batch(batch.clone()).unwrap();
        assert_eq!(rx.try_recv().unwrap().into_messages(), batch);
    }

    #[test]
    fn test_full_queue_is_backpressure() {
        let (conn, _rx) = ChannelConnection::new(1);
        conn.send(&ServerMessage::session("a:1")).unwrap();
        assert_eq!(
            conn.send(&ServerMessage::session("a:1")),
            Err(TransmitError::Backpressure)
        );
    }

    #[test]
    fn test_close_ends_receiver_after_queued_items() {
        let (conn, mut rx) = ChannelConnection::new(4);
        conn.send(&ServerMessage::session("a:1")).unwrap();
        conn.close();

        assert_eq!(conn.send(&ServerMessage::error("late")), Err(TransmitError::Closed));
        assert!(rx.try_recv().is_ok());
        assert_eq!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected));
        // Idempotent.
        conn.close();
    }

    #[test]
    fn test_dropped_receiver_is_closed() {
        let (conn, rx) = ChannelConnection::new(4);
        drop(rx);
        assert_eq!(
            conn.send(&ServerMessage::session("a:1")),
            Err(TransmitError::Closed)
        );
    }
}
