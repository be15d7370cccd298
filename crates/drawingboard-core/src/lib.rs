//! DrawingBoard Core Library
//!
//! Shared state for live drawing sessions: the per-drawing shape history and
//! the hub that replays it to joining clients and fans out new shapes.

pub mod connection;
pub mod hub;
pub mod protocol;
pub mod shapes;
pub mod store;

pub use connection::{ChannelConnection, Connection, ConnectionId, Outbound, TransmitError};
pub use hub::{BroadcastHub, HubConfig};
pub use protocol::{ErrorNotice, ServerMessage, SessionSetup};
pub use shapes::{Shape, ShapeKind};
pub use store::{Drawing, DrawingId, DrawingStore};
