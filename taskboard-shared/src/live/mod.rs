//! Live board updates
//!
//! - [`registry`]: the per-board connection registry and fan-out
//! - [`handshake`]: token and membership checks run before a connection
//!   is admitted
//!
//! The transport (WebSocket) lives in the API crate; this module only deals
//! in channels, so it can be exercised without sockets.

pub mod handshake;
pub mod registry;

pub use handshake::{admit, HandshakeRejection};
pub use registry::{Broadcaster, ConnectionId, LiveSubscription};
