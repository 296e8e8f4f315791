//! Transport abstraction layer for Jackroom.
//!
//! Provides the [`Transport`] and [`Connection`] traits plus the TCP
//! implementation the game server runs on. Incoming bytes are split into
//! frames by a varint length prefix (see [`frame`]); outgoing buffers are
//! written as-is because the codec frames them already.
//!
//! # Feature Flags
//!
//! - `mock`: [`MockConnection`], an in-memory connection for tests

mod error;
pub mod frame;
#[cfg(feature = "mock")]
mod mock;
mod tcp;

pub use error::TransportError;
#[cfg(feature = "mock")]
pub use mock::MockConnection;
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;
use std::future::Future;

/// Process-unique id of an accepted connection.
///
/// Client and room registries key their entries by id; the id is also the
/// `conn_id` field on every log line about the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A listener that hands out connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves with the next accepted connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single connection that exchanges frames with a remote peer.
///
/// Every method returns a `Send` future so that generic code can drive
/// connections from spawned tasks (room timers, per-connection handlers).
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes one already length-prefixed frame to the peer.
    fn send(
        &self,
        frame: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the body of the next frame.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed, either by
    /// the peer or by a local [`close`](Self::close).
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection. Idempotent.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;

    fn id(&self) -> ConnectionId;
}
