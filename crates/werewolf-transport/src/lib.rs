//! Transport abstraction layer for the werewolf server.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the byte stream a player is connected through. Each call to
//! [`Connection::send`] writes exactly one frame and each call to
//! [`Connection::recv`] yields exactly one frame, so layers above never see
//! partial messages.
//!
//! # Feature Flags
//!
//! - `tcp` (default): TCP transport with 4-byte length-prefixed framing

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::{MAX_FRAME_LENGTH, TcpConnection, TcpTransport};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that can send and receive framed messages.
///
/// Methods take `&self` so one task can block in [`recv`](Self::recv)
/// while another task sends on the same connection.
///
/// The futures are declared `Send` so that generic code can drive a
/// connection from inside `tokio::spawn`. Implementors can still write
/// plain `async fn`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next complete frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. Dropping
    /// the returned future before it resolves never loses buffered bytes.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the sending side of the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The local (server-side) address of the connection.
    fn local_addr(&self) -> SocketAddr;

    /// The remote (client-side) address of the connection.
    fn peer_addr(&self) -> SocketAddr;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut seats = HashMap::new();
        seats.insert(ConnectionId::new(1), 3u32);
        seats.insert(ConnectionId::new(2), 5u32);
        assert_eq!(seats[&ConnectionId::new(1)], 3);
        assert_ne!(ConnectionId::new(1), ConnectionId::new(2));
    }
}
