//! TCP transport with length-prefixed framing.
//!
//! TCP is a byte stream with no message boundaries, so every frame is
//! preceded by a 4-byte big-endian length (`LengthDelimitedCodec`).
//! Partial frames stay buffered inside the `FramedRead` until the rest
//! of the bytes arrive.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Largest frame accepted from a client (1 MiB).
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec()
}

/// A TCP-based [`Transport`] that listens for incoming players.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpConnection::from_stream(stream)?;
        tracing::debug!(id = %conn.id, %addr, "accepted TCP connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A single framed TCP connection.
///
/// The stream is split so the read half and the write half are locked
/// independently: a reader blocked in [`recv`](Connection::recv) never
/// delays a concurrent [`send`](Connection::send).
pub struct TcpConnection {
    id: ConnectionId,
    local: SocketAddr,
    peer: SocketAddr,
    reader: Mutex<FramedRead<OwnedReadHalf, LengthDelimitedCodec>>,
    writer: Mutex<FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>>,
}

impl TcpConnection {
    /// Connects to a server. Used by clients and tests.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        Self::from_stream(stream)
    }

    /// Wraps an already-connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        let local = stream.local_addr().map_err(TransportError::AcceptFailed)?;
        let peer = stream.peer_addr().map_err(TransportError::AcceptFailed)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(%peer, error = %e, "could not disable Nagle's algorithm");
        }
        let (read_half, write_half) = stream.into_split();
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));

        Ok(Self {
            id,
            local,
            peer,
            reader: Mutex::new(FramedRead::new(read_half, frame_codec())),
            writer: Mutex::new(FramedWrite::new(write_half, frame_codec())),
        })
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .send(Bytes::copy_from_slice(data))
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        match self.reader.lock().await.next().await {
            Some(Ok(frame)) => Ok(Some(frame.to_vec())),
            Some(Err(e)) => Err(TransportError::ReceiveFailed(e)),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        SinkExt::<Bytes>::close(&mut *writer)
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
