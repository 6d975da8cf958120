//! Request/response runtime over one framed connection.
//!
//! A [`Peer`] owns two background tasks:
//!
//! ```text
//!              ┌──────────── reader task ────────────┐
//! connection ──┤ decode → SelfDestruct? ──→ signals  │
//!              │                  else  ──→ inbox    │
//!              └─────────────────────────────────────┘
//!              ┌──────────── writer task ────────────┐
//! connection ◀─┤ outbound queue (FIFO, unbounded)    │
//!              └─────────────────────────────────────┘
//! ```
//!
//! The game never touches the connection directly. It enqueues packets
//! with [`Peer::send`] (fire-and-forget, ordered per recipient) and waits
//! for answers with [`Peer::ask`], which turns every failure into `None`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use werewolf_protocol::{Codec, Endpoint, Packet, PacketBuilder, PacketKind};
use werewolf_transport::{Connection, ConnectionId};

use crate::SessionError;

/// An out-of-band packet that must reach the game immediately, whatever
/// the game is currently waiting for.
///
/// Only self-destruct packets travel this way.
#[derive(Debug, Clone)]
pub struct Signal {
    /// The connection the packet arrived on.
    pub connection: ConnectionId,
    /// The decoded packet.
    pub packet: Packet,
}

/// One connected client, seen through its inbox and outbound queue.
pub struct Peer {
    id: ConnectionId,
    endpoint: Endpoint,
    codec: Arc<dyn Codec>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    inbox: Mutex<mpsc::UnboundedReceiver<Packet>>,
    closed: CancellationToken,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Peer {
    /// Starts the reader and writer tasks for `conn`.
    ///
    /// Packets this side sends carry `local → peer` as their endpoint pair.
    /// Self-destruct packets coming in are forwarded to `signals`.
    pub fn spawn<T: Connection>(
        conn: T,
        codec: Arc<dyn Codec>,
        signals: mpsc::UnboundedSender<Signal>,
    ) -> Arc<Peer> {
        let id = conn.id();
        let endpoint = Endpoint::between(conn.local_addr(), conn.peer_addr());
        let conn = Arc::new(conn);
        let closed = CancellationToken::new();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        tokio::spawn(read_loop(
            Arc::clone(&conn),
            Arc::clone(&codec),
            inbox_tx,
            signals,
            closed.clone(),
        ));
        let writer = tokio::spawn(write_loop(conn, outbound_rx, closed.clone()));

        tracing::debug!(conn_id = %id, peer = %endpoint.dest_addr, "peer started");

        Arc::new(Peer {
            id,
            endpoint,
            codec,
            outbound: outbound_tx,
            inbox: Mutex::new(inbox_rx),
            closed,
            writer: Mutex::new(Some(writer)),
        })
    }

    /// The underlying connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The endpoint pair stamped on outgoing packets.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// `false` once the connection was lost or [`close`](Self::close)d.
    pub fn is_connected(&self) -> bool {
        !self.closed.is_cancelled()
    }

    /// Starts a packet addressed to this peer.
    pub fn packet(&self, kind: PacketKind) -> PacketBuilder {
        Packet::builder(kind, self.endpoint.clone())
    }

    /// Encodes and enqueues a packet. Never waits for the network.
    ///
    /// # Errors
    /// - [`SessionError::Protocol`] if encoding fails
    /// - [`SessionError::ConnectionLost`] once the writer has stopped
    pub fn send(&self, packet: &Packet) -> Result<(), SessionError> {
        let frame = self.codec.encode(packet)?;
        self.outbound
            .send(frame)
            .map_err(|_| SessionError::ConnectionLost)
    }

    /// Waits up to `timeout` for the next inbox packet.
    pub async fn receive(&self, timeout: Duration) -> Result<Packet, SessionError> {
        self.receive_until(Instant::now() + timeout).await
    }

    /// Waits until `deadline` for the next inbox packet.
    ///
    /// Cancel-safe: dropping the future never loses a packet.
    pub async fn receive_until(&self, deadline: Instant) -> Result<Packet, SessionError> {
        let started = Instant::now();
        let mut inbox = self.inbox.lock().await;
        match tokio::time::timeout_at(deadline, inbox.recv()).await {
            Ok(Some(packet)) => Ok(packet),
            Ok(None) => Err(SessionError::ConnectionLost),
            Err(_) => Err(SessionError::ReceiveTimeout(started.elapsed())),
        }
    }

    /// Throws away everything already waiting in the inbox.
    ///
    /// Returns how many packets were discarded. Used before a new request
    /// so that a late answer to an earlier one is not mistaken for the
    /// reply.
    pub async fn drain(&self) -> usize {
        let mut inbox = self.inbox.lock().await;
        let mut discarded = 0;
        while let Ok(stale) = inbox.try_recv() {
            tracing::debug!(conn_id = %self.id, kind = %stale.kind(), "discarding stale packet");
            discarded += 1;
        }
        discarded
    }

    /// Sends a request and waits up to `timeout` for its reply.
    ///
    /// Only a packet of the request's reply kind counts as the answer;
    /// anything else arriving in the meantime is discarded. Timeouts and
    /// connection loss are logged and come back as `None`.
    pub async fn ask(&self, request: Packet, timeout: Duration) -> Option<Packet> {
        let Some(reply_kind) = request.kind().reply_kind() else {
            tracing::warn!(conn_id = %self.id, kind = %request.kind(), "ask with a non-request packet");
            return None;
        };
        let deadline = Instant::now() + timeout;

        let mut inbox = self.inbox.lock().await;
        while let Ok(stale) = inbox.try_recv() {
            tracing::debug!(conn_id = %self.id, kind = %stale.kind(), "discarding stale packet");
        }

        if let Err(e) = self.send(&request) {
            tracing::debug!(conn_id = %self.id, error = %e, "request not sent");
            return None;
        }

        loop {
            match tokio::time::timeout_at(deadline, inbox.recv()).await {
                Ok(Some(packet)) if packet.kind() == reply_kind => return Some(packet),
                Ok(Some(other)) => {
                    tracing::debug!(
                        conn_id = %self.id,
                        expected = %reply_kind,
                        got = %other.kind(),
                        "ignoring unexpected packet"
                    );
                }
                Ok(None) => {
                    tracing::debug!(conn_id = %self.id, "connection lost while waiting for reply");
                    return None;
                }
                Err(_) => {
                    tracing::debug!(conn_id = %self.id, ?timeout, "request timed out");
                    return None;
                }
            }
        }
    }

    /// Like [`ask`](Self::ask), but gives up as soon as `cancel` fires.
    pub async fn ask_cancellable(
        &self,
        request: Packet,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<Packet> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            reply = self.ask(request, timeout) => reply,
        }
    }

    /// Stops reading, flushes every queued packet, then closes the
    /// connection. Safe to call more than once.
    pub async fn close(&self) {
        self.closed.cancel();
        let writer = self.writer.lock().await.take();
        if let Some(handle) = writer {
            if let Err(e) = handle.await {
                tracing::debug!(conn_id = %self.id, error = %e, "writer task failed");
            }
        }
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn read_loop<T: Connection>(
    conn: Arc<T>,
    codec: Arc<dyn Codec>,
    inbox: mpsc::UnboundedSender<Packet>,
    signals: mpsc::UnboundedSender<Signal>,
    closed: CancellationToken,
) {
    let conn_id = conn.id();
    loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break,
            frame = conn.recv() => frame,
        };
        let data = match frame {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed by client");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        match codec.decode(&data) {
            Ok(packet) if packet.kind() == PacketKind::SelfDestruct => {
                tracing::debug!(%conn_id, "self-destruct signal received");
                let _ = signals.send(Signal {
                    connection: conn_id,
                    packet,
                });
            }
            Ok(packet) => {
                tracing::debug!(%conn_id, kind = %packet.kind(), "packet received");
                if inbox.send(packet).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping malformed packet");
            }
        }
    }
    closed.cancel();
}

async fn write_loop<T: Connection>(
    conn: Arc<T>,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    closed: CancellationToken,
) {
    let conn_id = conn.id();
    loop {
        tokio::select! {
            biased;
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = conn.send(&frame).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    closed.cancel();
                    return;
                }
            }
            _ = closed.cancelled() => {
                while let Ok(frame) = outbound.try_recv() {
                    if conn.send(&frame).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    tracing::debug!(%conn_id, "writer stopped");
}
