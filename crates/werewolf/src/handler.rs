//! Per-connection handshake.
//!
//! Each accepted connection gets its own task running [`handshake`]:
//!   1. Wrap the connection in a [`Peer`] (reader and writer tasks start)
//!   2. Wait for an `establish` packet until the handshake deadline
//!   3. Hand the peer to the lobby owner, which assigns the seat
//!
//! Anything other than `establish` before the deadline is ignored. A
//! connection that never establishes is closed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use werewolf_protocol::{Codec, PacketKind};
use werewolf_session::{Peer, SessionError, Signal};
use werewolf_transport::Connection;

/// Runs the handshake for one connection and returns the established peer.
pub(crate) async fn handshake<T: Connection>(
    conn: T,
    codec: Arc<dyn Codec>,
    signals: mpsc::UnboundedSender<Signal>,
    timeout: Duration,
) -> Result<Arc<Peer>, SessionError> {
    let peer = Peer::spawn(conn, codec, signals);
    let conn_id = peer.id();
    let deadline = Instant::now() + timeout;

    loop {
        let packet = match peer.receive_until(deadline).await {
            Ok(packet) => packet,
            Err(e) => {
                peer.close().await;
                return Err(e);
            }
        };
        if packet.kind() == PacketKind::Establish {
            tracing::debug!(%conn_id, "handshake complete");
            return Ok(peer);
        }
        tracing::debug!(%conn_id, kind = %packet.kind(), "ignoring packet before establish");
    }
}

/// Spawns [`handshake`] and forwards a successful peer to `joined`.
pub(crate) fn spawn_handshake<T: Connection>(
    conn: T,
    codec: Arc<dyn Codec>,
    signals: mpsc::UnboundedSender<Signal>,
    timeout: Duration,
    joined: mpsc::Sender<Arc<Peer>>,
) {
    tokio::spawn(async move {
        match handshake(conn, codec, signals, timeout).await {
            Ok(peer) => {
                if let Err(mpsc::error::SendError(peer)) = joined.send(peer).await {
                    tracing::debug!(conn_id = %peer.id(), "lobby closed before the handshake finished");
                    peer.close().await;
                }
            }
            Err(e) => tracing::debug!(error = %e, "handshake failed"),
        }
    });
}
