//! Error types for the session layer.

use std::time::Duration;

use werewolf_protocol::ProtocolError;

/// Errors that can occur while talking to a single player.
///
/// None of these end a game. At the `ask` boundary they collapse into
/// "no answer", and the orchestrator treats the player as abstaining.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Nothing arrived before the deadline. The peer stays usable.
    #[error("no packet received within {0:?}")]
    ReceiveTimeout(Duration),

    /// The connection was lost or closed; nothing more will arrive.
    #[error("connection lost")]
    ConnectionLost,

    /// A packet could not be built or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
