//! Unified error type for the werewolf server.

use werewolf_game::GameError;
use werewolf_protocol::ProtocolError;
use werewolf_session::SessionError;
use werewolf_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// `#[from]` on each variant lets `?` lift sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum WerewolfError {
    /// Binding, accepting, or a socket failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A packet that does not match the schema table.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A request/response failure on one connection.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Bad roster or settings, lobby misuse, or an abandoned game.
    #[error(transparent)]
    Game(#[from] GameError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error_keeps_message() {
        let err: WerewolfError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, WerewolfError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: WerewolfError = ProtocolError::UnknownPacketType(42).into();
        assert!(matches!(err, WerewolfError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: WerewolfError = SessionError::ConnectionLost.into();
        assert!(matches!(err, WerewolfError::Session(_)));
    }

    #[test]
    fn test_from_game_error_keeps_message() {
        let err: WerewolfError = GameError::Configuration("no wolves".into()).into();
        assert!(matches!(err, WerewolfError::Game(_)));
        assert!(err.to_string().contains("no wolves"));
    }
}
