//! Error types for the game layer.

/// Errors that can occur while setting up or running a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The role roster or game settings are unusable. Raised before the
    /// server starts listening.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Every seat is already taken.
    #[error("lobby is full ({0} seats)")]
    LobbyFull(usize),

    /// The game already started; no more joins.
    #[error("game already started")]
    AlreadyActive,

    /// `activate` was called with empty seats left.
    #[error("lobby not ready: {filled}/{capacity} seats filled")]
    NotReady { filled: usize, capacity: usize },

    /// No seated player is connected any more.
    #[error("game abandoned: no player is connected")]
    Abandoned,
}
