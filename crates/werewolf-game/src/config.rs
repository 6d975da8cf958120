//! Game timeouts and the phase state machine.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// How long the server waits for each kind of player input.
///
/// A timeout is never an error: the player simply abstains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Night skills, election sign-up, shots, badge hand-over.
    pub action: Duration,

    /// One discussion turn.
    pub speech: Duration,

    /// One ballot.
    pub vote: Duration,

    /// The wolves' shared kill-and-chat window.
    pub wolf_chat: Duration,

    /// Last words of a dying player.
    pub final_words: Duration,

    /// How long a fresh connection has to send `establish`.
    pub handshake: Duration,
}

impl GameConfig {
    /// The same timeout for every game action. Handy in tests.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            action: timeout,
            speech: timeout,
            vote: timeout,
            wolf_chat: timeout,
            final_words: timeout,
            handshake: timeout,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let turn = Duration::from_secs(120);
        Self {
            action: turn,
            speech: turn,
            vote: turn,
            wolf_chat: turn,
            final_words: turn,
            handshake: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// Where the game currently is.
///
/// ```text
/// PreGame → ElectingPolice → Night → DeathResolution → Day
///                              ▲            │  ▲          │
///                              │            ▼  └──────────┤
///                              └────────────┴─────────────┘
///                                        any → GameOver
/// ```
///
/// Death resolution follows both the night (victims at dawn) and the day
/// (exile, shots, self-destruct). A night with no deaths and a day with no
/// exile go straight on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    PreGame,
    ElectingPolice,
    Night,
    DeathResolution,
    Day,
    GameOver,
}

impl GamePhase {
    /// Returns `true` if moving from `self` to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        use GamePhase::*;
        match (self, target) {
            (GameOver, _) => false,
            (_, GameOver) => true,
            (PreGame, ElectingPolice) => true,
            (ElectingPolice, Night) => true,
            (Night, DeathResolution) => true,
            (DeathResolution, Day | Night) => true,
            (Day, DeathResolution | Night) => true,
            _ => false,
        }
    }

    pub fn is_over(self) -> bool {
        self == Self::GameOver
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreGame => write!(f, "PreGame"),
            Self::ElectingPolice => write!(f, "ElectingPolice"),
            Self::Night => write!(f, "Night"),
            Self::DeathResolution => write!(f, "DeathResolution"),
            Self::Day => write!(f, "Day"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}
