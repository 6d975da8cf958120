//! Player sessions for the werewolf server.
//!
//! This crate turns a raw framed connection into a player the game can
//! talk to:
//!
//! 1. **Request/response runtime** ([`Peer`]): one reader and one writer
//!    task per connection, an inbox, and `ask` with timeouts.
//! 2. **Player session** ([`PlayerSession`]): seat, role, life state and
//!    the game-level requests (vote, speak, use a skill, …).
//! 3. **Role strategies** ([`RoleKind`], [`RoleStrategy`]): what each role
//!    is asked at night and how it reacts to dying.
//!
//! # How it fits in the stack
//!
//! ```text
//! Game Layer (above)  ← drives phases, fans out asks to sessions
//!     ↕
//! Session Layer (this crate)  ← one PlayerSession + Peer per client
//!     ↕
//! Protocol Layer (below)  ← Packet, PacketKind, Codec
//! ```

mod error;
mod peer;
mod player;
mod role;

pub use error::SessionError;
pub use peer::{Peer, Signal};
pub use player::{ActionReply, DeathReport, PlayerSession};
pub use role::{
    DeathCause, RoleKind, RoleStrategy, SkillContext, WITCH_ANTIDOTE, WITCH_POISON,
};
