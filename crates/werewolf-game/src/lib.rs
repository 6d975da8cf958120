//! Game orchestration for the werewolf server.
//!
//! Everything between "enough clients have connected" and "results sent":
//!
//! - [`Lobby`]: seat assignment and role dealing before the game
//! - [`Game`]: the phase driver (police election, nights, days, death
//!   cascades, win check)
//! - [`RoleRoster`] / [`GameConfig`]: what is dealt and how long players
//!   get to answer
//! - [`merge_votes`] / [`top_candidates`], [`check_status`],
//!   [`NightLedger`], [`speaking_order`]: the pure rules, usable on their
//!   own
//!
//! # Key types
//!
//! - [`GamePhase`]: the phase state machine
//! - [`GameStatus`]: ongoing, or which side won
//! - [`GameError`]: configuration and lobby failures

mod config;
mod day;
mod death;
mod election;
mod error;
mod game;
mod lobby;
mod night;
mod roster;
mod rules;
mod vote;

pub use config::{GameConfig, GamePhase};
pub use error::GameError;
pub use game::Game;
pub use lobby::Lobby;
pub use roster::RoleRoster;
pub use rules::{GameStatus, NightLedger, check_status, speaking_order};
pub use vote::{POLICE_BONUS, merge_votes, top_candidates};
