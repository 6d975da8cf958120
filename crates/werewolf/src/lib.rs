//! # Werewolf
//!
//! A server for the Werewolf (Mafia) party game, played by clients over
//! TCP with length-prefixed JSON packets.
//!
//! The server seats players as they connect, deals hidden roles, and then
//! drives the whole game: police election, nights (wolves, predictor,
//! witch, guard), days (deaths, discussion, exile vote) and the final
//! result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use werewolf::prelude::*;
//!
//! # async fn start() -> Result<(), WerewolfError> {
//! let server = WerewolfServer::builder()
//!     .bind("0.0.0.0:21567")
//!     .preset(6)
//!     .build()
//!     .await?;
//! let status = server.run().await?;
//! println!("{status}");
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::WerewolfError;
pub use server::{DEFAULT_ADDR, WerewolfServer, WerewolfServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{DEFAULT_ADDR, WerewolfError, WerewolfServer, WerewolfServerBuilder};
    pub use werewolf_game::{GameConfig, GameError, GameStatus, RoleRoster};
    pub use werewolf_protocol::{Packet, PacketKind, Seat};
    pub use werewolf_session::RoleKind;
}
