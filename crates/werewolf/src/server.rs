//! `WerewolfServer` builder and server loop.
//!
//! Ties the layers together: TCP transport, JSON codec, per-connection
//! peers, the lobby, and finally the game driver. One server runs one
//! game.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use werewolf_game::{GameConfig, GameError, GameStatus, Lobby, RoleRoster};
use werewolf_protocol::{Codec, JsonCodec};
use werewolf_session::{Peer, RoleKind};
use werewolf_transport::{TcpTransport, Transport};

use crate::WerewolfError;
use crate::handler::spawn_handshake;

/// Default listen address of the binary.
pub const DEFAULT_ADDR: &str = "0.0.0.0:21567";

/// Finished handshakes waiting for the lobby owner.
const JOIN_QUEUE: usize = 64;

/// Where the dealt roles come from.
#[derive(Debug, Clone)]
enum Seating {
    Preset(usize),
    Roster(RoleRoster),
    RosterJson(String),
    Assignment(Vec<RoleKind>),
}

/// Builder for configuring and starting a werewolf server.
///
/// # Example
///
/// ```rust,ignore
/// use werewolf::prelude::*;
///
/// let server = WerewolfServer::builder()
///     .bind("0.0.0.0:21567")
///     .preset(8)
///     .build()
///     .await?;
/// let status = server.run().await?;
/// ```
#[derive(Debug, Clone)]
pub struct WerewolfServerBuilder {
    bind_addr: String,
    config: GameConfig,
    seating: Seating,
    seed: Option<u64>,
}

impl WerewolfServerBuilder {
    /// A 12-player preset game on the default address.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            config: GameConfig::default(),
            seating: Seating::Preset(12),
            seed: None,
        }
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the answer timeouts.
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses one of the built-in rosters (6, 8, 10 or 12 players).
    pub fn preset(mut self, players: usize) -> Self {
        self.seating = Seating::Preset(players);
        self
    }

    /// Deals `roster` at random.
    pub fn roster(mut self, roster: RoleRoster) -> Self {
        self.seating = Seating::Roster(roster);
        self
    }

    /// Deals a roster given as a JSON role-count map, e.g.
    /// `{"Wolf": 2, "Villager": 2, "Witch": 1, "Predictor": 1}`.
    pub fn roster_json(mut self, json: &str) -> Self {
        self.seating = Seating::RosterJson(json.to_string());
        self
    }

    /// Fixes the roles by seat: seat 1 gets `roles[0]`, and so on.
    pub fn assignment(mut self, roles: Vec<RoleKind>) -> Self {
        self.seating = Seating::Assignment(roles);
        self
    }

    /// Seeds the game's random choices (dealing, tie-breaks).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the roster, then binds the listener.
    ///
    /// A bad roster fails with [`GameError::Configuration`] before any
    /// socket is opened.
    pub async fn build(self) -> Result<WerewolfServer, WerewolfError> {
        let handshake = self.config.handshake;
        let lobby = match self.seating {
            Seating::Preset(players) => Lobby::new(&RoleRoster::preset(players)?, self.config),
            Seating::Roster(roster) => Lobby::new(&roster, self.config),
            Seating::RosterJson(json) => Lobby::new(&RoleRoster::from_json(&json)?, self.config),
            Seating::Assignment(roles) => {
                if roles.is_empty() {
                    return Err(GameError::Configuration("no roles to assign".into()).into());
                }
                Lobby::with_assignment(roles, self.config)
            }
        };
        let lobby = match self.seed {
            Some(seed) => lobby.seeded(seed),
            None => lobby,
        };

        let transport = TcpTransport::bind(&self.bind_addr).await?;
        tracing::info!(
            addr = %self.bind_addr,
            seats = lobby.capacity(),
            "werewolf server ready"
        );

        Ok(WerewolfServer {
            transport,
            lobby,
            handshake,
            codec: Arc::new(JsonCodec),
        })
    }
}

impl Default for WerewolfServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound werewolf server.
///
/// Call [`run()`](Self::run) to fill the seats and play the game.
pub struct WerewolfServer {
    transport: TcpTransport,
    lobby: Lobby,
    handshake: Duration,
    codec: Arc<dyn Codec>,
}

impl WerewolfServer {
    /// Creates a new builder.
    pub fn builder() -> WerewolfServerBuilder {
        WerewolfServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs until the game is over and returns who won.
    pub async fn run(self) -> Result<GameStatus, WerewolfError> {
        self.run_until(CancellationToken::new())
            .await?
            .ok_or(WerewolfError::Game(GameError::Abandoned))
    }

    /// Like [`run`](Self::run), but returns `Ok(None)` once `shutdown` is
    /// cancelled, whether the game has started or not.
    pub async fn run_until(
        mut self,
        shutdown: CancellationToken,
    ) -> Result<Option<GameStatus>, WerewolfError> {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (joined_tx, mut joined_rx) = mpsc::channel::<Arc<Peer>>(JOIN_QUEUE);

        tracing::info!(seats = self.lobby.capacity(), "waiting for players");
        while !self.lobby.is_full() {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(seated = self.lobby.len(), "shutdown before the game started");
                    return Ok(None);
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => spawn_handshake(
                        conn,
                        Arc::clone(&self.codec),
                        signals_tx.clone(),
                        self.handshake,
                        joined_tx.clone(),
                    ),
                    Err(e) => tracing::error!(error = %e, "accept failed"),
                },
                Some(peer) = joined_rx.recv() => {
                    let conn_id = peer.id();
                    match self.lobby.admit(Arc::clone(&peer)) {
                        Ok(seat) => tracing::debug!(%conn_id, %seat, "handshake seated"),
                        Err(e) => {
                            tracing::warn!(%conn_id, error = %e, "player turned away");
                            peer.close().await;
                        }
                    }
                }
            }
        }

        // Late handshakes find the queue closed and hang up.
        drop(joined_rx);
        drop(signals_tx);
        if let Err(e) = self.transport.shutdown().await {
            tracing::debug!(error = %e, "transport shutdown failed");
        }
        drop(self.transport);

        let mut game = self.lobby.activate(signals_rx)?;
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(day = game.day(), "shutdown during the game");
                Ok(None)
            }
            status = game.run() => Ok(Some(status?)),
        }
    }
}
