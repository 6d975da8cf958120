//! Seat assignment before the game starts.
//!
//! The lobby is owned by a single task (the server's lobby owner). It
//! hands out the lowest free seat to each client that completes the
//! handshake, tells the client its identity, and once every seat is taken
//! turns itself into a [`Game`].

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use werewolf_protocol::Seat;
use werewolf_session::{Peer, PlayerSession, RoleKind, Signal};

use crate::{Game, GameConfig, GameError, RoleRoster};

/// Players waiting for the game to start.
pub struct Lobby {
    config: GameConfig,
    /// `roles[n]` is dealt to seat `n + 1`.
    roles: Vec<RoleKind>,
    seats: BTreeMap<Seat, PlayerSession>,
    active: bool,
    rng: StdRng,
}

impl Lobby {
    /// A lobby dealing a freshly shuffled roster.
    pub fn new(roster: &RoleRoster, config: GameConfig) -> Self {
        let mut rng = StdRng::from_os_rng();
        let roles = roster.deal(&mut rng);
        tracing::debug!(
            seats = roles.len(),
            wolves = roster.count(RoleKind::Wolf),
            villagers = roster.count(RoleKind::Villager),
            "roster dealt"
        );
        Self {
            config,
            roles,
            seats: BTreeMap::new(),
            active: false,
            rng,
        }
    }

    /// A lobby with a fixed deal: seat 1 gets `roles[0]`, and so on.
    pub fn with_assignment(roles: Vec<RoleKind>, config: GameConfig) -> Self {
        Self {
            config,
            roles,
            seats: BTreeMap::new(),
            active: false,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Makes tie-breaks and death ordering reproducible.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn capacity(&self) -> usize {
        self.roles.len()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.roles.len()
    }

    /// Seats a client and sends it `establish-response`.
    ///
    /// Seats whose client already dropped are freed first, so a client
    /// that vanished before the game began does not hold a seat.
    ///
    /// # Errors
    /// - [`GameError::AlreadyActive`] after [`activate`](Self::activate)
    /// - [`GameError::LobbyFull`] when every seat is taken
    pub fn admit(&mut self, peer: Arc<Peer>) -> Result<Seat, GameError> {
        if self.active {
            return Err(GameError::AlreadyActive);
        }
        self.seats.retain(|seat, player| {
            let keep = player.peer().is_connected();
            if !keep {
                tracing::info!(%seat, "freeing seat of disconnected client");
            }
            keep
        });
        if self.is_full() {
            return Err(GameError::LobbyFull(self.capacity()));
        }

        let seat = (1..)
            .map(Seat)
            .find(|seat| !self.seats.contains_key(seat))
            .ok_or(GameError::LobbyFull(self.capacity()))?;
        let role = self.roles[(seat.0 - 1) as usize];

        let player = PlayerSession::new(seat, role, peer);
        player.inform_identity();
        tracing::info!(
            %seat,
            conn_id = %player.peer().id(),
            filled = self.seats.len() + 1,
            capacity = self.capacity(),
            "player seated"
        );
        self.seats.insert(seat, player);
        Ok(seat)
    }

    /// Locks the lobby and starts a game with everyone seated.
    ///
    /// Wires every wolf-family player's pack to its siblings. `signals`
    /// is the receiving end of the channel given to every [`Peer`].
    ///
    /// # Errors
    /// - [`GameError::NotReady`] while seats are empty
    /// - [`GameError::AlreadyActive`] on a second call
    pub fn activate(
        &mut self,
        signals: mpsc::UnboundedReceiver<Signal>,
    ) -> Result<Game, GameError> {
        if self.active {
            return Err(GameError::AlreadyActive);
        }
        if !self.is_full() {
            return Err(GameError::NotReady {
                filled: self.seats.len(),
                capacity: self.capacity(),
            });
        }
        self.active = true;

        let mut players = std::mem::take(&mut self.seats);
        let wolves: Vec<(Seat, Arc<Peer>)> = players
            .values()
            .filter(|p| p.role().is_wolf_family())
            .map(|p| (p.seat(), Arc::clone(p.peer())))
            .collect();
        for player in players.values_mut() {
            if player.role().is_wolf_family() {
                let pack = wolves
                    .iter()
                    .filter(|(seat, _)| *seat != player.seat())
                    .map(|(_, peer)| Arc::clone(peer))
                    .collect();
                player.set_pack(pack);
            }
        }

        tracing::info!(players = players.len(), wolves = wolves.len(), "lobby activated");
        Ok(Game::new(
            self.config.clone(),
            players,
            signals,
            self.rng.clone(),
        ))
    }
}
