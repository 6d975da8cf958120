//! The game driver.
//!
//! A [`Game`] is one async task that owns every piece of game state. It
//! fans requests out to players concurrently, joins on all of them, and
//! only then mutates state, so there is never more than one writer.
//!
//! The phases live in their own modules as further `impl Game` blocks:
//! `election`, `night`, `day` and `death`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures_util::future::join_all;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use werewolf_protocol::Seat;
use werewolf_session::{PlayerSession, Signal};
use werewolf_transport::ConnectionId;

use crate::rules::{GameStatus, check_status};
use crate::{GameConfig, GameError, GamePhase};

/// A running game.
pub struct Game {
    pub(crate) config: GameConfig,
    /// Every seated player, dead or alive.
    pub(crate) players: BTreeMap<Seat, PlayerSession>,
    /// The living subset of `players`.
    pub(crate) active: BTreeSet<Seat>,
    pub(crate) connections: HashMap<ConnectionId, Seat>,
    pub(crate) signals: mpsc::UnboundedReceiver<Signal>,
    pub(crate) phase: GamePhase,
    pub(crate) day: u32,
    pub(crate) night: u32,
    pub(crate) last_guarded: Option<Seat>,
    pub(crate) police: Option<Seat>,
    pub(crate) status: GameStatus,
    pub(crate) rng: StdRng,
}

impl Game {
    pub(crate) fn new(
        config: GameConfig,
        players: BTreeMap<Seat, PlayerSession>,
        signals: mpsc::UnboundedReceiver<Signal>,
        rng: StdRng,
    ) -> Self {
        let active = players.keys().copied().collect();
        let connections = players
            .values()
            .map(|p| (p.peer().id(), p.seat()))
            .collect();
        Self {
            config,
            players,
            active,
            connections,
            signals,
            phase: GamePhase::PreGame,
            day: 0,
            night: 0,
            last_guarded: None,
            police: None,
            status: GameStatus::Ongoing,
            rng,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn police(&self) -> Option<Seat> {
        self.police
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn night(&self) -> u32 {
        self.night
    }

    /// Living seats, ascending.
    pub fn active(&self) -> &BTreeSet<Seat> {
        &self.active
    }

    pub fn player(&self, seat: Seat) -> Option<&PlayerSession> {
        self.players.get(&seat)
    }

    /// Plays the game to the end.
    ///
    /// Elects the police, then alternates nights and days until one side
    /// wins. Every player then gets their result and all connections are
    /// closed after their queues flush.
    ///
    /// # Errors
    /// [`GameError::Abandoned`] when a night is about to begin and no
    /// seated player is connected any more.
    pub async fn run(&mut self) -> Result<GameStatus, GameError> {
        tracing::info!(players = self.players.len(), "game started");
        self.broadcast(&format!(
            "The game begins with {} players.",
            self.players.len()
        ));

        self.elect_police().await;

        while !self.status.is_over() {
            if !self.anyone_connected() {
                tracing::warn!(night = self.night + 1, "every player disconnected");
                self.enter(GamePhase::GameOver);
                self.close_all().await;
                return Err(GameError::Abandoned);
            }
            let deaths = self.night_time().await;
            self.day_time(deaths).await;
        }

        self.finish().await;
        Ok(self.status)
    }

    /// Sends every player (alive or dead) their result, a closing
    /// announcement, then closes all connections.
    pub(crate) async fn finish(&mut self) {
        self.enter(GamePhase::GameOver);
        tracing::info!(status = %self.status, code = self.status.code(), "game over");

        for player in self.players.values() {
            player.inform_result(self.status.is_winner(player.role()));
        }
        let reveal: Vec<String> = self
            .players
            .values()
            .map(|p| {
                let state = if p.is_alive() { "" } else { " (dead)" };
                format!("seat {} {}{state}", p.seat().0, p.role())
            })
            .collect();
        self.broadcast(&format!(
            "Game over: {}. Roles: {}.",
            self.status,
            reveal.join(", ")
        ));

        self.close_all().await;
    }

    async fn close_all(&self) {
        join_all(self.players.values().map(|p| p.peer().close())).await;
    }

    fn anyone_connected(&self) -> bool {
        self.active
            .iter()
            .any(|seat| self.players[seat].peer().is_connected())
    }

    // -----------------------------------------------------------------------
    // Helpers shared by the phase modules
    // -----------------------------------------------------------------------

    /// Moves to `next`. Staying in the same phase is a no-op.
    pub(crate) fn enter(&mut self, next: GamePhase) {
        if self.phase == next {
            return;
        }
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!(from = %self.phase, to = %next, "phase change");
        self.phase = next;
    }

    /// Announces `content` to every seated player, dead ones included.
    pub(crate) fn broadcast(&self, content: &str) {
        tracing::debug!(content, "broadcast");
        for player in self.players.values() {
            player.inform(content);
        }
    }

    /// Re-evaluates the win condition. A decided game stays decided.
    pub(crate) fn update_status(&mut self) {
        if self.status.is_over() {
            return;
        }
        self.status = check_status(self.active.iter().map(|seat| self.players[seat].role()));
        if self.status.is_over() {
            tracing::info!(status = %self.status, "win condition reached");
        }
    }

    /// The living player holding `role`, if any.
    pub(crate) fn active_with_role(&self, role: werewolf_session::RoleKind) -> Option<Seat> {
        self.active
            .iter()
            .copied()
            .find(|seat| self.players[seat].role() == role)
    }

    /// Collects ballots from `voters` concurrently.
    ///
    /// Returns the valid votes (for one of `candidates`) and the police's
    /// vote if the police cast a valid one.
    pub(crate) async fn collect_votes(
        &self,
        voters: &[Seat],
        candidates: &BTreeSet<Seat>,
        prompt: &str,
    ) -> (Vec<Seat>, Option<Seat>) {
        let timeout = self.config.vote;
        let ballots = join_all(voters.iter().map(|seat| {
            let player = &self.players[seat];
            async move { (player.seat(), player.vote(prompt, timeout).await) }
        }))
        .await;

        let mut votes = Vec::new();
        let mut police_vote = None;
        let mut lines = Vec::new();
        for (voter, choice) in ballots {
            match choice.filter(|c| candidates.contains(c)) {
                Some(choice) => {
                    if self.police == Some(voter) {
                        police_vote = Some(choice);
                    }
                    votes.push(choice);
                    lines.push(format!("seat {} → seat {}", voter.0, choice.0));
                }
                None => lines.push(format!("seat {} abstained", voter.0)),
            }
        }
        if !lines.is_empty() {
            self.broadcast(&format!("Votes: {}.", lines.join(", ")));
        }
        (votes, police_vote)
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("phase", &self.phase)
            .field("day", &self.day)
            .field("night", &self.night)
            .field("active", &self.active)
            .field("police", &self.police)
            .field("status", &self.status)
            .finish()
    }
}

pub(crate) fn seat_list(seats: &[Seat]) -> String {
    seats
        .iter()
        .map(|s| s.0.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
