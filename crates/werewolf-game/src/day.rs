//! Day: dawn deaths, discussion, and the exile vote.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use werewolf_protocol::Seat;
use werewolf_session::{DeathCause, PlayerSession, Signal};
use werewolf_transport::ConnectionId;

use crate::death::PendingDeath;
use crate::game::seat_list;
use crate::rules::speaking_order;
use crate::vote::{merge_votes, top_candidates};
use crate::{Game, GamePhase};

/// How one discussion turn ended.
enum Turn {
    Spoke(Option<String>),
    Interrupted(Seat),
}

impl Game {
    /// Runs the day that follows a night with `deaths`.
    pub(crate) async fn day_time(&mut self, deaths: Vec<(Seat, DeathCause)>) {
        self.day += 1;
        tracing::info!(day = self.day, deaths = deaths.len(), "day begins");

        self.enter(GamePhase::DeathResolution);
        let victims: Vec<Seat> = deaths.iter().map(|(seat, _)| *seat).collect();
        if victims.is_empty() {
            self.broadcast(&format!("Day {}: it was a peaceful night.", self.day));
        } else {
            self.broadcast(&format!(
                "Day {}: seat(s) {} died last night.",
                self.day,
                seat_list(&victims)
            ));
        }
        let first_night = self.night == 1;
        self.resolve_deaths(
            deaths
                .into_iter()
                .map(|(seat, cause)| PendingDeath::new(seat, cause, first_night))
                .collect(),
        )
        .await;
        if self.status.is_over() {
            return;
        }

        self.enter(GamePhase::Day);
        let anchor = match victims.as_slice() {
            [lone] => Some(*lone),
            _ => self.police,
        };
        let clockwise = match self.police {
            Some(police) => self.players[&police]
                .choose_direction(self.config.action)
                .await
                .unwrap_or(true),
            None => true,
        };
        let order = speaking_order(&self.active, anchor, clockwise);
        self.broadcast(&format!("Discussion order: {}.", seat_list(&order)));

        if self.discussion(&order).await {
            return;
        }
        self.exile_vote().await;
    }

    /// Gives each seat in `order` the floor. Returns `true` if a wolf
    /// self-destructed, which ends the day without a vote.
    async fn discussion(&mut self, order: &[Seat]) -> bool {
        // Signals sent outside the discussion are void.
        while self.signals.try_recv().is_ok() {}

        for &seat in order {
            if !self.active.contains(&seat) {
                continue;
            }
            let turn = {
                let speech = self.players[&seat].speak(self.config.speech);
                tokio::pin!(speech);
                loop {
                    tokio::select! {
                        words = &mut speech => break Turn::Spoke(words),
                        Some(signal) = self.signals.recv() => {
                            match self_destructing_wolf(&self.players, &self.active, &self.connections, &signal) {
                                Some(wolf) => break Turn::Interrupted(wolf),
                                None => tracing::debug!(conn_id = %signal.connection, "ignoring self-destruct"),
                            }
                        }
                    }
                }
            };
            match turn {
                Turn::Spoke(words) => self.announce_speech(seat, words),
                Turn::Interrupted(wolf) => {
                    self.self_destruct(wolf).await;
                    return true;
                }
            }
        }
        false
    }

    /// A wolf reveals itself. A White Werewolf may take one seat along.
    async fn self_destruct(&mut self, wolf: Seat) {
        tracing::info!(%wolf, "self-destruct");
        for player in self.players.values() {
            player.inform_self_destruct(wolf);
        }
        self.broadcast(&format!(
            "Seat {} self-destructs. The day ends without a vote.",
            wolf.0
        ));

        let mut deaths = vec![PendingDeath::new(wolf, DeathCause::SelfDestruct, false)];
        if self.players[&wolf].role() == werewolf_session::RoleKind::WhiteWerewolf {
            let taken = self.players[&wolf]
                .pick_seat(
                    "Choose a living seat to take with you, or -1 to go alone.",
                    self.config.action,
                )
                .await
                .filter(|seat| *seat != wolf && self.active.contains(seat));
            if let Some(seat) = taken {
                self.broadcast(&format!("The White Werewolf takes seat {} along.", seat.0));
                deaths.push(PendingDeath::new(seat, DeathCause::Explosion, true));
            }
        }
        self.resolve_deaths(deaths).await;
    }

    /// The exile vote, with one re-vote among tied candidates.
    async fn exile_vote(&mut self) {
        let mut voters: Vec<Seat> = self
            .active
            .iter()
            .copied()
            .filter(|seat| self.players[seat].can_vote())
            .collect();
        let mut candidates: BTreeSet<Seat> = self.active.clone();

        for round in 1..=2 {
            let (votes, police_vote) = self
                .collect_votes(&voters, &candidates, "Vote for the seat to exile.")
                .await;
            let top = top_candidates(&merge_votes(&votes, police_vote));
            match top.as_slice() {
                [] => {
                    self.broadcast("Nobody voted: no one is exiled today.");
                    return;
                }
                [exiled] => {
                    let exiled = *exiled;
                    tracing::info!(%exiled, round, "exile");
                    self.broadcast(&format!("Seat {} is exiled.", exiled.0));
                    self.resolve_deaths(vec![PendingDeath::new(exiled, DeathCause::Exile, true)])
                        .await;
                    return;
                }
                tied if round == 1 => {
                    self.broadcast(&format!(
                        "Tie between seats {}. Re-vote; the tied seats do not vote.",
                        seat_list(tied)
                    ));
                    candidates = tied.iter().copied().collect();
                    voters.retain(|seat| !candidates.contains(seat));
                }
                _ => {}
            }
        }
        tracing::info!(day = self.day, "exile vote tied twice");
        self.broadcast("The vote is tied again: no one is exiled today.");
    }
}

/// The seat behind a self-destruct signal, if it may self-destruct: a
/// living wolf-family player on a known connection.
fn self_destructing_wolf(
    players: &BTreeMap<Seat, PlayerSession>,
    active: &BTreeSet<Seat>,
    connections: &HashMap<ConnectionId, Seat>,
    signal: &Signal,
) -> Option<Seat> {
    let seat = *connections.get(&signal.connection)?;
    let player = players.get(&seat)?;
    (active.contains(&seat) && player.role().is_wolf_family()).then_some(seat)
}
