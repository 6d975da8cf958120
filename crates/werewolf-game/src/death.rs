//! Death cascades.
//!
//! One death can cause more: a Hunter or King of Werewolves shoots on the
//! way out, and the shot player may be a Hunter too. The cascade is a
//! worklist processed in order until it is empty or the game is decided.

use std::collections::VecDeque;
use std::sync::Arc;

use werewolf_protocol::Seat;
use werewolf_session::DeathCause;

use crate::{Game, GamePhase};

/// A death waiting to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingDeath {
    pub seat: Seat,
    pub cause: DeathCause,
    pub final_words: bool,
}

impl PendingDeath {
    pub fn new(seat: Seat, cause: DeathCause, final_words: bool) -> Self {
        Self {
            seat,
            cause,
            final_words,
        }
    }
}

impl Game {
    /// Resolves `pending` and everything it triggers.
    pub(crate) async fn resolve_deaths(&mut self, pending: Vec<PendingDeath>) {
        let mut queue: VecDeque<PendingDeath> = pending.into();
        while let Some(PendingDeath {
            seat,
            cause,
            final_words,
        }) = queue.pop_front()
        {
            if !self.active.contains(&seat) {
                continue;
            }
            self.enter(GamePhase::DeathResolution);

            let timeout = self.config.final_words;
            let Some(player) = self.players.get_mut(&seat) else {
                continue;
            };
            let role = player.role();
            let Some(report) = player.on_dead(cause, final_words, timeout).await else {
                self.broadcast(&format!(
                    "Seat {} is the Idiot and survives the exile, but may no longer vote.",
                    seat.0
                ));
                continue;
            };

            self.active.remove(&seat);
            let peer = Arc::clone(self.players[&seat].peer());
            for other in self.players.values_mut() {
                other.remove_from_pack(&peer);
            }
            if !matches!(cause, DeathCause::Wolves | DeathCause::Poison) {
                self.broadcast(&format!("Seat {} is dead: {cause}.", seat.0));
            }
            if let Some(words) = &report.final_words {
                self.broadcast(&format!("Final words of seat {}: {words}", seat.0));
            }
            if self.police == Some(seat) {
                self.pass_badge(seat, report.successor);
            }

            self.update_status();
            if self.status.is_over() {
                break;
            }

            if role.strategy().retaliates() && cause != DeathCause::Poison {
                let shot = self.players[&seat]
                    .pick_seat(
                        "You may shoot one living seat. Reply its number, or -1 to hold fire.",
                        self.config.action,
                    )
                    .await
                    .filter(|target| self.active.contains(target));
                if let Some(target) = shot {
                    tracing::info!(shooter = %seat, %target, "retaliation");
                    self.broadcast(&format!("Seat {} shoots seat {}.", seat.0, target.0));
                    queue.push_back(PendingDeath::new(target, DeathCause::Shot, true));
                }
            }
        }
    }

    /// Hands the badge from the dead police to `successor`, or destroys it.
    fn pass_badge(&mut self, from: Seat, successor: Option<Seat>) {
        if let Some(old) = self.players.get_mut(&from) {
            old.set_police(false);
        }
        match successor.filter(|s| self.active.contains(s)) {
            Some(next) => {
                if let Some(player) = self.players.get_mut(&next) {
                    player.set_police(true);
                }
                self.police = Some(next);
                tracing::info!(%from, to = %next, "badge passed");
                self.broadcast(&format!("The police badge passes to seat {}.", next.0));
            }
            None => {
                self.police = None;
                tracing::info!(%from, "badge destroyed");
                self.broadcast("The police badge is destroyed.");
            }
        }
    }
}
