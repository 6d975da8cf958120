//! Night: the wolves hunt, then each skilled role acts in turn.

use futures_util::future::join_all;
use rand::seq::{IndexedRandom, SliceRandom};
use tokio::time::Instant;
use werewolf_protocol::Seat;
use werewolf_session::{DeathCause, RoleKind, SkillContext, WITCH_ANTIDOTE, WITCH_POISON};

use crate::rules::NightLedger;
use crate::vote::{merge_votes, top_candidates};
use crate::{Game, GamePhase};

impl Game {
    /// Runs one night and returns its deaths in random order.
    ///
    /// Nobody dies here; the deaths are resolved at dawn by `day_time`.
    pub(crate) async fn night_time(&mut self) -> Vec<(Seat, DeathCause)> {
        self.enter(GamePhase::Night);
        self.night += 1;
        tracing::info!(night = self.night, alive = self.active.len(), "night begins");
        self.broadcast(&format!("Night {} falls. Everyone closes their eyes.", self.night));

        let victim = self.wolf_round().await;
        let mut ledger = NightLedger::new(victim);
        self.predictor_round().await;
        self.witch_round(&mut ledger).await;
        self.guard_round(&mut ledger).await;

        let mut deaths = ledger.into_deaths();
        deaths.shuffle(&mut self.rng);
        tracing::debug!(night = self.night, ?deaths, "night resolved");
        deaths
    }

    fn skill_context(&self, victim: Option<Seat>) -> SkillContext {
        SkillContext {
            victim,
            night: self.night,
            last_guarded: self.last_guarded,
        }
    }

    /// All living wolves pick a target before one shared deadline. The
    /// most-picked living seat is the victim; ties are broken at random.
    async fn wolf_round(&mut self) -> Option<Seat> {
        let wolves: Vec<Seat> = self
            .active
            .iter()
            .copied()
            .filter(|seat| self.players[seat].role().is_wolf_family())
            .collect();
        if wolves.is_empty() {
            return None;
        }

        for seat in &wolves {
            if self.players[seat].pack_len() == 0 {
                self.players[seat].inform("You hunt alone tonight.");
            }
        }
        let deadline = Instant::now() + self.config.wolf_chat;
        let picks = join_all(wolves.iter().map(|seat| self.players[seat].kill(deadline))).await;
        let targets: Vec<Seat> = picks
            .into_iter()
            .flatten()
            .filter(|seat| self.active.contains(seat))
            .collect();

        let top = top_candidates(&merge_votes(&targets, None));
        let victim = top.choose(&mut self.rng).copied();

        let message = match victim {
            Some(seat) => format!("The pack chose seat {}.", seat.0),
            None => "The pack could not agree on a victim.".to_string(),
        };
        for seat in &wolves {
            self.players[seat].inform(&message);
        }
        tracing::debug!(?victim, picks = targets.len(), "wolves chose");
        victim
    }

    /// The predictor learns whether one living seat is a wolf.
    async fn predictor_round(&mut self) {
        let Some(seat) = self.active_with_role(RoleKind::Predictor) else {
            return;
        };
        let ctx = self.skill_context(None);
        let predictor = &self.players[&seat];
        let Some(reply) = predictor.skill(&ctx, self.config.action).await else {
            return;
        };
        let Some(target) = Seat::from_wire(reply.target).filter(|t| self.active.contains(t)) else {
            predictor.inform("That is not a living seat; nothing was learned.");
            return;
        };
        let is_wolf = self.players[&target].role().is_wolf_family();
        predictor.reveal(target, is_wolf);
        tracing::debug!(predictor = %seat, %target, is_wolf, "inspection");
    }

    /// Antidote (`0`), poison (a seat) or nothing (`-1`).
    async fn witch_round(&mut self, ledger: &mut NightLedger) {
        let Some(seat) = self.active_with_role(RoleKind::Witch) else {
            return;
        };
        let victim = ledger.attacked();
        let ctx = self.skill_context(victim);
        let witch = &self.players[&seat];
        let used = witch.used();
        let Some(reply) = witch.skill(&ctx, self.config.action).await else {
            return;
        };

        let spent = match reply.target {
            0 if used & WITCH_ANTIDOTE == 0 => match victim {
                Some(victim) if victim == seat && self.night > 1 => {
                    witch.inform("You can only save yourself on the first night.");
                    0
                }
                Some(victim) => {
                    ledger.revive();
                    tracing::debug!(witch = %seat, %victim, "antidote used");
                    WITCH_ANTIDOTE
                }
                None => 0,
            },
            target if target > 0 && used & WITCH_POISON == 0 => {
                match Seat::from_wire(target).filter(|t| self.active.contains(t)) {
                    Some(target) => {
                        ledger.poison(target);
                        tracing::debug!(witch = %seat, %target, "poison used");
                        WITCH_POISON
                    }
                    None => 0,
                }
            }
            _ => 0,
        };
        if spent != 0 {
            if let Some(witch) = self.players.get_mut(&seat) {
                witch.record_skill(spent);
            }
        }
    }

    /// The guard protects one living seat, never the same one twice in a row.
    async fn guard_round(&mut self, ledger: &mut NightLedger) {
        let Some(seat) = self.active_with_role(RoleKind::Guard) else {
            self.last_guarded = None;
            return;
        };
        let ctx = self.skill_context(None);
        let guard = &self.players[&seat];
        let target = guard
            .skill(&ctx, self.config.action)
            .await
            .and_then(|reply| Seat::from_wire(reply.target))
            .filter(|t| self.active.contains(t));

        match target {
            Some(target) if Some(target) == self.last_guarded => {
                guard.inform("You cannot protect the same seat two nights in a row.");
                self.last_guarded = None;
            }
            Some(target) => {
                ledger.guard(target);
                self.last_guarded = Some(target);
                tracing::debug!(guard = %seat, %target, "protected");
            }
            None => self.last_guarded = None,
        }
    }
}
