//! The police election, held once before the first night.

use std::collections::BTreeSet;

use futures_util::future::join_all;
use werewolf_protocol::Seat;

use crate::game::seat_list;
use crate::vote::{merge_votes, top_candidates};
use crate::{Game, GamePhase};

impl Game {
    /// Elects the police.
    ///
    /// Everyone is asked to run at once. With no candidates, or with every
    /// player running (nobody left to vote), the game has no police.
    /// Otherwise candidates speak in seat order and the rest vote; a tie
    /// gets one more round among the tied candidates, and a second tie
    /// leaves the game without police.
    pub(crate) async fn elect_police(&mut self) {
        self.enter(GamePhase::ElectingPolice);
        self.broadcast("Police election: reply true to run for police.");

        let timeout = self.config.action;
        let sign_ups = join_all(self.active.iter().map(|seat| {
            let player = &self.players[seat];
            async move { (player.seat(), player.join_election(timeout).await) }
        }))
        .await;
        let candidates: BTreeSet<Seat> = sign_ups
            .into_iter()
            .filter_map(|(seat, runs)| runs.then_some(seat))
            .collect();

        if candidates.is_empty() || candidates.len() == self.active.len() {
            tracing::info!(candidates = candidates.len(), "no police election");
            self.broadcast("Nobody can be elected: this game has no police.");
            return;
        }

        let voters: Vec<Seat> = self
            .active
            .iter()
            .copied()
            .filter(|seat| !candidates.contains(seat) && self.players[seat].can_vote())
            .collect();

        let mut contenders = candidates;
        for round in 1..=2 {
            let listed: Vec<Seat> = contenders.iter().copied().collect();
            self.broadcast(&format!(
                "Police election round {round}. Candidates: {}.",
                seat_list(&listed)
            ));
            for seat in &listed {
                let words = self.players[seat].speak(self.config.speech).await;
                self.announce_speech(*seat, words);
            }

            let (votes, _) = self
                .collect_votes(&voters, &contenders, "Vote for the police.")
                .await;
            let top = top_candidates(&merge_votes(&votes, None));
            match top.as_slice() {
                [winner] => {
                    let winner = *winner;
                    self.police = Some(winner);
                    if let Some(player) = self.players.get_mut(&winner) {
                        player.set_police(true);
                    }
                    tracing::info!(police = %winner, round, "police elected");
                    self.broadcast(&format!("Seat {} is elected police.", winner.0));
                    return;
                }
                [] => break,
                tied => {
                    tracing::debug!(round, ?tied, "police election tied");
                    contenders = tied.iter().copied().collect();
                }
            }
        }

        tracing::info!("police election failed");
        self.broadcast("The election ended without a winner: this game has no police.");
    }

    /// Broadcasts one speech, or the speaker's silence.
    pub(crate) fn announce_speech(&self, seat: Seat, words: Option<String>) {
        match words {
            Some(words) => self.broadcast(&format!("Seat {}: {words}", seat.0)),
            None => self.broadcast(&format!("Seat {} said nothing.", seat.0)),
        }
    }
}
