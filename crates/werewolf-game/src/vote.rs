//! Ballot counting.

use std::collections::BTreeMap;

use werewolf_protocol::Seat;

/// Extra weight the police ballot carries on top of a normal vote.
pub const POLICE_BONUS: f64 = 0.5;

/// Tallies ballots into seat → weight.
///
/// Every vote counts 1.0. `police_vote` is the candidate the police voted
/// for (already present in `votes`); if that candidate is in the tally it
/// gains [`POLICE_BONUS`], so the police ballot weighs 1.5 in total.
pub fn merge_votes(votes: &[Seat], police_vote: Option<Seat>) -> BTreeMap<Seat, f64> {
    let mut tally = BTreeMap::new();
    for seat in votes {
        *tally.entry(*seat).or_insert(0.0) += 1.0;
    }
    if let Some(weight) = police_vote.and_then(|seat| tally.get_mut(&seat)) {
        *weight += POLICE_BONUS;
    }
    tally
}

/// The seats holding the maximum weight, ascending. Empty for an empty tally.
pub fn top_candidates(tally: &BTreeMap<Seat, f64>) -> Vec<Seat> {
    let Some(max) = tally.values().copied().reduce(f64::max) else {
        return Vec::new();
    };
    tally
        .iter()
        .filter(|(_, weight)| **weight == max)
        .map(|(seat, _)| *seat)
        .collect()
}
