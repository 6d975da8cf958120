//! Role rosters: how many of each role a game deals.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use werewolf_session::RoleKind;

use crate::GameError;

/// A validated role → count map.
///
/// At least one Villager and one Wolf; every other role at most once.
///
/// ```
/// use werewolf_game::RoleRoster;
///
/// let roster = RoleRoster::from_json(r#"{"Villager": 2, "Wolf": 2, "Witch": 1, "Predictor": 1}"#)
///     .unwrap();
/// assert_eq!(roster.player_count(), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRoster {
    counts: BTreeMap<RoleKind, usize>,
}

impl RoleRoster {
    /// Validates a role map.
    ///
    /// # Errors
    /// [`GameError::Configuration`] when a rule is broken.
    pub fn new(counts: BTreeMap<RoleKind, usize>) -> Result<Self, GameError> {
        let count = |role| counts.get(&role).copied().unwrap_or(0);
        if count(RoleKind::Villager) < 1 {
            return Err(GameError::Configuration(
                "at least one Villager is required".into(),
            ));
        }
        if count(RoleKind::Wolf) < 1 {
            return Err(GameError::Configuration(
                "at least one Wolf is required".into(),
            ));
        }
        if let Some((role, n)) = counts
            .iter()
            .find(|(role, n)| !matches!(role, RoleKind::Villager | RoleKind::Wolf) && **n > 1)
        {
            return Err(GameError::Configuration(format!(
                "{role} may appear at most once, got {n}"
            )));
        }
        let counts = counts.into_iter().filter(|(_, n)| *n > 0).collect();
        Ok(Self { counts })
    }

    /// Parses and validates a JSON object keyed by role name.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let counts: BTreeMap<RoleKind, usize> = serde_json::from_str(json)
            .map_err(|e| GameError::Configuration(format!("bad roster: {e}")))?;
        Self::new(counts)
    }

    /// One of the built-in tables for 6, 8, 10 or 12 players.
    pub fn preset(players: usize) -> Result<Self, GameError> {
        use RoleKind::*;
        let table: &[(RoleKind, usize)] = match players {
            6 => &[(Villager, 2), (Wolf, 2), (Witch, 1), (Predictor, 1)],
            8 => &[
                (Villager, 3),
                (Wolf, 2),
                (Predictor, 1),
                (Witch, 1),
                (Hunter, 1),
            ],
            10 => &[
                (Villager, 3),
                (Wolf, 3),
                (Predictor, 1),
                (Witch, 1),
                (Hunter, 1),
                (Guard, 1),
            ],
            12 => &[
                (Villager, 4),
                (Wolf, 3),
                (Predictor, 1),
                (Witch, 1),
                (Hunter, 1),
                (Guard, 1),
                (WhiteWerewolf, 1),
            ],
            other => {
                return Err(GameError::Configuration(format!(
                    "no preset for {other} players (use 6, 8, 10 or 12)"
                )));
            }
        };
        Self::new(table.iter().copied().collect())
    }

    /// Total number of seats.
    pub fn player_count(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count(&self, role: RoleKind) -> usize {
        self.counts.get(&role).copied().unwrap_or(0)
    }

    /// One role per seat, shuffled.
    pub fn deal<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<RoleKind> {
        let mut pool: Vec<RoleKind> = self
            .counts
            .iter()
            .flat_map(|(role, n)| std::iter::repeat_n(*role, *n))
            .collect();
        pool.shuffle(rng);
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_preset_player_counts() {
        for n in [6, 8, 10, 12] {
            assert_eq!(RoleRoster::preset(n).unwrap().player_count(), n);
        }
        assert!(matches!(
            RoleRoster::preset(7),
            Err(GameError::Configuration(_))
        ));
    }

    #[test]
    fn test_new_requires_villager_and_wolf() {
        let no_wolf = BTreeMap::from([(RoleKind::Villager, 3)]);
        assert!(matches!(
            RoleRoster::new(no_wolf),
            Err(GameError::Configuration(m)) if m.contains("Wolf")
        ));
        let no_villager = BTreeMap::from([(RoleKind::Wolf, 2), (RoleKind::Witch, 1)]);
        assert!(RoleRoster::new(no_villager).is_err());
    }

    #[test]
    fn test_new_special_roles_at_most_once() {
        let two_witches = BTreeMap::from([
            (RoleKind::Villager, 2),
            (RoleKind::Wolf, 2),
            (RoleKind::Witch, 2),
        ]);
        assert!(matches!(
            RoleRoster::new(two_witches),
            Err(GameError::Configuration(m)) if m.contains("Witch")
        ));
    }

    #[test]
    fn test_from_json_accepts_king_alias() {
        let roster =
            RoleRoster::from_json(r#"{"Villager": 3, "Wolf": 2, "KingofWerewolf": 1, "Hunter": 1}"#)
                .unwrap();
        assert_eq!(roster.count(RoleKind::KingOfWerewolves), 1);
        assert_eq!(roster.player_count(), 7);
    }

    #[test]
    fn test_from_json_unknown_role_is_configuration_error() {
        assert!(matches!(
            RoleRoster::from_json(r#"{"Villager": 1, "Wolf": 1, "Vampire": 1}"#),
            Err(GameError::Configuration(_))
        ));
    }

    #[test]
    fn test_deal_yields_every_role_once_per_seat() {
        let roster = RoleRoster::preset(12).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = roster.deal(&mut rng);
        assert_eq!(pool.len(), 12);
        pool.sort();
        let villagers = pool.iter().filter(|r| **r == RoleKind::Villager).count();
        let wolves = pool.iter().filter(|r| **r == RoleKind::Wolf).count();
        assert_eq!((villagers, wolves), (4, 3));
        assert!(pool.contains(&RoleKind::WhiteWerewolf));
    }
}
