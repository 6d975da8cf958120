//! Roles and their per-role behaviour.
//!
//! Every player has exactly one [`RoleKind`]. Behaviour that differs by
//! role (what the night prompt says, whether dying triggers a shot,
//! whether exile can be survived) lives behind the [`RoleStrategy`]
//! trait, with one zero-sized strategy per role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use werewolf_protocol::Seat;

/// Bit recorded in the witch's `used` counter once the antidote is gone.
pub const WITCH_ANTIDOTE: u32 = 1;
/// Bit recorded in the witch's `used` counter once the poison is gone.
pub const WITCH_POISON: u32 = 2;

// ---------------------------------------------------------------------------
// RoleKind
// ---------------------------------------------------------------------------

/// The nine roles a seat can be dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Villager,
    Wolf,
    #[serde(alias = "KingofWerewolf")]
    KingOfWerewolves,
    WhiteWerewolf,
    Predictor,
    Witch,
    Hunter,
    Guard,
    Idiot,
}

impl RoleKind {
    /// Every role, villagers first.
    pub const ALL: [RoleKind; 9] = [
        Self::Villager,
        Self::Wolf,
        Self::KingOfWerewolves,
        Self::WhiteWerewolf,
        Self::Predictor,
        Self::Witch,
        Self::Hunter,
        Self::Guard,
        Self::Idiot,
    ];

    /// The code sent to the client in `establish-response.identity`.
    pub fn identity(self) -> i64 {
        match self {
            Self::Villager => 0,
            Self::Wolf => -1,
            Self::WhiteWerewolf => -2,
            Self::KingOfWerewolves => -3,
            Self::Predictor => 1,
            Self::Witch => 2,
            Self::Hunter => 3,
            Self::Guard => 4,
            Self::Idiot => 5,
        }
    }

    /// Wolf, King of Werewolves and White Werewolf hunt together at night.
    pub fn is_wolf_family(self) -> bool {
        matches!(
            self,
            Self::Wolf | Self::KingOfWerewolves | Self::WhiteWerewolf
        )
    }

    /// Any non-villager role on the village side.
    pub fn is_skilled(self) -> bool {
        !self.is_wolf_family() && self != Self::Villager
    }

    /// The behaviour table entry for this role.
    pub fn strategy(self) -> &'static dyn RoleStrategy {
        match self {
            Self::Villager => &Villager,
            Self::Wolf => &Wolf,
            Self::KingOfWerewolves => &KingOfWerewolves,
            Self::WhiteWerewolf => &WhiteWerewolf,
            Self::Predictor => &Predictor,
            Self::Witch => &Witch,
            Self::Hunter => &Hunter,
            Self::Guard => &Guard,
            Self::Idiot => &Idiot,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Villager => "Villager",
            Self::Wolf => "Wolf",
            Self::KingOfWerewolves => "KingOfWerewolves",
            Self::WhiteWerewolf => "WhiteWerewolf",
            Self::Predictor => "Predictor",
            Self::Witch => "Witch",
            Self::Hunter => "Hunter",
            Self::Guard => "Guard",
            Self::Idiot => "Idiot",
        };
        f.write_str(name)
    }
}

impl FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KingofWerewolf" => Ok(Self::KingOfWerewolves),
            _ => Self::ALL
                .into_iter()
                .find(|role| role.to_string() == s)
                .ok_or_else(|| format!("unknown role '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Death causes and skill context
// ---------------------------------------------------------------------------

/// Why a seat is dying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeathCause {
    /// Killed by the wolves at night.
    Wolves,
    /// Poisoned by the witch.
    Poison,
    /// Voted out during the day.
    Exile,
    /// Shot by a dying Hunter or King of Werewolves.
    Shot,
    /// A wolf revealing itself during the discussion.
    SelfDestruct,
    /// Taken along by a self-destructing White Werewolf.
    Explosion,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Wolves => "killed at night",
            Self::Poison => "poisoned",
            Self::Exile => "exiled",
            Self::Shot => "shot",
            Self::SelfDestruct => "self-destructed",
            Self::Explosion => "taken by the White Werewolf",
        };
        f.write_str(text)
    }
}

/// What a role needs to know to word its night prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillContext {
    /// The wolves' pick for tonight, if any.
    pub victim: Option<Seat>,
    /// 1-based night counter.
    pub night: u32,
    /// The seat the guard protected last night.
    pub last_guarded: Option<Seat>,
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Role-specific behaviour.
///
/// `used` is the player's skill counter; its meaning is up to the role.
pub trait RoleStrategy: Send + Sync {
    /// The night prompt, or `None` when the role has nothing to do.
    fn skill_prompt(&self, used: u32, ctx: &SkillContext) -> Option<String>;

    /// Whether dying (other than by poison) lets this role shoot someone.
    fn retaliates(&self) -> bool {
        false
    }

    /// Whether an exile vote against this role is survived.
    fn survives_exile(&self, _used: u32) -> bool {
        false
    }
}

struct Villager;
struct Wolf;
struct KingOfWerewolves;
struct WhiteWerewolf;
struct Predictor;
struct Witch;
struct Hunter;
struct Guard;
struct Idiot;

impl RoleStrategy for Villager {
    fn skill_prompt(&self, _used: u32, _ctx: &SkillContext) -> Option<String> {
        None
    }
}

// The wolf kill is a pack action driven by `PlayerSession::kill`.
impl RoleStrategy for Wolf {
    fn skill_prompt(&self, _used: u32, _ctx: &SkillContext) -> Option<String> {
        None
    }
}

impl RoleStrategy for KingOfWerewolves {
    fn skill_prompt(&self, _used: u32, _ctx: &SkillContext) -> Option<String> {
        None
    }

    fn retaliates(&self) -> bool {
        true
    }
}

impl RoleStrategy for WhiteWerewolf {
    fn skill_prompt(&self, _used: u32, _ctx: &SkillContext) -> Option<String> {
        None
    }
}

impl RoleStrategy for Predictor {
    fn skill_prompt(&self, _used: u32, _ctx: &SkillContext) -> Option<String> {
        Some("Choose a seat to inspect tonight.".to_string())
    }
}

impl RoleStrategy for Witch {
    fn skill_prompt(&self, used: u32, ctx: &SkillContext) -> Option<String> {
        let victim = match ctx.victim {
            Some(seat) => format!("Seat {} was attacked tonight.", seat.0),
            None => "Nobody was attacked tonight.".to_string(),
        };
        let antidote = used & WITCH_ANTIDOTE == 0;
        let poison = used & WITCH_POISON == 0;
        match (antidote, poison) {
            (true, true) => Some(format!(
                "{victim} Reply 0 to use the antidote, a seat number to poison it, or -1 to do nothing."
            )),
            (true, false) => Some(format!(
                "{victim} Reply 0 to use the antidote, or -1 to do nothing."
            )),
            // Once the antidote is gone the witch no longer learns the victim.
            (false, true) => Some(
                "Reply a seat number to poison it, or -1 to do nothing.".to_string(),
            ),
            (false, false) => None,
        }
    }
}

impl RoleStrategy for Hunter {
    fn skill_prompt(&self, _used: u32, _ctx: &SkillContext) -> Option<String> {
        None
    }

    fn retaliates(&self) -> bool {
        true
    }
}

impl RoleStrategy for Guard {
    fn skill_prompt(&self, _used: u32, ctx: &SkillContext) -> Option<String> {
        Some(match ctx.last_guarded {
            Some(seat) => format!(
                "Choose a seat to protect tonight (not seat {} again), or -1 to rest.",
                seat.0
            ),
            None => "Choose a seat to protect tonight, or -1 to rest.".to_string(),
        })
    }
}

impl RoleStrategy for Idiot {
    fn skill_prompt(&self, _used: u32, _ctx: &SkillContext) -> Option<String> {
        None
    }

    fn survives_exile(&self, used: u32) -> bool {
        used == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_codes_match_wire_table() {
        let codes: Vec<i64> = RoleKind::ALL.iter().map(|r| r.identity()).collect();
        assert_eq!(codes, vec![0, -1, -3, -2, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_is_wolf_family() {
        assert!(RoleKind::Wolf.is_wolf_family());
        assert!(RoleKind::KingOfWerewolves.is_wolf_family());
        assert!(RoleKind::WhiteWerewolf.is_wolf_family());
        assert!(!RoleKind::Hunter.is_wolf_family());
        assert!(!RoleKind::Villager.is_wolf_family());
    }

    #[test]
    fn test_is_skilled_excludes_villagers_and_wolves() {
        let skilled: Vec<RoleKind> = RoleKind::ALL
            .into_iter()
            .filter(|r| r.is_skilled())
            .collect();
        assert_eq!(
            skilled,
            vec![
                RoleKind::Predictor,
                RoleKind::Witch,
                RoleKind::Hunter,
                RoleKind::Guard,
                RoleKind::Idiot
            ]
        );
    }

    #[test]
    fn test_from_str_accepts_both_king_spellings() {
        assert_eq!(
            "KingofWerewolf".parse::<RoleKind>().unwrap(),
            RoleKind::KingOfWerewolves
        );
        assert_eq!(
            "KingOfWerewolves".parse::<RoleKind>().unwrap(),
            RoleKind::KingOfWerewolves
        );
        assert!("Vampire".parse::<RoleKind>().is_err());
    }

    #[test]
    fn test_deserialize_king_alias() {
        let role: RoleKind = serde_json::from_str("\"KingofWerewolf\"").unwrap();
        assert_eq!(role, RoleKind::KingOfWerewolves);
    }

    #[test]
    fn test_witch_prompt_tracks_remaining_potions() {
        let ctx = SkillContext {
            victim: Some(Seat(4)),
            night: 2,
            last_guarded: None,
        };
        let witch = RoleKind::Witch.strategy();

        let fresh = witch.skill_prompt(0, &ctx).unwrap();
        assert!(fresh.contains("Seat 4") && fresh.contains("poison"));

        let poison_only = witch.skill_prompt(WITCH_ANTIDOTE, &ctx).unwrap();
        assert!(!poison_only.contains("Seat 4"), "victim must stay hidden");

        let revive_only = witch.skill_prompt(WITCH_POISON, &ctx).unwrap();
        assert!(revive_only.contains("Seat 4") && !revive_only.contains("poison"));

        assert!(witch.skill_prompt(WITCH_ANTIDOTE | WITCH_POISON, &ctx).is_none());
    }

    #[test]
    fn test_retaliates_only_hunter_and_king() {
        let shooters: Vec<RoleKind> = RoleKind::ALL
            .into_iter()
            .filter(|r| r.strategy().retaliates())
            .collect();
        assert_eq!(shooters, vec![RoleKind::KingOfWerewolves, RoleKind::Hunter]);
    }

    #[test]
    fn test_survives_exile_idiot_once() {
        let idiot = RoleKind::Idiot.strategy();
        assert!(idiot.survives_exile(0));
        assert!(!idiot.survives_exile(1));
        assert!(!RoleKind::Villager.strategy().survives_exile(0));
    }

    #[test]
    fn test_skill_prompt_none_for_roles_without_night_action() {
        let ctx = SkillContext::default();
        for role in [
            RoleKind::Villager,
            RoleKind::Wolf,
            RoleKind::Hunter,
            RoleKind::Idiot,
        ] {
            assert!(role.strategy().skill_prompt(0, &ctx).is_none(), "{role}");
        }
        assert!(RoleKind::Predictor.strategy().skill_prompt(5, &ctx).is_some());
    }
}
