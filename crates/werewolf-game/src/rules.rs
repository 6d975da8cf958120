//! Pure game rules: win check, night arithmetic, speaking order.

use std::collections::BTreeSet;
use std::fmt;

use werewolf_protocol::Seat;
use werewolf_session::{DeathCause, RoleKind};

// ---------------------------------------------------------------------------
// Win check
// ---------------------------------------------------------------------------

/// Whether the game is still running and, if not, who won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Ongoing,
    VillagersWin,
    WolvesWin,
}

impl GameStatus {
    /// 0 ongoing, 1 villagers, -1 wolves.
    pub fn code(self) -> i8 {
        match self {
            Self::Ongoing => 0,
            Self::VillagersWin => 1,
            Self::WolvesWin => -1,
        }
    }

    pub fn is_over(self) -> bool {
        self != Self::Ongoing
    }

    /// Whether a player holding `role` is on the winning side.
    pub fn is_winner(self, role: RoleKind) -> bool {
        match self {
            Self::Ongoing => false,
            Self::VillagersWin => !role.is_wolf_family(),
            Self::WolvesWin => role.is_wolf_family(),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::VillagersWin => write!(f, "villagers win"),
            Self::WolvesWin => write!(f, "wolves win"),
        }
    }
}

/// Evaluates the living roles.
///
/// No wolves left: the village wins. Otherwise the wolves win as soon as
/// either all plain villagers or all skilled roles are gone.
pub fn check_status(alive: impl IntoIterator<Item = RoleKind>) -> GameStatus {
    let (mut villagers, mut wolves, mut skilled) = (0, 0, 0);
    for role in alive {
        if role.is_wolf_family() {
            wolves += 1;
        } else if role == RoleKind::Villager {
            villagers += 1;
        } else {
            skilled += 1;
        }
    }
    if wolves == 0 {
        GameStatus::VillagersWin
    } else if villagers == 0 || skilled == 0 {
        GameStatus::WolvesWin
    } else {
        GameStatus::Ongoing
    }
}

// ---------------------------------------------------------------------------
// Night ledger
// ---------------------------------------------------------------------------

/// Accumulates the night's actions into the deaths they cause.
///
/// The wolf victim is kept as a signed seat number: the antidote flips
/// the sign, and so does the guard when protecting that seat. A positive
/// value at dawn means the victim dies, so antidote plus guard on the same
/// seat cancel out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightLedger {
    wolf_victim: i64,
    poisoned: Option<Seat>,
}

impl NightLedger {
    pub fn new(wolf_victim: Option<Seat>) -> Self {
        Self {
            wolf_victim: wolf_victim.map_or(0, Seat::to_wire),
            poisoned: None,
        }
    }

    /// The seat the wolves attacked, whether or not it was saved.
    pub fn attacked(&self) -> Option<Seat> {
        Seat::from_wire(self.wolf_victim.abs())
    }

    /// The antidote.
    pub fn revive(&mut self) {
        self.wolf_victim = -self.wolf_victim;
    }

    pub fn guard(&mut self, seat: Seat) {
        if self.wolf_victim.abs() == seat.to_wire() {
            self.wolf_victim = -self.wolf_victim;
        }
    }

    pub fn poison(&mut self, seat: Seat) {
        self.poisoned = Some(seat);
    }

    /// Deaths in resolution order, poison first. A seat dies at most once;
    /// poison wins over the wolves.
    pub fn into_deaths(self) -> Vec<(Seat, DeathCause)> {
        let mut deaths = Vec::with_capacity(2);
        if let Some(seat) = self.poisoned {
            deaths.push((seat, DeathCause::Poison));
        }
        if let Some(seat) = Seat::from_wire(self.wolf_victim) {
            if self.poisoned != Some(seat) {
                deaths.push((seat, DeathCause::Wolves));
            }
        }
        deaths
    }
}

// ---------------------------------------------------------------------------
// Speaking order
// ---------------------------------------------------------------------------

/// The discussion order for the day.
///
/// Starts with the first living seat after `anchor` in the chosen
/// direction and wraps around, so a living anchor (the police) speaks
/// last. Without an anchor the order starts at the lowest seat.
pub fn speaking_order(active: &BTreeSet<Seat>, anchor: Option<Seat>, clockwise: bool) -> Vec<Seat> {
    let mut seats: Vec<Seat> = active.iter().copied().collect();
    if !clockwise {
        seats.reverse();
    }
    let Some(anchor) = anchor else {
        seats.sort();
        return seats;
    };
    let split = seats
        .iter()
        .position(|seat| if clockwise { *seat > anchor } else { *seat < anchor })
        .unwrap_or(seats.len());
    seats.rotate_left(split);
    seats
}
