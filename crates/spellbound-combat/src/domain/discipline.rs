//! Magical disciplines and the effectiveness table between them.

use serde::{Deserialize, Serialize};

/// Elemental-like category of a spell or combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// Enchantments and compulsions.
    Charms,
    /// Curses and jinxes.
    Hexes,
    /// Reshaping matter.
    Transfiguration,
    /// Fire, frost and storm.
    Elemental,
    /// Restoration and warding.
    Healing,
    /// Forbidden magic.
    DarkArts,
}

impl Discipline {
    /// All disciplines, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Charms,
        Self::Hexes,
        Self::Transfiguration,
        Self::Elemental,
        Self::Healing,
        Self::DarkArts,
    ];

    /// Disciplines this one deals double damage to.
    #[must_use]
    pub fn strong_against(self) -> &'static [Self] {
        match self {
            Self::Charms => &[Self::Hexes],
            Self::Hexes => &[Self::Transfiguration, Self::Healing],
            Self::Transfiguration => &[Self::Elemental],
            Self::Elemental => &[Self::DarkArts, Self::Charms],
            Self::Healing => &[Self::DarkArts],
            Self::DarkArts => &[Self::Charms],
        }
    }

    /// Disciplines this one deals half damage to.
    #[must_use]
    pub fn weak_against(self) -> &'static [Self] {
        match self {
            Self::Charms => &[Self::DarkArts],
            Self::Hexes => &[Self::Charms],
            Self::Transfiguration => &[Self::Hexes],
            Self::Elemental => &[Self::Transfiguration],
            Self::Healing => &[Self::Hexes],
            Self::DarkArts => &[Self::Healing, Self::Elemental],
        }
    }
}

/// Qualitative bucket for a type multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectivenessTier {
    /// Multiplier of 2.0 or more.
    Super,
    /// Multiplier of 1.0.
    Normal,
    /// Multiplier of 0.5 or less.
    Weak,
}

impl EffectivenessTier {
    /// Buckets a numeric multiplier.
    #[must_use]
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier >= 2.0 {
            Self::Super
        } else if multiplier <= 0.5 {
            Self::Weak
        } else {
            Self::Normal
        }
    }
}

/// Damage multiplier for an attacking discipline against a defending one.
///
/// Returns exactly one of 0.5, 1.0 or 2.0. A missing discipline on either
/// side is neutral.
#[must_use]
pub fn type_multiplier(attacker: Option<Discipline>, defender: Option<Discipline>) -> f64 {
    let (Some(attacker), Some(defender)) = (attacker, defender) else {
        return 1.0;
    };

    if attacker.strong_against().contains(&defender) {
        2.0
    } else if attacker.weak_against().contains(&defender) {
        0.5
    } else {
        1.0
    }
}
