//! Core types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a ship.
pub type ShipId = String;

/// Total number of energy allocation points a ship distributes.
pub const ALLOCATION_TOTAL: u32 = 10;

/// The two sides of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Player,
    Enemy,
}

impl Team {
    /// The opposing side.
    pub const fn opponent(&self) -> Team {
        match self {
            Team::Player => Team::Enemy,
            Team::Enemy => Team::Player,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Player => write!(f, "player"),
            Team::Enemy => write!(f, "enemy"),
        }
    }
}

/// Hull classes. Each class carries a preset of base stats and a loadout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipClass {
    Interceptor,
    Corvette,
    Destroyer,
}

impl ShipClass {
    /// Get all ship classes.
    pub const fn all() -> &'static [ShipClass] {
        &[
            ShipClass::Interceptor,
            ShipClass::Corvette,
            ShipClass::Destroyer,
        ]
    }
}

impl fmt::Display for ShipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShipClass::Interceptor => write!(f, "Interceptor"),
            ShipClass::Corvette => write!(f, "Corvette"),
            ShipClass::Destroyer => write!(f, "Destroyer"),
        }
    }
}

/// How a hit is applied by the damage resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    #[default]
    Energy,
    Kinetic,
    Explosive,
    /// Drains energy instead of dealing damage.
    Emp,
}

impl DamageType {
    /// Multiplier applied before shields and armor.
    pub const fn multiplier(&self) -> f64 {
        match self {
            DamageType::Kinetic => 1.2,
            DamageType::Explosive => 1.3,
            DamageType::Energy | DamageType::Emp => 1.0,
        }
    }
}

/// Broad weapon family, used by the AI to judge matchups against shields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeaponFamily {
    #[default]
    Energy,
    Kinetic,
    Missile,
}

/// Weighting profile for the enemy decision heuristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProfile {
    #[default]
    Standard,
    Aggressive,
    Cautious,
    Flanker,
    Skirmisher,
    Anchor,
    Vanguard,
    Opportunist,
}

impl AiProfile {
    /// Flankers and skirmishers share mid-range band preferences.
    pub const fn prefers_mid_range(&self) -> bool {
        matches!(self, AiProfile::Flanker | AiProfile::Skirmisher)
    }

    /// Vanguards and opportunists chase near-kills.
    pub const fn hunts_near_kills(&self) -> bool {
        matches!(self, AiProfile::Vanguard | AiProfile::Opportunist)
    }

    /// Get all profiles.
    pub const fn all() -> &'static [AiProfile] {
        &[
            AiProfile::Standard,
            AiProfile::Aggressive,
            AiProfile::Cautious,
            AiProfile::Flanker,
            AiProfile::Skirmisher,
            AiProfile::Anchor,
            AiProfile::Vanguard,
            AiProfile::Opportunist,
        ]
    }
}

/// Terminal result of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleOutcome {
    pub game_over: bool,
    pub winner: Team,
}

impl BattleOutcome {
    pub const fn victory(winner: Team) -> Self {
        Self {
            game_over: true,
            winner,
        }
    }
}
