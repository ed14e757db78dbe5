//! Stellar Arena Core Library
//!
//! This crate contains the combat core for Stellar Arena, a turn-based
//! tactical ship battler on a hex grid. Ships spend action points and reactor
//! energy to move, fire and use abilities; initiative decides turn order and
//! an enemy AI plays the opposing fleet.
//!
//! # Design Principles
//!
//! - **No UI dependencies**: rendering, audio and input live elsewhere
//! - **Deterministic**: a seed and the same inputs replay the same battle
//! - **Serializable**: ships and events round-trip through serde
//! - **Fail without side effects**: an illegal action returns an error and
//!   changes nothing

// Geometry
pub mod hex;
pub mod pathfinding;

// Battle state
pub mod grid;
pub mod settings;
pub mod types;

// Ships and loadouts
pub mod ability;
pub mod ship;
pub mod upgrades;
pub mod weapon;

// Combat resolution
pub mod combat;

// Turn order and the AI
pub mod ai;
pub mod turn;

// Session and tooling
pub mod battle;
pub mod events;
pub mod rng;
pub mod simulation;

// Re-exports for convenience
pub use ability::{use_ability, Ability, AbilityKind, AbilityOutcome, AbilityScope};
pub use ai::{AiError, AiMemory, AiTurnReport};
pub use battle::{skirmish_fleets, Battle};
pub use combat::{fire_on_grid, has_line_of_sight, resolve_attack, AttackOutcome, Volley};
pub use events::{CombatEvent, EventLog, EventSink};
pub use grid::Grid;
pub use hex::{HexCoord, HexLayout, Point};
pub use pathfinding::{find_path, find_reachable, PathResult, ReachableHex};
pub use rng::{battle_rng, BattleRng};
pub use settings::{BattleSettings, SettingsError};
pub use ship::{
    ActionError, Attack, DamageReport, EnergyAllocation, RecordError, Ship, ShipBuilder,
    ShipOverrides, ShipRecord, StatusEffects, Velocity,
};
pub use simulation::{
    create_scenario, run_simulation, simulate_batch, ScenarioConfig, ScenarioReport,
    SimulationError, SimulationStats,
};
pub use turn::{Phase, TurnAdvance, TurnManager};
pub use types::*;
pub use upgrades::{UpgradeCategory, UpgradeKind};
pub use weapon::{Weapon, WeaponKind};
