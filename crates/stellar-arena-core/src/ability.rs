//! Tactical abilities.
//!
//! Abilities are keyed by [`AbilityKind`]; each ship gets its own fresh
//! [`Ability`] instance from [`AbilityKind::create`]. Activation goes through
//! [`use_ability`] with an explicit [`AbilityScope`]: self-targeted effects
//! work on a detached ship, while the dash and the EMP burst need the grid.

use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::pathfinding::drift_direction;
use crate::ship::{ActionError, Ship};
use crate::types::ShipId;
use serde::{Deserialize, Serialize};

/// Fraction of max shield restored by a shield surge.
const SURGE_FRACTION: f64 = 0.4;
const EVASIVE_CHARGES: u32 = 2;
const OVERCHARGE_SHOTS: u32 = 2;
/// Maximum hexes covered by a burst-engine dash.
const DASH_RANGE: u32 = 2;
const EMP_RADIUS: u32 = 3;
const EMP_DRAIN: f64 = 25.0;

/// Known abilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbilityKind {
    ShieldSurge,
    EvasiveManeuver,
    WeaponOvercharge,
    BurstEngines,
    EmpBurst,
}

impl AbilityKind {
    /// Get all ability kinds.
    pub const fn all() -> &'static [AbilityKind] {
        &[
            AbilityKind::ShieldSurge,
            AbilityKind::EvasiveManeuver,
            AbilityKind::WeaponOvercharge,
            AbilityKind::BurstEngines,
            AbilityKind::EmpBurst,
        ]
    }

    /// Stable persistence key.
    pub const fn key(&self) -> &'static str {
        match self {
            AbilityKind::ShieldSurge => "shieldSurge",
            AbilityKind::EvasiveManeuver => "evasiveManeuver",
            AbilityKind::WeaponOvercharge => "weaponOvercharge",
            AbilityKind::BurstEngines => "burstEngines",
            AbilityKind::EmpBurst => "empBurst",
        }
    }

    pub fn from_key(key: &str) -> Option<AbilityKind> {
        Self::all().iter().copied().find(|k| k.key() == key)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            AbilityKind::ShieldSurge => "Shield Surge",
            AbilityKind::EvasiveManeuver => "Evasive Maneuver",
            AbilityKind::WeaponOvercharge => "Weapon Overcharge",
            AbilityKind::BurstEngines => "Burst Engines",
            AbilityKind::EmpBurst => "EMP Burst",
        }
    }

    /// Whether activation needs grid access.
    pub const fn requires_grid(&self) -> bool {
        matches!(self, AbilityKind::BurstEngines | AbilityKind::EmpBurst)
    }

    /// `(energy_cost, ap_cost, cooldown)`
    const fn costs(&self) -> (f64, u32, u32) {
        match self {
            AbilityKind::ShieldSurge => (30.0, 1, 3),
            AbilityKind::EvasiveManeuver => (20.0, 1, 3),
            AbilityKind::WeaponOvercharge => (25.0, 1, 3),
            AbilityKind::BurstEngines => (20.0, 1, 3),
            AbilityKind::EmpBurst => (40.0, 2, 4),
        }
    }

    /// A fresh, ready instance.
    pub fn create(&self) -> Ability {
        let (energy_cost, ap_cost, cooldown) = self.costs();
        Ability {
            kind: *self,
            name: self.name().to_string(),
            energy_cost,
            ap_cost,
            cooldown,
            cooldown_remaining: 0,
        }
    }
}

/// An ability slot on a ship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ability {
    pub kind: AbilityKind,
    pub name: String,
    pub energy_cost: f64,
    pub ap_cost: u32,
    pub cooldown: u32,
    pub cooldown_remaining: u32,
}

impl Ability {
    pub fn is_ready(&self) -> bool {
        self.cooldown_remaining == 0
    }

    pub fn tick_cooldown(&mut self) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
    }
}

/// What an activation did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum AbilityOutcome {
    ShieldRestored { amount: f64 },
    EvasiveCharges { charges: u32 },
    Overcharged { shots: u32 },
    Dashed { from: HexCoord, to: HexCoord },
    EnergyDrained { drained: Vec<(ShipId, f64)> },
}

/// Where an ability is activated.
pub enum AbilityScope<'a> {
    /// A ship with no battle around it.
    Detached(&'a mut Ship),
    /// A ship placed on a grid.
    OnGrid { grid: &'a mut Grid, caster: &'a str },
}

/// Activate ability `index` of the caster.
///
/// Costs are only paid once the effect is known to be possible.
pub fn use_ability(scope: AbilityScope<'_>, index: usize) -> Result<AbilityOutcome, ActionError> {
    match scope {
        AbilityScope::Detached(ship) => {
            let kind = ship.check_ability(index)?;
            let outcome = apply_to_self(kind, ship)?;
            ship.spend_ability(index);
            Ok(outcome)
        }
        AbilityScope::OnGrid { grid, caster } => {
            let ship = grid
                .ship(caster)
                .ok_or_else(|| ActionError::ShipNotFound(caster.to_string()))?;
            let kind = ship.check_ability(index)?;

            match kind {
                AbilityKind::BurstEngines => {
                    let from = ship.position;
                    let to = plan_dash(grid, ship).ok_or(ActionError::PathBlocked)?;
                    let ship = grid
                        .ship_mut(caster)
                        .ok_or_else(|| ActionError::ShipNotFound(caster.to_string()))?;
                    ship.spend_ability(index);
                    ship.position = to;
                    Ok(AbilityOutcome::Dashed { from, to })
                }
                AbilityKind::EmpBurst => {
                    let center = ship.position;
                    let team = ship.team;
                    let targets: Vec<ShipId> = grid
                        .ships_by_team(team.opponent())
                        .filter(|s| s.position.distance(&center) <= EMP_RADIUS)
                        .map(|s| s.id.clone())
                        .collect();

                    if let Some(ship) = grid.ship_mut(caster) {
                        ship.spend_ability(index);
                    }
                    let drained = targets
                        .into_iter()
                        .filter_map(|id| {
                            let target = grid.ship_mut(&id)?;
                            let amount = target.drain_energy(EMP_DRAIN);
                            Some((id, amount))
                        })
                        .collect();
                    Ok(AbilityOutcome::EnergyDrained { drained })
                }
                _ => {
                    let ship = grid
                        .ship_mut(caster)
                        .ok_or_else(|| ActionError::ShipNotFound(caster.to_string()))?;
                    let outcome = apply_to_self(kind, ship)?;
                    ship.spend_ability(index);
                    Ok(outcome)
                }
            }
        }
    }
}

fn apply_to_self(kind: AbilityKind, ship: &mut Ship) -> Result<AbilityOutcome, ActionError> {
    match kind {
        AbilityKind::ShieldSurge => {
            let amount = ship.restore_shield(ship.max_shield * SURGE_FRACTION);
            Ok(AbilityOutcome::ShieldRestored { amount })
        }
        AbilityKind::EvasiveManeuver => {
            ship.status_effects.evasive_charges += EVASIVE_CHARGES;
            Ok(AbilityOutcome::EvasiveCharges {
                charges: ship.status_effects.evasive_charges,
            })
        }
        AbilityKind::WeaponOvercharge => {
            ship.status_effects.overcharge_shots += OVERCHARGE_SHOTS;
            Ok(AbilityOutcome::Overcharged {
                shots: ship.status_effects.overcharge_shots,
            })
        }
        AbilityKind::BurstEngines | AbilityKind::EmpBurst => {
            Err(ActionError::MissingContext(kind.name().to_string()))
        }
    }
}

/// Pick the dash destination: along the current drift, or straight away from
/// the nearest opponent when not drifting.
fn plan_dash(grid: &Grid, ship: &Ship) -> Option<HexCoord> {
    let direction = drift_direction(&ship.velocity).or_else(|| {
        let nearest = grid
            .ships_by_team(ship.team.opponent())
            .min_by_key(|s| s.position.distance(&ship.position))?;
        let line = ship.position.line_to(&nearest.position);
        let toward = ship.position.direction_to(line.get(1)?)?;
        Some((toward + 3) % 6)
    })?;

    let mut position = ship.position;
    for _ in 0..DASH_RANGE {
        let next = position.neighbor(direction);
        if !grid.is_valid_hex(next) || grid.is_blocked(next) {
            break;
        }
        position = next;
    }
    (position != ship.position).then_some(position)
}
