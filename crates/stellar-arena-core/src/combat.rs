//! Weapon fire resolution.
//!
//! A fired [`Attack`] is turned into shield and hull damage here. The damage
//! type scales the raw damage before the target's own mitigation runs, except
//! for EMP hits, which only drain energy.

use crate::events::{CombatEvent, EventLog};
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::ship::{ActionError, Attack, DamageReport, Ship};
use crate::types::DamageType;
use crate::weapon::Weapon;
use serde::{Deserialize, Serialize};

/// What an attack did to its target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AttackOutcome {
    /// Shields and hull were hit.
    #[serde(rename_all = "camelCase")]
    Damage {
        report: DamageReport,
        /// Damage after the type multiplier, before shields and armor.
        total_damage: f64,
    },
    /// The target's energy was drained instead.
    EnergyDrained { amount: f64 },
}

impl AttackOutcome {
    /// Whether the target was destroyed by this attack.
    pub fn destroyed(&self) -> bool {
        matches!(self, AttackOutcome::Damage { report, .. } if report.destroyed)
    }

    /// Shield plus hull damage actually dealt.
    pub fn damage_dealt(&self) -> f64 {
        match self {
            AttackOutcome::Damage { report, .. } => report.total(),
            AttackOutcome::EnergyDrained { .. } => 0.0,
        }
    }
}

/// Apply an attack to its target.
pub fn resolve_attack(attack: &Attack, target: &mut Ship) -> AttackOutcome {
    let damage_type = attack.weapon.damage_type;

    if damage_type == DamageType::Emp {
        let amount = target.drain_energy(attack.damage);
        return AttackOutcome::EnergyDrained { amount };
    }

    let total_damage = attack.damage * damage_type.multiplier();
    let report = target.take_damage(total_damage);

    AttackOutcome::Damage {
        report,
        total_damage,
    }
}

/// Whether the straight line between two hexes is clear.
///
/// Only the hexes between the endpoints are checked, so ships standing on
/// either end never block.
pub fn has_line_of_sight(from: HexCoord, to: HexCoord, grid: &Grid) -> bool {
    let line = from.line_to(&to);
    if line.len() <= 2 {
        return true;
    }
    line[1..line.len() - 1]
        .iter()
        .all(|&hex| !grid.is_blocked(hex))
}

/// Per-check breakdown of whether a weapon can fire at a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetingInfo {
    pub distance: u32,
    pub in_range: bool,
    pub has_energy: bool,
    pub has_action_points: bool,
    pub off_cooldown: bool,
    pub can_fire: bool,
}

/// Report each firing precondition separately, for target previews.
pub fn targeting_info(attacker: &Ship, target: &Ship, weapon: &Weapon) -> TargetingInfo {
    let distance = attacker.distance_to(target);
    let in_range = weapon.in_range(distance);
    let has_energy = attacker.energy >= weapon.energy_cost;
    let has_action_points = attacker.action_points >= weapon.ap_cost;
    let off_cooldown = weapon.is_ready();

    TargetingInfo {
        distance,
        in_range,
        has_energy,
        has_action_points,
        off_cooldown,
        can_fire: in_range && has_energy && has_action_points && off_cooldown,
    }
}

/// A weapon discharge carried out on the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Volley {
    pub attack: Attack,
    pub outcome: AttackOutcome,
    /// The target, taken off the grid because this shot destroyed it.
    pub wreck: Option<Ship>,
}

/// Fire `attacker`'s weapon at `target`, resolve the hit and clear the wreck.
///
/// Line of sight is not checked here; callers that require it check first.
/// Nothing changes if the shot cannot be fired.
pub fn fire_on_grid(
    grid: &mut Grid,
    attacker: &str,
    weapon_index: usize,
    target: &str,
    events: &mut EventLog,
) -> Result<Volley, ActionError> {
    let shooter = grid
        .ship(attacker)
        .ok_or_else(|| ActionError::ShipNotFound(attacker.to_string()))?;
    let victim = grid
        .ship(target)
        .filter(|s| s.is_alive())
        .ok_or_else(|| ActionError::ShipNotFound(target.to_string()))?;
    if shooter.team == victim.team {
        return Err(ActionError::FriendlyTarget);
    }
    let target_position = victim.position;

    let attack = grid
        .ship_mut(attacker)
        .ok_or_else(|| ActionError::ShipNotFound(attacker.to_string()))?
        .fire_weapon(weapon_index, target, target_position)?;
    events.emit(CombatEvent::WeaponFired {
        attacker: attack.attacker.clone(),
        weapon: attack.weapon.name.clone(),
        target: attack.target.clone(),
        damage: attack.damage,
        overcharged: attack.overcharged,
    });

    let victim = grid
        .ship_mut(target)
        .ok_or_else(|| ActionError::ShipNotFound(target.to_string()))?;
    let outcome = resolve_attack(&attack, victim);
    match outcome {
        AttackOutcome::Damage { report, .. } => events.emit(CombatEvent::DamageApplied {
            target: target.to_string(),
            shield_damage: report.shield_damage,
            hull_damage: report.hull_damage,
        }),
        AttackOutcome::EnergyDrained { amount } => events.emit(CombatEvent::EnergyDrained {
            target: target.to_string(),
            amount,
        }),
    }

    let wreck = if outcome.destroyed() {
        let wreck = grid.remove_ship_by_id(target);
        if let Some(ship) = &wreck {
            tracing::info!(ship = %ship.name, by = %attack.attacker, "ship destroyed");
            events.emit(CombatEvent::ShipDestroyed {
                ship: ship.id.clone(),
                name: ship.name.clone(),
            });
        }
        wreck
    } else {
        None
    };

    Ok(Volley {
        attack,
        outcome,
        wreck,
    })
}

impl Ship {
    /// Targeting breakdown for each weapon against `target`, in slot order.
    pub fn weapon_readiness(&self, target: &Ship) -> Vec<TargetingInfo> {
        self.weapons
            .iter()
            .map(|weapon| targeting_info(self, target, weapon))
            .collect()
    }
}
