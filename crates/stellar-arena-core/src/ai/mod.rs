//! Enemy decision making.
//!
//! An AI turn runs to completion in one call:
//!
//! 1. Score every opponent and pick a focus target
//! 2. Maybe activate one ability
//! 3. Re-pick the target and reposition if the range is wrong
//! 4. Fire the best (target, weapon) pair until nothing can fire
//!
//! The scoring functions are pure reads of the grid; only [`take_turn`]
//! mutates it. Randomness is never used, so decisions are reproducible from
//! the grid state alone.

pub mod abilities;
pub mod positioning;
pub mod targeting;
pub mod weapons;

pub use abilities::choose_enemy_ability;
pub use positioning::{force_advance_path, plan_reposition};
pub use targeting::{choose_best_target, evaluate_target_score};
pub use weapons::{select_best_attack, AttackPlan, WeaponChoice};

use crate::ability::{use_ability, AbilityKind, AbilityScope};
use crate::combat::fire_on_grid;
use crate::events::{CombatEvent, EventLog};
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::ship::ActionError;
use crate::types::ShipId;

/// Default cap on attacks in one AI turn.
pub const DEFAULT_MAX_ATTACKS: u32 = 10;

/// Errors that abort an AI turn. The turn still ends.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AiError {
    #[error("AI ship {0} is not on the grid")]
    ShipNotFound(ShipId),
    #[error("planned action failed: {0}")]
    Action(#[from] ActionError),
}

/// State the AI keeps between turns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AiMemory {
    /// The target the enemy side last focused. Shared by all AI ships.
    pub last_focus: Option<ShipId>,
}

/// What one AI turn did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AiTurnReport {
    pub target: Option<ShipId>,
    pub ability: Option<AbilityKind>,
    /// Hexes moved, repositioning and fallback advances combined.
    pub hexes_moved: usize,
    pub attacks: u32,
    pub destroyed: Vec<ShipId>,
}

/// Play one full turn for `ship_id`.
///
/// The ship must already be active. Ending the turn is the caller's job.
pub fn take_turn(
    grid: &mut Grid,
    ship_id: &str,
    memory: &mut AiMemory,
    max_attacks: u32,
    events: &mut EventLog,
) -> Result<AiTurnReport, AiError> {
    let mut report = AiTurnReport::default();
    let missing = || AiError::ShipNotFound(ship_id.to_string());

    // Target and ability.
    let (target, ability) = {
        let ship = grid.ship(ship_id).ok_or_else(missing)?;
        let Some(target) = choose_best_target(grid, ship, memory.last_focus.as_deref()) else {
            tracing::debug!(ship = %ship.name, "no opponents left");
            return Ok(report);
        };
        (target.id.clone(), choose_enemy_ability(ship, Some(target)))
    };
    memory.last_focus = Some(target.clone());
    report.target = Some(target);

    if let Some(index) = ability {
        let scope = AbilityScope::OnGrid {
            grid: &mut *grid,
            caster: ship_id,
        };
        match use_ability(scope, index) {
            Ok(outcome) => {
                let kind = grid
                    .ship(ship_id)
                    .and_then(|s| s.abilities.get(index))
                    .map(|a| a.kind)
                    .ok_or_else(missing)?;
                tracing::debug!(ship = ship_id, ability = kind.key(), "AI used ability");
                report.ability = Some(kind);
                events.emit(CombatEvent::AbilityUsed {
                    ship: ship_id.to_string(),
                    ability: kind,
                    outcome,
                });
            }
            Err(err) => tracing::debug!(ship = ship_id, error = %err, "AI ability skipped"),
        }
    }

    // Reposition against the freshest target.
    let plan = {
        let ship = grid.ship(ship_id).ok_or_else(missing)?;
        let Some(target) = choose_best_target(grid, ship, memory.last_focus.as_deref()) else {
            return Ok(report);
        };
        memory.last_focus = Some(target.id.clone());
        plan_reposition(grid, ship, target)
    };
    if let Some(path) = plan {
        report.hexes_moved += move_along(grid, ship_id, &path, events);
    }

    // Attack loop.
    loop {
        let plan = {
            let ship = grid.ship(ship_id).ok_or_else(missing)?;
            if ship.action_points == 0 || ship.energy <= 0.0 || report.attacks >= max_attacks {
                break;
            }
            if grid.team_count(ship.team.opponent()) == 0 {
                break;
            }
            match select_best_attack(grid, ship, memory.last_focus.as_deref()) {
                Some(plan) => Ok(plan),
                None => Err(force_advance_path(grid, ship, memory.last_focus.as_deref())),
            }
        };

        let plan = match plan {
            Ok(plan) => plan,
            Err(Some(path)) => {
                let moved = move_along(grid, ship_id, &path, events);
                if moved == 0 {
                    break;
                }
                report.hexes_moved += moved;
                continue;
            }
            Err(None) => {
                tracing::debug!(ship = ship_id, "no attack or advance available");
                break;
            }
        };

        tracing::debug!(
            ship = ship_id,
            target = %plan.target,
            weapon = plan.weapon.index,
            score = plan.total_score,
            "AI firing"
        );
        let volley = fire_on_grid(grid, ship_id, plan.weapon.index, &plan.target, events)?;
        report.attacks += 1;

        if let Some(wreck) = volley.wreck {
            if memory.last_focus.as_deref() == Some(wreck.id.as_str()) {
                memory.last_focus = None;
            }
            report.destroyed.push(wreck.id);
        }
    }

    tracing::debug!(
        ship = ship_id,
        attacks = report.attacks,
        moved = report.hexes_moved,
        "AI turn complete"
    );
    Ok(report)
}

/// Walk a planned path. Returns the hexes moved, 0 if the move was refused.
fn move_along(grid: &mut Grid, ship_id: &str, path: &[HexCoord], events: &mut EventLog) -> usize {
    let Some(from) = grid.ship(ship_id).map(|s| s.position) else {
        return 0;
    };
    match grid.move_ship(ship_id, path) {
        Ok(()) => {
            let to = grid.ship(ship_id).map_or(from, |s| s.position);
            events.emit(CombatEvent::ShipMoved {
                ship: ship_id.to_string(),
                from,
                to,
                hexes: path.len(),
                drift: false,
            });
            path.len()
        }
        Err(err) => {
            tracing::debug!(ship = ship_id, error = %err, "AI move refused");
            0
        }
    }
}
