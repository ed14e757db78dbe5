//! Weapon selection and attack planning.

use super::targeting::evaluate_target_score;
use crate::grid::Grid;
use crate::ship::Ship;
use crate::types::{AiProfile, ShipId, WeaponFamily};
use crate::weapon::Weapon;

/// Weight of the target score when ranking (target, weapon) pairs.
const TARGET_WEIGHT: f64 = 0.35;

/// A weapon picked against one target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeaponChoice {
    pub index: usize,
    pub score: f64,
    pub expected_damage: f64,
}

/// The best shot available this instant.
#[derive(Clone, Debug, PartialEq)]
pub struct AttackPlan {
    pub target: ShipId,
    pub weapon: WeaponChoice,
    pub total_score: f64,
}

/// Damage the weapon should do against the target's current defenses.
pub fn expected_damage(weapon: &Weapon, target: &Ship) -> f64 {
    let shielded = target.shield > 0.0;
    let mut expected = weapon.damage
        * match (weapon.family, shielded) {
            (WeaponFamily::Energy, true) => 1.1,
            (WeaponFamily::Energy, false) => 0.85,
            (WeaponFamily::Kinetic, true) => 0.75,
            (WeaponFamily::Kinetic, false) => 1.2,
            (WeaponFamily::Missile, _) => 1.05,
        };
    if shielded {
        expected = expected.min(target.shield + target.hull);
    }
    expected.max(0.0)
}

/// Score firing `weapon` from `attacker` at `target`. Returns (score, expected damage).
pub fn evaluate_weapon_choice(attacker: &Ship, target: &Ship, weapon: &Weapon) -> (f64, f64) {
    let expected = expected_damage(weapon, target);
    let ap_cost = weapon.ap_cost as f64;
    let mut score = expected * 1.4;

    score -= weapon.energy_cost * 0.4;
    score -= ap_cost * 1.5;
    score += attacker.action_points.saturating_sub(weapon.ap_cost) as f64 * 3.0;

    if expected >= target.hull && target.hull > 0.0 {
        score += 35.0;
    }

    // Keep AP for a getaway when badly hurt.
    if attacker.hull_ratio() < 0.3 && attacker.action_points <= weapon.ap_cost {
        score -= 25.0;
    }

    if weapon.is_ready() {
        score += 8.0;
    }

    match attacker.ai_profile {
        AiProfile::Aggressive => {
            score += expected * 0.2;
            score -= ap_cost * 0.5;
        }
        AiProfile::Cautious => {
            score -= expected * 0.1;
            score -= weapon.energy_cost * 0.3;
        }
        AiProfile::Skirmisher | AiProfile::Flanker => {
            score += (weapon.max_range - weapon.min_range) as f64 * 0.5;
            if expected > target.hull && weapon.ap_cost <= 1 {
                score += 10.0;
            }
        }
        AiProfile::Anchor => {
            if weapon.family == WeaponFamily::Energy {
                score += 12.0;
            }
        }
        AiProfile::Vanguard => {
            if weapon.ap_cost <= 1 {
                score += 6.0;
            }
        }
        AiProfile::Opportunist | AiProfile::Standard => {}
    }

    (score, expected)
}

/// The best weapon that can fire at `target` right now.
pub fn choose_best_weapon(attacker: &Ship, target: &Ship) -> Option<WeaponChoice> {
    let mut best: Option<WeaponChoice> = None;
    for (index, weapon) in attacker.weapons.iter().enumerate() {
        if !attacker.can_fire_weapon(index, target.position) {
            continue;
        }
        let (score, expected_damage) = evaluate_weapon_choice(attacker, target, weapon);
        if best.map_or(true, |b| score > b.score) {
            best = Some(WeaponChoice {
                index,
                score,
                expected_damage,
            });
        }
    }
    best
}

/// Rank every (target, weapon) pair and return the best, if any can fire.
pub fn select_best_attack(grid: &Grid, ship: &Ship, last_focus: Option<&str>) -> Option<AttackPlan> {
    let mut best: Option<AttackPlan> = None;
    for target in grid.ships_by_team(ship.team.opponent()) {
        let Some(weapon) = choose_best_weapon(ship, target) else {
            continue;
        };
        let total_score =
            weapon.score + evaluate_target_score(grid, ship, target, last_focus) * TARGET_WEIGHT;
        if best.as_ref().map_or(true, |b| total_score > b.total_score) {
            best = Some(AttackPlan {
                target: target.id.clone(),
                weapon,
                total_score,
            });
        }
    }
    best
}
