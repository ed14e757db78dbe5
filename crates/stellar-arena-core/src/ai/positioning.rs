//! Tactical movement for AI ships.

use super::targeting::choose_best_target;
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::ship::Ship;
use crate::types::AiProfile;

/// AP at which a ship has enough slack to reposition even when it can attack.
const SPARE_AP: u32 = 4;

/// (hull, shield) ratios below which a ship tries to open distance.
pub fn retreat_thresholds(profile: AiProfile) -> (f64, f64) {
    let hull = match profile {
        AiProfile::Aggressive => 0.22,
        AiProfile::Anchor => 0.45,
        AiProfile::Cautious => 0.55,
        _ => 0.35,
    };
    let shield = if profile == AiProfile::Aggressive {
        0.25
    } else {
        0.4
    };
    (hull, shield)
}

/// Whether the ship is hurt badly enough to fall back.
pub fn in_retreat(ship: &Ship) -> bool {
    let hull_ratio = if ship.max_hull > 0.0 {
        ship.hull / ship.max_hull
    } else {
        1.0
    };
    let (hull, shield) = retreat_thresholds(ship.ai_profile);
    hull_ratio < hull && ship.shield_ratio() < shield
}

/// Penalty for ending a move right on top of the focus target.
pub fn cluster_penalty(hex: HexCoord, focus: HexCoord) -> f64 {
    let distance = hex.distance(&focus);
    if distance >= 3 {
        0.0
    } else {
        (3 - distance) as f64 * 12.0
    }
}

/// Plan a move toward a better firing position against `target`.
///
/// The first weapon is the reference for range. Returns the path to walk,
/// already truncated to the ship's AP, or None to stay put.
pub fn plan_reposition(grid: &Grid, ship: &Ship, target: &Ship) -> Option<Vec<HexCoord>> {
    let weapon = ship.weapons.first()?;
    let ap = ship.action_points;
    let distance = ship.distance_to(target);
    let retreat = in_retreat(ship);

    let can_attack_from_here = weapon.in_range(distance);
    let consider = retreat || !can_attack_from_here || ap >= SPARE_AP;
    if !consider || ap <= 1 {
        return None;
    }

    let optimal = weapon.optimal_range();
    let must_move = if retreat {
        distance < weapon.max_range
    } else {
        !weapon.in_range(distance)
    };
    let could_improve = if retreat {
        distance <= weapon.max_range && ap >= 2
    } else {
        distance.abs_diff(optimal) > 2 && ap >= SPARE_AP
    };
    if !must_move && !could_improve {
        return None;
    }

    let d0 = distance as f64;
    let max = weapon.max_range as f64;
    let opt = optimal as f64;
    let closing_weight = if ship.ai_profile == AiProfile::Aggressive {
        22.0
    } else {
        15.0
    };

    let mut best: Option<(HexCoord, f64)> = None;
    for reachable in grid.reachable_hexes(ship) {
        let d = reachable.hex.distance(&target.position) as f64;
        let mut score = 0.0;

        if weapon.in_range(reachable.hex.distance(&target.position)) {
            score += 100.0;
            score -= (d - opt).abs() * 12.0;
        } else if d < max + 2.0 {
            score += 45.0 - (d - max) * 18.0;
        } else {
            score -= d * 6.0;
        }

        if !retreat && distance > weapon.max_range {
            score += (d0 - d) * closing_weight;
        }

        if retreat {
            score += (d - d0) * 20.0;
            if d <= max {
                score -= (max - d) * 25.0;
            }
        }

        match ship.ai_profile {
            AiProfile::Flanker => {
                score -= (d - opt).abs() * 5.0;
                score -= cluster_penalty(reachable.hex, target.position);
            }
            AiProfile::Anchor => score -= d * 3.0,
            _ => {}
        }

        if ap as f64 - reachable.cost < weapon.ap_cost as f64 {
            score -= 50.0;
        }

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((reachable.hex, score));
        }
    }

    let (destination, score) = best?;
    if destination == ship.position {
        return None;
    }
    tracing::debug!(ship = %ship.name, to = %destination, score, retreat, "repositioning");

    let path = grid.find_path(ship.position, destination, ship)?;
    truncate_to_ap(path.steps, ap)
}

/// Fallback move: advance part of the way toward the best target.
///
/// Walks half the path (at least one step, at most the AP left). The
/// target's own hex is occupied, so the path goes to its nearest free
/// neighbor when the direct route fails.
pub fn force_advance_path(grid: &Grid, ship: &Ship, last_focus: Option<&str>) -> Option<Vec<HexCoord>> {
    let ap = ship.action_points;
    if ap == 0 {
        return None;
    }
    let target = choose_best_target(grid, ship, last_focus)?;

    let direct = grid
        .find_path(ship.position, target.position, ship)
        .map(|p| p.steps)
        .filter(|steps| !steps.is_empty());

    let path = match direct {
        Some(steps) => steps,
        None => {
            let mut best: Option<Vec<HexCoord>> = None;
            for neighbor in target.position.neighbors() {
                if !grid.is_valid_hex(neighbor) || grid.is_blocked(neighbor) {
                    continue;
                }
                let Some(candidate) = grid.find_path(ship.position, neighbor, ship) else {
                    continue;
                };
                if candidate.steps.is_empty() {
                    continue;
                }
                if best.as_ref().map_or(true, |b| candidate.steps.len() < b.len()) {
                    best = Some(candidate.steps);
                }
            }
            best?
        }
    };

    let steps = (path.len() / 2).max(1).min(ap as usize);
    tracing::debug!(ship = %ship.name, toward = %target.name, steps, "fallback advance");
    truncate_to_ap(path, steps as u32)
}

fn truncate_to_ap(mut path: Vec<HexCoord>, ap: u32) -> Option<Vec<HexCoord>> {
    if path.is_empty() {
        return None;
    }
    path.truncate((ap as usize).max(1));
    Some(path)
}
