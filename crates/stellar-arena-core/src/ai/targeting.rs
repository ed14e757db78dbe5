//! Target selection.

use crate::combat::has_line_of_sight;
use crate::grid::Grid;
use crate::ship::Ship;
use crate::types::{AiProfile, WeaponFamily};

/// Range gap assumed when a ship has no weapons at all.
const NO_WEAPON_RANGE_GAP: u32 = 5;

/// How well a ship's weapons reach a target right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeaponAccess {
    /// Weapons that could fire at the target this instant.
    pub available: u32,
    /// Hexes to close (or open) before the nearest range band is reached.
    pub range_gap: u32,
}

/// Summed damage `threat`'s ready, in-range weapons could send at `victim`.
///
/// Ships that are not on their turn often sit at 0 AP or energy, so an
/// empty gauge is read as full.
pub fn estimate_target_threat(threat: &Ship, victim: &Ship) -> f64 {
    let distance = threat.distance_to(victim);
    let action_points = if threat.action_points > 0 {
        threat.action_points
    } else {
        threat.max_action_points
    };
    let energy = if threat.energy > 0.0 {
        threat.energy
    } else {
        threat.max_energy
    };

    threat
        .weapons
        .iter()
        .filter(|w| action_points >= w.ap_cost && energy >= w.energy_cost && w.is_ready())
        .filter(|w| w.in_range(distance))
        .map(|w| match w.family {
            WeaponFamily::Energy if victim.shield > 0.0 => w.damage * 1.1,
            WeaponFamily::Kinetic if victim.shield == 0.0 => w.damage * 1.2,
            _ => w.damage,
        })
        .sum()
}

/// Count weapons able to fire at `target` and the smallest range gap.
pub fn count_weapons_in_range(ship: &Ship, target: &Ship) -> WeaponAccess {
    let distance = ship.distance_to(target);
    let mut available = 0;
    let mut range_gap: Option<u32> = None;

    for (index, weapon) in ship.weapons.iter().enumerate() {
        let gap = if distance > weapon.max_range {
            distance - weapon.max_range
        } else {
            weapon.min_range.saturating_sub(distance)
        };
        range_gap = Some(range_gap.map_or(gap, |g| g.min(gap)));

        if ship.can_fire_weapon(index, target.position) {
            available += 1;
        }
    }

    WeaponAccess {
        available,
        range_gap: range_gap.unwrap_or(NO_WEAPON_RANGE_GAP),
    }
}

/// Score how attractive `target` is for `ship`. Higher is better.
pub fn evaluate_target_score(
    grid: &Grid,
    ship: &Ship,
    target: &Ship,
    last_focus: Option<&str>,
) -> f64 {
    let hull_percent = target.hull / target.max_hull.max(1.0);
    let shield_percent = target.shield / target.max_shield.max(1.0);
    let mut score = 0.0;

    score += (1.0 - hull_percent) * 120.0;
    if target.shield == 0.0 {
        score += 25.0;
    }

    let threat = estimate_target_threat(target, ship);
    score += threat * 0.5;

    let distance = ship.distance_to(target);
    let d = distance as f64;
    score -= d * 1.8;

    if !has_line_of_sight(ship.position, target.position, grid) {
        score -= 45.0;
    }

    let access = count_weapons_in_range(ship, target);
    if access.available == 0 {
        score -= 30.0 + access.range_gap as f64 * 5.0;
    } else {
        score += access.available as f64 * 18.0;
    }

    if last_focus == Some(target.id.as_str()) {
        score += 25.0;
    }

    if ship.shield < ship.max_shield * 0.2 && target.shield > 0.0 {
        score += 10.0;
    }

    // Distant targets that pose little danger are not worth the chase.
    if threat < 10.0 && distance > 4 {
        score -= 15.0;
    }

    match ship.ai_profile {
        AiProfile::Aggressive => {
            score += (1.0 - hull_percent) * 35.0;
            score += threat * 0.2;
            score -= d * 0.5;
        }
        AiProfile::Cautious => {
            score -= (1.0 - shield_percent) * 20.0;
            if distance > 4 {
                score -= 10.0;
            }
            if target.shield == 0.0 {
                score += 15.0;
            }
        }
        AiProfile::Flanker | AiProfile::Skirmisher => {
            score -= (d - 4.0).abs() * 8.0;
            score += access.available as f64 * 5.0;
        }
        AiProfile::Anchor => {
            score += shield_percent * 10.0;
            score -= d * 2.0;
        }
        AiProfile::Vanguard | AiProfile::Opportunist => {
            score += (1.0 - hull_percent) * 20.0 + threat * 0.3;
        }
        AiProfile::Standard => {}
    }

    score
}

/// The highest-scoring living opponent. Ties go to the first in roster order.
pub fn choose_best_target<'g>(
    grid: &'g Grid,
    ship: &Ship,
    last_focus: Option<&str>,
) -> Option<&'g Ship> {
    let mut best: Option<(&Ship, f64)> = None;
    for target in grid.ships_by_team(ship.team.opponent()) {
        let score = evaluate_target_score(grid, ship, target, last_focus);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((target, score));
        }
    }
    best.map(|(target, _)| target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexCoord;
    use crate::types::{ShipClass, Team};

    fn place(grid: &mut Grid, id: &str, class: ShipClass, team: Team, q: i32, r: i32) {
        grid.place_ship(Ship::from_preset(id, class, team, HexCoord::new(q, r)))
            .unwrap();
    }

    #[test]
    fn test_threat_counts_ready_weapons_in_range() {
        let corvette = Ship::from_preset("c", ShipClass::Corvette, Team::Player, HexCoord::new(0, 0));
        let victim = Ship::from_preset("v", ShipClass::Interceptor, Team::Enemy, HexCoord::new(4, 0));
        // Pulse Cannon 30 * 1.1 against shields, Missiles 55.
        assert!((estimate_target_threat(&corvette, &victim) - 88.0).abs() < 1e-9);

        let far = Ship::from_preset("f", ShipClass::Interceptor, Team::Enemy, HexCoord::new(7, 0));
        assert!((estimate_target_threat(&corvette, &far) - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_threat_reads_empty_gauges_as_full() {
        let mut corvette = Ship::from_preset("c", ShipClass::Corvette, Team::Player, HexCoord::new(0, 0));
        corvette.action_points = 0;
        corvette.energy = 0.0;
        let victim = Ship::from_preset("v", ShipClass::Interceptor, Team::Enemy, HexCoord::new(1, 0));
        assert!((estimate_target_threat(&corvette, &victim) - 33.0).abs() < 1e-9);
    }

    #[test]
    fn test_weapon_access_range_gap() {
        let interceptor = Ship::from_preset("i", ShipClass::Interceptor, Team::Enemy, HexCoord::new(0, 0));
        let target = Ship::from_preset("t", ShipClass::Corvette, Team::Player, HexCoord::new(9, 0));
        let access = count_weapons_in_range(&interceptor, &target);
        assert_eq!(access, WeaponAccess { available: 0, range_gap: 3 });

        let mut unarmed = interceptor.clone();
        unarmed.weapons.clear();
        assert_eq!(count_weapons_in_range(&unarmed, &target).range_gap, 5);
    }

    #[test]
    fn test_prefers_damaged_target() {
        let mut grid = Grid::new(15, 15);
        place(&mut grid, "e", ShipClass::Corvette, Team::Enemy, 0, 0);
        place(&mut grid, "healthy", ShipClass::Corvette, Team::Player, 3, 0);
        place(&mut grid, "hurt", ShipClass::Corvette, Team::Player, 0, 3);
        if let Some(ship) = grid.ship_mut("hurt") {
            ship.hull = 20.0;
            ship.shield = 0.0;
        }

        let enemy = grid.ship("e").unwrap();
        let target = choose_best_target(&grid, enemy, None).unwrap();
        assert_eq!(target.id, "hurt");
    }

    #[test]
    fn test_focus_bonus_and_tie_break() {
        let mut grid = Grid::new(15, 15);
        place(&mut grid, "e", ShipClass::Corvette, Team::Enemy, 0, 0);
        place(&mut grid, "a", ShipClass::Corvette, Team::Player, 3, 0);
        place(&mut grid, "b", ShipClass::Corvette, Team::Player, -3, 0);

        let enemy = grid.ship("e").unwrap();
        assert_eq!(choose_best_target(&grid, enemy, None).unwrap().id, "a");
        assert_eq!(choose_best_target(&grid, enemy, Some("b")).unwrap().id, "b");

        let a = grid.ship("a").unwrap();
        let b = grid.ship("b").unwrap();
        let with_focus = evaluate_target_score(&grid, enemy, b, Some("b"));
        let without = evaluate_target_score(&grid, enemy, a, Some("b"));
        assert!((with_focus - without - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_blocked_line_of_sight_penalized() {
        let mut grid = Grid::new(15, 15);
        place(&mut grid, "e", ShipClass::Corvette, Team::Enemy, 0, 0);
        place(&mut grid, "p", ShipClass::Corvette, Team::Player, 4, 0);
        let clear = {
            let enemy = grid.ship("e").unwrap();
            evaluate_target_score(&grid, enemy, grid.ship("p").unwrap(), None)
        };
        grid.add_obstacle(HexCoord::new(2, 0));
        let enemy = grid.ship("e").unwrap();
        let blocked = evaluate_target_score(&grid, enemy, grid.ship("p").unwrap(), None);
        assert!((clear - blocked - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_opponents() {
        let mut grid = Grid::new(15, 15);
        place(&mut grid, "e", ShipClass::Corvette, Team::Enemy, 0, 0);
        let enemy = grid.ship("e").unwrap();
        assert!(choose_best_target(&grid, enemy, None).is_none());
    }
}
