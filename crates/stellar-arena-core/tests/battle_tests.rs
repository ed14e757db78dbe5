//! Integration tests for complete Stellar Arena battle flows.
//!
//! These tests verify end-to-end behavior including:
//! - Hex geometry properties
//! - Pathfinding budgets and reachable sets
//! - Damage and energy allocation invariants
//! - Initiative order and round flow
//! - Enemy turns that always end
//! - Win detection
//! - Ship snapshots
//! - Seeded simulation runs

use rand::rngs::mock::StepRng;
use stellar_arena_core::{
    ai::{self, AiMemory},
    battle::{skirmish_fleets, Battle},
    events::{CombatEvent, EventLog},
    grid::Grid,
    hex::HexCoord,
    pathfinding::{drift_direction, find_path, find_reachable},
    settings::BattleSettings,
    ship::{ActionError, Ship, ShipOverrides},
    simulation::{run_simulation, ScenarioConfig},
    turn::{TurnAdvance, TurnManager},
    types::{AiProfile, BattleOutcome, ShipClass, Team},
    weapon::Weapon,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// A preset ship at (q, r).
fn ship_at(id: &str, class: ShipClass, team: Team, q: i32, r: i32) -> Ship {
    Ship::from_preset(id, class, team, HexCoord::new(q, r))
}

/// A preset ship whose turn is open.
fn active_ship(id: &str, class: ShipClass, team: Team, q: i32, r: i32) -> Ship {
    let mut ship = ship_at(id, class, team, q, r);
    ship.start_turn();
    ship
}

/// A corvette with fixed sensors, so initiative is exact under `StepRng`.
fn ship_with_sensors(id: &str, team: Team, sensors: u32, q: i32) -> Ship {
    Ship::builder(id, ShipClass::Corvette, team)
        .position(HexCoord::new(q, 0))
        .overrides(ShipOverrides {
            sensors: Some(sensors),
            ..Default::default()
        })
        .build()
}

fn sample_hexes() -> Vec<HexCoord> {
    let mut hexes = Vec::new();
    for q in -3..=3 {
        for r in -3..=3 {
            hexes.push(HexCoord::new(q, r));
        }
    }
    hexes
}

// =============================================================================
// Hex Geometry Tests
// =============================================================================

mod hex_geometry {
    use super::*;

    #[test]
    fn test_distance_symmetry_and_triangle_inequality() {
        let hexes = sample_hexes();
        for a in &hexes {
            assert_eq!(a.distance(a), 0);
            for b in &hexes {
                assert_eq!(a.distance(b), b.distance(a));
                for c in hexes.iter().step_by(5) {
                    assert!(a.distance(c) <= a.distance(b) + b.distance(c));
                }
            }
        }
    }

    #[test]
    fn test_neighbors_are_distinct_and_adjacent() {
        for hex in sample_hexes() {
            let neighbors = hex.neighbors();
            for (i, n) in neighbors.iter().enumerate() {
                assert_eq!(hex.distance(n), 1);
                assert!(!neighbors[i + 1..].contains(n));
            }
        }
    }

    #[test]
    fn test_lines_are_connected() {
        let origin = HexCoord::new(0, 0);
        for target in sample_hexes() {
            let line = origin.line_to(&target);
            assert_eq!(line.len() as u32, origin.distance(&target) + 1);
            assert_eq!(line.first(), Some(&origin));
            assert_eq!(line.last(), Some(&target));
            for pair in line.windows(2) {
                assert_eq!(pair[0].distance(&pair[1]), 1);
            }
        }
    }
}

// =============================================================================
// Pathfinding Tests
// =============================================================================

mod pathfinding_tests {
    use super::*;

    fn walled_grid() -> Grid {
        let mut grid = Grid::new(15, 15);
        for r in -2..=2 {
            grid.add_obstacle(HexCoord::new(2, r));
        }
        grid
    }

    #[test]
    fn test_paths_stay_within_budget_and_end_on_goal() {
        let grid = walled_grid();
        let ship = active_ship("s", ShipClass::Interceptor, Team::Player, 0, 0);

        for goal in sample_hexes() {
            if goal == ship.position || grid.is_blocked(goal) {
                continue;
            }
            if let Some(path) = find_path(&grid, ship.position, goal, &ship, 4.0) {
                assert!(path.total_cost <= 4.0 + 1e-9);
                assert_eq!(path.steps.last(), Some(&goal));
                assert!(path.steps.iter().all(|h| !grid.is_blocked(*h)));
            }
        }
    }

    #[test]
    fn test_blocked_or_distant_goals_fail() {
        let grid = walled_grid();
        let ship = active_ship("s", ShipClass::Interceptor, Team::Player, 0, 0);
        assert!(find_path(&grid, ship.position, HexCoord::new(2, 0), &ship, 10.0).is_none());
        assert!(find_path(&grid, ship.position, HexCoord::new(-6, 0), &ship, 4.0).is_none());
    }

    #[test]
    fn test_start_equals_goal_is_empty() {
        let grid = Grid::new(15, 15);
        let ship = active_ship("s", ShipClass::Corvette, Team::Player, 0, 0);
        let path = find_path(&grid, ship.position, ship.position, &ship, 3.0).unwrap();
        assert!(path.steps.is_empty());
    }

    #[test]
    fn test_reachable_set_consistent_with_paths() {
        let grid = walled_grid();
        let ship = active_ship("s", ShipClass::Interceptor, Team::Player, 0, 0);
        let budget = ship.action_points as f64;

        let reachable = find_reachable(&grid, ship.position, &ship);
        assert!(!reachable.is_empty());
        for entry in reachable {
            assert!(entry.cost <= budget + 1e-9);
            let path = find_path(&grid, ship.position, entry.hex, &ship, budget).unwrap();
            assert!(path.total_cost <= entry.cost + 1e-9);
        }
    }

    #[test]
    fn test_drift_sector_changes_step_cost() {
        let grid = Grid::new(15, 15);
        let mut ship = active_ship("s", ShipClass::Interceptor, Team::Player, 0, 0);
        ship.velocity.q = 1.0;
        let sector = drift_direction(&ship.velocity).unwrap();

        let origin = ship.position;
        let with = origin.neighbor(sector).neighbor(sector);
        let against = origin.neighbor((sector + 3) % 6).neighbor((sector + 3) % 6);
        let with_drift = find_path(&grid, origin, with, &ship, 4.0).unwrap();
        let against_drift = find_path(&grid, origin, against, &ship, 4.0).unwrap();
        assert_eq!(with_drift.total_cost, 1.0);
        assert!(against_drift.total_cost > 2.0);
    }
}

// =============================================================================
// Ship Invariant Tests
// =============================================================================

mod ship_invariants {
    use super::*;

    #[test]
    fn test_damage_conservation() {
        for amount in [0.0, 1.0, 7.5, 40.0, 64.9, 65.0, 120.0, 500.0] {
            let mut ship = ship_at("c", ShipClass::Corvette, Team::Enemy, 0, 0);
            let report = ship.take_damage(amount);

            assert!(ship.shield >= 0.0);
            assert!(ship.hull >= 0.0);
            assert!(report.shield_damage + report.hull_damage <= amount + 1e-9);
            assert_eq!(report.destroyed, ship.hull == 0.0);
            assert_eq!(ship.is_destroyed, ship.hull == 0.0);
        }
    }

    #[test]
    fn test_energy_allocation_invariant() {
        let mut ship = active_ship("c", ShipClass::Corvette, Team::Player, 0, 0);
        let before = ship.energy_allocation;

        for (w, s, e) in [(5, 5, 5), (0, 0, 0), (3, 3, 3), (10, 1, 0)] {
            assert!(ship.set_energy_allocation(w, s, e).is_err());
            assert_eq!(ship.energy_allocation, before);
        }

        ship.set_energy_allocation(10, 0, 0).unwrap();
        assert_eq!(
            (
                ship.energy_allocation.weapons,
                ship.energy_allocation.shields,
                ship.energy_allocation.engines
            ),
            (10, 0, 0)
        );
        assert_eq!(ship.energy_allocation.total(), 10);
    }

    #[test]
    fn test_allocation_change_needs_action_point() {
        let mut ship = active_ship("c", ShipClass::Corvette, Team::Player, 0, 0);
        ship.action_points = 0;
        assert!(matches!(
            ship.set_energy_allocation(4, 3, 3),
            Err(ActionError::InsufficientActionPoints { .. })
        ));
    }

    #[test]
    fn test_weapon_range_gating() {
        let mut ship = active_ship("s", ShipClass::Corvette, Team::Player, 0, 0);
        ship.weapons = vec![Weapon::energy("Test Beam", 20.0, 10.0, 1, 0, (2, 6))];

        assert!(!ship.can_fire_weapon(0, HexCoord::new(1, 0)));
        assert!(ship.can_fire_weapon(0, HexCoord::new(4, 0)));
        assert!(!ship.can_fire_weapon(0, HexCoord::new(7, 0)));
    }

    #[test]
    fn test_failed_fire_changes_nothing() {
        let mut ship = active_ship("s", ShipClass::Corvette, Team::Player, 0, 0);
        let before = ship.clone();
        assert!(ship.fire_weapon(0, "t", HexCoord::new(9, 0)).is_err());
        assert_eq!(ship, before);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut ship = ship_at("c", ShipClass::Corvette, Team::Enemy, 3, -2);
        ship.hull = 77.0;
        ship.shield = 12.5;
        ship.energy = 41.0;
        ship.weapons[1].cooldown_remaining = 2;
        ship.abilities[0].cooldown_remaining = 1;
        ship.status_effects.evasive_charges = 1;
        ship.ai_profile = AiProfile::Flanker;

        let json = ship.to_json().unwrap();
        let restored = Ship::from_json(&json).unwrap();

        assert_eq!(restored.id, ship.id);
        assert_eq!(restored.position, ship.position);
        assert_eq!(restored.hull, 77.0);
        assert_eq!(restored.shield, 12.5);
        assert_eq!(restored.energy, 41.0);
        assert_eq!(restored.weapons, ship.weapons);
        assert_eq!(restored.abilities, ship.abilities);
        assert_eq!(restored.status_effects, ship.status_effects);
        assert_eq!(restored.ai_profile, AiProfile::Flanker);
    }

    #[test]
    fn test_corrupt_snapshot_rejected() {
        assert!(Ship::from_json("{not json").is_err());

        let ship = ship_at("c", ShipClass::Corvette, Team::Enemy, 0, 0);
        let mut value: serde_json::Value = serde_json::from_str(&ship.to_json().unwrap()).unwrap();
        value["hull"] = serde_json::json!(-5.0);
        assert!(Ship::from_json(&value.to_string()).is_err());
    }
}

// =============================================================================
// Turn Flow Tests
// =============================================================================

mod turn_flow {
    use super::*;

    fn three_ship_grid() -> Grid {
        let mut grid = Grid::new(15, 15);
        grid.place_ship(ship_with_sensors("slow", Team::Enemy, 20, 6)).unwrap();
        grid.place_ship(ship_with_sensors("player", Team::Player, 30, -6)).unwrap();
        grid.place_ship(ship_with_sensors("fast", Team::Enemy, 45, 3)).unwrap();
        grid
    }

    #[test]
    fn test_initiative_order_and_current_ship() {
        let mut grid = three_ship_grid();
        let mut rng = StepRng::new(0, 0);
        let mut events = EventLog::default();
        let mut turns = TurnManager::new();

        turns.start_round(&mut grid, &mut rng, &mut events);
        let order: Vec<String> = turns.initiative_queue().into_iter().map(|e| e.ship).collect();
        assert_eq!(order, vec!["fast", "player", "slow"]);
        assert_eq!(turns.current_ship(&grid).unwrap().id, "player");

        turns.next_turn(&mut grid, &mut rng, &mut events);
        assert_eq!(turns.current_ship(&grid).unwrap().id, "slow");
    }

    #[test]
    fn test_event_order_for_round_start() {
        let mut grid = three_ship_grid();
        let mut rng = StepRng::new(0, 0);
        let mut events = EventLog::default();
        let mut turns = TurnManager::new();
        turns.start_round(&mut grid, &mut rng, &mut events);

        let kinds: Vec<String> = events
            .events()
            .map(|e| match e {
                CombatEvent::RoundStarted { .. } => "round".to_string(),
                CombatEvent::TurnStarted { ship, .. } => format!("turn:{ship}"),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec!["round", "turn:fast", "turn:player"]);
    }

    #[test]
    fn test_win_detection_both_sides() {
        let mut grid = three_ship_grid();
        grid.remove_ship_by_id("slow");
        grid.remove_ship_by_id("fast");
        let mut events = EventLog::default();
        assert_eq!(
            TurnManager::new().end_round(&grid, &mut events),
            Some(BattleOutcome::victory(Team::Player))
        );

        let mut grid = three_ship_grid();
        grid.remove_ship_by_id("player");
        assert_eq!(
            TurnManager::new().end_round(&grid, &mut events),
            Some(BattleOutcome::victory(Team::Enemy))
        );
    }

    #[test]
    fn test_drift_applies_at_turn_end() {
        let mut grid = three_ship_grid();
        let mut rng = StepRng::new(0, 0);
        let mut events = EventLog::default();
        let mut turns = TurnManager::new();
        turns.start_round(&mut grid, &mut rng, &mut events);

        if let Some(player) = grid.ship_mut("player") {
            player.velocity.q = 1.0;
        }
        turns.next_turn(&mut grid, &mut rng, &mut events);

        assert_eq!(grid.ship("player").unwrap().position, HexCoord::new(-5, 0));
        assert!(events
            .events()
            .any(|e| matches!(e, CombatEvent::ShipMoved { drift: true, .. })));
    }
}

// =============================================================================
// Enemy AI Tests
// =============================================================================

mod enemy_ai {
    use super::*;

    #[test]
    fn test_ai_never_stalls() {
        let loadouts: Vec<Box<dyn Fn(&mut Ship)>> = vec![
            Box::new(|_: &mut Ship| {}),
            Box::new(|s: &mut Ship| s.weapons.clear()),
            Box::new(|s: &mut Ship| s.energy = 0.0),
            Box::new(|s: &mut Ship| {
                s.weapons.clear();
                s.abilities.clear();
            }),
        ];

        for strip in loadouts {
            let mut grid = Grid::new(15, 15);
            let mut enemy = ship_with_sensors("enemy", Team::Enemy, 10, 5);
            strip(&mut enemy);
            grid.place_ship(enemy).unwrap();
            grid.place_ship(ship_with_sensors("lead", Team::Enemy, 90, 7)).unwrap();
            grid.place_ship(ship_with_sensors("player", Team::Player, 50, -5)).unwrap();

            let mut rng = StepRng::new(0, 0);
            let mut events = EventLog::default();
            let mut turns = TurnManager::new();
            turns.start_round(&mut grid, &mut rng, &mut events);
            turns.next_turn(&mut grid, &mut rng, &mut events);
            assert_eq!(turns.current_ship_id(), Some("enemy"));

            let advance = turns.process_enemy_turn(&mut grid, &mut rng, &mut events);
            assert!(advance.is_some());
            assert_ne!(turns.current_ship_id(), Some("enemy"));
            assert!(!turns.is_processing_ai());
        }
    }

    #[test]
    fn test_ai_focuses_and_damages() {
        let mut grid = Grid::new(15, 15);
        grid.place_ship(active_ship("e", ShipClass::Destroyer, Team::Enemy, 0, 0)).unwrap();
        grid.place_ship(ship_at("p", ShipClass::Corvette, Team::Player, 4, 0)).unwrap();

        let mut memory = AiMemory::default();
        let mut events = EventLog::default();
        let report = ai::take_turn(&mut grid, "e", &mut memory, 10, &mut events).unwrap();

        assert_eq!(memory.last_focus.as_deref(), Some("p"));
        assert!(report.attacks > 0);
        let target = grid.ship("p").unwrap();
        assert!(target.shield + target.hull < target.max_shield + target.max_hull);
    }

    #[test]
    fn test_every_profile_finishes_a_turn() {
        for profile in AiProfile::all() {
            let mut grid = Grid::new(15, 15);
            let mut enemy = active_ship("e", ShipClass::Corvette, Team::Enemy, 5, 0);
            enemy.ai_profile = *profile;
            grid.place_ship(enemy).unwrap();
            grid.place_ship(ship_at("p", ShipClass::Interceptor, Team::Player, -5, 1)).unwrap();

            let mut memory = AiMemory::default();
            let mut events = EventLog::default();
            let report = ai::take_turn(&mut grid, "e", &mut memory, 10, &mut events);
            assert!(report.is_ok(), "{profile:?} failed: {report:?}");
        }
    }
}

// =============================================================================
// Battle Session Tests
// =============================================================================

mod battle_session {
    use super::*;

    #[test]
    fn test_skirmish_plays_to_completion_or_cap() {
        let mut battle = Battle::new(BattleSettings::seeded(9)).unwrap();
        let (player, enemy) = skirmish_fleets();
        battle.setup(player, enemy).unwrap();

        for _ in 0..400 {
            if battle.is_over() {
                break;
            }
            if battle.is_player_turn() {
                battle.end_turn().unwrap();
            } else {
                battle.step();
            }
        }

        // Passive players only lose or survive.
        if let Some(outcome) = battle.outcome() {
            assert_eq!(outcome.winner, Team::Enemy);
            assert_eq!(battle.grid().team_count(Team::Player), 0);
        }
    }

    #[test]
    fn test_sink_sees_every_event() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let mut battle = Battle::new(BattleSettings::seeded(4)).unwrap();
        battle.set_sink(Box::new(move |_: &CombatEvent| {
            *counter.lock().unwrap() += 1;
        }));

        let (player, enemy) = skirmish_fleets();
        battle.setup(player, enemy).unwrap();
        assert_eq!(*seen.lock().unwrap() as u64, battle.events().total_emitted());
    }

    #[test]
    fn test_setup_is_repeatable() {
        let mut battle = Battle::new(BattleSettings::seeded(5)).unwrap();
        let (player, enemy) = skirmish_fleets();
        let first = battle.setup(player, enemy).unwrap();
        let obstacles = battle.grid().obstacles();

        let mut again = Battle::new(BattleSettings::seeded(5)).unwrap();
        let (player, enemy) = skirmish_fleets();
        assert_eq!(again.setup(player, enemy).unwrap(), first);
        assert_eq!(again.grid().obstacles(), obstacles);
        assert!(matches!(first, TurnAdvance::Started(_)));
    }
}

// =============================================================================
// Simulation Tests
// =============================================================================

mod simulation_runs {
    use super::*;

    #[test]
    fn test_simulation_terminates() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("stellar_arena_core=debug")
            .with_test_writer()
            .try_init();

        let stats = run_simulation(&ScenarioConfig::default(), 1, 50).unwrap();
        assert!(stats.rounds <= 50);
        assert!(stats.turns > 0);
        assert!(stats.player_damage >= 0.0);
        assert!(stats.enemy_damage >= 0.0);
    }
}
