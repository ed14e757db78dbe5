//! Headless balance simulation.
//!
//! A scripted player fleet fights the AI on an open 15x15 field. Each run is
//! seeded, so a batch of runs is reproducible. Aggregated reports are meant
//! for tuning presets and AI profiles, not for gameplay.

use crate::ability::AbilityKind;
use crate::battle::Battle;
use crate::combat::has_line_of_sight;
use crate::events::CombatEvent;
use crate::hex::HexCoord;
use crate::settings::{BattleSettings, SettingsError};
use crate::ship::{ActionError, Ship};
use crate::types::{AiProfile, ShipClass, ShipId, Team};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rounds after which a run is called a draw.
pub const DEFAULT_MAX_ROUNDS: u32 = 50;
/// Seeded runs per scenario in a batch.
pub const DEFAULT_ITERATIONS: u32 = 5;

/// Enemies this close make an EMP burst worth firing.
const EMP_TRIGGER_RANGE: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("setup failed: {0}")]
    Setup(#[from] ActionError),
}

/// Fleets for one simulated battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioConfig {
    pub player_presets: Vec<ShipClass>,
    pub enemy_presets: Vec<ShipClass>,
    /// Profile per enemy slot; missing slots play `standard`.
    pub ai_profiles: Vec<AiProfile>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            player_presets: vec![ShipClass::Corvette, ShipClass::Interceptor],
            enemy_presets: vec![ShipClass::Corvette],
            ai_profiles: Vec::new(),
        }
    }
}

/// Result of a single run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStats {
    pub rounds: u32,
    pub turns: u32,
    /// Damage taken by the player fleet.
    pub player_damage: f64,
    /// Damage taken by the enemy fleet.
    pub enemy_damage: f64,
    pub player_losses: u32,
    pub enemy_losses: u32,
    /// None when the round cap was hit first.
    pub winner: Option<Team>,
}

/// Averages over every run of one scenario.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub index: usize,
    pub config: ScenarioConfig,
    pub wins: u32,
    pub losses: u32,
    pub avg_rounds: f64,
    pub avg_turns: f64,
    pub avg_player_damage: f64,
    pub avg_enemy_damage: f64,
}

/// Build both fleets: players on the left edge, enemies on the right.
pub fn create_scenario(config: &ScenarioConfig) -> (Vec<Ship>, Vec<Ship>) {
    let row = |index: usize| index as i32 * 2 - 1;

    let player = config
        .player_presets
        .iter()
        .enumerate()
        .map(|(i, class)| {
            Ship::builder(format!("player{}", i + 1), *class, Team::Player)
                .name(format!("Player {}", i + 1))
                .position(HexCoord::new(-5, row(i)))
                .build()
        })
        .collect();

    let enemy = config
        .enemy_presets
        .iter()
        .enumerate()
        .map(|(i, class)| {
            Ship::builder(format!("enemy{}", i + 1), *class, Team::Enemy)
                .name(format!("Enemy {}", i + 1))
                .position(HexCoord::new(5, row(i)))
                .ai_profile(config.ai_profiles.get(i).copied().unwrap_or_default())
                .build()
        })
        .collect();

    (player, enemy)
}

/// Fight one seeded battle to a result or the round cap.
pub fn run_simulation(
    config: &ScenarioConfig,
    seed: u64,
    max_rounds: u32,
) -> Result<SimulationStats, SimulationError> {
    let settings = BattleSettings {
        seed: Some(seed),
        ..BattleSettings::open_field()
    };
    let mut battle = Battle::new(settings)?;
    let (player, enemy) = create_scenario(config);
    let teams: HashMap<ShipId, Team> = player
        .iter()
        .chain(enemy.iter())
        .map(|s| (s.id.clone(), s.team))
        .collect();

    battle.setup(player, enemy)?;
    let mut stats = SimulationStats::default();
    tally(&mut battle, &teams, &mut stats);

    while stats.rounds < max_rounds {
        stats.rounds = battle.turns().turn_number();
        let Some(team) = battle.current_ship().map(|s| s.team) else {
            break;
        };
        stats.turns += 1;

        match team {
            Team::Player => {
                play_player_turn(&mut battle);
                // Refused only when the player's own shot ended the battle.
                let _ = battle.end_turn();
            }
            Team::Enemy => {
                battle.step();
            }
        }
        tally(&mut battle, &teams, &mut stats);

        if let Some(outcome) = battle.outcome() {
            stats.winner = Some(outcome.winner);
            break;
        }
    }

    tracing::info!(
        seed,
        rounds = stats.rounds,
        turns = stats.turns,
        winner = ?stats.winner,
        "simulation finished"
    );
    Ok(stats)
}

/// Run every scenario `iterations` times with seeds 1..=iterations.
pub fn simulate_batch(
    scenarios: &[ScenarioConfig],
    iterations: u32,
    max_rounds: u32,
) -> Result<Vec<ScenarioReport>, SimulationError> {
    let mut reports = Vec::with_capacity(scenarios.len());

    for (index, config) in scenarios.iter().enumerate() {
        let mut report = ScenarioReport {
            index,
            config: config.clone(),
            wins: 0,
            losses: 0,
            avg_rounds: 0.0,
            avg_turns: 0.0,
            avg_player_damage: 0.0,
            avg_enemy_damage: 0.0,
        };

        for i in 0..iterations {
            let stats = run_simulation(config, u64::from(i) + 1, max_rounds)?;
            match stats.winner {
                Some(Team::Player) => report.wins += 1,
                Some(Team::Enemy) => report.losses += 1,
                None => {}
            }
            report.avg_rounds += f64::from(stats.rounds);
            report.avg_turns += f64::from(stats.turns);
            report.avg_player_damage += stats.player_damage;
            report.avg_enemy_damage += stats.enemy_damage;
        }

        let divisor = f64::from(iterations.max(1));
        report.avg_rounds /= divisor;
        report.avg_turns /= divisor;
        report.avg_player_damage /= divisor;
        report.avg_enemy_damage /= divisor;

        tracing::debug!(index, wins = report.wins, losses = report.losses, "scenario done");
        reports.push(report);
    }

    Ok(reports)
}

/// Fold the battle's new events into the running totals.
fn tally(battle: &mut Battle, teams: &HashMap<ShipId, Team>, stats: &mut SimulationStats) {
    for event in battle.events_mut().drain() {
        match event {
            CombatEvent::DamageApplied {
                target,
                shield_damage,
                hull_damage,
            } => match teams.get(&target) {
                Some(Team::Player) => stats.player_damage += shield_damage + hull_damage,
                Some(Team::Enemy) => stats.enemy_damage += shield_damage + hull_damage,
                None => {}
            },
            CombatEvent::ShipDestroyed { ship, .. } => match teams.get(&ship) {
                Some(Team::Player) => stats.player_losses += 1,
                Some(Team::Enemy) => stats.enemy_losses += 1,
                None => {}
            },
            _ => {}
        }
    }
}

// =============================================================================
// Scripted player
// =============================================================================

/// Heaviest-armed enemy first, nearest on ties.
fn pick_target(battle: &Battle, ship: &Ship) -> Option<(ShipId, HexCoord)> {
    let mut best: Option<(&Ship, f64, u32)> = None;
    for enemy in battle.grid().ships_by_team(Team::Enemy) {
        let threat = enemy.total_weapon_damage();
        let distance = ship.distance_to(enemy);
        let better = match best {
            None => true,
            Some((_, t, d)) => threat > t || (threat == t && distance < d),
        };
        if better {
            best = Some((enemy, threat, distance));
        }
    }
    best.map(|(s, _, _)| (s.id.clone(), s.position))
}

/// One ability, one shot or one step toward the target.
fn play_player_turn(battle: &mut Battle) {
    let Some(ship) = battle.current_ship() else {
        return;
    };
    if ship.action_points == 0 || ship.energy <= 0.0 {
        return;
    }
    let Some((target_id, _)) = pick_target(battle, ship) else {
        return;
    };

    maybe_use_ability(battle, &target_id);

    // Abilities may have moved either ship.
    let (shot, step) = {
        let Some(ship) = battle.current_ship() else {
            return;
        };
        let Some(target) = battle.grid().ship(&target_id) else {
            return;
        };
        let mut weapon: Option<(usize, f64)> = None;
        for (index, w) in ship.weapons.iter().enumerate() {
            if ship.can_fire_weapon(index, target.position)
                && weapon.map_or(true, |(_, damage)| w.damage > damage)
            {
                weapon = Some((index, w.damage));
            }
        }
        let shot = weapon
            .filter(|_| has_line_of_sight(ship.position, target.position, battle.grid()))
            .map(|(index, _)| index);
        (shot, approach_step(battle, ship, target))
    };

    if let Some(index) = shot {
        if battle.fire(index, &target_id).is_ok() {
            return;
        }
    }
    if let Some(step) = step {
        if let Err(err) = battle.move_to(step) {
            tracing::debug!(error = %err, "scripted move refused");
        }
    }
}

/// First hex of the shortest path to a free hex next to `target`.
fn approach_step(battle: &Battle, ship: &Ship, target: &Ship) -> Option<HexCoord> {
    let grid = battle.grid();
    let mut best: Option<Vec<HexCoord>> = None;
    for neighbor in target.position.neighbors() {
        if neighbor == ship.position {
            return None;
        }
        if !grid.is_valid_hex(neighbor) || grid.is_blocked(neighbor) {
            continue;
        }
        let Some(path) = grid.find_path(ship.position, neighbor, ship) else {
            continue;
        };
        if !path.steps.is_empty() && best.as_ref().map_or(true, |b| path.steps.len() < b.len()) {
            best = Some(path.steps);
        }
    }
    best.and_then(|steps| steps.first().copied())
}

/// Use the first ability whose trigger holds.
fn maybe_use_ability(battle: &mut Battle, target_id: &str) {
    let Some(ship) = battle.current_ship() else {
        return;
    };
    let kinds: Vec<AbilityKind> = ship.abilities.iter().map(|a| a.kind).collect();

    for (index, kind) in kinds.into_iter().enumerate() {
        let Some(ship) = battle.current_ship() else {
            return;
        };
        if !ship.can_use_ability(index) {
            continue;
        }
        let wanted = match kind {
            AbilityKind::ShieldSurge => ship.shield_ratio() < 0.5 || ship.hull_ratio() < 0.6,
            AbilityKind::EvasiveManeuver => ship.hull_ratio() < 0.45,
            AbilityKind::WeaponOvercharge => battle.grid().ship(target_id).is_some(),
            AbilityKind::BurstEngines => true,
            AbilityKind::EmpBurst => battle
                .grid()
                .ships_by_team(Team::Enemy)
                .any(|e| e.position.distance(&ship.position) <= EMP_TRIGGER_RANGE),
        };
        if wanted && battle.use_ability(index).is_ok() {
            return;
        }
    }
}
