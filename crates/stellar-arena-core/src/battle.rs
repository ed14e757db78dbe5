//! A battle session: grid, turn order, random source and event log together.
//!
//! [`Battle`] is the surface a game loop or UI talks to. Player actions are
//! only accepted for the ship whose turn is open, and every action either
//! succeeds completely or returns an [`ActionError`] with nothing changed.
//! Enemy turns are run with [`Battle::step`].

use crate::ability::{self, AbilityOutcome, AbilityScope};
use crate::combat::{fire_on_grid, has_line_of_sight, Volley};
use crate::events::{CombatEvent, EventLog, EventSink};
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::rng::{battle_rng, BattleRng};
use crate::settings::{BattleSettings, SettingsError};
use crate::ship::{ActionError, Ship};
use crate::turn::{TurnAdvance, TurnManager};
use crate::types::{BattleOutcome, ShipClass, ShipId, Team};

/// One battle from setup to victory.
#[derive(Debug)]
pub struct Battle {
    settings: BattleSettings,
    grid: Grid,
    turns: TurnManager,
    rng: BattleRng,
    events: EventLog,
}

impl Battle {
    /// Create an empty battle. Call [`Battle::setup`] to place fleets.
    pub fn new(settings: BattleSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let (width, height) = settings.grid_dimensions();
        Ok(Self {
            grid: Grid::new(width, height),
            turns: TurnManager::with_max_ai_attacks(settings.max_ai_attacks),
            rng: battle_rng(settings.seed),
            events: EventLog::new(settings.event_log_capacity),
            settings,
        })
    }

    /// Place both fleets, scatter obstacles and start the first round.
    ///
    /// Ships are forced onto the team of the list they arrive in. Any
    /// previous battle state is discarded.
    pub fn setup(&mut self, player: Vec<Ship>, enemy: Vec<Ship>) -> Result<TurnAdvance, ActionError> {
        self.grid.clear();
        self.turns.reset();
        self.events.clear();

        let fleets = player
            .into_iter()
            .map(|s| (s, Team::Player))
            .chain(enemy.into_iter().map(|s| (s, Team::Enemy)));
        for (mut ship, team) in fleets {
            ship.team = team;
            self.grid.place_ship(ship)?;
        }

        let placed = self
            .grid
            .generate_obstacles(self.settings.obstacle_count, &mut self.rng);
        tracing::info!(
            players = self.grid.team_count(Team::Player),
            enemies = self.grid.team_count(Team::Enemy),
            obstacles = placed,
            "battle set up"
        );

        Ok(self
            .turns
            .start_round(&mut self.grid, &mut self.rng, &mut self.events))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn settings(&self) -> &BattleSettings {
        &self.settings
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn turns(&self) -> &TurnManager {
        &self.turns
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    /// Forward every event to `sink` as it is emitted.
    pub fn set_sink(&mut self, sink: Box<dyn EventSink>) {
        self.events.set_sink(sink);
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.turns.outcome()
    }

    pub fn is_over(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn current_ship(&self) -> Option<&Ship> {
        self.turns.current_ship(&self.grid)
    }

    pub fn is_player_turn(&self) -> bool {
        self.turns.is_player_turn(&self.grid)
    }

    // =========================================================================
    // Player actions
    // =========================================================================

    /// The acting player ship, or why the player cannot act.
    fn acting_player(&self) -> Result<ShipId, ActionError> {
        if self.is_over() {
            return Err(ActionError::BattleOver);
        }
        match self.current_ship() {
            Some(ship) if ship.team == Team::Player => Ok(ship.id.clone()),
            _ => Err(ActionError::NotYourTurn),
        }
    }

    /// Move the acting ship to `goal` along the cheapest path.
    pub fn move_to(&mut self, goal: HexCoord) -> Result<Vec<HexCoord>, ActionError> {
        let id = self.acting_player()?;
        let ship = self
            .grid
            .ship(&id)
            .ok_or_else(|| ActionError::ShipNotFound(id.clone()))?;
        let from = ship.position;
        let path = self
            .grid
            .find_path(from, goal, ship)
            .ok_or(ActionError::PathBlocked)?;
        if path.steps.is_empty() {
            return Err(ActionError::EmptyPath);
        }

        self.grid.move_ship(&id, &path.steps)?;
        self.events.emit(CombatEvent::ShipMoved {
            ship: id,
            from,
            to: goal,
            hexes: path.steps.len(),
            drift: false,
        });
        Ok(path.steps)
    }

    /// Fire weapon `weapon_index` of the acting ship at `target_id`.
    ///
    /// Range, energy, AP and cooldown are checked first, then line of sight.
    /// A kill is cleared from the grid and the queue, and ends the battle
    /// immediately if it was the last of its side.
    pub fn fire(&mut self, weapon_index: usize, target_id: &str) -> Result<Volley, ActionError> {
        let id = self.acting_player()?;
        let attacker = self
            .grid
            .ship(&id)
            .ok_or_else(|| ActionError::ShipNotFound(id.clone()))?;
        let target = self
            .grid
            .ship(target_id)
            .ok_or_else(|| ActionError::ShipNotFound(target_id.to_string()))?;
        if target.team == attacker.team {
            return Err(ActionError::FriendlyTarget);
        }
        attacker.check_fire(weapon_index, target.position)?;
        if !has_line_of_sight(attacker.position, target.position, &self.grid) {
            return Err(ActionError::NoLineOfSight);
        }

        let volley = fire_on_grid(&mut self.grid, &id, weapon_index, target_id, &mut self.events)?;
        if let Some(wreck) = &volley.wreck {
            self.turns.remove_ship_from_queue(&wreck.id);
            self.turns.settle(&self.grid, &mut self.events);
        }
        Ok(volley)
    }

    /// Activate ability `index` of the acting ship.
    pub fn use_ability(&mut self, index: usize) -> Result<AbilityOutcome, ActionError> {
        let id = self.acting_player()?;
        let outcome = ability::use_ability(
            AbilityScope::OnGrid {
                grid: &mut self.grid,
                caster: &id,
            },
            index,
        )?;
        let kind = self
            .grid
            .ship(&id)
            .and_then(|s| s.abilities.get(index))
            .map(|a| a.kind)
            .ok_or(ActionError::UnknownAbility(index))?;

        if let AbilityOutcome::Dashed { from, to } = outcome {
            self.events.emit(CombatEvent::ShipMoved {
                ship: id.clone(),
                from,
                to,
                hexes: 0,
                drift: false,
            });
        }
        self.events.emit(CombatEvent::AbilityUsed {
            ship: id,
            ability: kind,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Change the acting ship's energy split. Costs 1 AP.
    pub fn allocate_energy(&mut self, weapons: u32, shields: u32, engines: u32) -> Result<(), ActionError> {
        let id = self.acting_player()?;
        let ship = self
            .grid
            .ship_mut(&id)
            .ok_or_else(|| ActionError::ShipNotFound(id.clone()))?;
        ship.set_energy_allocation(weapons, shields, engines)?;
        let allocation = ship.energy_allocation;
        self.events.emit(CombatEvent::EnergyReallocated { ship: id, allocation });
        Ok(())
    }

    /// End the acting player ship's turn.
    pub fn end_turn(&mut self) -> Result<TurnAdvance, ActionError> {
        self.turns
            .end_current_turn(&mut self.grid, &mut self.rng, &mut self.events)
    }

    // =========================================================================
    // Driving the loop
    // =========================================================================

    /// Advance the battle by one decision.
    ///
    /// Runs the AI if an enemy is up. On a player turn nothing happens and
    /// the acting ship is returned.
    pub fn step(&mut self) -> TurnAdvance {
        if let Some(outcome) = self.outcome() {
            return TurnAdvance::BattleOver(outcome);
        }
        match self.current_ship().map(|s| (s.id.clone(), s.team)) {
            Some((id, Team::Player)) => TurnAdvance::Started(id),
            Some((_, Team::Enemy)) => {
                let advance =
                    self.turns
                        .process_enemy_turn(&mut self.grid, &mut self.rng, &mut self.events);
                match advance {
                    Some(advance) => advance,
                    None => self
                        .turns
                        .next_turn(&mut self.grid, &mut self.rng, &mut self.events),
                }
            }
            None => self
                .turns
                .next_turn(&mut self.grid, &mut self.rng, &mut self.events),
        }
    }

    /// Run enemy turns until a player ship is up or the battle ends.
    ///
    /// Gives up after `max_turns` enemy turns and returns the last advance.
    pub fn run_enemy_turns(&mut self, max_turns: usize) -> TurnAdvance {
        let mut advance = self.step();
        for _ in 1..max_turns {
            match &advance {
                TurnAdvance::BattleOver(_) => break,
                TurnAdvance::Started(_) if self.is_player_turn() => break,
                TurnAdvance::Started(_) => advance = self.step(),
            }
        }
        advance
    }
}

/// The stock skirmish: two player ships against a corvette and a destroyer.
pub fn skirmish_fleets() -> (Vec<Ship>, Vec<Ship>) {
    let ship = |id: &str, name: &str, class: ShipClass, team: Team, q: i32, r: i32| {
        Ship::builder(id, class, team)
            .name(name)
            .position(HexCoord::new(q, r))
            .build()
    };
    let player = vec![
        ship("player1", "Aurora", ShipClass::Corvette, Team::Player, -5, 2),
        ship("player2", "Falcon", ShipClass::Interceptor, Team::Player, -5, -2),
    ];
    let enemy = vec![
        ship("enemy1", "Raider Alpha", ShipClass::Corvette, Team::Enemy, 5, 0),
        ship("enemy2", "Destroyer Beta", ShipClass::Destroyer, Team::Enemy, 6, -2),
    ];
    (player, enemy)
}
