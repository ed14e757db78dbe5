//! Initiative order and the round/turn state machine.
//!
//! A round rolls initiative for every living ship, sorts the queue highest
//! first and walks it one ship at a time. The lead ship's turn is opened
//! and closed as part of starting the round, so once [`TurnManager::start_round`]
//! returns the second ship in the queue is acting. When the queue runs out
//! the round ends, the win condition is checked and a new round begins.

use crate::ai::{self, AiMemory};
use crate::events::{CombatEvent, EventLog};
use crate::grid::Grid;
use crate::ship::{ActionError, Ship};
use crate::types::{BattleOutcome, ShipId, Team};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Where the manager is in the round cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Initiative,
    Action,
    End,
}

/// Result of advancing the turn order.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnAdvance {
    /// This ship's turn has started.
    Started(ShipId),
    /// A side has been wiped out. Terminal.
    BattleOver(BattleOutcome),
}

/// One row of the initiative display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    pub ship: ShipId,
    pub is_active: bool,
}

/// Drives rounds and turns over a [`Grid`].
#[derive(Clone, Debug)]
pub struct TurnManager {
    turn_number: u32,
    queue: Vec<ShipId>,
    current_index: usize,
    /// The ship whose turn is open, if any.
    active: Option<ShipId>,
    /// The ship at `current_index` was removed; the next advance must not skip its successor.
    slot_vacated: bool,
    phase: Phase,
    outcome: Option<BattleOutcome>,
    processing_ai: bool,
    ai_memory: AiMemory,
    max_ai_attacks: u32,
}

impl Default for TurnManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnManager {
    pub fn new() -> Self {
        Self::with_max_ai_attacks(ai::DEFAULT_MAX_ATTACKS)
    }

    pub fn with_max_ai_attacks(max_ai_attacks: u32) -> Self {
        Self {
            turn_number: 1,
            queue: Vec::new(),
            current_index: 0,
            active: None,
            slot_vacated: false,
            phase: Phase::Initiative,
            outcome: None,
            processing_ai: false,
            ai_memory: AiMemory::default(),
            max_ai_attacks,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Round counter, starting at 1.
    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    pub fn is_processing_ai(&self) -> bool {
        self.processing_ai
    }

    pub fn ai_memory(&self) -> &AiMemory {
        &self.ai_memory
    }

    /// Id of the ship whose turn is open.
    pub fn current_ship_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn current_ship<'g>(&self, grid: &'g Grid) -> Option<&'g Ship> {
        self.current_ship_id().and_then(|id| grid.ship(id))
    }

    /// The queue for this round, flagging the acting ship.
    pub fn initiative_queue(&self) -> Vec<QueueEntry> {
        self.queue
            .iter()
            .map(|id| QueueEntry {
                ship: id.clone(),
                is_active: self.active.as_deref() == Some(id.as_str()),
            })
            .collect()
    }

    pub fn is_player_turn(&self, grid: &Grid) -> bool {
        self.current_ship(grid)
            .is_some_and(|ship| ship.team == Team::Player)
    }

    // =========================================================================
    // Round cycle
    // =========================================================================

    /// Roll initiative and run the queue up to the first ship that acts.
    pub fn start_round(
        &mut self,
        grid: &mut Grid,
        rng: &mut dyn RngCore,
        events: &mut EventLog,
    ) -> TurnAdvance {
        if let Some(outcome) = self.outcome {
            return TurnAdvance::BattleOver(outcome);
        }
        self.close_current(grid, events);
        self.begin_round(grid, rng, events);
        self.advance(grid, rng, events)
    }

    /// End the current ship's turn and open the next one.
    ///
    /// Rolls over into a new round when the queue is exhausted.
    pub fn next_turn(
        &mut self,
        grid: &mut Grid,
        rng: &mut dyn RngCore,
        events: &mut EventLog,
    ) -> TurnAdvance {
        if let Some(outcome) = self.outcome {
            return TurnAdvance::BattleOver(outcome);
        }
        self.close_current(grid, events);
        self.advance(grid, rng, events)
    }

    /// Close the round: bump the counter and check for a winner.
    pub fn end_round(&mut self, grid: &Grid, events: &mut EventLog) -> Option<BattleOutcome> {
        self.phase = Phase::End;
        self.turn_number += 1;
        let outcome = self.check_win_condition(grid)?;
        self.finish(outcome, events);
        Some(outcome)
    }

    /// A side with no living ships has lost.
    pub fn check_win_condition(&self, grid: &Grid) -> Option<BattleOutcome> {
        if grid.team_count(Team::Player) == 0 {
            return Some(BattleOutcome::victory(Team::Enemy));
        }
        if grid.team_count(Team::Enemy) == 0 {
            return Some(BattleOutcome::victory(Team::Player));
        }
        None
    }

    /// Record a win found mid-turn. Returns the outcome if the battle is over.
    pub fn settle(&mut self, grid: &Grid, events: &mut EventLog) -> Option<BattleOutcome> {
        if let Some(outcome) = self.outcome {
            return Some(outcome);
        }
        let outcome = self.check_win_condition(grid)?;
        self.finish(outcome, events);
        Some(outcome)
    }

    /// Drop a ship from this round's queue, keeping the index on the same ship.
    pub fn remove_ship_from_queue(&mut self, ship_id: &str) {
        let Some(index) = self.queue.iter().position(|id| id == ship_id) else {
            return;
        };
        self.queue.remove(index);

        if index < self.current_index {
            self.current_index -= 1;
        } else if index == self.current_index {
            self.slot_vacated = true;
        }
    }

    /// Remove every queued ship that is no longer on the grid.
    pub fn prune_queue(&mut self, grid: &Grid) {
        let gone: Vec<ShipId> = self
            .queue
            .iter()
            .filter(|id| grid.ship(id).map_or(true, |s| !s.is_alive()))
            .cloned()
            .collect();
        for id in gone {
            self.remove_ship_from_queue(&id);
        }
    }

    /// Player-initiated end of turn.
    pub fn end_current_turn(
        &mut self,
        grid: &mut Grid,
        rng: &mut dyn RngCore,
        events: &mut EventLog,
    ) -> Result<TurnAdvance, ActionError> {
        if self.outcome.is_some() {
            return Err(ActionError::BattleOver);
        }
        if !self.is_player_turn(grid) {
            return Err(ActionError::NotYourTurn);
        }
        Ok(self.next_turn(grid, rng, events))
    }

    /// Run the AI for the current enemy ship, then advance.
    ///
    /// Returns None when there is no enemy turn to process or one is already
    /// being processed. The turn ends even if the AI fails.
    pub fn process_enemy_turn(
        &mut self,
        grid: &mut Grid,
        rng: &mut dyn RngCore,
        events: &mut EventLog,
    ) -> Option<TurnAdvance> {
        let ship_id = match self.current_ship(grid) {
            Some(ship) if ship.team == Team::Enemy => ship.id.clone(),
            _ => {
                tracing::warn!("process_enemy_turn called without an enemy ship up");
                return None;
            }
        };
        if self.processing_ai {
            tracing::warn!(ship = %ship_id, "AI turn already in progress");
            return None;
        }
        self.processing_ai = true;

        match ai::take_turn(
            grid,
            &ship_id,
            &mut self.ai_memory,
            self.max_ai_attacks,
            events,
        ) {
            Ok(report) => tracing::debug!(
                ship = %ship_id,
                attacks = report.attacks,
                destroyed = report.destroyed.len(),
                "enemy turn resolved"
            ),
            Err(err) => {
                tracing::error!(ship = %ship_id, error = %err, "AI turn failed, ending turn");
                events.emit(CombatEvent::AiFault {
                    ship: ship_id.clone(),
                    error: err.to_string(),
                });
            }
        }

        self.prune_queue(grid);
        let advance = match self.settle(grid, events) {
            Some(outcome) => TurnAdvance::BattleOver(outcome),
            None => self.next_turn(grid, rng, events),
        };
        self.processing_ai = false;
        Some(advance)
    }

    /// Back to a fresh battle. Keeps the AI attack cap.
    pub fn reset(&mut self) {
        *self = Self::with_max_ai_attacks(self.max_ai_attacks);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin_round(&mut self, grid: &mut Grid, rng: &mut dyn RngCore, events: &mut EventLog) {
        self.phase = Phase::Initiative;
        self.queue.clear();
        self.current_index = 0;
        self.slot_vacated = false;

        let ids: Vec<ShipId> = grid
            .all_ships()
            .iter()
            .filter(|s| s.is_alive())
            .map(|s| s.id.clone())
            .collect();
        let mut rolled: Vec<(ShipId, u32)> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(ship) = grid.ship_mut(&id) {
                let initiative = ship.roll_initiative(rng);
                rolled.push((id, initiative));
            }
        }
        // Stable: equal rolls keep roster order.
        rolled.sort_by(|a, b| b.1.cmp(&a.1));
        self.queue = rolled.into_iter().map(|(id, _)| id).collect();

        tracing::info!(round = self.turn_number, ships = self.queue.len(), "round started");
        events.emit(CombatEvent::RoundStarted {
            round: self.turn_number,
            order: self.queue.clone(),
        });

        // The lead ship's turn opens and closes with the round start.
        if let Some(lead) = self.queue.first().cloned() {
            self.open(grid, &lead, events);
            self.close_current(grid, events);
        }
    }

    /// Step the index to the next living ship and open its turn.
    fn advance(&mut self, grid: &mut Grid, rng: &mut dyn RngCore, events: &mut EventLog) -> TurnAdvance {
        loop {
            if self.slot_vacated {
                self.slot_vacated = false;
            } else {
                self.current_index += 1;
            }

            if self.current_index >= self.queue.len() {
                if let Some(outcome) = self.end_round(grid, events) {
                    return TurnAdvance::BattleOver(outcome);
                }
                self.begin_round(grid, rng, events);
                continue;
            }

            let id = self.queue[self.current_index].clone();
            if grid.ship(&id).is_some_and(Ship::is_alive) {
                self.open(grid, &id, events);
                return TurnAdvance::Started(id);
            }
            tracing::debug!(ship = %id, "skipping ship no longer in play");
        }
    }

    fn open(&mut self, grid: &mut Grid, id: &str, events: &mut EventLog) {
        let Some(ship) = grid.ship_mut(id) else {
            return;
        };
        ship.start_turn();
        events.emit(CombatEvent::TurnStarted {
            ship: ship.id.clone(),
            name: ship.name.clone(),
            round: self.turn_number,
        });
        self.active = Some(ship.id.clone());
        self.phase = Phase::Action;
    }

    fn close_current(&mut self, grid: &mut Grid, events: &mut EventLog) {
        let Some(id) = self.active.take() else {
            return;
        };
        let Some(ship) = grid.ship_mut(&id) else {
            return;
        };
        if let Some(drift) = ship.end_turn() {
            events.emit(CombatEvent::ShipMoved {
                ship: id,
                from: drift.from,
                to: drift.to,
                hexes: 0,
                drift: true,
            });
        }
    }

    fn finish(&mut self, outcome: BattleOutcome, events: &mut EventLog) {
        self.outcome = Some(outcome);
        self.phase = Phase::End;
        self.active = None;
        tracing::info!(winner = ?outcome.winner, round = self.turn_number, "battle over");
        events.emit(CombatEvent::BattleEnded {
            outcome,
            round: self.turn_number,
        });
    }
}
