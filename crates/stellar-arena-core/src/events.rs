//! Combat event stream.
//!
//! Everything notable that happens in a battle is recorded as a
//! [`CombatEvent`]. The core never waits on a listener: events are pushed into
//! a bounded [`EventLog`] and forwarded to an optional [`EventSink`] (a combat
//! log panel, a renderer, a replay recorder).
//!
//! Event types:
//! - Round and turn boundaries
//! - Movement, including end-of-turn drift
//! - Weapon fire and its effect on the target
//! - Ability activations and energy reallocation
//! - Destruction and battle end
//! - AI faults that forced a turn to end

use crate::ability::{AbilityKind, AbilityOutcome};
use crate::hex::HexCoord;
use crate::ship::EnergyAllocation;
use crate::types::{BattleOutcome, ShipId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Default number of events kept in a log.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// A notification emitted by the battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CombatEvent {
    RoundStarted {
        round: u32,
        /// Ship ids in initiative order.
        order: Vec<ShipId>,
    },
    TurnStarted {
        ship: ShipId,
        name: String,
        round: u32,
    },
    ShipMoved {
        ship: ShipId,
        from: HexCoord,
        to: HexCoord,
        /// Hexes in the path; 0 for a dash or a drift.
        hexes: usize,
        drift: bool,
    },
    WeaponFired {
        attacker: ShipId,
        weapon: String,
        target: ShipId,
        damage: f64,
        overcharged: bool,
    },
    DamageApplied {
        target: ShipId,
        shield_damage: f64,
        hull_damage: f64,
    },
    EnergyDrained {
        target: ShipId,
        amount: f64,
    },
    AbilityUsed {
        ship: ShipId,
        ability: AbilityKind,
        outcome: AbilityOutcome,
    },
    EnergyReallocated {
        ship: ShipId,
        allocation: EnergyAllocation,
    },
    ShipDestroyed {
        ship: ShipId,
        name: String,
    },
    BattleEnded {
        outcome: BattleOutcome,
        round: u32,
    },
    AiFault {
        ship: ShipId,
        error: String,
    },
}

impl fmt::Display for CombatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatEvent::RoundStarted { round, .. } => write!(f, "Round {round} begins"),
            CombatEvent::TurnStarted { name, round, .. } => {
                write!(f, "{name}'s turn (round {round})")
            }
            CombatEvent::ShipMoved {
                ship, hexes, drift, ..
            } => {
                if *drift {
                    write!(f, "{ship} drifts")
                } else {
                    write!(f, "{ship} moves {hexes} hexes")
                }
            }
            CombatEvent::WeaponFired {
                attacker,
                weapon,
                target,
                ..
            } => write!(f, "{attacker} fires {weapon} at {target}"),
            CombatEvent::DamageApplied {
                target,
                shield_damage,
                hull_damage,
            } => write!(
                f,
                "{target} takes {shield_damage:.0} shield / {hull_damage:.0} hull damage"
            ),
            CombatEvent::EnergyDrained { target, amount } => {
                write!(f, "{target} loses {amount:.0} energy")
            }
            CombatEvent::AbilityUsed { ship, ability, .. } => {
                write!(f, "{ship} uses {}", ability.name())
            }
            CombatEvent::EnergyReallocated { ship, allocation } => write!(
                f,
                "{ship} reallocates power: W{} S{} E{}",
                allocation.weapons, allocation.shields, allocation.engines
            ),
            CombatEvent::ShipDestroyed { name, .. } => write!(f, "{name} destroyed!"),
            CombatEvent::BattleEnded { outcome, .. } => {
                write!(f, "Battle over: {} wins", outcome.winner)
            }
            CombatEvent::AiFault { ship, error } => write!(f, "{ship} AI fault: {error}"),
        }
    }
}

/// Receives events as they are emitted.
pub trait EventSink {
    fn on_event(&mut self, event: &CombatEvent);
}

/// Forward events to a plain closure.
impl<F> EventSink for F
where
    F: FnMut(&CombatEvent),
{
    fn on_event(&mut self, event: &CombatEvent) {
        self(event)
    }
}

/// The most recent combat events, oldest first.
pub struct EventLog {
    events: VecDeque<CombatEvent>,
    capacity: usize,
    /// Total events ever emitted, including evicted ones.
    emitted: u64,
    sink: Option<Box<dyn EventSink>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity: capacity.max(1),
            emitted: 0,
            sink: None,
        }
    }

    /// Attach a sink. Replaces any previous one.
    pub fn set_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Record an event, evicting the oldest once full.
    pub fn emit(&mut self, event: CombatEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.on_event(&event);
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.emitted += 1;
    }

    pub fn events(&self) -> impl Iterator<Item = &CombatEvent> + '_ {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&CombatEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_emitted(&self) -> u64 {
        self.emitted
    }

    /// Drop every stored event. The sink stays attached.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Take the stored events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<CombatEvent> {
        self.events.drain(..).collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("events", &self.events)
            .field("capacity", &self.capacity)
            .field("emitted", &self.emitted)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
