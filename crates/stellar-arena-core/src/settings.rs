//! Battle settings and configuration.

use serde::{Deserialize, Serialize};

/// Smallest grid side that still leaves room to maneuver.
const MIN_GRID_SIDE: u32 = 5;
const MAX_GRID_SIDE: u32 = 101;

/// Configuration for a single battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BattleSettings {
    /// Grid width in hexes.
    pub grid_width: u32,
    /// Grid height in hexes.
    pub grid_height: u32,
    /// Obstacles scattered at setup. Collisions are dropped, so fewer may appear.
    pub obstacle_count: usize,
    /// Seed for initiative rolls and obstacle placement (None = from entropy).
    pub seed: Option<u64>,
    /// Safety cap on attacks per AI turn.
    pub max_ai_attacks: u32,
    /// Number of combat events kept in the log.
    pub event_log_capacity: usize,
}

impl BattleSettings {
    /// Standard arena: 15x15 with 10 obstacles.
    pub fn new() -> Self {
        Self {
            grid_width: 15,
            grid_height: 15,
            obstacle_count: 10,
            seed: None,
            max_ai_attacks: 10,
            event_log_capacity: 100,
        }
    }

    /// Standard arena with a fixed seed, for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new()
        }
    }

    /// Same arena without obstacles.
    pub fn open_field() -> Self {
        Self {
            obstacle_count: 0,
            ..Self::new()
        }
    }

    /// Validate settings and return any errors.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for side in [self.grid_width, self.grid_height] {
            if side < MIN_GRID_SIDE {
                return Err(SettingsError::GridTooSmall);
            }
            if side > MAX_GRID_SIDE {
                return Err(SettingsError::GridTooLarge);
            }
        }
        let cells = (self.grid_width * self.grid_height) as usize;
        if self.obstacle_count > cells / 2 {
            return Err(SettingsError::TooManyObstacles);
        }
        if self.max_ai_attacks == 0 {
            return Err(SettingsError::NoAiAttacks);
        }
        if self.event_log_capacity == 0 {
            return Err(SettingsError::EmptyEventLog);
        }
        Ok(())
    }

    /// Grid dimensions as (width, height).
    pub fn grid_dimensions(&self) -> (u32, u32) {
        (self.grid_width, self.grid_height)
    }
}

impl Default for BattleSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from settings validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsError {
    GridTooSmall,
    GridTooLarge,
    TooManyObstacles,
    NoAiAttacks,
    EmptyEventLog,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::GridTooSmall => {
                write!(f, "Grid must be at least {MIN_GRID_SIDE} hexes on each side")
            }
            SettingsError::GridTooLarge => {
                write!(f, "Grid must be at most {MAX_GRID_SIDE} hexes on each side")
            }
            SettingsError::TooManyObstacles => {
                write!(f, "Obstacles may cover at most half of the grid")
            }
            SettingsError::NoAiAttacks => write!(f, "AI must be allowed at least one attack"),
            SettingsError::EmptyEventLog => write!(f, "Event log must hold at least one event"),
        }
    }
}

impl std::error::Error for SettingsError {}
