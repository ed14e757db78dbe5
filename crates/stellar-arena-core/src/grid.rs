//! The battle grid: ship positions and static obstacles over a bounded hex region.
//!
//! The grid owns the ships of a battle in placement order. Occupancy is read
//! from ship positions, so a ship that drifts onto another ship's hex is
//! still representable (drift does not check collisions).

use crate::hex::HexCoord;
use crate::pathfinding::{self, PathResult, ReachableHex};
use crate::ship::{ActionError, Ship};
use crate::types::Team;
use rand::{Rng, RngCore};
use std::collections::HashSet;

/// A bounded hex battlefield.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    /// Width in hexes.
    width: u32,
    /// Height in hexes.
    height: u32,
    /// Ships in placement order.
    ships: Vec<Ship>,
    obstacles: HashSet<HexCoord>,
}

impl Grid {
    /// Create an empty grid centered on (0, 0).
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ships: Vec::new(),
            obstacles: HashSet::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn max_q(&self) -> i32 {
        (self.width / 2) as i32
    }

    fn max_r(&self) -> i32 {
        (self.height / 2) as i32
    }

    /// Check if a coordinate lies within the half-extents of the grid.
    pub fn is_valid_hex(&self, hex: HexCoord) -> bool {
        hex.q.abs() <= self.max_q() && hex.r.abs() <= self.max_r()
    }

    /// Every valid hex, row-major.
    pub fn hexes(&self) -> impl Iterator<Item = HexCoord> + '_ {
        let (max_q, max_r) = (self.max_q(), self.max_r());
        (-max_r..=max_r).flat_map(move |r| (-max_q..=max_q).map(move |q| HexCoord::new(q, r)))
    }

    // =========================================================================
    // Ships
    // =========================================================================

    /// Place a ship on its own position.
    pub fn place_ship(&mut self, ship: Ship) -> Result<(), ActionError> {
        let hex = ship.position;
        self.place_ship_at(ship, hex)
    }

    /// Place a ship on `hex`, which must be valid and free.
    pub fn place_ship_at(&mut self, mut ship: Ship, hex: HexCoord) -> Result<(), ActionError> {
        if !self.is_valid_hex(hex) || self.is_blocked(hex) {
            return Err(ActionError::HexUnavailable(hex));
        }
        ship.position = hex;
        self.ships.push(ship);
        Ok(())
    }

    /// Remove and return the ship standing on `hex`.
    pub fn remove_ship(&mut self, hex: HexCoord) -> Option<Ship> {
        let index = self.ships.iter().position(|s| s.position == hex)?;
        Some(self.ships.remove(index))
    }

    /// Remove and return a ship by id.
    pub fn remove_ship_by_id(&mut self, id: &str) -> Option<Ship> {
        let index = self.ships.iter().position(|s| s.id == id)?;
        Some(self.ships.remove(index))
    }

    pub fn ship_at(&self, hex: HexCoord) -> Option<&Ship> {
        self.ships.iter().find(|s| s.position == hex)
    }

    pub fn ship_at_mut(&mut self, hex: HexCoord) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.position == hex)
    }

    pub fn ship(&self, id: &str) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id == id)
    }

    pub fn ship_mut(&mut self, id: &str) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.id == id)
    }

    /// All ships in placement order, destroyed ones included.
    pub fn all_ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Living ships of one team, in placement order.
    pub fn ships_by_team(&self, team: Team) -> impl Iterator<Item = &Ship> + '_ {
        self.ships
            .iter()
            .filter(move |s| s.team == team && !s.is_destroyed)
    }

    /// Number of living ships on a team.
    pub fn team_count(&self, team: Team) -> usize {
        self.ships_by_team(team).count()
    }

    pub fn is_occupied(&self, hex: HexCoord) -> bool {
        self.ships.iter().any(|s| s.position == hex)
    }

    /// Blocked means occupied or an obstacle.
    pub fn is_blocked(&self, hex: HexCoord) -> bool {
        self.is_occupied(hex) || self.is_obstacle(hex)
    }

    /// Move a ship along `path`, paying action points and building momentum.
    pub fn move_ship(&mut self, id: &str, path: &[HexCoord]) -> Result<(), ActionError> {
        let ship = self
            .ship(id)
            .ok_or_else(|| ActionError::ShipNotFound(id.to_string()))?;
        ship.check_move(path)?;

        if let Some(&blocked) = path
            .iter()
            .find(|&&hex| !self.is_valid_hex(hex) || self.is_blocked(hex))
        {
            return Err(ActionError::HexUnavailable(blocked));
        }

        if let Some(ship) = self.ship_mut(id) {
            ship.advance_along(path);
        }
        Ok(())
    }

    /// Teleport a ship to a free hex without spending anything.
    pub fn relocate_ship(&mut self, id: &str, to: HexCoord) -> Result<(), ActionError> {
        if !self.is_valid_hex(to) || self.is_blocked(to) {
            return Err(ActionError::HexUnavailable(to));
        }
        let ship = self
            .ship_mut(id)
            .ok_or_else(|| ActionError::ShipNotFound(id.to_string()))?;
        ship.position = to;
        Ok(())
    }

    // =========================================================================
    // Pathfinding
    // =========================================================================

    /// Path from `start` to `goal` within the ship's current action points.
    pub fn find_path(&self, start: HexCoord, goal: HexCoord, ship: &Ship) -> Option<PathResult> {
        pathfinding::find_path(self, start, goal, ship, ship.action_points as f64)
    }

    /// Hexes the ship can reach this turn, with their costs.
    pub fn reachable_hexes(&self, ship: &Ship) -> Vec<ReachableHex> {
        pathfinding::find_reachable(self, ship.position, ship)
    }

    // =========================================================================
    // Obstacles
    // =========================================================================

    /// Returns false if the hex was already an obstacle.
    pub fn add_obstacle(&mut self, hex: HexCoord) -> bool {
        self.obstacles.insert(hex)
    }

    pub fn is_obstacle(&self, hex: HexCoord) -> bool {
        self.obstacles.contains(&hex)
    }

    /// Obstacles in row-major order.
    pub fn obstacles(&self) -> Vec<HexCoord> {
        let mut obstacles: Vec<HexCoord> = self.obstacles.iter().copied().collect();
        obstacles.sort();
        obstacles
    }

    /// Scatter up to `count` obstacles on random free hexes.
    ///
    /// Draws that land on a ship or repeat an obstacle are dropped, so fewer
    /// than `count` may be placed. Returns how many were added.
    pub fn generate_obstacles(&mut self, count: usize, rng: &mut dyn RngCore) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let mut placed = 0;
        for _ in 0..count {
            let q = rng.gen_range(0..self.width) as i32 - self.max_q();
            let r = rng.gen_range(0..self.height) as i32 - self.max_r();
            let hex = HexCoord::new(q, r);

            if self.is_valid_hex(hex) && !self.is_occupied(hex) && self.add_obstacle(hex) {
                placed += 1;
            }
        }
        tracing::debug!(requested = count, placed, "generated obstacles");
        placed
    }

    /// Remove every ship and obstacle.
    pub fn clear(&mut self) {
        self.ships.clear();
        self.obstacles.clear();
    }
}
