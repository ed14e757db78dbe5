//! Drift-aware pathfinding on the battle grid.
//!
//! Every step costs 1 action point, halved when it follows the ship's drift
//! sector and increased by half when it fights it. Occupied hexes, obstacles
//! and hexes outside the grid are impassable.

use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::ship::{Ship, Velocity};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::f64::consts::PI;

const BASE_STEP_COST: f64 = 1.0;
const WITH_DRIFT_FACTOR: f64 = 0.5;
const AGAINST_DRIFT_FACTOR: f64 = 1.5;
/// Cheapest possible step, used to bound remaining cost.
const MIN_STEP_COST: f64 = BASE_STEP_COST * WITH_DRIFT_FACTOR;

/// Result of a pathfinding operation.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    /// Steps from start to goal, start excluded.
    pub steps: Vec<HexCoord>,
    /// Total movement cost of the path.
    pub total_cost: f64,
}

/// A hex reachable this turn and what it costs to get there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReachableHex {
    pub hex: HexCoord,
    pub cost: f64,
}

/// Node in the priority queue.
#[derive(Clone, Copy, PartialEq)]
struct PathNode {
    coord: HexCoord,
    g_cost: f64, // Cost from start
    f_cost: f64, // g_cost + heuristic
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (lowest f_cost first)
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.g_cost.total_cmp(&self.g_cost))
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sector (0-5) the velocity points into, or `None` when not drifting.
pub fn drift_direction(velocity: &Velocity) -> Option<usize> {
    if velocity.is_zero() {
        return None;
    }
    let angle = velocity.r.atan2(velocity.q);
    let sector = ((angle + PI) / (PI / 3.0)).floor() as usize;
    Some(sector % 6)
}

/// Cost of a single step for a ship with the given velocity.
pub fn move_cost(velocity: &Velocity, from: HexCoord, to: HexCoord) -> f64 {
    let (Some(drift), Some(step)) = (drift_direction(velocity), from.direction_to(&to)) else {
        return BASE_STEP_COST;
    };

    if drift == step {
        BASE_STEP_COST * WITH_DRIFT_FACTOR
    } else if drift.abs_diff(step) == 3 {
        BASE_STEP_COST * AGAINST_DRIFT_FACTOR
    } else {
        BASE_STEP_COST
    }
}

/// Movement cost of walking `steps` from `start`.
pub fn path_cost(ship: &Ship, start: HexCoord, steps: &[HexCoord]) -> f64 {
    let mut from = start;
    let mut total = 0.0;
    for &step in steps {
        total += move_cost(&ship.velocity, from, step);
        from = step;
    }
    total
}

fn passable(grid: &Grid, hex: HexCoord) -> bool {
    grid.is_valid_hex(hex) && !grid.is_blocked(hex)
}

/// Find the cheapest path from `start` to `goal` costing at most `budget`.
///
/// The frontier is ordered by cost so far plus hex distance to the goal.
/// Because drift makes steps cheaper than one, that ordering can reach the
/// goal along a dearer route first, so the search keeps going until no
/// open node can still beat the best cost found.
pub fn find_path(
    grid: &Grid,
    start: HexCoord,
    goal: HexCoord,
    ship: &Ship,
    budget: f64,
) -> Option<PathResult> {
    if start == goal {
        return Some(PathResult {
            steps: Vec::new(),
            total_cost: 0.0,
        });
    }
    if !passable(grid, goal) {
        return None;
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<HexCoord, HexCoord> = HashMap::new();
    let mut g_scores: HashMap<HexCoord, f64> = HashMap::new();
    let mut best_goal: Option<f64> = None;

    g_scores.insert(start, 0.0);
    open_set.push(PathNode {
        coord: start,
        g_cost: 0.0,
        f_cost: heuristic(&start, &goal),
    });

    while let Some(current) = open_set.pop() {
        // Stale entry
        if current.g_cost > *g_scores.get(&current.coord).unwrap_or(&f64::INFINITY) {
            continue;
        }
        if current.coord == goal {
            best_goal = Some(best_goal.map_or(current.g_cost, |b: f64| b.min(current.g_cost)));
            continue;
        }
        if let Some(best) = best_goal {
            let lower_bound = current.g_cost + MIN_STEP_COST * heuristic(&current.coord, &goal);
            if lower_bound >= best {
                continue;
            }
        }

        for neighbor in current.coord.neighbors() {
            if !passable(grid, neighbor) {
                continue;
            }

            let tentative_g = current.g_cost + move_cost(&ship.velocity, current.coord, neighbor);
            if tentative_g > budget {
                continue;
            }
            if tentative_g >= *g_scores.get(&neighbor).unwrap_or(&f64::INFINITY) {
                continue;
            }

            came_from.insert(neighbor, current.coord);
            g_scores.insert(neighbor, tentative_g);
            open_set.push(PathNode {
                coord: neighbor,
                g_cost: tentative_g,
                f_cost: tentative_g + heuristic(&neighbor, &goal),
            });
        }
    }

    let total_cost = best_goal?;
    Some(PathResult {
        steps: reconstruct_path(&came_from, goal, start),
        total_cost,
    })
}

/// Every hex reachable from `start` within the ship's current action points.
///
/// The start hex is excluded. Results are sorted by cost, then position.
pub fn find_reachable(grid: &Grid, start: HexCoord, ship: &Ship) -> Vec<ReachableHex> {
    let budget = ship.action_points as f64;
    let mut reachable: HashMap<HexCoord, f64> = HashMap::new();
    let mut frontier: BinaryHeap<PathNode> = BinaryHeap::new();

    reachable.insert(start, 0.0);
    frontier.push(PathNode {
        coord: start,
        g_cost: 0.0,
        f_cost: 0.0,
    });

    while let Some(current) = frontier.pop() {
        if current.g_cost > *reachable.get(&current.coord).unwrap_or(&f64::INFINITY) {
            continue;
        }

        for neighbor in current.coord.neighbors() {
            if !passable(grid, neighbor) {
                continue;
            }

            let total_cost = current.g_cost + move_cost(&ship.velocity, current.coord, neighbor);

            // Check if within movement budget
            if total_cost > budget {
                continue;
            }

            if total_cost < *reachable.get(&neighbor).unwrap_or(&f64::INFINITY) {
                reachable.insert(neighbor, total_cost);
                frontier.push(PathNode {
                    coord: neighbor,
                    g_cost: total_cost,
                    f_cost: total_cost,
                });
            }
        }
    }

    let mut result: Vec<ReachableHex> = reachable
        .into_iter()
        .filter(|(hex, _)| *hex != start)
        .map(|(hex, cost)| ReachableHex { hex, cost })
        .collect();
    result.sort_by(|a, b| a.cost.total_cmp(&b.cost).then_with(|| a.hex.cmp(&b.hex)));
    result
}

fn heuristic(a: &HexCoord, b: &HexCoord) -> f64 {
    a.distance(b) as f64
}

/// Reconstruct the path from the came_from map, start excluded.
fn reconstruct_path(
    came_from: &HashMap<HexCoord, HexCoord>,
    goal: HexCoord,
    start: HexCoord,
) -> Vec<HexCoord> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}
