//! Hex coordinate system for the battle grid.
//!
//! Uses axial coordinates `(q, r)`. The implicit third cube axis is
//! `s = -q - r`, which makes distance and line drawing simple.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axial direction vectors in their fixed order.
///
/// Pathfinding drift sectors and the AI both index into this table, so the
/// order must never change.
pub const DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Axial hex coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct HexCoord {
    /// Column axis
    pub q: i32,
    /// Row axis
    pub r: i32,
}

impl PartialOrd for HexCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HexCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Row-major ordering for deterministic iteration
        (self.r, self.q).cmp(&(other.r, other.q))
    }
}

impl HexCoord {
    /// Create a new hex coordinate.
    #[inline]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third cube coordinate.
    #[inline]
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Component-wise sum.
    #[inline]
    pub const fn add(&self, other: HexCoord) -> HexCoord {
        HexCoord::new(self.q + other.q, self.r + other.r)
    }

    /// Component-wise difference.
    #[inline]
    pub const fn subtract(&self, other: HexCoord) -> HexCoord {
        HexCoord::new(self.q - other.q, self.r - other.r)
    }

    /// Get all 6 neighboring hexes, in `DIRECTIONS` order.
    pub fn neighbors(&self) -> [HexCoord; 6] {
        DIRECTIONS.map(|(dq, dr)| HexCoord::new(self.q + dq, self.r + dr))
    }

    /// The neighbor in direction `index` (taken modulo 6).
    pub fn neighbor(&self, index: usize) -> HexCoord {
        let (dq, dr) = DIRECTIONS[index % 6];
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// Direction index of a single step from `self` to `other`.
    ///
    /// Returns `None` if the two hexes are not adjacent.
    pub fn direction_to(&self, other: &HexCoord) -> Option<usize> {
        let delta = (other.q - self.q, other.r - self.r);
        DIRECTIONS.iter().position(|&d| d == delta)
    }

    /// Distance to another hex in steps.
    ///
    /// Cube-space Manhattan distance halved; always exact for integer input.
    pub fn distance(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// All hexes on the straight line from `self` to `other`, endpoints included.
    ///
    /// Produces `distance + 1` connected hexes by interpolating in cube space
    /// and rounding each sample.
    pub fn line_to(&self, other: &HexCoord) -> Vec<HexCoord> {
        let n = self.distance(other);
        if n == 0 {
            return vec![*self];
        }

        // Nudge off exact hex edges so samples never round ambiguously.
        let (aq, ar) = (self.q as f64 + 1e-6, self.r as f64 + 1e-6);
        let (bq, br) = (other.q as f64 + 1e-6, other.r as f64 + 1e-6);
        let steps = n as f64;
        (0..=n)
            .map(|i| {
                let t = i as f64 / steps;
                hex_round(lerp(aq, bq, t), lerp(ar, br, t))
            })
            .collect()
    }

    /// Get all hexes within a given radius (inclusive).
    pub fn hexes_in_radius(&self, radius: u32) -> Vec<HexCoord> {
        let n = radius as i32;
        let mut result = Vec::new();

        for dq in -n..=n {
            let lo = (-n).max(-dq - n);
            let hi = n.min(-dq + n);
            for dr in lo..=hi {
                result.push(HexCoord::new(self.q + dq, self.r + dr));
            }
        }

        result
    }

    /// Canonical map key, `"q,r"`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

/// Failure to parse a `"q,r"` key.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex key: {0:?}")]
pub struct HexParseError(pub String);

impl FromStr for HexCoord {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || HexParseError(s.to_string());
        let (q, r) = s.split_once(',').ok_or_else(err)?;
        let q = q.trim().parse().map_err(|_| err())?;
        let r = r.trim().parse().map_err(|_| err())?;
        Ok(HexCoord::new(q, r))
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Round fractional axial coordinates to the nearest hex.
///
/// The axis with the largest rounding error is recomputed from the other two
/// so that `q + r + s == 0` holds.
pub fn hex_round(q: f64, r: f64) -> HexCoord {
    let s = -q - r;
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let q_diff = (rq - q).abs();
    let r_diff = (rr - r).abs();
    let s_diff = (rs - s).abs();

    if q_diff > r_diff && q_diff > s_diff {
        rq = -rr - rs;
    } else if s_diff <= r_diff {
        rr = -rq - rs;
    }

    HexCoord::new(rq as i32, rr as i32)
}

/// A 2D point in layout space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Flat-top hex layout for converting between hexes and screen space.
///
/// The combat core never draws anything; this is shared math for renderers
/// and input handling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HexLayout {
    /// Hex radius in pixels.
    pub size: f64,
    /// Pixel position of hex (0, 0).
    pub origin: Point,
}

const SQRT_3: f64 = 1.732_050_807_568_877_2;

impl HexLayout {
    pub const fn new(size: f64, origin: Point) -> Self {
        Self { size, origin }
    }

    /// Center of a hex in pixel space.
    pub fn hex_to_pixel(&self, hex: HexCoord) -> Point {
        let q = hex.q as f64;
        let r = hex.r as f64;
        let x = 1.5 * q * self.size;
        let y = (SQRT_3 / 2.0 * q + SQRT_3 * r) * self.size;
        Point::new(x + self.origin.x, y + self.origin.y)
    }

    /// Hex containing a pixel position.
    pub fn pixel_to_hex(&self, point: Point) -> HexCoord {
        let px = (point.x - self.origin.x) / self.size;
        let py = (point.y - self.origin.y) / self.size;
        let q = 2.0 / 3.0 * px;
        let r = -1.0 / 3.0 * px + SQRT_3 / 3.0 * py;
        hex_round(q, r)
    }

    /// The six corner points of a hex, starting at angle 0.
    pub fn hex_corners(&self, hex: HexCoord) -> [Point; 6] {
        let center = self.hex_to_pixel(hex);
        std::array::from_fn(|i| {
            let angle = std::f64::consts::PI / 3.0 * i as f64;
            Point::new(
                center.x + self.size * angle.cos(),
                center.y + self.size * angle.sin(),
            )
        })
    }
}

impl Default for HexLayout {
    fn default() -> Self {
        Self::new(30.0, Point::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let coord = HexCoord::new(3, -5);
        assert_eq!(coord.q, 3);
        assert_eq!(coord.r, -5);
        assert_eq!(coord.s(), 2);
    }

    #[test]
    fn test_distance_same_hex() {
        let coord = HexCoord::new(2, -1);
        assert_eq!(coord.distance(&coord), 0);
    }

    #[test]
    fn test_distance_known_values() {
        let origin = HexCoord::new(0, 0);
        assert_eq!(origin.distance(&HexCoord::new(3, 0)), 3);
        assert_eq!(origin.distance(&HexCoord::new(2, -4)), 4);
        assert_eq!(origin.distance(&HexCoord::new(-3, 3)), 3);
        assert_eq!(HexCoord::new(-2, 1).distance(&HexCoord::new(3, -1)), 5);
    }

    #[test]
    fn test_distance_symmetry_and_triangle() {
        let hexes: Vec<HexCoord> = HexCoord::new(0, 0).hexes_in_radius(3);
        for a in &hexes {
            for b in &hexes {
                assert_eq!(a.distance(b), b.distance(a));
                for c in hexes.iter().step_by(5) {
                    assert!(a.distance(c) <= a.distance(b) + b.distance(c));
                }
            }
        }
    }

    #[test]
    fn test_neighbors_distinct_and_adjacent() {
        let coord = HexCoord::new(4, -2);
        let neighbors = coord.neighbors();
        for (i, n) in neighbors.iter().enumerate() {
            assert_eq!(coord.distance(n), 1);
            assert_eq!(coord.direction_to(n), Some(i));
            for m in &neighbors[i + 1..] {
                assert_ne!(n, m);
            }
        }
    }

    #[test]
    fn test_neighbor_order_is_fixed() {
        let n = HexCoord::new(0, 0).neighbors();
        assert_eq!(n[0], HexCoord::new(1, 0));
        assert_eq!(n[3], HexCoord::new(-1, 0));
        assert_eq!(n[5], HexCoord::new(0, 1));
    }

    #[test]
    fn test_direction_to_non_adjacent() {
        let a = HexCoord::new(0, 0);
        assert_eq!(a.direction_to(&HexCoord::new(2, 0)), None);
        assert_eq!(a.direction_to(&a), None);
    }

    #[test]
    fn test_line_to_is_connected() {
        let a = HexCoord::new(-3, 2);
        let b = HexCoord::new(4, -1);
        let line = a.line_to(&b);
        assert_eq!(line.len(), a.distance(&b) as usize + 1);
        assert_eq!(line.first(), Some(&a));
        assert_eq!(line.last(), Some(&b));
        for pair in line.windows(2) {
            assert_eq!(pair[0].distance(&pair[1]), 1);
        }
    }

    #[test]
    fn test_line_to_self() {
        let a = HexCoord::new(1, 1);
        assert_eq!(a.line_to(&a), vec![a]);
    }

    #[test]
    fn test_hexes_in_radius() {
        let center = HexCoord::new(1, -1);
        assert_eq!(center.hexes_in_radius(0), vec![center]);
        assert_eq!(center.hexes_in_radius(1).len(), 7);
        assert_eq!(center.hexes_in_radius(2).len(), 19);
        assert!(center
            .hexes_in_radius(2)
            .iter()
            .all(|h| center.distance(h) <= 2));
    }

    #[test]
    fn test_key_roundtrip() {
        let coord = HexCoord::new(-4, 7);
        assert_eq!(coord.key(), "-4,7");
        assert_eq!("-4,7".parse::<HexCoord>(), Ok(coord));
        assert_eq!(" 2 , -3".parse::<HexCoord>(), Ok(HexCoord::new(2, -3)));
    }

    #[test]
    fn test_key_parse_rejects_garbage() {
        assert!("4".parse::<HexCoord>().is_err());
        assert!("a,b".parse::<HexCoord>().is_err());
        assert!("".parse::<HexCoord>().is_err());
    }

    #[test]
    fn test_layout_roundtrip_centers() {
        let layout = HexLayout::new(30.0, Point::new(400.0, 300.0));
        for hex in HexCoord::new(0, 0).hexes_in_radius(3) {
            let pixel = layout.hex_to_pixel(hex);
            assert_eq!(layout.pixel_to_hex(pixel), hex);
        }
    }

    #[test]
    fn test_layout_origin() {
        let layout = HexLayout::new(10.0, Point::new(5.0, 7.0));
        assert_eq!(layout.hex_to_pixel(HexCoord::new(0, 0)), Point::new(5.0, 7.0));
        let corners = layout.hex_corners(HexCoord::new(0, 0));
        assert!((corners[0].x - 15.0).abs() < 1e-9);
        assert!((corners[0].y - 7.0).abs() < 1e-9);
    }
}
