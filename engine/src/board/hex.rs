//! Axial hex geometry.
//!
//! Cells are addressed by axial `(q, r)` coordinates. Neighbors follow a
//! fixed direction order so every iteration over them is deterministic.
//! Bridges are keyed by [`EdgeKey`], a canonical unordered pair of adjacent
//! hexes. Both types serialize as compact strings (`"q,r"` and `"q,r|q,r"`)
//! so they can be used as JSON object keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A cell on the axial-coordinate board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hex {
    pub q: i32,
    pub r: i32,
}

/// The six neighbor offsets, in the order used by every neighbor walk.
pub const DIRECTIONS: [Hex; 6] = [
    Hex { q: 1, r: 0 },
    Hex { q: 1, r: -1 },
    Hex { q: 0, r: -1 },
    Hex { q: -1, r: 0 },
    Hex { q: -1, r: 1 },
    Hex { q: 0, r: 1 },
];

/// The board center.
pub const ORIGIN: Hex = Hex { q: 0, r: 0 };

impl Hex {
    pub const fn new(q: i32, r: i32) -> Self {
        Hex { q, r }
    }

    /// The implicit third cube coordinate.
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    pub const fn add(self, other: Hex) -> Hex {
        Hex::new(self.q + other.q, self.r + other.r)
    }

    pub const fn scale(self, k: i32) -> Hex {
        Hex::new(self.q * k, self.r * k)
    }

    /// Returns the six neighbors in [`DIRECTIONS`] order.
    pub fn neighbors(self) -> [Hex; 6] {
        DIRECTIONS.map(|d| self.add(d))
    }

    pub fn is_adjacent(self, other: Hex) -> bool {
        self.distance(other) == 1
    }

    /// Hex-step distance between two cells.
    pub fn distance(self, other: Hex) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.s() - other.s()).unsigned_abs();
        (dq + dr + ds) / 2
    }

    /// Distance from the board center.
    pub fn length(self) -> u32 {
        self.distance(ORIGIN)
    }

    /// The corner of the ring at `radius` in the given direction (0..6).
    pub fn corner(direction: usize, radius: i32) -> Hex {
        DIRECTIONS[direction % 6].scale(radius)
    }
}

/// All hexes within `radius` of the center, sorted by `(q, r)`.
pub fn hexes_within(radius: i32) -> Vec<Hex> {
    let mut hexes = Vec::new();
    for q in -radius..=radius {
        let r_min = (-radius).max(-q - radius);
        let r_max = radius.min(-q + radius);
        for r in r_min..=r_max {
            hexes.push(Hex::new(q, r));
        }
    }
    hexes
}

/// Errors from parsing hex and edge strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeometryParseError {
    #[error("invalid hex key '{0}', expected 'q,r'")]
    InvalidHex(String),

    #[error("invalid edge key '{0}', expected 'q,r|q,r'")]
    InvalidEdge(String),

    #[error("edge '{0}' does not join adjacent hexes")]
    NotAdjacent(String),
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

impl FromStr for Hex {
    type Err = GeometryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (q, r) = s
            .split_once(',')
            .ok_or_else(|| GeometryParseError::InvalidHex(s.to_string()))?;
        let q = q
            .trim()
            .parse()
            .map_err(|_| GeometryParseError::InvalidHex(s.to_string()))?;
        let r = r
            .trim()
            .parse()
            .map_err(|_| GeometryParseError::InvalidHex(s.to_string()))?;
        Ok(Hex::new(q, r))
    }
}

impl Serialize for Hex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Canonical key for the edge between two adjacent hexes.
///
/// The smaller hex (by `(q, r)`) is always stored first, so the same edge
/// built from either side compares equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    a: Hex,
    b: Hex,
}

impl EdgeKey {
    /// Builds the key for the edge between `x` and `y`, or `None` if they
    /// are not adjacent.
    pub fn new(x: Hex, y: Hex) -> Option<EdgeKey> {
        if !x.is_adjacent(y) {
            return None;
        }
        if x <= y {
            Some(EdgeKey { a: x, b: y })
        } else {
            Some(EdgeKey { a: y, b: x })
        }
    }

    pub const fn endpoints(self) -> (Hex, Hex) {
        (self.a, self.b)
    }

    pub fn touches(self, hex: Hex) -> bool {
        self.a == hex || self.b == hex
    }

    /// The endpoint opposite `hex`, if `hex` is an endpoint.
    pub fn other(self, hex: Hex) -> Option<Hex> {
        if self.a == hex {
            Some(self.b)
        } else if self.b == hex {
            Some(self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.a, self.b)
    }
}

impl FromStr for EdgeKey {
    type Err = GeometryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once('|')
            .ok_or_else(|| GeometryParseError::InvalidEdge(s.to_string()))?;
        let x: Hex = x
            .parse()
            .map_err(|_| GeometryParseError::InvalidEdge(s.to_string()))?;
        let y: Hex = y
            .parse()
            .map_err(|_| GeometryParseError::InvalidEdge(s.to_string()))?;
        EdgeKey::new(x, y).ok_or_else(|| GeometryParseError::NotAdjacent(s.to_string()))
    }
}

impl Serialize for EdgeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EdgeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
