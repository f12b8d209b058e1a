//! Deterministic pseudo-random generator for the game engine.
//!
//! Uses SplitMix32: four bytes of state, trivially serializable, and
//! reproducible across platforms. Every draw consumes a generator state and
//! returns the successor alongside the value, so the state stored in a
//! [`GameState`](crate::game::GameState) is the only source of randomness
//! and replaying the same commands from the same seed is bit-exact.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A game seed as supplied by the host: either a number or free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Number(u64),
    Text(String),
}

impl From<u64> for Seed {
    fn from(n: u64) -> Self {
        Seed::Number(n)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Seed::Text(s.to_string())
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Number(n) => write!(f, "{n}"),
            Seed::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Immutable SplitMix32 generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RngState(u32);

impl RngState {
    /// Creates a generator from a raw 32-bit state.
    pub const fn new(state: u32) -> Self {
        RngState(state)
    }

    /// Derives the initial state from a seed. Numbers are truncated to
    /// 32 bits; text is hashed with FNV-1a.
    pub fn from_seed(seed: &Seed) -> Self {
        match seed {
            Seed::Number(n) => RngState(*n as u32),
            Seed::Text(s) => RngState(fnv1a(s)),
        }
    }

    /// Returns the raw state (for hashing and debugging).
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Draws the next 32-bit value.
    #[must_use]
    pub fn next_u32(self) -> (u32, RngState) {
        let state = self.0.wrapping_add(0x9E37_79B9);
        let mut z = state;
        z = (z ^ (z >> 16)).wrapping_mul(0x85EB_CA6B);
        z = (z ^ (z >> 13)).wrapping_mul(0xC2B2_AE35);
        z ^= z >> 16;
        (z, RngState(state))
    }

    /// Draws a value in `0..n`. A bound of zero yields zero without
    /// advancing the generator.
    #[must_use]
    pub fn next_below(self, n: u32) -> (u32, RngState) {
        if n == 0 {
            return (0, self);
        }
        let (v, next) = self.next_u32();
        (((u64::from(v) * u64::from(n)) >> 32) as u32, next)
    }

    /// Draws a value in `min..=max`. Returns `min` when the range is empty.
    #[must_use]
    pub fn next_range(self, min: i32, max: i32) -> (i32, RngState) {
        if max <= min {
            return (min, self);
        }
        let span = (i64::from(max) - i64::from(min) + 1) as u32;
        let (v, next) = self.next_below(span);
        ((i64::from(min) + i64::from(v)) as i32, next)
    }

    /// Rolls a die with the given number of sides, returning `1..=sides`.
    #[must_use]
    pub fn roll_die(self, sides: u32) -> (u32, RngState) {
        let (v, next) = self.next_below(sides.max(1));
        (v + 1, next)
    }

    /// Fisher-Yates shuffle, walking from the last index down to 1.
    #[must_use]
    pub fn shuffle<T>(self, mut items: Vec<T>) -> (Vec<T>, RngState) {
        let mut rng = self;
        for i in (1..items.len()).rev() {
            let (j, next) = rng.next_below((i + 1) as u32);
            rng = next;
            items.swap(i, j as usize);
        }
        (items, rng)
    }
}

/// 32-bit FNV-1a over the UTF-8 bytes of `s`.
fn fnv1a(s: &str) -> u32 {
    let mut hash: u32 = 0x811C_9DC5;
    for b in s.bytes() {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sequence_from_zero() {
        let rng = RngState::new(0);
        let (a, rng) = rng.next_u32();
        let (b, rng) = rng.next_u32();
        let (c, rng) = rng.next_u32();
        let (d, _) = rng.next_u32();
        assert_eq!([a, b, c, d], [0x92CA_2F0E, 0x3CD6_E3F3, 0x1B14_7DCC, 0x4C08_1DBF]);
    }

    #[test]
    fn numeric_seed_sequence() {
        let rng = RngState::from_seed(&Seed::Number(7));
        let (a, rng) = rng.next_u32();
        let (b, rng) = rng.next_u32();
        let (c, _) = rng.next_u32();
        assert_eq!([a, b, c], [588_686_121, 1_937_383_562, 4_286_812_467]);
    }

    #[test]
    fn text_seed_uses_fnv1a() {
        assert_eq!(RngState::from_seed(&Seed::from("bridgehold")).raw(), 0x63FD_AB7D);
        assert_eq!(RngState::from_seed(&Seed::from("")).raw(), 0x811C_9DC5);
    }

    #[test]
    fn draws_do_not_mutate_original() {
        let rng = RngState::new(99);
        let (first, _) = rng.next_u32();
        let (again, _) = rng.next_u32();
        assert_eq!(first, again);
    }

    #[test]
    fn next_below_zero_does_not_advance() {
        let rng = RngState::new(5);
        let (v, next) = rng.next_below(0);
        assert_eq!(v, 0);
        assert_eq!(next, rng);
    }

    #[test]
    fn next_below_stays_in_bounds() {
        let mut rng = RngState::new(1234);
        for n in 1..50 {
            let (v, next) = rng.next_below(n);
            assert!(v < n);
            rng = next;
        }
    }

    #[test]
    fn roll_die_covers_all_faces() {
        let mut rng = RngState::new(3);
        let mut seen = [false; 6];
        for _ in 0..200 {
            let (v, next) = rng.roll_die(6);
            assert!((1..=6).contains(&v));
            seen[(v - 1) as usize] = true;
            rng = next;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn next_range_inclusive() {
        let mut rng = RngState::new(77);
        for _ in 0..100 {
            let (v, next) = rng.next_range(-2, 2);
            assert!((-2..=2).contains(&v));
            rng = next;
        }
        assert_eq!(RngState::new(1).next_range(4, 4).0, 4);
    }

    #[test]
    fn shuffle_known_permutation() {
        let (items, _) = RngState::new(42).shuffle((0..6).collect::<Vec<u32>>());
        assert_eq!(items, vec![5, 3, 2, 0, 4, 1]);
    }

    #[test]
    fn shuffle_empty_and_single() {
        let rng = RngState::new(8);
        let (empty, after) = rng.shuffle(Vec::<u8>::new());
        assert!(empty.is_empty());
        assert_eq!(after, rng);
        let (one, after) = rng.shuffle(vec![1]);
        assert_eq!(one, vec![1]);
        assert_eq!(after, rng);
    }

    #[test]
    fn serialization_round_trip() {
        let (_, rng) = RngState::new(42).next_u32();
        let json = serde_json::to_string(&rng).unwrap();
        let restored: RngState = serde_json::from_str(&json).unwrap();
        assert_eq!(rng, restored);
    }

    #[test]
    fn seed_deserializes_untagged() {
        let n: Seed = serde_json::from_str("7").unwrap();
        assert_eq!(n, Seed::Number(7));
        let s: Seed = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(s, Seed::Text("abc".into()));
    }
}
