//! Board representation.
//!
//! Contains hex geometry, units, the board record with its occupancy
//! helpers, and starting-board generation.

pub mod hex;
pub mod mapgen;
pub mod state;
pub mod unit;

pub use hex::{hexes_within, EdgeKey, GeometryParseError, Hex, DIRECTIONS, ORIGIN};
pub use mapgen::{generate_board, GeneratedBoard};
pub use state::{Board, Bridge, HexRecord, TileType, MAX_PLAYERS_PER_HEX};
pub use unit::{ChampionState, PlayerId, Unit, UnitId, UnitKind};
