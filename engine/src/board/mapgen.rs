//! Board generation.
//!
//! Builds the starting board for a player count: a center tile at the
//! origin, capital slots on the outer-ring corners, and mines and forges
//! scattered with the game RNG away from the slots.

use super::hex::{Hex, ORIGIN};
use super::state::{Board, TileType};
use crate::config::GameConfig;
use crate::rng::RngState;

/// Minimum distance between a resource tile and any capital slot or the center.
const RESOURCE_CLEARANCE: u32 = 2;

/// Outer-ring corner directions used as capital slots, by player count.
pub fn slot_directions(players: usize) -> &'static [usize] {
    match players {
        0..=2 => &[0, 3],
        3 => &[0, 2, 4],
        4 => &[0, 1, 3, 4],
        5 => &[0, 1, 2, 3, 4],
        _ => &[0, 1, 2, 3, 4, 5],
    }
}

/// Result of board generation.
#[derive(Debug, Clone)]
pub struct GeneratedBoard {
    pub board: Board,
    /// Hexes players may draft as capitals.
    pub capital_slots: Vec<Hex>,
}

/// Generates the board for `players` seats. Returns `None` if the config has
/// no radius for that player count.
pub fn generate_board(
    config: &GameConfig,
    players: usize,
    rng: RngState,
) -> Option<(GeneratedBoard, RngState)> {
    let radius = config.board_radius(players)?;
    let mut board = Board::empty(radius);
    board.set_tile(ORIGIN, TileType::Center);

    let capital_slots: Vec<Hex> = slot_directions(players)
        .iter()
        .map(|d| Hex::corner(*d, radius))
        .collect();

    let candidates: Vec<Hex> = board
        .hexes
        .keys()
        .copied()
        .filter(|h| {
            h.distance(ORIGIN) >= RESOURCE_CLEARANCE
                && capital_slots
                    .iter()
                    .all(|s| h.distance(*s) >= RESOURCE_CLEARANCE)
        })
        .collect();
    let (candidates, mut rng) = rng.shuffle(candidates);
    let mut spots = candidates.into_iter();

    for _ in 0..config.mine_count {
        let Some(hex) = spots.next() else { break };
        let (idx, next) = rng.next_below(config.mine_values.len() as u32);
        rng = next;
        let value = config.mine_values.get(idx as usize).copied().unwrap_or(1);
        if let Some(rec) = board.hexes.get_mut(&hex) {
            rec.tile = TileType::Mine;
            rec.mine_value = Some(value);
        }
    }
    for _ in 0..config.forge_count {
        let Some(hex) = spots.next() else { break };
        board.set_tile(hex, TileType::Forge);
    }

    Some((
        GeneratedBoard {
            board,
            capital_slots,
        },
        rng,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_sit_on_outer_ring() {
        let cfg = GameConfig::default();
        for players in 2..=6 {
            let (gen, _) = generate_board(&cfg, players, RngState::new(1)).unwrap();
            assert_eq!(gen.capital_slots.len(), players);
            let radius = gen.board.radius as u32;
            assert!(gen.capital_slots.iter().all(|h| h.length() == radius));
        }
    }

    #[test]
    fn resources_keep_clearance() {
        let cfg = GameConfig::default();
        let (gen, _) = generate_board(&cfg, 4, RngState::new(9)).unwrap();
        let board = &gen.board;
        let mines: Vec<_> = board
            .hexes
            .iter()
            .filter(|(_, r)| r.tile == TileType::Mine)
            .collect();
        let forges = board
            .hexes
            .values()
            .filter(|r| r.tile == TileType::Forge)
            .count();
        assert_eq!(mines.len(), cfg.mine_count);
        assert_eq!(forges, cfg.forge_count);
        for (hex, rec) in mines {
            assert!(cfg.mine_values.contains(&rec.mine_value.unwrap()));
            assert!(gen.capital_slots.iter().all(|s| hex.distance(*s) >= 2));
            assert!(hex.length() >= 2);
        }
        assert_eq!(board.tile(ORIGIN), Some(TileType::Center));
    }

    #[test]
    fn generation_is_deterministic() {
        let cfg = GameConfig::default();
        let (a, ra) = generate_board(&cfg, 3, RngState::new(5)).unwrap();
        let (b, rb) = generate_board(&cfg, 3, RngState::new(5)).unwrap();
        assert_eq!(a.board, b.board);
        assert_eq!(ra, rb);
    }

    #[test]
    fn missing_radius_yields_none() {
        let mut cfg = GameConfig::default();
        cfg.board_radius_by_players.remove(&3);
        assert!(generate_board(&cfg, 3, RngState::new(0)).is_none());
    }
}
