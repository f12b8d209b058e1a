//! Combat retreats.
//!
//! A retreat moves a player's whole stack out of a battle hex over a bridge
//! into an adjacent empty hex. Declining keeps the battle going.

use serde_json::json;

use crate::board::{Board, Hex, PlayerId};
use crate::game::{BlockPayload, GameState, RetreatDecision};

use super::combat::{continue_battle, end_battle};

/// Hexes `player` may retreat to from `hex`: bridged neighbours that are on
/// the board and empty, in neighbour order.
pub fn retreat_options(board: &Board, hex: Hex, player: &PlayerId) -> Vec<Hex> {
    if !board.has_units(player, hex) {
        return Vec::new();
    }
    board
        .bridged_neighbors(hex)
        .into_iter()
        .filter(|n| board.contains(*n) && board.is_empty_hex(*n))
        .collect()
}

/// Records a retreat answer. `to: None` stays and fights.
pub fn submit_retreat(state: &GameState, player: &PlayerId, to: Option<Hex>) -> Option<GameState> {
    let block = state.block.as_ref()?;
    let BlockPayload::CombatRetreat { options, .. } = &block.payload else {
        return None;
    };
    if !block.is_waiting_on(player) {
        return None;
    }
    if let Some(hex) = to {
        if !options.contains(&hex) {
            return None;
        }
    }
    let mut next = state.clone();
    let block = next.block.as_mut()?;
    if let BlockPayload::CombatRetreat { decision, .. } = &mut block.payload {
        *decision = Some(RetreatDecision { to });
    }
    block.waiting_for.remove(player);
    Some(next)
}

/// Applies a retreat answer and ends or resumes the battle.
pub fn resolve_retreat(state: &mut GameState, hex: Hex, player: &PlayerId, decision: Option<RetreatDecision>) {
    let to = decision.and_then(|d| d.to);
    let target = to.filter(|t| retreat_options(&state.board, hex, player).contains(t));
    match target {
        Some(to) => {
            let moved = state.board.move_stack(player, hex, to);
            log::debug!("{} retreats {} units from {} to {}", player, moved, hex, to);
            state.push_event(
                "combat.retreated",
                json!({ "hex": hex, "player": player, "to": to, "units": moved }),
            );
            if let Some(battle) = state.battle.clone() {
                end_battle(state, &battle);
            }
        }
        None => {
            state.push_event("combat.stood", json!({ "hex": hex, "player": player }));
            continue_battle(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::EdgeKey;
    use crate::config::{GameConfig, LobbyPlayer};
    use crate::engine::create_new_game;
    use crate::game::{BattleState, Block};

    fn p(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn retreat_state() -> (GameState, Hex, Hex) {
        let lobby = vec![LobbyPlayer::new("a"), LobbyPlayer::new("b")];
        let mut state = create_new_game(GameConfig::default(), 29u64, &lobby).unwrap();
        let hex = Hex::new(0, 1);
        let back = Hex::new(0, 2);
        state.board.add_forces(&p("a"), hex, 1);
        state.board.add_forces(&p("b"), hex, 3);
        state.board.add_bridge(EdgeKey::new(hex, back).unwrap(), None, false);
        state.battle = Some(BattleState {
            hex,
            attacker: p("a"),
            defender: p("b"),
            siege: false,
            round: 1,
            retreat_offered: [p("a")].into_iter().collect(),
        });
        state.block = Some(Block::new(
            [p("a")],
            BlockPayload::CombatRetreat {
                hex,
                player: p("a"),
                options: retreat_options(&state.board, hex, &p("a")),
                decision: None,
            },
        ));
        (state, hex, back)
    }

    #[test]
    fn options_need_bridge_and_empty_hex() {
        let (mut state, hex, back) = retreat_state();
        assert_eq!(retreat_options(&state.board, hex, &p("a")), vec![back]);
        state.board.add_forces(&p("b"), back, 1);
        assert!(retreat_options(&state.board, hex, &p("a")).is_empty());
    }

    #[test]
    fn submit_checks_options() {
        let (state, _, back) = retreat_state();
        assert!(submit_retreat(&state, &p("b"), None).is_none());
        assert!(submit_retreat(&state, &p("a"), Some(Hex::new(3, 0))).is_none());
        let next = submit_retreat(&state, &p("a"), Some(back)).unwrap();
        assert!(next.block.as_ref().unwrap().waiting_for.is_empty());
    }

    #[test]
    fn retreat_moves_stack_and_ends_battle() {
        let (mut state, hex, back) = retreat_state();
        state.block = None;
        resolve_retreat(&mut state, hex, &p("a"), Some(RetreatDecision { to: Some(back) }));
        assert_eq!(state.board.force_count(&p("a"), back), 1);
        assert!(!state.board.has_units(&p("a"), hex));
        assert!(state.battle.is_none());
        assert!(state.log.iter().any(|e| e.kind == "combat.retreated"));
    }

    #[test]
    fn standing_resumes_battle() {
        let (mut state, hex, _) = retreat_state();
        state.block = None;
        resolve_retreat(&mut state, hex, &p("a"), Some(RetreatDecision { to: None }));
        assert!(state.log.iter().any(|e| e.kind == "combat.stood"));
        assert!(state.log.iter().any(|e| e.kind == "combat.round"));
    }
}
