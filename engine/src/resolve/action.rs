//! Action phase.
//!
//! Every player with mana left who has not passed declares one action
//! simultaneously. Declarations then resolve one at a time, ordered by
//! faction priority and then by seat counted from the lead. Once all have
//! resolved, each contested non-capital hex is fought over before the next
//! declaration step opens. When nobody can act the round moves on to sieges.

use std::collections::BTreeMap;

use serde_json::json;

use crate::board::{EdgeKey, PlayerId, TileType};
use crate::game::{
    ActionDeclaration, ActionEntry, ActionResolution, Block, BlockPayload, CardInstanceId, GameState,
};

use super::combat::{continue_battle, enter_sieges, start_battle};
use super::effects::{apply_card, is_card_playable, CardPlay};
use crate::game::deck::settle_played_card;

/// Players who still get to declare this round.
pub fn eligible_players(state: &GameState) -> Vec<PlayerId> {
    state
        .players
        .iter()
        .filter(|p| !p.done_this_round && p.resources.mana >= 1)
        .map(|p| p.id.clone())
        .collect()
}

/// Opens a declaration step, or moves on to sieges if nobody can act.
pub fn begin_declarations(state: &mut GameState) {
    let eligible = eligible_players(state);
    if eligible.is_empty() {
        enter_sieges(state);
        return;
    }
    state.block = Some(Block::new(
        eligible,
        BlockPayload::ActionDeclarations {
            declarations: BTreeMap::new(),
        },
    ));
}

/// Mana and gold a declaration costs, or `None` if the card is unknown.
fn declaration_cost(state: &GameState, decl: &ActionDeclaration) -> Option<(u32, u32)> {
    let config = &state.config;
    match decl {
        ActionDeclaration::Done => Some((0, 0)),
        ActionDeclaration::BuildBridge { .. } => Some((config.bridge_mana_cost, 0)),
        ActionDeclaration::March { .. } => Some((config.march_mana_cost, 0)),
        ActionDeclaration::CapitalReinforce => Some((config.reinforce_mana_cost, config.reinforce_gold_cost)),
        ActionDeclaration::PlayCard { instance_id, .. } => {
            let card = state.card_def(*instance_id)?;
            Some((card.cost.mana, card.cost.gold))
        }
    }
}

/// Structural and affordability checks made at declaration time. Board
/// legality of basic actions is checked again when the action resolves.
fn declaration_ok(state: &GameState, player: &PlayerId, decl: &ActionDeclaration) -> bool {
    let Some(p) = state.player(player) else {
        return false;
    };
    let Some((mana, gold)) = declaration_cost(state, decl) else {
        return false;
    };
    if p.resources.mana < mana || p.resources.gold < gold {
        return false;
    }
    match decl {
        ActionDeclaration::Done => true,
        ActionDeclaration::BuildBridge { edge } => {
            let (a, b) = edge.endpoints();
            state.board.contains(a) && state.board.contains(b)
        }
        ActionDeclaration::March { from, to } => {
            state.board.contains(*to) && from.is_adjacent(*to) && state.board.has_units(player, *from)
        }
        ActionDeclaration::CapitalReinforce => p.capital.is_some(),
        ActionDeclaration::PlayCard { instance_id, targets } => {
            p.deck.hand.contains(instance_id)
                && state
                    .card_def(*instance_id)
                    .is_some_and(|card| is_card_playable(state, player, card, targets))
        }
    }
}

/// Records one player's declaration and charges its cost. A played card
/// leaves the hand at once.
pub fn submit_declaration(state: &GameState, player: &PlayerId, decl: &ActionDeclaration) -> Option<GameState> {
    let block = state.block.as_ref()?;
    if !matches!(block.payload, BlockPayload::ActionDeclarations { .. }) || !block.is_waiting_on(player) {
        return None;
    }
    if !declaration_ok(state, player, decl) {
        return None;
    }
    let (mana, gold) = declaration_cost(state, decl)?;
    let mut next = state.clone();
    let p = next.player_mut(player)?;
    p.resources.mana -= mana;
    p.resources.gold -= gold;
    if let ActionDeclaration::PlayCard { instance_id, .. } = decl {
        p.deck.hand.retain(|c| c != instance_id);
        p.deck.in_play.push(*instance_id);
    }
    let block = next.block.as_mut()?;
    if let BlockPayload::ActionDeclarations { declarations } = &mut block.payload {
        declarations.insert(player.clone(), decl.clone());
    }
    block.waiting_for.remove(player);
    Some(next)
}

/// Orders declarations by faction priority, then lead-relative seat.
pub fn resolution_order(state: &GameState, declarations: &BTreeMap<PlayerId, ActionDeclaration>) -> Vec<ActionEntry> {
    let mut keyed: Vec<((usize, usize), ActionEntry)> = declarations
        .iter()
        .filter_map(|(id, decl)| {
            let p = state.player(id)?;
            let rank = p
                .faction
                .map_or(state.config.faction_priority.len(), |f| state.config.faction_rank(f));
            let key = (rank, state.lead_distance(p.seat));
            Some((
                key,
                ActionEntry {
                    player: id.clone(),
                    declaration: decl.clone(),
                },
            ))
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, entry)| entry).collect()
}

/// Starts resolving a closed declaration step.
pub fn begin_resolution(state: &mut GameState, declarations: &BTreeMap<PlayerId, ActionDeclaration>) {
    let entries = resolution_order(state, declarations);
    let order: Vec<&PlayerId> = entries.iter().map(|e| &e.player).collect();
    state.push_event("action.order", json!({ "order": order }));
    state.action_resolution = Some(ActionResolution { entries, cursor: 0 });
}

/// Action phase step with no block open.
pub fn step(state: &mut GameState) {
    if state.battle.is_some() {
        continue_battle(state);
        return;
    }
    let Some(resolution) = state.action_resolution.as_mut() else {
        begin_declarations(state);
        return;
    };
    if !resolution.is_finished() {
        let entry = resolution.entries[resolution.cursor].clone();
        resolution.cursor += 1;
        resolve_entry(state, &entry);
        return;
    }
    let battlefield = state
        .board
        .contested_hexes()
        .into_iter()
        .find(|h| state.board.tile(*h) != Some(TileType::Capital));
    match battlefield {
        Some(hex) => start_battle(state, hex, false),
        None => {
            state.action_resolution = None;
            begin_declarations(state);
        }
    }
}

fn fizzle(state: &mut GameState, player: &PlayerId, decl: &ActionDeclaration, reason: &str) {
    log::debug!("{}: {} fizzled ({})", player, decl.name(), reason);
    state.push_event(
        "action.fizzled",
        json!({ "player": player, "action": decl.name(), "reason": reason }),
    );
}

/// The player has units on an endpoint or owns a capital there.
fn present_at(state: &GameState, player: &PlayerId, edge: EdgeKey) -> bool {
    let (a, b) = edge.endpoints();
    let capital = state.player(player).and_then(|p| p.capital);
    [a, b]
        .into_iter()
        .any(|h| state.board.has_units(player, h) || capital == Some(h))
}

/// Resolves one declaration against the current board. Costs were paid at
/// declaration and stay paid when the action fizzles.
fn resolve_entry(state: &mut GameState, entry: &ActionEntry) {
    let player = &entry.player;
    let decl = &entry.declaration;
    let Some(capital) = state.player(player).map(|p| p.capital) else {
        return;
    };

    match decl {
        ActionDeclaration::Done => {
            if let Some(p) = state.player_mut(player) {
                p.done_this_round = true;
            }
            state.push_event("action.done", json!({ "player": player }));
        }
        ActionDeclaration::BuildBridge { edge } => {
            if !present_at(state, player, *edge) {
                return fizzle(state, player, decl, "presence");
            }
            if !state.board.add_bridge(*edge, Some(player.clone()), false) {
                return fizzle(state, player, decl, "bridge");
            }
            state.push_event("action.bridgeBuilt", json!({ "player": player, "edge": edge }));
        }
        ActionDeclaration::March { from, to } => {
            let board = &state.board;
            if !board.has_units(player, *from) {
                return fizzle(state, player, decl, "units");
            }
            if !board.has_bridge(*from, *to) {
                return fizzle(state, player, decl, "bridge");
            }
            if board.would_exceed_two_players(*to, player) {
                return fizzle(state, player, decl, "occupancy");
            }
            let moved = state.board.move_stack(player, *from, *to);
            state.push_event(
                "action.marched",
                json!({ "player": player, "from": from, "to": to, "units": moved }),
            );
        }
        ActionDeclaration::CapitalReinforce => {
            let Some(capital) = capital else {
                return fizzle(state, player, decl, "capital");
            };
            if state.board.would_exceed_two_players(capital, player) {
                return fizzle(state, player, decl, "occupancy");
            }
            state.board.add_forces(player, capital, 1);
            state.push_event(
                "action.reinforced",
                json!({ "player": player, "hex": capital }),
            );
        }
        ActionDeclaration::PlayCard { instance_id, targets } => {
            resolve_card_play(state, player, *instance_id, targets, decl);
        }
    }
}

/// Applies a played card leniently: effects whose targets no longer hold
/// are skipped and the rest still resolve.
fn resolve_card_play(
    state: &mut GameState,
    player: &PlayerId,
    instance: CardInstanceId,
    targets: &crate::catalog::CardTargets,
    decl: &ActionDeclaration,
) {
    let Some(card) = state.card_def(instance).cloned() else {
        settle_played_card(state, player, instance, false);
        return fizzle(state, player, decl, "card");
    };
    let play = CardPlay {
        player,
        card: &card,
        instance: Some(instance),
        targets,
    };
    let outcome = apply_card(state, &play);
    if outcome.champion_attached {
        // The card travels with its champion until the champion falls.
        if let Some(p) = state.player_mut(player) {
            p.deck.in_play.retain(|c| *c != instance);
        }
    } else {
        settle_played_card(state, player, instance, card.burn);
    }
    state.push_event(
        "action.cardPlayed",
        json!({
            "player": player,
            "cardId": card.id,
            "instanceId": instance,
            "targets": targets,
            "applied": outcome.applied,
            "skipped": outcome.skipped,
            "burned": card.burn,
        }),
    );
}
