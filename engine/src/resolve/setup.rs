//! Setup flow.
//!
//! Four sequential steps: deck preview, capital draft, starting bridges and
//! the free starting card. Players answer the step's block; the host then
//! advances explicitly, which resolves the step and opens the next.

use std::collections::BTreeMap;

use serde_json::json;

use crate::board::{EdgeKey, Hex, PlayerId, TileType};
use crate::catalog::{Age, CardId};
use crate::error::EngineError;
use crate::game::deck::gain_card_to_hand;
use crate::game::{Block, BlockPayload, GameState, Phase, SetupChoice, SetupStep};

/// The block shown when a game is created.
pub fn deck_preview_block(state: &GameState) -> Block {
    let mut age_one_cards: Vec<CardId> = state
        .market_decks
        .get(&Age::I)
        .cloned()
        .unwrap_or_default();
    age_one_cards.sort();
    age_one_cards.dedup();
    let deck_sizes = state
        .market_decks
        .iter()
        .map(|(age, deck)| (*age, deck.len()))
        .collect();
    Block::new(
        Vec::<PlayerId>::new(),
        BlockPayload::SetupDeckPreview {
            age_one_cards,
            deck_sizes,
        },
    )
}

/// Records a setup choice. Returns `None` when the choice is not accepted.
pub fn submit_choice(state: &GameState, player: &PlayerId, choice: &SetupChoice) -> Option<GameState> {
    if state.phase != Phase::Setup {
        return None;
    }
    let block = state.block.as_ref()?;
    if !block.is_waiting_on(player) {
        return None;
    }
    let mut next = state.clone();
    let block = next.block.as_mut()?;

    match (&mut block.payload, choice) {
        (BlockPayload::SetupCapitalDraft { slots, order, picks }, SetupChoice::Capital { hex }) => {
            if !slots.contains(hex) || picks.values().any(|h| h == hex) {
                return None;
            }
            picks.insert(player.clone(), *hex);
            block.waiting_for.clear();
            if let Some(up) = order.iter().find(|p| !picks.contains_key(*p)) {
                block.waiting_for.insert(up.clone());
            }
        }
        (BlockPayload::SetupStartingBridges { picks }, SetupChoice::StartingBridge { edge }) => {
            let capital = state.player(player)?.capital?;
            let (a, b) = edge.endpoints();
            if !edge.touches(capital) || !state.board.contains(a) || !state.board.contains(b) {
                return None;
            }
            picks.insert(player.clone(), *edge);
            block.waiting_for.remove(player);
        }
        (BlockPayload::SetupFreeStartingCard { offers, picks }, SetupChoice::FreeCard { card_id }) => {
            if !offers.get(player).is_some_and(|o| o.contains(card_id)) {
                return None;
            }
            picks.insert(player.clone(), card_id.clone());
            block.waiting_for.remove(player);
        }
        _ => return None,
    }
    Some(next)
}

/// Resolves the current setup step and opens the next one. Only the host
/// may advance, and only once nobody is still owed a response.
pub fn advance(state: &GameState, player: &PlayerId) -> Result<GameState, EngineError> {
    if state.winner.is_some() {
        return Err(EngineError::GameOver);
    }
    if state.phase != Phase::Setup {
        return Err(EngineError::NotInSetup);
    }
    let block = state.block.as_ref().ok_or(EngineError::NoBlock)?;
    let host = state.host().ok_or(EngineError::NoBlock)?;
    if host != player {
        return Err(EngineError::NotHost {
            host: host.to_string(),
        });
    }
    if !block.waiting_for.is_empty() {
        return Err(EngineError::StillWaiting {
            waiting: block.waiting_for.len(),
        });
    }

    let mut next = state.clone();
    match &block.payload {
        BlockPayload::SetupDeckPreview { .. } => open_capital_draft(&mut next),
        BlockPayload::SetupCapitalDraft { picks, .. } => {
            place_capitals(&mut next, picks);
            open_starting_bridges(&mut next);
        }
        BlockPayload::SetupStartingBridges { picks } => {
            place_starting_bridges(&mut next, picks);
            open_free_card(&mut next);
        }
        BlockPayload::SetupFreeStartingCard { picks, .. } => {
            grant_free_cards(&mut next, picks);
            next.enter_phase(Phase::RoundReset);
        }
        _ => return Err(EngineError::NoBlock),
    }
    next.revision += 1;
    Ok(next)
}

fn open_step(state: &mut GameState, step: SetupStep, block: Block) {
    log::debug!("setup: opening {step:?}");
    state.setup.step = step;
    state.push_event("setup.stepOpened", json!({ "step": step }));
    state.block = Some(block);
}

fn open_capital_draft(state: &mut GameState) {
    let order: Vec<PlayerId> = state.players.iter().rev().map(|p| p.id.clone()).collect();
    let first = order.first().cloned();
    let block = Block::new(
        first,
        BlockPayload::SetupCapitalDraft {
            slots: state.setup.capital_slots.clone(),
            order,
            picks: BTreeMap::new(),
        },
    );
    open_step(state, SetupStep::CapitalDraft, block);
}

fn place_capitals(state: &mut GameState, picks: &BTreeMap<PlayerId, Hex>) {
    let forces = state.config.starting_forces;
    let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();
    let mut placed = serde_json::Map::new();
    for id in ids {
        let Some(hex) = picks.get(&id).copied() else {
            continue;
        };
        if let Some(rec) = state.board.hexes.get_mut(&hex) {
            rec.tile = TileType::Capital;
            rec.owner = Some(id.clone());
        }
        state.board.add_forces(&id, hex, forces);
        if let Some(p) = state.player_mut(&id) {
            p.capital = Some(hex);
        }
        placed.insert(id.to_string(), json!(hex));
    }
    state.push_event("setup.capitalsPlaced", json!({ "capitals": placed }));
}

fn open_starting_bridges(state: &mut GameState) {
    let waiting: Vec<PlayerId> = state
        .players
        .iter()
        .filter(|p| p.capital.is_some())
        .map(|p| p.id.clone())
        .collect();
    let block = Block::new(
        waiting,
        BlockPayload::SetupStartingBridges {
            picks: BTreeMap::new(),
        },
    );
    open_step(state, SetupStep::StartingBridges, block);
}

/// Places picks in seat order; a duplicate edge keeps its first owner.
fn place_starting_bridges(state: &mut GameState, picks: &BTreeMap<PlayerId, EdgeKey>) {
    let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();
    let mut revealed = Vec::new();
    for id in ids {
        let Some(edge) = picks.get(&id).copied() else {
            continue;
        };
        let placed = state.board.add_bridge(edge, Some(id.clone()), false);
        revealed.push(json!({ "player": id, "edge": edge, "placed": placed }));
    }
    state.push_event("setup.bridgesRevealed", json!({ "bridges": revealed }));
}

fn open_free_card(state: &mut GameState) {
    let mut pool = state.config.free_card_pool.clone();
    pool.sort();
    pool.dedup();
    let offer_size = state.config.free_card_offer;
    let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();

    let mut offers = BTreeMap::new();
    for id in ids {
        let mut offer = state.shuffle(pool.clone());
        offer.truncate(offer_size);
        if !offer.is_empty() {
            offers.insert(id, offer);
        }
    }
    let block = Block::new(
        offers.keys().cloned().collect::<Vec<_>>(),
        BlockPayload::SetupFreeStartingCard {
            offers,
            picks: BTreeMap::new(),
        },
    );
    open_step(state, SetupStep::FreeStartingCard, block);
}

fn grant_free_cards(state: &mut GameState, picks: &BTreeMap<PlayerId, CardId>) {
    let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();
    for id in ids {
        if let Some(card) = picks.get(&id) {
            gain_card_to_hand(state, &id, card);
        }
    }
    state.push_event("setup.freeCardsChosen", json!({ "picks": picks }));
}
