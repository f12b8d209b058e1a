//! Round bookkeeping phases: reset, quiet study, collection, scoring,
//! cleanup and the age update that may end the game.

use std::collections::BTreeMap;

use serde_json::json;

use crate::board::{PlayerId, TileType, ORIGIN};
use crate::catalog::CardId;
use crate::game::deck::{discard_hand, draw_cards, draw_to_hand_size, gain_card_to_discard};
use crate::game::{Block, BlockPayload, CardInstanceId, CollectionChoice, GameState, Phase};

fn player_ids(state: &GameState) -> Vec<PlayerId> {
    state.players.iter().map(|p| p.id.clone()).collect()
}

/// Starts a new round: advances the lead seat, refills mana and hands.
pub fn reset(state: &mut GameState) {
    state.round += 1;
    let n = state.players.len().max(1);
    state.lead_seat = (state.round as usize - 1) % n;
    let base_mana = state.config.base_mana;
    for p in &mut state.players {
        p.resources.mana = base_mana;
        p.done_this_round = false;
        p.bought_this_round = false;
    }
    let hand_size = state.config.hand_size;
    for id in player_ids(state) {
        draw_to_hand_size(state, &id, hand_size);
    }
    log::debug!("round {} starts, lead seat {}", state.round, state.lead_seat);
    state.push_event(
        "round.started",
        json!({ "round": state.round, "leadSeat": state.lead_seat, "age": state.market.age }),
    );
    state.enter_phase(Phase::RoundStudy);
}

/// Opens the quiet-study block, or skips to the market when nobody can study.
pub fn begin_study(state: &mut GameState) {
    let max = state.config.quiet_study_max;
    let waiting: Vec<PlayerId> = state
        .players
        .iter()
        .filter(|p| !p.deck.hand.is_empty())
        .map(|p| p.id.clone())
        .collect();
    if max == 0 || waiting.is_empty() {
        state.enter_phase(Phase::RoundMarket);
        return;
    }
    state.block = Some(Block::new(
        waiting,
        BlockPayload::QuietStudy {
            max,
            discards: BTreeMap::new(),
        },
    ));
}

/// Records a quiet-study discard list.
pub fn submit_quiet_study(state: &GameState, player: &PlayerId, cards: &[CardInstanceId]) -> Option<GameState> {
    let block = state.block.as_ref()?;
    let BlockPayload::QuietStudy { max, .. } = &block.payload else {
        return None;
    };
    if !block.is_waiting_on(player) || cards.len() > *max {
        return None;
    }
    let hand = &state.player(player)?.deck.hand;
    let mut seen = cards.to_vec();
    seen.sort();
    seen.dedup();
    if seen.len() != cards.len() || !cards.iter().all(|c| hand.contains(c)) {
        return None;
    }

    let mut next = state.clone();
    let block = next.block.as_mut()?;
    if let BlockPayload::QuietStudy { discards, .. } = &mut block.payload {
        discards.insert(player.clone(), cards.to_vec());
    }
    block.waiting_for.remove(player);
    Some(next)
}

/// Discards and redraws for every submitted list, in seat order.
pub fn resolve_quiet_study(state: &mut GameState, discards: &BTreeMap<PlayerId, Vec<CardInstanceId>>) {
    for id in player_ids(state) {
        let Some(cards) = discards.get(&id) else {
            continue;
        };
        if cards.is_empty() {
            continue;
        }
        if let Some(p) = state.player_mut(&id) {
            p.deck.hand.retain(|c| !cards.contains(c));
            p.deck.discard_pile.extend(cards.iter().copied());
        }
        let drawn = draw_cards(state, &id, cards.len());
        state.push_event(
            "round.quietStudied",
            json!({ "player": id, "discarded": cards.len(), "drawn": drawn }),
        );
    }
    state.enter_phase(Phase::RoundMarket);
}

/// Pays income and opens forge choices.
pub fn begin_collection(state: &mut GameState) {
    let income = state.config.base_gold_income;
    let mut paid = serde_json::Map::new();
    for id in player_ids(state) {
        let mines: u32 = state
            .board
            .hexes
            .values()
            .filter(|rec| rec.tile == TileType::Mine)
            .filter(|rec| rec.occupants.len() == 1 && rec.occupants.contains_key(&id))
            .filter_map(|rec| rec.mine_value)
            .sum();
        state.credit_gold(&id, income + mines);
        paid.insert(id.to_string(), json!(income + mines));
    }
    state.push_event("collection.income", json!({ "paid": paid }));

    let age = state.market.age;
    let offer_size = state.config.forge_offer;
    let mut offers = BTreeMap::new();
    for id in player_ids(state) {
        let holds_forge = state
            .board
            .hexes
            .iter()
            .any(|(h, rec)| rec.tile == TileType::Forge && state.board.sole_occupant(*h) == Some(&id));
        if !holds_forge {
            continue;
        }
        let Some(deck) = state.power_decks.get_mut(&age) else {
            continue;
        };
        let n = offer_size.min(deck.len());
        let offer: Vec<CardId> = deck.drain(..n).collect();
        if !offer.is_empty() {
            offers.insert(id, offer);
        }
    }

    if offers.is_empty() {
        state.enter_phase(Phase::RoundScoring);
        return;
    }
    state.block = Some(Block::new(
        offers.keys().cloned().collect::<Vec<_>>(),
        BlockPayload::CollectionChoices {
            offers,
            choices: BTreeMap::new(),
        },
    ));
}

/// Records a forge choice.
pub fn submit_collection_choice(state: &GameState, player: &PlayerId, choice: &CollectionChoice) -> Option<GameState> {
    let block = state.block.as_ref()?;
    let BlockPayload::CollectionChoices { offers, .. } = &block.payload else {
        return None;
    };
    if !block.is_waiting_on(player) {
        return None;
    }
    let valid = match choice {
        CollectionChoice::Draft { card_id } => offers.get(player).is_some_and(|o| o.contains(card_id)),
        CollectionChoice::Scrap { instance_id } => state.player(player)?.deck.hand.contains(instance_id),
        CollectionChoice::Skip => true,
    };
    if !valid {
        return None;
    }
    let mut next = state.clone();
    let block = next.block.as_mut()?;
    if let BlockPayload::CollectionChoices { choices, .. } = &mut block.payload {
        choices.insert(player.clone(), choice.clone());
    }
    block.waiting_for.remove(player);
    Some(next)
}

/// Applies forge choices in seat order. Unchosen offers go back under the
/// power deck in offer order.
pub fn resolve_collection(
    state: &mut GameState,
    offers: &BTreeMap<PlayerId, Vec<CardId>>,
    choices: &BTreeMap<PlayerId, CollectionChoice>,
) {
    let age = state.market.age;
    let mut returned: Vec<CardId> = Vec::new();
    for id in player_ids(state) {
        let Some(offer) = offers.get(&id) else {
            continue;
        };
        let choice = choices.get(&id).cloned().unwrap_or(CollectionChoice::Skip);
        let mut drafted = None;
        match &choice {
            CollectionChoice::Draft { card_id } => {
                gain_card_to_discard(state, &id, card_id);
                drafted = Some(card_id.clone());
            }
            CollectionChoice::Scrap { instance_id } => {
                if let Some(p) = state.player_mut(&id) {
                    if let Some(i) = p.deck.hand.iter().position(|c| c == instance_id) {
                        let card = p.deck.hand.remove(i);
                        p.deck.scrapped.push(card);
                    }
                }
            }
            CollectionChoice::Skip => {}
        }
        let mut skipped_draft = false;
        for card in offer {
            if !skipped_draft && drafted.as_ref() == Some(card) {
                skipped_draft = true;
                continue;
            }
            returned.push(card.clone());
        }
        state.push_event("collection.resolved", json!({ "player": id, "choice": choice }));
    }
    state.power_decks.entry(age).or_default().extend(returned);
    state.enter_phase(Phase::RoundScoring);
}

/// Recomputes control VP and totals.
pub fn score(state: &mut GameState) {
    let center_vp = state.config.center_vp;
    let capital_vp = state.config.capital_control_vp;
    let mut scores = serde_json::Map::new();
    for id in player_ids(state) {
        let mut control = 0;
        if state.board.sole_occupant(ORIGIN) == Some(&id) {
            control += center_vp;
        }
        let enemy_capitals = state
            .board
            .hexes
            .iter()
            .filter(|(h, rec)| {
                rec.tile == TileType::Capital
                    && rec.owner.as_ref().is_some_and(|o| *o != id)
                    && state.board.sole_occupant(**h) == Some(&id)
            })
            .count() as u32;
        control += enemy_capitals * capital_vp;
        if let Some(p) = state.player_mut(&id) {
            p.vp.control = control;
            p.vp.recompute();
            scores.insert(id.to_string(), json!(p.vp));
        }
    }
    state.push_event("round.scored", json!({ "round": state.round, "scores": scores }));
    state.enter_phase(Phase::RoundCleanup);
}

/// Discards hands, drops temporary bridges and expired modifiers.
pub fn cleanup(state: &mut GameState) {
    for id in player_ids(state) {
        discard_hand(state, &id);
    }
    let bridges = state.board.remove_temporary_bridges();
    let round = state.round;
    state.modifiers.retain(|m| m.expires_at_round > round);
    state.market.row.clear();
    state.market.slot = 0;
    state.market.bids.clear();
    state.market.out.clear();
    state.push_event("round.cleanedUp", json!({ "temporaryBridgesRemoved": bridges }));
    state.enter_phase(Phase::RoundAgeUpdate);
}

/// Ends the game or moves to the next round, switching ages when due.
pub fn age_update(state: &mut GameState) {
    let vp_to_win = state.config.vp_to_win;
    let reached = state.players.iter().any(|p| p.vp.total >= vp_to_win);
    if reached || state.round >= state.config.max_rounds {
        finish_game(state);
        return;
    }
    let next_age = state.config.age_for_round(state.round + 1);
    if next_age != state.market.age {
        log::info!("age {} begins after round {}", next_age.name(), state.round);
        state.push_event(
            "age.changed",
            json!({ "from": state.market.age, "to": next_age, "round": state.round + 1 }),
        );
        state.market.age = next_age;
    }
    state.enter_phase(Phase::RoundReset);
}

/// Highest total wins; ties go to more gold, then lead-relative seat order.
pub fn pick_winner(state: &GameState) -> Option<PlayerId> {
    state
        .players
        .iter()
        .min_by_key(|p| {
            (
                std::cmp::Reverse(p.vp.total),
                std::cmp::Reverse(p.resources.gold),
                state.lead_distance(p.seat),
            )
        })
        .map(|p| p.id.clone())
}

fn finish_game(state: &mut GameState) {
    let winner = pick_winner(state);
    log::info!("game over after round {}: winner {:?}", state.round, winner);
    state.enter_phase(Phase::GameOver);
    state.push_event("game.over", json!({ "winner": winner, "round": state.round }));
    state.winner = winner;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, LobbyPlayer};
    use crate::engine::create_new_game;

    fn game() -> GameState {
        let lobby = vec![LobbyPlayer::new("a"), LobbyPlayer::new("b"), LobbyPlayer::new("c")];
        create_new_game(GameConfig::default(), 21u64, &lobby).unwrap()
    }

    #[test]
    fn reset_rotates_lead_and_fills_hands() {
        let mut state = game();
        state.phase = Phase::RoundReset;
        state.block = None;
        reset(&mut state);
        assert_eq!(state.round, 1);
        assert_eq!(state.lead_seat, 0);
        assert!(state.players.iter().all(|p| p.deck.hand.len() == 4));
        assert!(state.players.iter().all(|p| p.resources.mana == 1));
        assert_eq!(state.phase, Phase::RoundStudy);
        state.round = 4;
        reset(&mut state);
        assert_eq!(state.lead_seat, 1);
    }

    #[test]
    fn winner_tie_breaks() {
        let mut state = game();
        for p in &mut state.players {
            p.vp.total = 5;
            p.resources.gold = 3;
        }
        state.lead_seat = 2;
        assert_eq!(pick_winner(&state), Some(PlayerId::new("c")));
        state.players[0].resources.gold = 4;
        assert_eq!(pick_winner(&state), Some(PlayerId::new("a")));
        state.players[1].vp.total = 6;
        assert_eq!(pick_winner(&state), Some(PlayerId::new("b")));
    }

    #[test]
    fn age_update_ends_on_max_rounds() {
        let mut state = game();
        state.round = state.config.max_rounds;
        age_update(&mut state);
        assert_eq!(state.phase, Phase::GameOver);
        assert!(state.winner.is_some());
        assert_eq!(state.log.last().unwrap().kind, "game.over");
    }

    #[test]
    fn age_update_switches_age() {
        let mut state = game();
        state.round = state.config.age_two_round - 1;
        age_update(&mut state);
        assert_eq!(state.market.age, crate::catalog::Age::II);
        assert!(state.log.iter().any(|e| e.kind == "age.changed"));
        assert_eq!(state.phase, Phase::RoundReset);
    }

    #[test]
    fn quiet_study_rejects_cards_not_in_hand() {
        let mut state = game();
        state.phase = Phase::RoundReset;
        reset(&mut state);
        begin_study(&mut state);
        let a = PlayerId::new("a");
        let foreign = state.player(&PlayerId::new("b")).unwrap().deck.hand[0];
        assert!(submit_quiet_study(&state, &a, &[foreign]).is_none());
        let own = state.player(&a).unwrap().deck.hand.clone();
        assert!(submit_quiet_study(&state, &a, &own[..2]).is_none());
        let next = submit_quiet_study(&state, &a, &own[..1]).unwrap();
        assert!(!next.block.as_ref().unwrap().is_waiting_on(&a));
    }
}
