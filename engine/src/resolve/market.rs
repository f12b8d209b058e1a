//! Market auction.
//!
//! Once per round a row of one card per player is revealed from the current
//! age deck (plus a preview slice of the next age deck on configured rounds)
//! and shuffled. Each slot is a sealed-bid auction among players who have
//! not bought yet: the highest `Buy` wins and pays, ties going to the
//! earliest seat counted from the lead. Pass amounts feed a carry-over pot
//! that is split among the round's non-buyers once the row is consumed.

use std::collections::BTreeSet;

use serde_json::json;

use crate::board::PlayerId;
use crate::catalog::{Age, CardId};
use crate::game::deck::gain_card_to_hand;
use crate::game::{Bid, Block, BlockPayload, GameState, MarketCard, Phase};

/// How many cards to take from each deck: `(current, next)`.
///
/// Lengths are counts of distinct card ids still available in each deck. The
/// preview slice comes from the next deck first; whichever deck is short is
/// topped up from the other.
pub fn row_split(players: usize, preview: usize, current_len: usize, next_len: usize) -> (usize, usize) {
    let from_next = preview.min(next_len).min(players);
    let from_current = (players - from_next).min(current_len);
    let extra_next = (players - from_next - from_current).min(next_len - from_next);
    (from_current, from_next + extra_next)
}

/// Reveals and shuffles this round's row. Returns the number of cards.
pub fn build_row(state: &mut GameState) -> usize {
    let players = state.players.len();
    let age = state.market.age;
    let next_age = age.next();
    let preview = if next_age.is_some() {
        state.config.preview_for_round(state.round)
    } else {
        0
    };
    let current_ids = distinct_ids(state, Some(age), &BTreeSet::new());
    let next_ids = distinct_ids(state, next_age, &current_ids);
    let (take_current, take_next) =
        row_split(players, preview, current_ids.len(), next_ids.len());

    let mut taken = BTreeSet::new();
    let mut row = take_from_deck(state, age, take_current, &mut taken);
    if let Some(next_age) = next_age {
        row.extend(take_from_deck(state, next_age, take_next, &mut taken));
    }
    let row = state.shuffle(row);
    let count = row.len();
    state.push_event(
        "market.rowRevealed",
        json!({ "round": state.round, "row": row }),
    );
    state.market.row = row;
    state.market.slot = 0;
    state.market.bids.clear();
    state.market.out.clear();
    count
}

fn distinct_ids(state: &GameState, age: Option<Age>, exclude: &BTreeSet<CardId>) -> BTreeSet<CardId> {
    age.and_then(|a| state.market_decks.get(&a))
        .map(|deck| {
            deck.iter()
                .filter(|id| !exclude.contains(*id))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Takes up to `count` cards from the head of the deck, skipping ids already
/// in `taken`. Skipped copies stay in the deck in their original order.
fn take_from_deck(
    state: &mut GameState,
    age: Age,
    count: usize,
    taken: &mut BTreeSet<CardId>,
) -> Vec<MarketCard> {
    let Some(deck) = state.market_decks.get_mut(&age) else {
        return Vec::new();
    };
    let mut picked = Vec::new();
    let mut rest = Vec::with_capacity(deck.len());
    for card_id in deck.drain(..) {
        if picked.len() < count && taken.insert(card_id.clone()) {
            picked.push(MarketCard { card_id, age });
        } else {
            rest.push(card_id);
        }
    }
    *deck = rest;
    picked
}

/// Market phase step when no block is open.
pub fn step(state: &mut GameState) {
    if state.market.row.is_empty() && build_row(state) == 0 {
        finish(state);
        return;
    }
    open_slot(state);
}

fn open_slot(state: &mut GameState) {
    let slot = state.market.slot;
    let Some(card) = state.market.row.get(slot).cloned() else {
        finish(state);
        return;
    };
    let waiting: Vec<PlayerId> = state
        .players
        .iter()
        .filter(|p| !state.market.out.contains(&p.id))
        .map(|p| p.id.clone())
        .collect();
    if waiting.is_empty() {
        burn_slot(state, &card.card_id);
        advance_slot(state);
        return;
    }
    state.market.bids.clear();
    state.block = Some(Block::new(
        waiting,
        BlockPayload::MarketBidsForCard {
            slot,
            card_id: card.card_id,
            age: card.age,
        },
    ));
}

/// Records a sealed bid.
pub fn submit_bid(state: &GameState, player: &PlayerId, bid: Bid) -> Option<GameState> {
    let block = state.block.as_ref()?;
    if !matches!(block.payload, BlockPayload::MarketBidsForCard { .. }) || !block.is_waiting_on(player) {
        return None;
    }
    let gold = state.player(player)?.resources.gold;
    let ok = match bid {
        Bid::Buy { amount } => amount >= 1 && amount <= gold,
        Bid::Pass { amount } => amount <= gold,
    };
    if !ok {
        return None;
    }
    let mut next = state.clone();
    next.market.bids.insert(player.clone(), bid);
    if let Some(block) = next.block.as_mut() {
        block.waiting_for.remove(player);
    }
    Some(next)
}

/// Settles the current slot once every bidder has answered.
pub fn resolve_slot(state: &mut GameState) {
    let slot = state.market.slot;
    let Some(card) = state.market.row.get(slot).cloned() else {
        finish(state);
        return;
    };
    let bids = std::mem::take(&mut state.market.bids);

    for (id, bid) in &bids {
        if let Bid::Pass { amount } = bid {
            let paid = state.debit_gold(id, *amount);
            state.market.pass_pot += paid;
        }
    }

    let winner = state
        .lead_order()
        .into_iter()
        .filter_map(|id| match bids.get(&id) {
            Some(Bid::Buy { amount }) => Some((id, *amount)),
            _ => None,
        })
        .fold(None::<(PlayerId, u32)>, |best, (id, amount)| match best {
            Some((_, top)) if top >= amount => best,
            _ => Some((id, amount)),
        });

    match winner {
        Some((id, amount)) => {
            let paid = state.debit_gold(&id, amount);
            gain_card_to_hand(state, &id, &card.card_id);
            state.market.out.insert(id.clone());
            if let Some(p) = state.player_mut(&id) {
                p.bought_this_round = true;
            }
            log::info!("market: {} buys {} for {}", id, card.card_id, paid);
            state.push_event(
                "market.cardWon",
                json!({ "player": id, "cardId": card.card_id, "amount": paid, "slot": slot }),
            );
        }
        None => burn_slot(state, &card.card_id),
    }
    advance_slot(state);
}

fn burn_slot(state: &mut GameState, card_id: &CardId) {
    state.push_event(
        "market.cardBurned",
        json!({ "cardId": card_id, "slot": state.market.slot }),
    );
}

fn advance_slot(state: &mut GameState) {
    state.market.slot += 1;
    if state.market.slot >= state.market.row.len() {
        finish(state);
    }
}

/// Splits the pot among non-buyers and moves on to the action phase.
fn finish(state: &mut GameState) {
    let non_buyers: Vec<PlayerId> = state
        .players
        .iter()
        .filter(|p| !p.bought_this_round)
        .map(|p| p.id.clone())
        .collect();
    let pot = state.market.pass_pot;
    if pot > 0 && !non_buyers.is_empty() {
        let share = pot / non_buyers.len() as u32;
        if share > 0 {
            for id in &non_buyers {
                state.credit_gold(id, share);
            }
            state.market.pass_pot = pot % non_buyers.len() as u32;
            state.push_event(
                "market.potSplit",
                json!({ "share": share, "players": non_buyers, "carried": state.market.pass_pot }),
            );
        }
    }
    state.market.row.clear();
    state.market.slot = 0;
    state.market.bids.clear();
    state.market.out.clear();
    state.enter_phase(Phase::RoundAction);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, LobbyPlayer};
    use crate::engine::create_new_game;

    fn game(n: usize) -> GameState {
        let lobby: Vec<LobbyPlayer> = (1..=n).map(|i| LobbyPlayer::new(format!("p{i}"))).collect();
        let mut state = create_new_game(GameConfig::default(), 13u64, &lobby).unwrap();
        state.phase = Phase::RoundMarket;
        state.block = None;
        state.round = 1;
        state
    }

    fn p(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    #[test]
    fn row_split_cases() {
        assert_eq!(row_split(3, 0, 10, 10), (3, 0));
        assert_eq!(row_split(3, 1, 10, 10), (2, 1));
        assert_eq!(row_split(3, 1, 1, 10), (1, 2));
        assert_eq!(row_split(4, 2, 10, 1), (3, 1));
        assert_eq!(row_split(4, 0, 1, 1), (1, 1));
        assert_eq!(row_split(4, 0, 0, 0), (0, 0));
    }

    #[test]
    fn row_has_one_card_per_player() {
        let mut state = game(3);
        let before = state.market_decks[&Age::I].len();
        assert_eq!(build_row(&mut state), 3);
        assert_eq!(state.market_decks[&Age::I].len(), before - 3);
    }

    #[test]
    fn row_ids_are_distinct() {
        for seed in 0..50u64 {
            let lobby: Vec<LobbyPlayer> =
                (1..=6).map(|i| LobbyPlayer::new(format!("p{i}"))).collect();
            let mut state = create_new_game(GameConfig::default(), seed, &lobby).unwrap();
            state.round = 1;
            let available: BTreeSet<CardId> =
                state.market_decks[&Age::I].iter().cloned().collect();
            let count = build_row(&mut state);
            let ids: BTreeSet<&CardId> = state.market.row.iter().map(|c| &c.card_id).collect();
            assert_eq!(ids.len(), count, "seed {seed}: {:?}", state.market.row);
            assert_eq!(count, 6.min(available.len()));
        }
    }

    #[test]
    fn duplicate_copies_stay_in_deck_order() {
        let mut state = game(3);
        state.market_decks.insert(
            Age::I,
            ["a", "a", "b", "a", "c", "d"].into_iter().map(CardId::from).collect(),
        );
        assert_eq!(build_row(&mut state), 3);
        let mut ids: Vec<&str> = state.market.row.iter().map(|c| c.card_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["a", "b", "c"]);
        let deck: Vec<&str> = state.market_decks[&Age::I].iter().map(CardId::as_str).collect();
        assert_eq!(deck, ["a", "a", "d"]);
    }

    #[test]
    fn row_shrinks_to_distinct_cards() {
        let mut state = game(4);
        state.market_decks.insert(
            Age::I,
            ["a", "a", "a"].into_iter().map(CardId::from).collect(),
        );
        state.market_decks.insert(Age::II, vec![CardId::from("z")]);
        assert_eq!(build_row(&mut state), 2);
        assert_eq!(state.market_decks[&Age::I].len(), 2);
    }

    #[test]
    fn preview_round_mixes_next_age() {
        let mut state = game(3);
        state.round = 3;
        build_row(&mut state);
        let next = state.market.row.iter().filter(|c| c.age == Age::II).count();
        assert_eq!(next, 1);
    }

    #[test]
    fn highest_buy_wins_and_pass_feeds_pot() {
        let mut state = game(3);
        step(&mut state);
        let card = state.market.row[0].card_id.clone();
        state = submit_bid(&state, &p("p1"), Bid::Buy { amount: 2 }).unwrap();
        state = submit_bid(&state, &p("p2"), Bid::Buy { amount: 3 }).unwrap();
        state = submit_bid(&state, &p("p3"), Bid::Pass { amount: 1 }).unwrap();
        assert!(state.block.as_ref().unwrap().waiting_for.is_empty());
        state.block = None;
        resolve_slot(&mut state);

        let p2 = state.player(&p("p2")).unwrap();
        assert_eq!(p2.resources.gold, state.config.starting_gold - 3);
        assert!(p2.bought_this_round);
        assert_eq!(state.card_id_of(*p2.deck.hand.last().unwrap()), Some(&card));
        assert_eq!(state.market.pass_pot, 1);
        assert!(state.market.out.contains(&p("p2")));
        assert_eq!(state.market.slot, 1);
    }

    #[test]
    fn tie_goes_to_lead_relative_seat() {
        let mut state = game(3);
        state.lead_seat = 1;
        step(&mut state);
        for id in ["p1", "p2", "p3"] {
            state = submit_bid(&state, &p(id), Bid::Buy { amount: 2 }).unwrap();
        }
        state.block = None;
        resolve_slot(&mut state);
        assert!(state.market.out.contains(&p("p2")));
    }

    #[test]
    fn nobody_buys_burns_card() {
        let mut state = game(2);
        step(&mut state);
        for id in ["p1", "p2"] {
            state = submit_bid(&state, &p(id), Bid::Pass { amount: 0 }).unwrap();
        }
        state.block = None;
        resolve_slot(&mut state);
        assert!(state.log.iter().any(|e| e.kind == "market.cardBurned"));
        assert!(state.market.out.is_empty());
    }

    #[test]
    fn invalid_bids_rejected() {
        let mut state = game(2);
        step(&mut state);
        let gold = state.config.starting_gold;
        assert!(submit_bid(&state, &p("p1"), Bid::Buy { amount: 0 }).is_none());
        assert!(submit_bid(&state, &p("p1"), Bid::Buy { amount: gold + 1 }).is_none());
        assert!(submit_bid(&state, &p("p1"), Bid::Pass { amount: gold + 1 }).is_none());
        let once = submit_bid(&state, &p("p1"), Bid::Pass { amount: 0 }).unwrap();
        assert!(submit_bid(&once, &p("p1"), Bid::Pass { amount: 0 }).is_none());
    }

    #[test]
    fn pot_split_among_non_buyers() {
        let mut state = game(3);
        state.market.pass_pot = 5;
        state.players[0].bought_this_round = true;
        let gold_before = state.players[1].resources.gold;
        finish(&mut state);
        assert_eq!(state.players[1].resources.gold, gold_before + 2);
        assert_eq!(state.players[2].resources.gold, gold_before + 2);
        assert_eq!(state.market.pass_pot, 1);
        assert_eq!(state.phase, Phase::RoundAction);
    }
}
