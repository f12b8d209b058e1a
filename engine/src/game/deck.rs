//! Personal deck handling: drawing, discarding and moving card instances
//! between piles.

use super::state::{CardInstanceId, GameState};
use crate::board::PlayerId;
use crate::catalog::CardId;

/// Draws up to `count` cards into `player`'s hand, shuffling the discard pile
/// into a fresh draw pile when the draw pile runs out. Returns the number
/// drawn.
pub fn draw_cards(state: &mut GameState, player: &PlayerId, count: usize) -> usize {
    let mut drawn = 0;
    while drawn < count {
        let Some(p) = state.player(player) else {
            return drawn;
        };
        if p.deck.draw_pile.is_empty() {
            if p.deck.discard_pile.is_empty() {
                break;
            }
            reshuffle_discard(state, player);
            continue;
        }
        let Some(p) = state.player_mut(player) else {
            return drawn;
        };
        let card = p.deck.draw_pile.remove(0);
        p.deck.hand.push(card);
        drawn += 1;
    }
    drawn
}

/// Draws until `player` holds `hand_size` cards (or both piles are empty).
pub fn draw_to_hand_size(state: &mut GameState, player: &PlayerId, hand_size: usize) -> usize {
    let held = state.player(player).map_or(0, |p| p.deck.hand.len());
    draw_cards(state, player, hand_size.saturating_sub(held))
}

/// Shuffles the discard pile beneath the current draw pile.
pub fn reshuffle_discard(state: &mut GameState, player: &PlayerId) {
    let Some(p) = state.player_mut(player) else {
        return;
    };
    let discards = std::mem::take(&mut p.deck.discard_pile);
    let shuffled = state.shuffle(discards);
    if let Some(p) = state.player_mut(player) {
        p.deck.draw_pile.extend(shuffled);
    }
}

/// Takes up to `count` cards off the top of the draw pile, reshuffling the
/// discard pile first if the draw pile is short.
pub fn take_from_top(state: &mut GameState, player: &PlayerId, count: usize) -> Vec<CardInstanceId> {
    let short = state
        .player(player)
        .is_some_and(|p| p.deck.draw_pile.len() < count && !p.deck.discard_pile.is_empty());
    if short {
        reshuffle_discard(state, player);
    }
    match state.player_mut(player) {
        Some(p) => {
            let n = count.min(p.deck.draw_pile.len());
            p.deck.draw_pile.drain(..n).collect()
        }
        None => Vec::new(),
    }
}

/// Removes `card` from `player`'s hand. Returns false if it was not there.
pub fn remove_from_hand(state: &mut GameState, player: &PlayerId, card: CardInstanceId) -> bool {
    let Some(p) = state.player_mut(player) else {
        return false;
    };
    match p.deck.hand.iter().position(|c| *c == card) {
        Some(i) => {
            p.deck.hand.remove(i);
            true
        }
        None => false,
    }
}

/// Removes `count` random cards from `player`'s hand.
pub fn take_random_from_hand(state: &mut GameState, player: &PlayerId, count: usize) -> Vec<CardInstanceId> {
    let mut taken = Vec::new();
    for _ in 0..count {
        let len = state.player(player).map_or(0, |p| p.deck.hand.len());
        if len == 0 {
            break;
        }
        let idx = state.next_below(len as u32) as usize;
        if let Some(p) = state.player_mut(player) {
            taken.push(p.deck.hand.remove(idx));
        }
    }
    taken
}

/// Moves `card` out of `in_play` and onto the discard pile, or into the
/// burned pile when `burn` is set.
pub fn settle_played_card(state: &mut GameState, player: &PlayerId, card: CardInstanceId, burn: bool) {
    let Some(p) = state.player_mut(player) else {
        return;
    };
    p.deck.in_play.retain(|c| *c != card);
    if burn {
        p.burned.push(card);
    } else {
        p.deck.discard_pile.push(card);
    }
}

/// Creates a new instance of `card_id` directly in `player`'s hand.
pub fn gain_card_to_hand(state: &mut GameState, player: &PlayerId, card_id: &CardId) -> CardInstanceId {
    let id = state.new_card_instance(card_id, player);
    if let Some(p) = state.player_mut(player) {
        p.deck.hand.push(id);
    }
    id
}

/// Creates a new instance of `card_id` on top of `player`'s discard pile.
pub fn gain_card_to_discard(state: &mut GameState, player: &PlayerId, card_id: &CardId) -> CardInstanceId {
    let id = state.new_card_instance(card_id, player);
    if let Some(p) = state.player_mut(player) {
        p.deck.discard_pile.push(id);
    }
    id
}

/// Moves hand and in-play cards to the discard pile.
pub fn discard_hand(state: &mut GameState, player: &PlayerId) {
    if let Some(p) = state.player_mut(player) {
        let hand = std::mem::take(&mut p.deck.hand);
        let in_play = std::mem::take(&mut p.deck.in_play);
        p.deck.discard_pile.extend(hand);
        p.deck.discard_pile.extend(in_play);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, LobbyPlayer};
    use crate::engine::create_new_game;
    use crate::rng::Seed;

    fn game() -> (GameState, PlayerId) {
        let lobby = vec![LobbyPlayer::new("a"), LobbyPlayer::new("b")];
        let state = create_new_game(GameConfig::default(), Seed::Number(3), &lobby).unwrap();
        (state, PlayerId::new("a"))
    }

    #[test]
    fn draw_moves_cards_from_top() {
        let (mut state, a) = game();
        let top = state.player(&a).unwrap().deck.draw_pile[0];
        assert_eq!(draw_cards(&mut state, &a, 2), 2);
        let p = state.player(&a).unwrap();
        assert_eq!(p.deck.hand[0], top);
        assert_eq!(p.deck.hand.len(), 2);
    }

    #[test]
    fn draw_reshuffles_discard() {
        let (mut state, a) = game();
        let total = state.player(&a).unwrap().deck.draw_pile.len();
        {
            let p = state.player_mut(&a).unwrap();
            let pile = std::mem::take(&mut p.deck.draw_pile);
            p.deck.discard_pile = pile;
        }
        assert_eq!(draw_cards(&mut state, &a, 3), 3);
        let p = state.player(&a).unwrap();
        assert_eq!(p.deck.hand.len() + p.deck.draw_pile.len(), total);
        assert!(p.deck.discard_pile.is_empty());
    }

    #[test]
    fn draw_stops_when_exhausted() {
        let (mut state, a) = game();
        let total = state.player(&a).unwrap().deck.draw_pile.len();
        assert_eq!(draw_cards(&mut state, &a, total + 5), total);
    }

    #[test]
    fn discard_hand_collects_in_play() {
        let (mut state, a) = game();
        draw_cards(&mut state, &a, 2);
        let card = state.player(&a).unwrap().deck.hand[0];
        assert!(remove_from_hand(&mut state, &a, card));
        state.player_mut(&a).unwrap().deck.in_play.push(card);
        discard_hand(&mut state, &a);
        let p = state.player(&a).unwrap();
        assert!(p.deck.hand.is_empty() && p.deck.in_play.is_empty());
        assert_eq!(p.deck.discard_pile.len(), 2);
    }
}
