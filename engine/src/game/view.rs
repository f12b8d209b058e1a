//! Per-viewer projections of a game state.
//!
//! A view carries everything a client may see: public board and market,
//! counts for every pile, and the viewer's own private data. Other players'
//! hands, sealed bids, pending declarations, hidden setup picks and scout
//! cards are reduced to "submitted" lists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::block::{BlockPayload, RetreatDecision};
use super::command::{ActionDeclaration, CollectionChoice};
use super::event::GameEvent;
use super::state::{
    BattleState, Bid, CardInstanceId, GameState, MarketCard, Modifier, Phase, Resources, SetupStep,
    VictoryPoints,
};
use crate::board::{Board, EdgeKey, Hex, PlayerId};
use crate::catalog::{Age, CardId};
use crate::config::Faction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandCard {
    pub instance_id: CardInstanceId,
    pub card_id: CardId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub seat: usize,
    pub faction: Option<Faction>,
    pub capital: Option<Hex>,
    pub resources: Resources,
    pub vp: VictoryPoints,
    pub done_this_round: bool,
    pub hand_count: usize,
    pub draw_count: usize,
    pub discard_count: usize,
    pub in_play_count: usize,
    pub scrapped_count: usize,
    pub burned_count: usize,
    /// Present only for the viewer's own seat.
    pub hand: Option<Vec<HandCard>>,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketView {
    pub age: Age,
    pub row: Vec<MarketCard>,
    pub slot: usize,
    pub pass_pot: u32,
    pub out: BTreeSet<PlayerId>,
    pub bids_submitted: Vec<PlayerId>,
    pub own_bid: Option<Bid>,
}

/// Block contents as visible to one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BlockDetail {
    DeckPreview {
        age_one_cards: Vec<CardId>,
    },
    CapitalDraft {
        slots: Vec<Hex>,
        order: Vec<PlayerId>,
        picks: Vec<(PlayerId, Hex)>,
    },
    StartingBridges {
        submitted: Vec<PlayerId>,
        own_pick: Option<EdgeKey>,
    },
    FreeStartingCard {
        submitted: Vec<PlayerId>,
        own_offer: Option<Vec<CardId>>,
        own_pick: Option<CardId>,
    },
    QuietStudy {
        max: usize,
        submitted: Vec<PlayerId>,
    },
    MarketBid {
        slot: usize,
        card_id: CardId,
        age: Age,
    },
    ActionDeclarations {
        submitted: Vec<PlayerId>,
        own_declaration: Option<ActionDeclaration>,
    },
    CollectionChoices {
        submitted: Vec<PlayerId>,
        own_offer: Option<Vec<CardId>>,
        own_choice: Option<CollectionChoice>,
    },
    CombatRetreat {
        hex: Hex,
        player: PlayerId,
        options: Vec<Hex>,
        decision: Option<RetreatDecision>,
    },
    ScoutReport {
        player: PlayerId,
        keep: usize,
        /// Revealed cards, shown only to the scouting player.
        cards: Option<Vec<HandCard>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    pub kind: String,
    pub waiting_for: BTreeSet<PlayerId>,
    pub detail: BlockDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub viewer: Option<PlayerId>,
    pub revision: u64,
    pub round: u32,
    pub lead_seat: usize,
    pub phase: Phase,
    pub setup_step: Option<SetupStep>,
    pub players: Vec<PlayerView>,
    pub board: Board,
    pub market: MarketView,
    pub market_deck_sizes: Vec<(Age, usize)>,
    pub block: Option<BlockView>,
    pub battle: Option<BattleState>,
    pub modifiers: Vec<Modifier>,
    pub log: Vec<GameEvent>,
    pub winner: Option<PlayerId>,
}

fn hand_cards(state: &GameState, ids: &[CardInstanceId]) -> Vec<HandCard> {
    ids.iter()
        .filter_map(|id| {
            state.card_id_of(*id).map(|card_id| HandCard {
                instance_id: *id,
                card_id: card_id.clone(),
            })
        })
        .collect()
}

fn submitted<T>(map: &std::collections::BTreeMap<PlayerId, T>) -> Vec<PlayerId> {
    map.keys().cloned().collect()
}

fn block_detail(state: &GameState, payload: &BlockPayload, viewer: Option<&PlayerId>) -> BlockDetail {
    let own = |id: &PlayerId| viewer == Some(id);
    match payload {
        BlockPayload::SetupDeckPreview { age_one_cards, .. } => BlockDetail::DeckPreview {
            age_one_cards: age_one_cards.clone(),
        },
        BlockPayload::SetupCapitalDraft { slots, order, picks } => BlockDetail::CapitalDraft {
            slots: slots.clone(),
            order: order.clone(),
            picks: picks.iter().map(|(p, h)| (p.clone(), *h)).collect(),
        },
        BlockPayload::SetupStartingBridges { picks } => BlockDetail::StartingBridges {
            submitted: submitted(picks),
            own_pick: viewer.and_then(|v| picks.get(v).copied()),
        },
        BlockPayload::SetupFreeStartingCard { offers, picks } => BlockDetail::FreeStartingCard {
            submitted: submitted(picks),
            own_offer: viewer.and_then(|v| offers.get(v).cloned()),
            own_pick: viewer.and_then(|v| picks.get(v).cloned()),
        },
        BlockPayload::QuietStudy { max, discards } => BlockDetail::QuietStudy {
            max: *max,
            submitted: submitted(discards),
        },
        BlockPayload::MarketBidsForCard { slot, card_id, age } => BlockDetail::MarketBid {
            slot: *slot,
            card_id: card_id.clone(),
            age: *age,
        },
        BlockPayload::ActionDeclarations { declarations } => BlockDetail::ActionDeclarations {
            submitted: submitted(declarations),
            own_declaration: viewer.and_then(|v| declarations.get(v).cloned()),
        },
        BlockPayload::CollectionChoices { offers, choices } => BlockDetail::CollectionChoices {
            submitted: submitted(choices),
            own_offer: viewer.and_then(|v| offers.get(v).cloned()),
            own_choice: viewer.and_then(|v| choices.get(v).cloned()),
        },
        BlockPayload::CombatRetreat {
            hex,
            player,
            options,
            decision,
        } => BlockDetail::CombatRetreat {
            hex: *hex,
            player: player.clone(),
            options: options.clone(),
            decision: *decision,
        },
        BlockPayload::ScoutReport {
            player, cards, keep, ..
        } => BlockDetail::ScoutReport {
            player: player.clone(),
            keep: *keep,
            cards: own(player).then(|| hand_cards(state, cards)),
        },
    }
}

/// Builds the projection of `state` for `viewer` (`None` for a spectator).
pub fn build_view(state: &GameState, viewer: Option<&PlayerId>) -> GameView {
    let players = state
        .players
        .iter()
        .map(|p| PlayerView {
            id: p.id.clone(),
            name: p.name.clone(),
            seat: p.seat,
            faction: p.faction,
            capital: p.capital,
            resources: p.resources,
            vp: p.vp,
            done_this_round: p.done_this_round,
            hand_count: p.deck.hand.len(),
            draw_count: p.deck.draw_pile.len(),
            discard_count: p.deck.discard_pile.len(),
            in_play_count: p.deck.in_play.len(),
            scrapped_count: p.deck.scrapped.len(),
            burned_count: p.burned.len(),
            hand: (viewer == Some(&p.id)).then(|| hand_cards(state, &p.deck.hand)),
            connected: p.connected,
        })
        .collect();

    let market = MarketView {
        age: state.market.age,
        row: state.market.row.clone(),
        slot: state.market.slot,
        pass_pot: state.market.pass_pot,
        out: state.market.out.clone(),
        bids_submitted: submitted(&state.market.bids),
        own_bid: viewer.and_then(|v| state.market.bids.get(v).copied()),
    };

    let block = state.block.as_ref().map(|b| BlockView {
        kind: b.kind().to_string(),
        waiting_for: b.waiting_for.clone(),
        detail: block_detail(state, &b.payload, viewer),
    });

    GameView {
        viewer: viewer.cloned(),
        revision: state.revision,
        round: state.round,
        lead_seat: state.lead_seat,
        phase: state.phase,
        setup_step: (state.phase == Phase::Setup).then_some(state.setup.step),
        players,
        board: state.board.clone(),
        market,
        market_deck_sizes: state
            .market_decks
            .iter()
            .map(|(age, deck)| (*age, deck.len()))
            .collect(),
        block,
        battle: state.battle.clone(),
        modifiers: state.modifiers.clone(),
        log: state.log.clone(),
        winner: state.winner.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, LobbyPlayer};
    use crate::engine::create_new_game;
    use crate::game::deck::draw_cards;

    fn game() -> GameState {
        let lobby = vec![LobbyPlayer::new("a"), LobbyPlayer::new("b")];
        let mut state = create_new_game(GameConfig::default(), 11u64, &lobby).unwrap();
        draw_cards(&mut state, &PlayerId::new("a"), 2);
        draw_cards(&mut state, &PlayerId::new("b"), 2);
        state
    }

    #[test]
    fn own_hand_only() {
        let state = game();
        let a = PlayerId::new("a");
        let view = build_view(&state, Some(&a));
        assert_eq!(view.players[0].hand.as_ref().map(Vec::len), Some(2));
        assert!(view.players[1].hand.is_none());
        assert_eq!(view.players[1].hand_count, 2);
    }

    #[test]
    fn spectator_sees_no_hands() {
        let state = game();
        let view = build_view(&state, None);
        assert!(view.players.iter().all(|p| p.hand.is_none()));
        assert_eq!(view.setup_step, Some(SetupStep::DeckPreview));
    }

    #[test]
    fn hidden_bridge_picks() {
        let mut state = game();
        let a = PlayerId::new("a");
        let edge = EdgeKey::new(Hex::new(0, 0), Hex::new(1, 0)).unwrap();
        state.block = Some(super::super::block::Block::new(
            [PlayerId::new("b")],
            BlockPayload::SetupStartingBridges {
                picks: [(a.clone(), edge)].into_iter().collect(),
            },
        ));
        let mine = build_view(&state, Some(&a));
        let theirs = build_view(&state, Some(&PlayerId::new("b")));
        match (mine.block.unwrap().detail, theirs.block.unwrap().detail) {
            (
                BlockDetail::StartingBridges { own_pick: Some(e), submitted },
                BlockDetail::StartingBridges { own_pick: None, .. },
            ) => {
                assert_eq!(e, edge);
                assert_eq!(submitted, vec![a]);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }
}
