//! Legal command generation.
//!
//! Lists the commands a player could submit against the current block, for
//! self-play drivers and tests. Candidates are generated from the block and
//! the board, then filtered through [`apply_command`] so only commands the
//! engine would accept are returned.

pub mod targets;

use rand::Rng;

use crate::board::{EdgeKey, PlayerId};
use crate::engine::apply_command;
use crate::game::{
    ActionDeclaration, Bid, BlockPayload, CollectionChoice, Command, GameState, Phase, SetupChoice,
};

pub use targets::candidate_targets;

/// Players the game is waiting on. During setup, once every answer is in,
/// that is the host, who must advance.
pub fn pending_players(state: &GameState) -> Vec<PlayerId> {
    if state.winner.is_some() || state.phase == Phase::GameOver {
        return Vec::new();
    }
    match &state.block {
        Some(block) if !block.waiting_for.is_empty() => block.waiting_for.iter().cloned().collect(),
        Some(_) if state.phase == Phase::Setup => state.host().cloned().into_iter().collect(),
        _ => Vec::new(),
    }
}

fn candidates(state: &GameState, player: &PlayerId) -> Vec<Command> {
    let Some(block) = state.block.as_ref() else {
        return Vec::new();
    };
    if state.phase == Phase::Setup && block.waiting_for.is_empty() {
        return vec![Command::AdvanceSetup];
    }
    if !block.is_waiting_on(player) {
        return Vec::new();
    }
    let Some(me) = state.player(player) else {
        return Vec::new();
    };

    match &block.payload {
        BlockPayload::SetupDeckPreview { .. } => Vec::new(),
        BlockPayload::SetupCapitalDraft { slots, .. } => slots
            .iter()
            .map(|hex| Command::SubmitSetupChoice {
                choice: SetupChoice::Capital { hex: *hex },
            })
            .collect(),
        BlockPayload::SetupStartingBridges { .. } => {
            let Some(capital) = me.capital else {
                return Vec::new();
            };
            capital
                .neighbors()
                .into_iter()
                .filter_map(|n| EdgeKey::new(capital, n))
                .map(|edge| Command::SubmitSetupChoice {
                    choice: SetupChoice::StartingBridge { edge },
                })
                .collect()
        }
        BlockPayload::SetupFreeStartingCard { offers, .. } => offers
            .get(player)
            .into_iter()
            .flatten()
            .map(|card_id| Command::SubmitSetupChoice {
                choice: SetupChoice::FreeCard {
                    card_id: card_id.clone(),
                },
            })
            .collect(),
        BlockPayload::QuietStudy { .. } => {
            let mut out = vec![Command::SubmitQuietStudy { card_ids: Vec::new() }];
            out.extend(me.deck.hand.iter().map(|c| Command::SubmitQuietStudy { card_ids: vec![*c] }));
            out
        }
        BlockPayload::MarketBidsForCard { .. } => {
            let gold = me.resources.gold;
            let mut out = vec![Command::SubmitMarketBid {
                bid: Bid::Pass { amount: 0 },
            }];
            if gold > 0 {
                out.push(Command::SubmitMarketBid {
                    bid: Bid::Pass { amount: 1 },
                });
            }
            out.extend((1..=gold).map(|amount| Command::SubmitMarketBid {
                bid: Bid::Buy { amount },
            }));
            out
        }
        BlockPayload::ActionDeclarations { .. } => action_candidates(state, player)
            .into_iter()
            .map(|declaration| Command::SubmitAction { declaration })
            .collect(),
        BlockPayload::CollectionChoices { offers, .. } => {
            let mut out = vec![Command::SubmitCollectionChoices {
                choice: CollectionChoice::Skip,
            }];
            for card_id in offers.get(player).into_iter().flatten() {
                out.push(Command::SubmitCollectionChoices {
                    choice: CollectionChoice::Draft {
                        card_id: card_id.clone(),
                    },
                });
            }
            for instance_id in &me.deck.hand {
                out.push(Command::SubmitCollectionChoices {
                    choice: CollectionChoice::Scrap {
                        instance_id: *instance_id,
                    },
                });
            }
            out
        }
        BlockPayload::CombatRetreat { options, .. } => {
            let mut out = vec![Command::SubmitCombatRetreat { to: None }];
            out.extend(options.iter().map(|h| Command::SubmitCombatRetreat { to: Some(*h) }));
            out
        }
        BlockPayload::ScoutReport { cards, keep, .. } => {
            let mut out = vec![Command::SubmitScoutReportChoice { keep: Vec::new() }];
            if *keep > 0 {
                out.extend(cards.iter().map(|c| Command::SubmitScoutReportChoice { keep: vec![*c] }));
            }
            out
        }
    }
}

fn action_candidates(state: &GameState, player: &PlayerId) -> Vec<ActionDeclaration> {
    let mut out = vec![ActionDeclaration::Done, ActionDeclaration::CapitalReinforce];
    let board = &state.board;
    for hex in board.hexes_with_units(player) {
        for n in hex.neighbors() {
            if !board.contains(n) {
                continue;
            }
            if board.has_bridge(hex, n) {
                out.push(ActionDeclaration::March { from: hex, to: n });
            } else if let Some(edge) = EdgeKey::new(hex, n) {
                out.push(ActionDeclaration::BuildBridge { edge });
            }
        }
    }
    if let Some(me) = state.player(player) {
        for instance_id in &me.deck.hand {
            let Some(card) = state.card_def(*instance_id) else {
                continue;
            };
            for targets in candidate_targets(state, player, card) {
                out.push(ActionDeclaration::PlayCard {
                    instance_id: *instance_id,
                    targets,
                });
            }
        }
    }
    out
}

/// Every command `player` could submit that the engine would accept.
pub fn legal_commands(state: &GameState, player: &PlayerId) -> Vec<Command> {
    candidates(state, player)
        .into_iter()
        .filter(|cmd| {
            apply_command(state, cmd, player)
                .map(|next| next.revision != state.revision)
                .unwrap_or(false)
        })
        .collect()
}

/// Picks a uniformly random legal command for `player`.
pub fn random_command(state: &GameState, player: &PlayerId, rng: &mut impl Rng) -> Option<Command> {
    let legal = legal_commands(state, player);
    if legal.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..legal.len());
    legal.into_iter().nth(idx)
}
