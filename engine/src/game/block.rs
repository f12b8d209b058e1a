//! Blocks: the "waiting for input" record that halts the driver.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::command::{ActionDeclaration, CollectionChoice};
use super::state::CardInstanceId;
use crate::board::{EdgeKey, Hex, PlayerId};
use crate::catalog::{Age, CardId};

/// A retreat answer; `to: None` stays and fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetreatDecision {
    pub to: Option<Hex>,
}

/// Variant-specific block data. Responses are recorded here until the block
/// resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum BlockPayload {
    #[serde(rename = "setup.deckPreview")]
    SetupDeckPreview {
        age_one_cards: Vec<CardId>,
        deck_sizes: BTreeMap<Age, usize>,
    },
    #[serde(rename = "setup.capitalDraft")]
    SetupCapitalDraft {
        slots: Vec<Hex>,
        /// Pick order; the head of the unpicked tail is on the clock.
        order: Vec<PlayerId>,
        picks: BTreeMap<PlayerId, Hex>,
    },
    #[serde(rename = "setup.startingBridges")]
    SetupStartingBridges { picks: BTreeMap<PlayerId, EdgeKey> },
    #[serde(rename = "setup.freeStartingCard")]
    SetupFreeStartingCard {
        offers: BTreeMap<PlayerId, Vec<CardId>>,
        picks: BTreeMap<PlayerId, CardId>,
    },
    #[serde(rename = "round.quietStudy")]
    QuietStudy {
        max: usize,
        discards: BTreeMap<PlayerId, Vec<CardInstanceId>>,
    },
    #[serde(rename = "market.bidsForCard")]
    MarketBidsForCard { slot: usize, card_id: CardId, age: Age },
    #[serde(rename = "actionStep.declarations")]
    ActionDeclarations {
        declarations: BTreeMap<PlayerId, ActionDeclaration>,
    },
    #[serde(rename = "collection.choices")]
    CollectionChoices {
        offers: BTreeMap<PlayerId, Vec<CardId>>,
        choices: BTreeMap<PlayerId, CollectionChoice>,
    },
    #[serde(rename = "combat.retreat")]
    CombatRetreat {
        hex: Hex,
        player: PlayerId,
        options: Vec<Hex>,
        decision: Option<RetreatDecision>,
    },
    #[serde(rename = "action.scoutReport")]
    ScoutReport {
        player: PlayerId,
        cards: Vec<CardInstanceId>,
        keep: usize,
        chosen: Option<Vec<CardInstanceId>>,
    },
}

impl BlockPayload {
    /// Dotted tag naming the blocking sub-phase.
    pub const fn kind(&self) -> &'static str {
        match self {
            BlockPayload::SetupDeckPreview { .. } => "setup.deckPreview",
            BlockPayload::SetupCapitalDraft { .. } => "setup.capitalDraft",
            BlockPayload::SetupStartingBridges { .. } => "setup.startingBridges",
            BlockPayload::SetupFreeStartingCard { .. } => "setup.freeStartingCard",
            BlockPayload::QuietStudy { .. } => "round.quietStudy",
            BlockPayload::MarketBidsForCard { .. } => "market.bidsForCard",
            BlockPayload::ActionDeclarations { .. } => "actionStep.declarations",
            BlockPayload::CollectionChoices { .. } => "collection.choices",
            BlockPayload::CombatRetreat { .. } => "combat.retreat",
            BlockPayload::ScoutReport { .. } => "action.scoutReport",
        }
    }

    pub const fn is_setup(&self) -> bool {
        matches!(
            self,
            BlockPayload::SetupDeckPreview { .. }
                | BlockPayload::SetupCapitalDraft { .. }
                | BlockPayload::SetupStartingBridges { .. }
                | BlockPayload::SetupFreeStartingCard { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub waiting_for: BTreeSet<PlayerId>,
    pub payload: BlockPayload,
}

impl Block {
    pub fn new(waiting_for: impl IntoIterator<Item = PlayerId>, payload: BlockPayload) -> Self {
        Block {
            waiting_for: waiting_for.into_iter().collect(),
            payload,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    pub fn is_waiting_on(&self, player: &PlayerId) -> bool {
        self.waiting_for.contains(player)
    }
}
