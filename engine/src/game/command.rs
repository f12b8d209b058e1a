//! Player commands.

use serde::{Deserialize, Serialize};

use super::state::{Bid, CardInstanceId};
use crate::board::{EdgeKey, Hex};
use crate::catalog::{CardId, CardTargets};

/// A choice submitted during one of the setup steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SetupChoice {
    Capital { hex: Hex },
    StartingBridge { edge: EdgeKey },
    FreeCard { card_id: CardId },
}

/// One action declared during an action step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionDeclaration {
    Done,
    BuildBridge {
        edge: EdgeKey,
    },
    March {
        from: Hex,
        to: Hex,
    },
    CapitalReinforce,
    PlayCard {
        instance_id: CardInstanceId,
        #[serde(default)]
        targets: CardTargets,
    },
}

impl ActionDeclaration {
    pub const fn name(&self) -> &'static str {
        match self {
            ActionDeclaration::Done => "done",
            ActionDeclaration::BuildBridge { .. } => "buildBridge",
            ActionDeclaration::March { .. } => "march",
            ActionDeclaration::CapitalReinforce => "capitalReinforce",
            ActionDeclaration::PlayCard { .. } => "playCard",
        }
    }
}

/// A forge-holder's collection answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CollectionChoice {
    /// Takes one offered power card into the discard pile.
    Draft { card_id: CardId },
    /// Removes a hand card from the game.
    Scrap { instance_id: CardInstanceId },
    Skip,
}

/// A player-submitted intent. The issuing player is passed alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Command {
    SubmitSetupChoice { choice: SetupChoice },
    AdvanceSetup,
    SubmitQuietStudy { card_ids: Vec<CardInstanceId> },
    SubmitScoutReportChoice { keep: Vec<CardInstanceId> },
    SubmitAction { declaration: ActionDeclaration },
    SubmitMarketBid { bid: Bid },
    SubmitCollectionChoices { choice: CollectionChoice },
    SubmitCombatRetreat { to: Option<Hex> },
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Command::SubmitSetupChoice { .. } => "SubmitSetupChoice",
            Command::AdvanceSetup => "AdvanceSetup",
            Command::SubmitQuietStudy { .. } => "SubmitQuietStudy",
            Command::SubmitScoutReportChoice { .. } => "SubmitScoutReportChoice",
            Command::SubmitAction { .. } => "SubmitAction",
            Command::SubmitMarketBid { .. } => "SubmitMarketBid",
            Command::SubmitCollectionChoices { .. } => "SubmitCollectionChoices",
            Command::SubmitCombatRetreat { .. } => "SubmitCombatRetreat",
        }
    }
}
