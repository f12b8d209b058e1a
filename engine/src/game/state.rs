//! The game-state snapshot.
//!
//! [`GameState`] is a plain value. Public entry points take `&GameState`
//! and return a new one; internally the resolvers mutate a working clone
//! through the helpers here, which keep RNG draws, event appends and card
//! bookkeeping in one place.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::block::Block;
use super::event::GameEvent;
use crate::board::{Board, Hex, PlayerId};
use crate::catalog::{Age, CardDef, CardId};
use crate::config::{Faction, GameConfig};
use crate::rng::{RngState, Seed};

/// Runtime identity of one physical card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardInstanceId(pub u32);

impl fmt::Display for CardInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A card instance bound to its catalog definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInstance {
    pub id: CardInstanceId,
    pub card_id: CardId,
    pub owner: PlayerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub gold: u32,
    pub mana: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VictoryPoints {
    pub permanent: u32,
    pub control: u32,
    pub total: u32,
}

impl VictoryPoints {
    pub fn recompute(&mut self) {
        self.total = self.permanent + self.control;
    }
}

/// A player's personal card piles. The draw pile's top is index 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeckState {
    pub draw_pile: Vec<CardInstanceId>,
    pub discard_pile: Vec<CardInstanceId>,
    pub hand: Vec<CardInstanceId>,
    /// Cards declared this round and not yet resolved.
    pub in_play: Vec<CardInstanceId>,
    pub scrapped: Vec<CardInstanceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub seat: usize,
    pub faction: Option<Faction>,
    pub capital: Option<Hex>,
    pub resources: Resources,
    pub vp: VictoryPoints,
    pub done_this_round: bool,
    pub bought_this_round: bool,
    pub deck: DeckState,
    pub burned: Vec<CardInstanceId>,
    pub flags: BTreeSet<String>,
    pub connected: bool,
}

/// Top-level phases. Setup nests its own steps in [`SetupStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "setup")]
    Setup,
    #[serde(rename = "round.reset")]
    RoundReset,
    #[serde(rename = "round.study")]
    RoundStudy,
    #[serde(rename = "round.market")]
    RoundMarket,
    #[serde(rename = "round.action")]
    RoundAction,
    #[serde(rename = "round.sieges")]
    RoundSieges,
    #[serde(rename = "round.collection")]
    RoundCollection,
    #[serde(rename = "round.scoring")]
    RoundScoring,
    #[serde(rename = "round.cleanup")]
    RoundCleanup,
    #[serde(rename = "round.ageUpdate")]
    RoundAgeUpdate,
    #[serde(rename = "gameOver")]
    GameOver,
}

impl Phase {
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::RoundReset => "round.reset",
            Phase::RoundStudy => "round.study",
            Phase::RoundMarket => "round.market",
            Phase::RoundAction => "round.action",
            Phase::RoundSieges => "round.sieges",
            Phase::RoundCollection => "round.collection",
            Phase::RoundScoring => "round.scoring",
            Phase::RoundCleanup => "round.cleanup",
            Phase::RoundAgeUpdate => "round.ageUpdate",
            Phase::GameOver => "gameOver",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupStep {
    DeckPreview,
    CapitalDraft,
    StartingBridges,
    FreeStartingCard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupState {
    pub step: SetupStep,
    pub capital_slots: Vec<Hex>,
}

/// A revealed market card and the age deck it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCard {
    pub card_id: CardId,
    pub age: Age,
}

/// A sealed market bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Bid {
    Buy { amount: u32 },
    Pass { amount: u32 },
}

impl Bid {
    pub const fn amount(self) -> u32 {
        match self {
            Bid::Buy { amount } | Bid::Pass { amount } => amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketState {
    pub age: Age,
    pub row: Vec<MarketCard>,
    /// Index of the row slot under resolution.
    pub slot: usize,
    pub pass_pot: u32,
    pub bids: BTreeMap<PlayerId, Bid>,
    pub out: BTreeSet<PlayerId>,
}

impl MarketState {
    pub fn new(age: Age) -> Self {
        MarketState {
            age,
            row: Vec::new(),
            slot: 0,
            pass_pot: 0,
            bids: BTreeMap::new(),
            out: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ModifierKind {
    /// Extra combat dice for the owner.
    CombatDice { bonus: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    pub id: u32,
    pub owner: PlayerId,
    pub source_card: Option<CardId>,
    pub kind: ModifierKind,
    /// Dropped at the cleanup of this round.
    pub expires_at_round: u32,
}

/// One declared action awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    pub player: PlayerId,
    pub declaration: super::command::ActionDeclaration,
}

/// Cursor over the ordered declarations of one action step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResolution {
    pub entries: Vec<ActionEntry>,
    pub cursor: usize,
}

impl ActionResolution {
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.entries.len()
    }
}

/// A battle in progress at one hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleState {
    pub hex: Hex,
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub siege: bool,
    pub round: u32,
    /// Players already offered a retreat in this battle.
    pub retreat_offered: BTreeSet<PlayerId>,
}

/// Complete game snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub config: Arc<GameConfig>,
    pub seed: Seed,
    pub rng: RngState,
    pub revision: u64,
    pub players: Vec<PlayerState>,
    pub round: u32,
    pub lead_seat: usize,
    pub phase: Phase,
    pub setup: SetupState,
    pub board: Board,
    pub market: MarketState,
    pub market_decks: BTreeMap<Age, Vec<CardId>>,
    pub power_decks: BTreeMap<Age, Vec<CardId>>,
    pub log: Vec<GameEvent>,
    pub modifiers: Vec<Modifier>,
    pub next_modifier_seq: u32,
    pub block: Option<Block>,
    pub action_resolution: Option<ActionResolution>,
    pub battle: Option<BattleState>,
    /// Capital hexes still to be checked this sieges phase.
    pub siege_queue: Vec<Hex>,
    pub card_instances: BTreeMap<CardInstanceId, CardInstance>,
    pub next_instance_seq: u32,
    pub winner: Option<PlayerId>,
}

impl GameState {
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == *id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == *id)
    }

    pub fn host(&self) -> Option<&PlayerId> {
        self.players.first().map(|p| &p.id)
    }

    /// Seat distance from the lead seat, wrapping around the table.
    pub fn lead_distance(&self, seat: usize) -> usize {
        let n = self.players.len().max(1);
        (seat + n - self.lead_seat % n) % n
    }

    /// Player ids in seat order starting from the lead seat.
    pub fn lead_order(&self) -> Vec<PlayerId> {
        let mut ids: Vec<&PlayerState> = self.players.iter().collect();
        ids.sort_by_key(|p| self.lead_distance(p.seat));
        ids.into_iter().map(|p| p.id.clone()).collect()
    }

    /// True when the driver cannot advance without a command.
    pub fn is_blocked(&self) -> bool {
        if self.winner.is_some() || matches!(self.phase, Phase::Setup | Phase::GameOver) {
            return true;
        }
        self.block
            .as_ref()
            .is_some_and(|b| !b.waiting_for.is_empty())
    }

    pub fn push_event(&mut self, kind: &str, payload: Value) {
        self.log.push(GameEvent::new(kind, payload));
    }

    /// Moves to `phase`, clearing any residual block and logging the entry.
    pub fn enter_phase(&mut self, phase: Phase) {
        log::debug!("round {}: entering {}", self.round, phase);
        self.phase = phase;
        self.block = None;
        self.push_event(
            &format!("phase.{}", phase.name()),
            serde_json::json!({ "round": self.round }),
        );
    }

    pub fn next_below(&mut self, n: u32) -> u32 {
        let (v, next) = self.rng.next_below(n);
        self.rng = next;
        v
    }

    pub fn roll_die(&mut self, sides: u32) -> u32 {
        let (v, next) = self.rng.roll_die(sides);
        self.rng = next;
        v
    }

    pub fn shuffle<T>(&mut self, items: Vec<T>) -> Vec<T> {
        let (items, next) = self.rng.shuffle(items);
        self.rng = next;
        items
    }

    /// Creates a card instance owned by `owner`. The caller places it in a pile.
    pub fn new_card_instance(&mut self, card_id: &CardId, owner: &PlayerId) -> CardInstanceId {
        let id = CardInstanceId(self.next_instance_seq);
        self.next_instance_seq += 1;
        self.card_instances.insert(
            id,
            CardInstance {
                id,
                card_id: card_id.clone(),
                owner: owner.clone(),
            },
        );
        id
    }

    pub fn card_id_of(&self, instance: CardInstanceId) -> Option<&CardId> {
        self.card_instances.get(&instance).map(|c| &c.card_id)
    }

    /// Catalog definition behind a card instance.
    pub fn card_def(&self, instance: CardInstanceId) -> Option<&CardDef> {
        let card_id = self.card_id_of(instance)?;
        self.config.catalog.get(card_id)
    }

    pub fn add_modifier(&mut self, owner: &PlayerId, source_card: Option<CardId>, kind: ModifierKind) {
        let id = self.next_modifier_seq;
        self.next_modifier_seq += 1;
        self.modifiers.push(Modifier {
            id,
            owner: owner.clone(),
            source_card,
            kind,
            expires_at_round: self.round,
        });
    }

    /// Extra combat dice `player` holds from active modifiers.
    pub fn combat_bonus_dice(&self, player: &PlayerId) -> u32 {
        self.modifiers
            .iter()
            .filter(|m| m.owner == *player)
            .map(|m| match m.kind {
                ModifierKind::CombatDice { bonus } => bonus,
            })
            .sum()
    }

    /// Adds `amount` gold to `player`.
    pub fn credit_gold(&mut self, player: &PlayerId, amount: u32) {
        if let Some(p) = self.player_mut(player) {
            p.resources.gold += amount;
        }
    }

    /// Takes up to `amount` gold from `player`, returning what was taken.
    pub fn debit_gold(&mut self, player: &PlayerId, amount: u32) -> u32 {
        match self.player_mut(player) {
            Some(p) => {
                let taken = amount.min(p.resources.gold);
                p.resources.gold -= taken;
                taken
            }
            None => 0,
        }
    }
}
