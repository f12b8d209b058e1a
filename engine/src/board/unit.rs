//! Unit types and ownership.
//!
//! Represents generic forces and named champions, the player that owns
//! them, and the hex they currently stand on.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::hex::Hex;
use crate::catalog::CardId;
use crate::game::CardInstanceId;

/// Stable identity of a seated player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

impl Borrow<str> for PlayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Board-unique unit identifier, allocated from the board's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// Combat profile and health of a deployed champion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionState {
    pub card_id: CardId,
    /// The card instance that stays attached to the champion while it lives.
    pub card_instance: Option<CardInstanceId>,
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub attack_dice: u32,
    pub hit_faces: u32,
    /// Gold paid to the opposing player when this champion dies.
    pub bounty: u32,
}

/// What kind of unit occupies a hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UnitKind {
    Force,
    Champion(ChampionState),
}

/// A unit on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub hex: Hex,
    pub kind: UnitKind,
}

impl Unit {
    pub fn is_force(&self) -> bool {
        matches!(self.kind, UnitKind::Force)
    }

    pub fn champion(&self) -> Option<&ChampionState> {
        match &self.kind {
            UnitKind::Champion(c) => Some(c),
            UnitKind::Force => None,
        }
    }

    pub fn champion_mut(&mut self) -> Option<&mut ChampionState> {
        match &mut self.kind {
            UnitKind::Champion(c) => Some(c),
            UnitKind::Force => None,
        }
    }
}
