//! Board representation.
//!
//! Holds hex records, the unit table, and bridges. Units are tracked twice:
//! once in [`Board::units`] (id -> record) and once in the occupant list of
//! the hex they stand on. The mutation helpers here keep both views in sync
//! and are the only code that should touch occupant lists.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::hex::{hexes_within, EdgeKey, Hex};
use super::unit::{ChampionState, PlayerId, Unit, UnitId, UnitKind};

/// The most distinct players whose units may share one hex.
pub const MAX_PLAYERS_PER_HEX: usize = 2;

/// Terrain of a hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TileType {
    #[default]
    Normal,
    Mine,
    Forge,
    Capital,
    Center,
}

/// One cell of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HexRecord {
    pub tile: TileType,
    /// Capital owner, or the last player to hold the hex alone.
    pub owner: Option<PlayerId>,
    pub mine_value: Option<u32>,
    pub occupants: BTreeMap<PlayerId, Vec<UnitId>>,
}

/// A bridge across one hex edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bridge {
    pub edge: EdgeKey,
    pub owner: Option<PlayerId>,
    /// Temporary bridges are removed at round cleanup.
    pub temporary: bool,
}

/// Complete board state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub radius: i32,
    pub hexes: BTreeMap<Hex, HexRecord>,
    pub units: BTreeMap<UnitId, Unit>,
    pub bridges: BTreeMap<EdgeKey, Bridge>,
    pub next_unit_seq: u32,
}

impl Board {
    /// Creates a board of plain hexes with no units or bridges.
    pub fn empty(radius: i32) -> Self {
        Board {
            radius,
            hexes: hexes_within(radius)
                .into_iter()
                .map(|h| (h, HexRecord::default()))
                .collect(),
            units: BTreeMap::new(),
            bridges: BTreeMap::new(),
            next_unit_seq: 1,
        }
    }

    pub fn contains(&self, hex: Hex) -> bool {
        self.hexes.contains_key(&hex)
    }

    pub fn get(&self, hex: Hex) -> Option<&HexRecord> {
        self.hexes.get(&hex)
    }

    pub fn tile(&self, hex: Hex) -> Option<TileType> {
        self.hexes.get(&hex).map(|h| h.tile)
    }

    /// Sets the tile type of a hex. Returns false if the hex is off-board.
    pub fn set_tile(&mut self, hex: Hex, tile: TileType) -> bool {
        match self.hexes.get_mut(&hex) {
            Some(rec) => {
                rec.tile = tile;
                true
            }
            None => false,
        }
    }

    /// The hex holding `player`'s capital, if placed.
    pub fn capital_of(&self, player: &PlayerId) -> Option<Hex> {
        self.hexes
            .iter()
            .find(|(_, rec)| rec.tile == TileType::Capital && rec.owner.as_ref() == Some(player))
            .map(|(h, _)| *h)
    }

    /// Unit ids `player` has on `hex` (empty if none).
    pub fn units_of(&self, player: &PlayerId, hex: Hex) -> &[UnitId] {
        self.hexes
            .get(&hex)
            .and_then(|rec| rec.occupants.get(player))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_units(&self, player: &PlayerId, hex: Hex) -> bool {
        !self.units_of(player, hex).is_empty()
    }

    /// Players with at least one unit on `hex`, in id order.
    pub fn occupying_players(&self, hex: Hex) -> Vec<PlayerId> {
        self.hexes
            .get(&hex)
            .map(|rec| rec.occupants.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_empty_hex(&self, hex: Hex) -> bool {
        self.hexes
            .get(&hex)
            .map_or(true, |rec| rec.occupants.is_empty())
    }

    /// True if more than one player has units on `hex`.
    pub fn is_contested(&self, hex: Hex) -> bool {
        self.hexes
            .get(&hex)
            .is_some_and(|rec| rec.occupants.len() > 1)
    }

    /// The only player with units on `hex`, if exactly one.
    pub fn sole_occupant(&self, hex: Hex) -> Option<&PlayerId> {
        let rec = self.hexes.get(&hex)?;
        if rec.occupants.len() == 1 {
            rec.occupants.keys().next()
        } else {
            None
        }
    }

    /// True if `player` entering `hex` would put a third player there.
    pub fn would_exceed_two_players(&self, hex: Hex, player: &PlayerId) -> bool {
        match self.hexes.get(&hex) {
            Some(rec) => {
                !rec.occupants.contains_key(player) && rec.occupants.len() >= MAX_PLAYERS_PER_HEX
            }
            None => true,
        }
    }

    pub fn force_count(&self, player: &PlayerId, hex: Hex) -> usize {
        self.units_of(player, hex)
            .iter()
            .filter(|id| self.units.get(id).is_some_and(Unit::is_force))
            .count()
    }

    /// Champions `player` has on `hex`, in unit-id order.
    pub fn champions_of(&self, player: &PlayerId, hex: Hex) -> Vec<&Unit> {
        let mut champs: Vec<&Unit> = self
            .units_of(player, hex)
            .iter()
            .filter_map(|id| self.units.get(id))
            .filter(|u| u.champion().is_some())
            .collect();
        champs.sort_by_key(|u| u.id);
        champs
    }

    /// Every hex where `player` has units, in hex order.
    pub fn hexes_with_units(&self, player: &PlayerId) -> Vec<Hex> {
        self.hexes
            .iter()
            .filter(|(_, rec)| rec.occupants.contains_key(player))
            .map(|(h, _)| *h)
            .collect()
    }

    /// Every hex with units of more than one player, in hex order.
    pub fn contested_hexes(&self) -> Vec<Hex> {
        self.hexes
            .iter()
            .filter(|(_, rec)| rec.occupants.len() > 1)
            .map(|(h, _)| *h)
            .collect()
    }

    fn allocate_unit(&mut self, owner: &PlayerId, hex: Hex, kind: UnitKind) -> UnitId {
        let id = UnitId(self.next_unit_seq);
        self.next_unit_seq += 1;
        self.units.insert(
            id,
            Unit {
                id,
                owner: owner.clone(),
                hex,
                kind,
            },
        );
        if let Some(rec) = self.hexes.get_mut(&hex) {
            rec.occupants.entry(owner.clone()).or_default().push(id);
        }
        id
    }

    /// Places `count` forces for `player` on `hex`. Callers check occupancy.
    /// Returns the new unit ids (empty if the hex is off-board).
    pub fn add_forces(&mut self, player: &PlayerId, hex: Hex, count: u32) -> Vec<UnitId> {
        if !self.contains(hex) {
            return Vec::new();
        }
        let ids = (0..count)
            .map(|_| self.allocate_unit(player, hex, UnitKind::Force))
            .collect();
        self.refresh_owner(hex);
        ids
    }

    /// Places a champion for `player` on `hex`.
    pub fn add_champion(
        &mut self,
        player: &PlayerId,
        hex: Hex,
        champion: ChampionState,
    ) -> Option<UnitId> {
        if !self.contains(hex) {
            return None;
        }
        let id = self.allocate_unit(player, hex, UnitKind::Champion(champion));
        self.refresh_owner(hex);
        Some(id)
    }

    /// Removes a unit from the board, returning its record.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        if let Some(rec) = self.hexes.get_mut(&unit.hex) {
            if let Some(list) = rec.occupants.get_mut(&unit.owner) {
                list.retain(|u| *u != id);
                if list.is_empty() {
                    rec.occupants.remove(&unit.owner);
                }
            }
        }
        self.refresh_owner(unit.hex);
        Some(unit)
    }

    /// Moves the given units to `to`, keeping their owners.
    pub fn move_units(&mut self, ids: &[UnitId], to: Hex) {
        if !self.contains(to) {
            return;
        }
        let mut touched = BTreeSet::new();
        for id in ids {
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            let from = unit.hex;
            let owner = unit.owner.clone();
            unit.hex = to;
            if let Some(rec) = self.hexes.get_mut(&from) {
                if let Some(list) = rec.occupants.get_mut(&owner) {
                    list.retain(|u| u != id);
                    if list.is_empty() {
                        rec.occupants.remove(&owner);
                    }
                }
            }
            if let Some(rec) = self.hexes.get_mut(&to) {
                rec.occupants.entry(owner).or_default().push(*id);
            }
            touched.insert(from);
        }
        touched.insert(to);
        for hex in touched {
            self.refresh_owner(hex);
        }
    }

    /// Moves every unit `player` has on `from` to `to`. Returns the count moved.
    pub fn move_stack(&mut self, player: &PlayerId, from: Hex, to: Hex) -> usize {
        let ids = self.units_of(player, from).to_vec();
        self.move_units(&ids, to);
        ids.len()
    }

    /// Records a lone occupant as the hex owner. Capitals keep their owner.
    fn refresh_owner(&mut self, hex: Hex) {
        let Some(rec) = self.hexes.get_mut(&hex) else {
            return;
        };
        if rec.tile == TileType::Capital {
            return;
        }
        if rec.occupants.len() == 1 {
            rec.owner = rec.occupants.keys().next().cloned();
        }
    }

    pub fn has_bridge(&self, a: Hex, b: Hex) -> bool {
        EdgeKey::new(a, b).is_some_and(|e| self.bridges.contains_key(&e))
    }

    /// Adds a bridge. Returns false if either endpoint is off-board or a
    /// bridge already spans the edge.
    pub fn add_bridge(&mut self, edge: EdgeKey, owner: Option<PlayerId>, temporary: bool) -> bool {
        let (a, b) = edge.endpoints();
        if !self.contains(a) || !self.contains(b) || self.bridges.contains_key(&edge) {
            return false;
        }
        self.bridges.insert(
            edge,
            Bridge {
                edge,
                owner,
                temporary,
            },
        );
        true
    }

    pub fn remove_bridge(&mut self, edge: EdgeKey) -> Option<Bridge> {
        self.bridges.remove(&edge)
    }

    /// Drops every temporary bridge, returning how many were removed.
    pub fn remove_temporary_bridges(&mut self) -> usize {
        let before = self.bridges.len();
        self.bridges.retain(|_, b| !b.temporary);
        before - self.bridges.len()
    }

    /// Hexes joined to `hex` by a bridge, in neighbor order.
    pub fn bridged_neighbors(&self, hex: Hex) -> Vec<Hex> {
        hex.neighbors()
            .into_iter()
            .filter(|n| self.has_bridge(hex, *n))
            .collect()
    }

    /// Hexes reachable from `from` in at most `max_steps` bridge crossings.
    pub fn reachable_over_bridges(&self, from: Hex, max_steps: u32) -> BTreeSet<Hex> {
        let mut seen = BTreeSet::from([from]);
        let mut frontier = vec![from];
        for _ in 0..max_steps {
            let mut next = Vec::new();
            for hex in frontier {
                for n in self.bridged_neighbors(hex) {
                    if seen.insert(n) {
                        next.push(n);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        seen
    }

    /// Lists violations of the occupancy bookkeeping. Empty when consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut listed: BTreeMap<UnitId, usize> = BTreeMap::new();
        for (hex, rec) in &self.hexes {
            if rec.occupants.len() > MAX_PLAYERS_PER_HEX {
                problems.push(format!("hex {hex} holds {} players", rec.occupants.len()));
            }
            for (player, ids) in &rec.occupants {
                if ids.is_empty() {
                    problems.push(format!("hex {hex} has an empty list for {player}"));
                }
                for id in ids {
                    *listed.entry(*id).or_default() += 1;
                    match self.units.get(id) {
                        Some(u) if u.hex == *hex && u.owner == *player => {}
                        Some(u) => problems.push(format!(
                            "unit {id} listed on {hex} for {player} but recorded on {} for {}",
                            u.hex, u.owner
                        )),
                        None => problems.push(format!("hex {hex} lists unknown unit {id}")),
                    }
                }
            }
        }
        for id in self.units.keys() {
            match listed.get(id) {
                Some(1) => {}
                Some(n) => problems.push(format!("unit {id} listed {n} times")),
                None => problems.push(format!("unit {id} is not on any hex")),
            }
        }
        problems
    }
}
