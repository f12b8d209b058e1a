//! Game configuration.
//!
//! Every tuning constant the resolvers read lives in [`GameConfig`]. All
//! fields default, so a JSON override only needs the keys it changes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::board::PlayerId;
use crate::catalog::{
    standard_free_card_pool, standard_starting_deck, Age, CardCatalog, CardId,
};
use crate::error::ConfigError;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;

/// Player faction. Factions only matter for action ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Faction {
    Bastion,
    Veil,
    Aerial,
    Prospect,
    Cipher,
    Gatewright,
}

impl Faction {
    pub const ALL: [Faction; 6] = [
        Faction::Bastion,
        Faction::Veil,
        Faction::Aerial,
        Faction::Prospect,
        Faction::Cipher,
        Faction::Gatewright,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Faction::Bastion => "bastion",
            Faction::Veil => "veil",
            Faction::Aerial => "aerial",
            Faction::Prospect => "prospect",
            Faction::Cipher => "cipher",
            Faction::Gatewright => "gatewright",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A seated lobby entry. Seat order is the order of the lobby list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    pub id: PlayerId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub faction: Option<Faction>,
}

impl LobbyPlayer {
    pub fn new(id: impl Into<String>) -> Self {
        LobbyPlayer {
            id: PlayerId::new(id),
            name: None,
            faction: None,
        }
    }

    pub fn with_faction(mut self, faction: Faction) -> Self {
        self.faction = Some(faction);
        self
    }
}

/// Rules constants and content for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Board radius keyed by player count.
    pub board_radius_by_players: BTreeMap<usize, i32>,
    pub mine_count: usize,
    pub forge_count: usize,
    /// Mine values are drawn from this list.
    pub mine_values: Vec<u32>,

    pub starting_gold: u32,
    pub starting_forces: u32,
    pub starting_deck: Vec<CardId>,
    pub free_card_pool: Vec<CardId>,
    pub free_card_offer: usize,

    pub base_mana: u32,
    pub base_gold_income: u32,
    pub hand_size: usize,
    pub quiet_study_max: usize,

    /// Listed factions resolve first, in list order.
    pub faction_priority: Vec<Faction>,
    pub bridge_mana_cost: u32,
    pub march_mana_cost: u32,
    pub reinforce_mana_cost: u32,
    pub reinforce_gold_cost: u32,

    /// Next-age cards revealed in the market row, keyed by round.
    pub market_preview: BTreeMap<u32, usize>,
    pub age_two_round: u32,
    pub age_three_round: u32,
    pub forge_offer: usize,

    pub center_vp: u32,
    pub capital_control_vp: u32,
    pub vp_to_win: u32,
    pub max_rounds: u32,

    pub dice_sides: u32,
    /// A force die hits on a roll of `force_hit_faces` or lower.
    pub force_hit_faces: u32,
    pub capital_defense_dice: u32,
    pub max_combat_rounds: u32,
    pub siege_gold_steal: u32,

    pub catalog: Arc<CardCatalog>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            board_radius_by_players: BTreeMap::from([(2, 4), (3, 4), (4, 5), (5, 5), (6, 6)]),
            mine_count: 4,
            forge_count: 2,
            mine_values: vec![1, 2, 2, 3],
            starting_gold: 4,
            starting_forces: 3,
            starting_deck: standard_starting_deck(),
            free_card_pool: standard_free_card_pool(),
            free_card_offer: 3,
            base_mana: 1,
            base_gold_income: 1,
            hand_size: 4,
            quiet_study_max: 1,
            faction_priority: Vec::new(),
            bridge_mana_cost: 1,
            march_mana_cost: 1,
            reinforce_mana_cost: 1,
            reinforce_gold_cost: 1,
            market_preview: BTreeMap::from([(3, 1), (6, 1)]),
            age_two_round: 4,
            age_three_round: 7,
            forge_offer: 2,
            center_vp: 1,
            capital_control_vp: 1,
            vp_to_win: 10,
            max_rounds: 12,
            dice_sides: 6,
            force_hit_faces: 2,
            capital_defense_dice: 2,
            max_combat_rounds: 6,
            siege_gold_steal: 2,
            catalog: Arc::new(CardCatalog::standard()),
        }
    }
}

impl GameConfig {
    /// Parses a configuration from JSON, filling missing keys with defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        GameConfig::from_json(&data)
    }

    /// The age in effect during `round`.
    pub fn age_for_round(&self, round: u32) -> Age {
        if round >= self.age_three_round {
            Age::III
        } else if round >= self.age_two_round {
            Age::II
        } else {
            Age::I
        }
    }

    /// Next-age cards to mix into the market row this round.
    pub fn preview_for_round(&self, round: u32) -> usize {
        self.market_preview.get(&round).copied().unwrap_or(0)
    }

    pub fn board_radius(&self, players: usize) -> Option<i32> {
        self.board_radius_by_players.get(&players).copied()
    }

    /// Position of `faction` in the priority list; unlisted factions sort last.
    pub fn faction_rank(&self, faction: Faction) -> usize {
        self.faction_priority
            .iter()
            .position(|f| *f == faction)
            .unwrap_or(self.faction_priority.len())
    }

    /// Rejects configurations the resolvers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.dice_sides < 2 {
            return invalid(format!("diceSides must be at least 2, got {}", self.dice_sides));
        }
        if self.force_hit_faces > self.dice_sides {
            return invalid(format!(
                "forceHitFaces {} exceeds diceSides {}",
                self.force_hit_faces, self.dice_sides
            ));
        }
        if self.max_combat_rounds == 0 {
            return invalid("maxCombatRounds must be at least 1".to_string());
        }
        if self.hand_size == 0 {
            return invalid("handSize must be at least 1".to_string());
        }
        if self.max_rounds == 0 {
            return invalid("maxRounds must be at least 1".to_string());
        }
        if self.age_two_round > self.age_three_round {
            return invalid(format!(
                "ageTwoRound {} is after ageThreeRound {}",
                self.age_two_round, self.age_three_round
            ));
        }
        if self.mine_count > 0 && self.mine_values.is_empty() {
            return invalid("mineValues is empty but mines are configured".to_string());
        }
        for players in MIN_PLAYERS..=MAX_PLAYERS {
            match self.board_radius(players) {
                Some(r) if r >= 2 => {}
                Some(r) => return invalid(format!("board radius {r} for {players} players is below 2")),
                None => return invalid(format!("no board radius for {players} players")),
            }
        }
        for id in self.starting_deck.iter().chain(self.free_card_pool.iter()) {
            if self.catalog.get(id).is_none() {
                return invalid(format!("unknown card id '{id}'"));
            }
        }
        let mut seen = BTreeSet::new();
        for f in &self.faction_priority {
            if !seen.insert(*f) {
                return invalid(format!("faction '{f}' listed twice in factionPriority"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = GameConfig::from_json(r#"{"vpToWin": 6, "factionPriority": ["veil", "bastion"]}"#)
            .unwrap();
        assert_eq!(cfg.vp_to_win, 6);
        assert_eq!(cfg.base_mana, 1);
        assert_eq!(cfg.faction_rank(Faction::Veil), 0);
        assert_eq!(cfg.faction_rank(Faction::Bastion), 1);
        assert_eq!(cfg.faction_rank(Faction::Aerial), 2);
    }

    #[test]
    fn rejects_bad_dice() {
        let err = GameConfig::from_json(r#"{"diceSides": 1}"#).unwrap_err();
        assert!(err.to_string().contains("diceSides"));
    }

    #[test]
    fn rejects_duplicate_faction_priority() {
        let cfg = GameConfig {
            faction_priority: vec![Faction::Veil, Faction::Veil],
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_starting_card() {
        let cfg = GameConfig {
            starting_deck: vec![CardId::new("nope")],
            ..GameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn age_schedule() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.age_for_round(1), Age::I);
        assert_eq!(cfg.age_for_round(4), Age::II);
        assert_eq!(cfg.age_for_round(9), Age::III);
        assert_eq!(cfg.preview_for_round(3), 1);
        assert_eq!(cfg.preview_for_round(1), 0);
    }

    #[test]
    fn lobby_player_json() {
        let p: LobbyPlayer = serde_json::from_str(r#"{"id":"a","faction":"veil"}"#).unwrap();
        assert_eq!(p, LobbyPlayer::new("a").with_faction(Faction::Veil));
    }
}
