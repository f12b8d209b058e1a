//! Card catalog: immutable card definitions consumed by the resolvers.
//!
//! A card is data: a cost, a [`TargetSpec`] describing what the player must
//! point at, and an ordered list of declarative [`Effect`]s interpreted by
//! [`crate::resolve::effects`]. Unknown effect kinds in JSON deserialize to
//! [`Effect::Unsupported`], which makes the card unplayable instead of
//! failing the whole catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::{EdgeKey, Hex, TileType, UnitId};
use crate::error::ConfigError;

/// Catalog key of a card definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        CardId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(s: &str) -> Self {
        CardId(s.to_string())
    }
}

/// Content tier governing which decks are in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Age {
    I,
    II,
    III,
}

impl Age {
    pub const ALL: [Age; 3] = [Age::I, Age::II, Age::III];

    pub const fn next(self) -> Option<Age> {
        match self {
            Age::I => Some(Age::II),
            Age::II => Some(Age::III),
            Age::III => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Age::I => "I",
            Age::II => "II",
            Age::III => "III",
        }
    }
}

/// Which deck a card is shuffled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardDeck {
    /// Personal starting decks and the free starting pick.
    Starter,
    /// Auctioned in the market row.
    Market,
    /// Drafted at forges during collection.
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardKind {
    Order,
    Spell,
    Champion,
    Victory,
}

/// Resources spent when the card is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CardCost {
    pub mana: u32,
    pub gold: u32,
}

/// Combat profile of the champion a card deploys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionStats {
    pub hp: u32,
    pub attack_dice: u32,
    pub hit_faces: u32,
    #[serde(default)]
    pub bounty: u32,
}

/// What a card must be pointed at when played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TargetSpec {
    #[default]
    None,
    Edge {
        #[serde(default)]
        require_presence: bool,
    },
    MultiEdge {
        count: usize,
        #[serde(default)]
        require_presence: bool,
    },
    Stack {
        max_distance: u32,
        #[serde(default = "default_true")]
        require_bridges: bool,
    },
    Path {
        max_length: usize,
    },
    MultiPath {
        count: usize,
        max_length: usize,
    },
    Hex {
        #[serde(default)]
        max_distance_from_capital: Option<u32>,
        #[serde(default)]
        require_presence: bool,
        #[serde(default)]
        require_empty: bool,
    },
    HexPair {
        max_distance: u32,
    },
    Champion {
        #[serde(default)]
        own: bool,
    },
    Choice {
        options: Vec<String>,
    },
}

fn default_true() -> bool {
    true
}

impl TargetSpec {
    pub const fn kind_name(&self) -> &'static str {
        match self {
            TargetSpec::None => "none",
            TargetSpec::Edge { .. } => "edge",
            TargetSpec::MultiEdge { .. } => "multiEdge",
            TargetSpec::Stack { .. } => "stack",
            TargetSpec::Path { .. } => "path",
            TargetSpec::MultiPath { .. } => "multiPath",
            TargetSpec::Hex { .. } => "hex",
            TargetSpec::HexPair { .. } => "hexPair",
            TargetSpec::Champion { .. } => "champion",
            TargetSpec::Choice { .. } => "choice",
        }
    }
}

/// Target payload supplied with a played card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CardTargets {
    #[default]
    None,
    Edge {
        edge: EdgeKey,
    },
    MultiEdge {
        edges: Vec<EdgeKey>,
    },
    Stack {
        from: Hex,
        to: Hex,
    },
    Path {
        path: Vec<Hex>,
    },
    MultiPath {
        paths: Vec<Vec<Hex>>,
    },
    Hex {
        hex: Hex,
    },
    HexPair {
        from: Hex,
        to: Hex,
    },
    Champion {
        unit_id: UnitId,
    },
    Choice {
        option: String,
    },
}

impl CardTargets {
    pub const fn kind_name(&self) -> &'static str {
        match self {
            CardTargets::None => "none",
            CardTargets::Edge { .. } => "edge",
            CardTargets::MultiEdge { .. } => "multiEdge",
            CardTargets::Stack { .. } => "stack",
            CardTargets::Path { .. } => "path",
            CardTargets::MultiPath { .. } => "multiPath",
            CardTargets::Hex { .. } => "hex",
            CardTargets::HexPair { .. } => "hexPair",
            CardTargets::Champion { .. } => "champion",
            CardTargets::Choice { .. } => "choice",
        }
    }
}

/// One declarative card effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Effect {
    GainGold {
        amount: u32,
    },
    GainMana {
        amount: u32,
    },
    DrawCards {
        count: usize,
    },
    /// Discards random cards from hand.
    DiscardCards {
        count: usize,
    },
    /// Burns random cards from hand out of the game.
    BurnCards {
        count: usize,
    },
    BuildBridge,
    BuildTemporaryBridge,
    DestroyBridge,
    MoveStack,
    MovePath,
    DeployForces {
        count: u32,
    },
    DeployChampion,
    RollGold {
        sides: u32,
        table: Vec<u32>,
    },
    GoldIfOccupying {
        tile: TileType,
        amount: u32,
    },
    GainVictoryPoints {
        amount: u32,
    },
    HealChampion {
        amount: u32,
    },
    DamageChampion {
        amount: u32,
    },
    /// Extra combat dice for the rest of the round.
    CombatBonus {
        dice: u32,
    },
    /// Reveals the top `look` draw-pile cards; the player keeps up to `keep`.
    ScoutReport {
        look: usize,
        keep: usize,
    },
    IfChosen {
        option: String,
        effects: Vec<Effect>,
    },
    /// Reserved: manual hit assignment.
    AssignHits,
    /// Reserved: retreat-linked combat effect.
    RetreatOnLoss,
    #[serde(other)]
    Unsupported,
}

impl Effect {
    /// True for kinds the resolver implements.
    pub fn is_supported(&self) -> bool {
        match self {
            Effect::AssignHits | Effect::RetreatOnLoss | Effect::Unsupported => false,
            Effect::IfChosen { effects, .. } => effects.iter().all(Effect::is_supported),
            _ => true,
        }
    }
}

/// A card definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDef {
    pub id: CardId,
    pub name: String,
    pub deck: CardDeck,
    #[serde(default)]
    pub age: Option<Age>,
    pub kind: CardKind,
    #[serde(default)]
    pub cost: CardCost,
    #[serde(default)]
    pub target_spec: TargetSpec,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub champion: Option<ChampionStats>,
    /// Burned instead of discarded after resolving.
    #[serde(default)]
    pub burn: bool,
    /// Disabled cards are never dealt into decks.
    #[serde(default)]
    pub disabled: bool,
    /// Copies shuffled into the age deck.
    #[serde(default = "default_copies")]
    pub copies: u32,
}

fn default_copies() -> u32 {
    1
}

/// The full set of card definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardCatalog {
    pub cards: BTreeMap<CardId, CardDef>,
}

impl CardCatalog {
    pub fn from_cards(cards: Vec<CardDef>) -> Self {
        CardCatalog {
            cards: cards.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    /// Parses a catalog from a JSON array of card definitions.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cards: Vec<CardDef> = serde_json::from_str(json)?;
        Ok(CardCatalog::from_cards(cards))
    }

    /// Loads a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        CardCatalog::from_json(&data)
    }

    pub fn get(&self, id: &CardId) -> Option<&CardDef> {
        self.cards.get(id)
    }

    /// Enabled cards of `deck` and `age`, each repeated by its copy count,
    /// in id order (callers shuffle).
    pub fn deck_list(&self, deck: CardDeck, age: Age) -> Vec<CardId> {
        self.cards
            .values()
            .filter(|c| c.deck == deck && c.age == Some(age) && !c.disabled)
            .flat_map(|c| std::iter::repeat(c.id.clone()).take(c.copies as usize))
            .collect()
    }

    /// The built-in catalog.
    pub fn standard() -> Self {
        CardCatalog::from_cards(standard_cards())
    }
}

fn card(id: &str, name: &str, deck: CardDeck, age: Option<Age>, kind: CardKind) -> CardDef {
    CardDef {
        id: CardId::new(id),
        name: name.to_string(),
        deck,
        age,
        kind,
        cost: CardCost { mana: 1, gold: 0 },
        target_spec: TargetSpec::None,
        effects: Vec::new(),
        champion: None,
        burn: false,
        disabled: false,
        copies: 1,
    }
}

fn standard_cards() -> Vec<CardDef> {
    use CardDeck::{Market, Power, Starter};
    use CardKind::{Champion, Order, Spell, Victory};

    vec![
        // Starter deck and free starting picks.
        CardDef {
            effects: vec![Effect::GainGold { amount: 2 }],
            ..card("supply_run", "Supply Run", Starter, None, Spell)
        },
        CardDef {
            effects: vec![Effect::DeployForces { count: 1 }],
            ..card("rally", "Rally", Starter, None, Order)
        },
        CardDef {
            target_spec: TargetSpec::Edge { require_presence: true },
            effects: vec![Effect::BuildBridge],
            ..card("pontoon", "Pontoon", Starter, None, Order)
        },
        CardDef {
            target_spec: TargetSpec::Stack { max_distance: 2, require_bridges: true },
            effects: vec![Effect::MoveStack],
            ..card("forced_march", "Forced March", Starter, None, Order)
        },
        CardDef {
            effects: vec![Effect::DrawCards { count: 2 }],
            ..card("study", "Study", Starter, None, Spell)
        },
        CardDef {
            cost: CardCost { mana: 0, gold: 0 },
            effects: vec![Effect::GainMana { amount: 1 }, Effect::DiscardCards { count: 1 }],
            ..card("second_wind", "Second Wind", Starter, None, Spell)
        },
        CardDef {
            effects: vec![Effect::ScoutReport { look: 3, keep: 1 }],
            ..card("scout_report", "Scout Report", Starter, None, Spell)
        },
        CardDef {
            target_spec: TargetSpec::Hex {
                max_distance_from_capital: Some(1),
                require_presence: false,
                require_empty: false,
            },
            effects: vec![Effect::DeployForces { count: 2 }],
            ..card("levy", "Levy", Starter, None, Order)
        },
        // Age I market.
        CardDef {
            effects: vec![Effect::GoldIfOccupying { tile: TileType::Mine, amount: 2 }],
            copies: 2,
            ..card("prospector", "Prospector", Market, Some(Age::I), Spell)
        },
        CardDef {
            effects: vec![Effect::CombatBonus { dice: 1 }, Effect::DrawCards { count: 1 }],
            ..card("war_drums", "War Drums", Market, Some(Age::I), Spell)
        },
        CardDef {
            target_spec: TargetSpec::MultiEdge { count: 2, require_presence: false },
            effects: vec![Effect::BuildTemporaryBridge],
            ..card("ferry_network", "Ferry Network", Market, Some(Age::I), Order)
        },
        CardDef {
            target_spec: TargetSpec::Edge { require_presence: false },
            effects: vec![Effect::DestroyBridge],
            ..card("sapper", "Sapper", Market, Some(Age::I), Order)
        },
        CardDef {
            effects: vec![Effect::RollGold { sides: 6, table: vec![0, 1, 1, 2, 3, 5] }],
            copies: 2,
            ..card("lucky_strike", "Lucky Strike", Market, Some(Age::I), Spell)
        },
        CardDef {
            kind: Champion,
            cost: CardCost { mana: 1, gold: 1 },
            champion: Some(ChampionStats { hp: 2, attack_dice: 2, hit_faces: 3, bounty: 2 }),
            effects: vec![Effect::DeployChampion],
            ..card("road_warden", "Road Warden", Market, Some(Age::I), Champion)
        },
        CardDef {
            target_spec: TargetSpec::Choice {
                options: vec!["gold".to_string(), "mana".to_string()],
            },
            effects: vec![
                Effect::IfChosen {
                    option: "gold".to_string(),
                    effects: vec![Effect::GainGold { amount: 3 }],
                },
                Effect::IfChosen {
                    option: "mana".to_string(),
                    effects: vec![Effect::GainMana { amount: 1 }],
                },
            ],
            ..card("trade_caravan", "Trade Caravan", Market, Some(Age::I), Spell)
        },
        CardDef {
            target_spec: TargetSpec::Hex {
                max_distance_from_capital: Some(2),
                require_presence: true,
                require_empty: false,
            },
            effects: vec![Effect::DeployForces { count: 2 }],
            ..card("muster", "Muster", Market, Some(Age::I), Order)
        },
        // Age II market.
        CardDef {
            target_spec: TargetSpec::Path { max_length: 3 },
            effects: vec![Effect::MovePath],
            ..card("pathfinder", "Pathfinder", Market, Some(Age::II), Order)
        },
        CardDef {
            target_spec: TargetSpec::MultiPath { count: 2, max_length: 2 },
            effects: vec![Effect::MovePath],
            ..card("double_column", "Double Column", Market, Some(Age::II), Order)
        },
        CardDef {
            target_spec: TargetSpec::HexPair { max_distance: 3 },
            effects: vec![Effect::MoveStack],
            cost: CardCost { mana: 1, gold: 2 },
            ..card("waygate", "Waygate", Market, Some(Age::II), Spell)
        },
        CardDef {
            kind: Champion,
            cost: CardCost { mana: 1, gold: 2 },
            champion: Some(ChampionStats { hp: 3, attack_dice: 2, hit_faces: 3, bounty: 3 }),
            effects: vec![Effect::DeployChampion],
            ..card("iron_guard", "Iron Guard", Market, Some(Age::II), Champion)
        },
        CardDef {
            target_spec: TargetSpec::Champion { own: false },
            effects: vec![Effect::DamageChampion { amount: 2 }],
            ..card("bounty_hunter", "Bounty Hunter", Market, Some(Age::II), Order)
        },
        CardDef {
            target_spec: TargetSpec::Champion { own: true },
            effects: vec![Effect::HealChampion { amount: 2 }, Effect::GainGold { amount: 1 }],
            ..card("field_medic", "Field Medic", Market, Some(Age::II), Spell)
        },
        CardDef {
            burn: true,
            effects: vec![Effect::GainVictoryPoints { amount: 1 }, Effect::GainGold { amount: 1 }],
            ..card("tithe", "Tithe", Market, Some(Age::II), Victory)
        },
        // Age III market.
        CardDef {
            kind: Champion,
            cost: CardCost { mana: 1, gold: 3 },
            champion: Some(ChampionStats { hp: 4, attack_dice: 3, hit_faces: 3, bounty: 4 }),
            effects: vec![Effect::DeployChampion],
            ..card("warlord", "Warlord", Market, Some(Age::III), Champion)
        },
        CardDef {
            burn: true,
            effects: vec![Effect::GainVictoryPoints { amount: 2 }],
            ..card("coronation", "Coronation", Market, Some(Age::III), Victory)
        },
        CardDef {
            target_spec: TargetSpec::Hex {
                max_distance_from_capital: None,
                require_presence: true,
                require_empty: false,
            },
            effects: vec![Effect::DeployForces { count: 3 }],
            ..card("grand_army", "Grand Army", Market, Some(Age::III), Order)
        },
        CardDef {
            effects: vec![Effect::CombatBonus { dice: 2 }],
            copies: 2,
            ..card("siege_engine", "Siege Engine", Market, Some(Age::III), Spell)
        },
        // Power decks.
        CardDef {
            cost: CardCost { mana: 0, gold: 0 },
            effects: vec![Effect::GainMana { amount: 1 }],
            copies: 3,
            ..card("ley_line", "Ley Line", Power, Some(Age::I), Spell)
        },
        CardDef {
            effects: vec![Effect::GoldIfOccupying { tile: TileType::Forge, amount: 3 }],
            copies: 2,
            ..card("forge_charter", "Forge Charter", Power, Some(Age::I), Spell)
        },
        CardDef {
            effects: vec![Effect::DrawCards { count: 1 }, Effect::GainMana { amount: 1 }],
            copies: 3,
            ..card("arcane_tithe", "Arcane Tithe", Power, Some(Age::II), Spell)
        },
        CardDef {
            burn: true,
            effects: vec![Effect::GainVictoryPoints { amount: 2 }],
            copies: 3,
            ..card("ascendancy", "Ascendancy", Power, Some(Age::III), Victory)
        },
        // Held back until the combat flow supports them.
        CardDef {
            disabled: true,
            effects: vec![Effect::RetreatOnLoss],
            ..card("rearguard", "Rearguard", Market, Some(Age::II), Order)
        },
        CardDef {
            disabled: true,
            effects: vec![Effect::AssignHits],
            ..card("tactician", "Tactician", Market, Some(Age::III), Order)
        },
    ]
}

/// Starting deck dealt to every player.
pub fn standard_starting_deck() -> Vec<CardId> {
    ["supply_run", "supply_run", "rally", "pontoon", "forced_march", "study"]
        .into_iter()
        .map(CardId::from)
        .collect()
}

/// Pool the free starting card is offered from.
pub fn standard_free_card_pool() -> Vec<CardId> {
    ["second_wind", "scout_report", "levy", "pontoon", "study"]
        .into_iter()
        .map(CardId::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_every_deck() {
        let cat = CardCatalog::standard();
        for age in Age::ALL {
            assert!(!cat.deck_list(CardDeck::Market, age).is_empty(), "market {age:?}");
            assert!(!cat.deck_list(CardDeck::Power, age).is_empty(), "power {age:?}");
        }
        for id in standard_starting_deck().iter().chain(standard_free_card_pool().iter()) {
            assert!(cat.get(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn disabled_cards_stay_out_of_decks() {
        let cat = CardCatalog::standard();
        let all: Vec<CardId> = Age::ALL
            .iter()
            .flat_map(|a| cat.deck_list(CardDeck::Market, *a))
            .collect();
        assert!(!all.contains(&CardId::new("rearguard")));
        assert!(!all.contains(&CardId::new("tactician")));
    }

    #[test]
    fn copies_repeat_in_deck_list() {
        let cat = CardCatalog::standard();
        let deck = cat.deck_list(CardDeck::Market, Age::I);
        let prospectors = deck.iter().filter(|c| c.as_str() == "prospector").count();
        assert_eq!(prospectors, 2);
    }

    #[test]
    fn unknown_effect_kind_parses_as_unsupported() {
        let json = r#"[{
            "id": "mystery", "name": "Mystery", "deck": "market", "age": "I", "kind": "spell",
            "effects": [{"kind": "gainGold", "amount": 1}, {"kind": "summonDragon", "size": 9}]
        }]"#;
        let cat = CardCatalog::from_json(json).unwrap();
        let card = cat.get(&CardId::new("mystery")).unwrap();
        assert_eq!(card.effects[0], Effect::GainGold { amount: 1 });
        assert_eq!(card.effects[1], Effect::Unsupported);
        assert!(!card.effects[1].is_supported());
    }

    #[test]
    fn reserved_effects_are_not_supported() {
        assert!(!Effect::AssignHits.is_supported());
        assert!(!Effect::RetreatOnLoss.is_supported());
        let nested = Effect::IfChosen {
            option: "x".into(),
            effects: vec![Effect::AssignHits],
        };
        assert!(!nested.is_supported());
    }

    #[test]
    fn target_spec_json_shape() {
        let spec: TargetSpec =
            serde_json::from_str(r#"{"kind":"stack","maxDistance":2}"#).unwrap();
        assert_eq!(spec, TargetSpec::Stack { max_distance: 2, require_bridges: true });
        let targets: CardTargets =
            serde_json::from_str(r#"{"kind":"stack","from":"0,0","to":"1,0"}"#).unwrap();
        assert_eq!(targets.kind_name(), spec.kind_name());
    }

    #[test]
    fn age_progression() {
        assert_eq!(Age::I.next(), Some(Age::II));
        assert_eq!(Age::III.next(), None);
        assert_eq!(Age::II.name(), "II");
    }
}
