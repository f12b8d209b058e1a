//! Game-state types: the snapshot, blocks, commands, the event log, deck
//! handling and per-viewer views.

pub mod block;
pub mod command;
pub mod deck;
pub mod event;
pub mod state;
pub mod view;

pub use block::{Block, BlockPayload, RetreatDecision};
pub use command::{ActionDeclaration, CollectionChoice, Command, SetupChoice};
pub use event::GameEvent;
pub use state::{
    ActionEntry, ActionResolution, BattleState, Bid, CardInstance, CardInstanceId, DeckState,
    GameState, MarketCard, MarketState, Modifier, ModifierKind, Phase, PlayerState, Resources,
    SetupState, SetupStep, VictoryPoints,
};
pub use view::{build_view, BlockDetail, BlockView, GameView, HandCard, MarketView, PlayerView};
