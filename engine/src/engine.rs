//! Engine entry points.
//!
//! Every function here takes a snapshot and returns a new one; the input is
//! never modified. A host creates a game with [`create_new_game`], folds
//! player commands in with [`apply_command`], then calls
//! [`run_until_blocked`] to carry the game forward to the next point where
//! it needs input. [`build_view`] projects a snapshot for one viewer.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;

use crate::board::generate_board;
use crate::board::PlayerId;
use crate::catalog::{Age, CardDeck};
use crate::config::{GameConfig, LobbyPlayer, MAX_PLAYERS, MIN_PLAYERS};
use crate::error::EngineError;
use crate::game::{
    Command, DeckState, GameState, MarketState, Phase, PlayerState, Resources, SetupState, SetupStep,
    VictoryPoints,
};
use crate::resolve::{action, effects, market, retreat, round, setup};
use crate::rng::{RngState, Seed};

pub use crate::game::build_view;
pub use crate::resolve::run_until_blocked;

fn check_lobby(lobby: &[LobbyPlayer]) -> Result<(), EngineError> {
    if lobby.len() < MIN_PLAYERS || lobby.len() > MAX_PLAYERS {
        return Err(EngineError::InvalidLobby(format!(
            "{} players; between {} and {} are supported",
            lobby.len(),
            MIN_PLAYERS,
            MAX_PLAYERS
        )));
    }
    let mut seen = BTreeSet::new();
    for entry in lobby {
        if entry.id.as_str().is_empty() {
            return Err(EngineError::InvalidLobby("empty player id".into()));
        }
        if !seen.insert(&entry.id) {
            return Err(EngineError::InvalidLobby(format!("duplicate player id '{}'", entry.id)));
        }
    }
    Ok(())
}

/// Builds the initial setup-phase state.
///
/// The board, both deck families and every starting deck are shuffled from
/// `seed`, so equal inputs always give equal games.
pub fn create_new_game(
    config: impl Into<Arc<GameConfig>>,
    seed: impl Into<Seed>,
    lobby: &[LobbyPlayer],
) -> Result<GameState, EngineError> {
    let config: Arc<GameConfig> = config.into();
    config.validate()?;
    check_lobby(lobby)?;
    let seed = seed.into();

    let rng = RngState::from_seed(&seed);
    let (generated, rng) = generate_board(&config, lobby.len(), rng).ok_or_else(|| {
        EngineError::InvalidLobby(format!("no board radius configured for {} players", lobby.len()))
    })?;

    let players = lobby
        .iter()
        .enumerate()
        .map(|(seat, entry)| PlayerState {
            id: entry.id.clone(),
            name: entry.name.clone().unwrap_or_else(|| entry.id.to_string()),
            seat,
            faction: entry.faction,
            capital: None,
            resources: Resources {
                gold: config.starting_gold,
                mana: 0,
            },
            vp: VictoryPoints::default(),
            done_this_round: false,
            bought_this_round: false,
            deck: DeckState::default(),
            burned: Vec::new(),
            flags: BTreeSet::new(),
            connected: true,
        })
        .collect();

    let mut state = GameState {
        config: config.clone(),
        seed: seed.clone(),
        rng,
        revision: 0,
        players,
        round: 0,
        lead_seat: 0,
        phase: Phase::Setup,
        setup: SetupState {
            step: SetupStep::DeckPreview,
            capital_slots: generated.capital_slots,
        },
        board: generated.board,
        market: MarketState::new(Age::I),
        market_decks: Default::default(),
        power_decks: Default::default(),
        log: Vec::new(),
        modifiers: Vec::new(),
        next_modifier_seq: 1,
        block: None,
        action_resolution: None,
        battle: None,
        siege_queue: Vec::new(),
        card_instances: Default::default(),
        next_instance_seq: 1,
        winner: None,
    };

    for age in Age::ALL {
        let market = state.shuffle(config.catalog.deck_list(CardDeck::Market, age));
        state.market_decks.insert(age, market);
        let power = state.shuffle(config.catalog.deck_list(CardDeck::Power, age));
        state.power_decks.insert(age, power);
    }

    let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();
    for id in &ids {
        let cards: Vec<_> = config
            .starting_deck
            .iter()
            .map(|card_id| state.new_card_instance(card_id, id))
            .collect();
        let cards = state.shuffle(cards);
        if let Some(p) = state.player_mut(id) {
            p.deck.draw_pile = cards;
        }
    }

    state.block = Some(setup::deck_preview_block(&state));
    log::info!(
        "new game: {} players, seed {}, board radius {}",
        ids.len(),
        seed,
        state.board.radius
    );
    state.push_event(
        "game.created",
        json!({ "seed": seed, "players": ids, "radius": state.board.radius }),
    );
    state.push_event("phase.setup", json!({ "round": 0 }));
    Ok(state)
}

/// Folds one command from `player` into the state.
///
/// Commands that do not fit the current block or break a rule are dropped:
/// the input snapshot comes back unchanged. Structural misuse (an unknown
/// player, or advancing setup out of turn) is an error.
pub fn apply_command(state: &GameState, command: &Command, player: &PlayerId) -> Result<GameState, EngineError> {
    if state.player(player).is_none() {
        return Err(EngineError::UnknownPlayer(player.to_string()));
    }
    if let Command::AdvanceSetup = command {
        return setup::advance(state, player);
    }
    if state.winner.is_some() || state.phase == Phase::GameOver {
        return Ok(state.clone());
    }

    let accepted = match command {
        Command::SubmitSetupChoice { choice } => setup::submit_choice(state, player, choice),
        Command::AdvanceSetup => None,
        Command::SubmitQuietStudy { card_ids } => round::submit_quiet_study(state, player, card_ids),
        Command::SubmitScoutReportChoice { keep } => effects::submit_scout_choice(state, player, keep),
        Command::SubmitAction { declaration } => action::submit_declaration(state, player, declaration),
        Command::SubmitMarketBid { bid } => market::submit_bid(state, player, *bid),
        Command::SubmitCollectionChoices { choice } => round::submit_collection_choice(state, player, choice),
        Command::SubmitCombatRetreat { to } => retreat::submit_retreat(state, player, *to),
    };

    match accepted {
        Some(mut next) => {
            next.revision += 1;
            log::trace!("{} accepted from {}", command.name(), player);
            Ok(next)
        }
        None => {
            log::trace!("{} from {} ignored in {}", command.name(), player, state.phase);
            Ok(state.clone())
        }
    }
}

/// Applies a command and then drives the game to its next block.
pub fn apply_and_run(state: &GameState, command: &Command, player: &PlayerId) -> Result<GameState, EngineError> {
    let next = apply_command(state, command, player)?;
    Ok(run_until_blocked(&next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ActionDeclaration, Bid, SetupChoice};

    fn lobby(n: usize) -> Vec<LobbyPlayer> {
        (1..=n).map(|i| LobbyPlayer::new(format!("p{i}"))).collect()
    }

    fn p(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    #[test]
    fn new_game_is_in_deck_preview() {
        let state = create_new_game(GameConfig::default(), 7u64, &lobby(3)).unwrap();
        assert_eq!(state.phase, Phase::Setup);
        assert_eq!(state.block.as_ref().unwrap().kind(), "setup.deckPreview");
        assert_eq!(state.setup.capital_slots.len(), 3);
        for player in &state.players {
            assert_eq!(player.deck.draw_pile.len(), state.config.starting_deck.len());
            assert_eq!(player.resources.gold, state.config.starting_gold);
        }
        assert_eq!(state.log[0].kind, "game.created");
    }

    #[test]
    fn same_seed_same_game() {
        let a = create_new_game(GameConfig::default(), "river", &lobby(4)).unwrap();
        let b = create_new_game(GameConfig::default(), "river", &lobby(4)).unwrap();
        let c = create_new_game(GameConfig::default(), "delta", &lobby(4)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.market_decks, c.market_decks);
    }

    #[test]
    fn lobby_validation() {
        let err = create_new_game(GameConfig::default(), 1u64, &lobby(1)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidLobby(_)));
        let err = create_new_game(GameConfig::default(), 1u64, &lobby(7)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidLobby(_)));
        let dupes = vec![LobbyPlayer::new("x"), LobbyPlayer::new("x")];
        assert!(create_new_game(GameConfig::default(), 1u64, &dupes).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GameConfig {
            dice_sides: 1,
            ..GameConfig::default()
        };
        let err = create_new_game(config, 1u64, &lobby(2)).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn unknown_player_is_an_error() {
        let state = create_new_game(GameConfig::default(), 7u64, &lobby(2)).unwrap();
        let err = apply_command(&state, &Command::AdvanceSetup, &p("ghost")).unwrap_err();
        assert_eq!(err, EngineError::UnknownPlayer("ghost".into()));
    }

    #[test]
    fn wrong_block_commands_are_ignored() {
        let state = create_new_game(GameConfig::default(), 7u64, &lobby(2)).unwrap();
        let bid = Command::SubmitMarketBid {
            bid: Bid::Pass { amount: 0 },
        };
        let next = apply_command(&state, &bid, &p("p1")).unwrap();
        assert_eq!(next, state);
        let act = Command::SubmitAction {
            declaration: ActionDeclaration::Done,
        };
        assert_eq!(apply_command(&state, &act, &p("p2")).unwrap(), state);
    }

    #[test]
    fn accepted_command_bumps_revision() {
        let state = create_new_game(GameConfig::default(), 7u64, &lobby(2)).unwrap();
        let drafting = apply_command(&state, &Command::AdvanceSetup, &p("p1")).unwrap();
        let slot = drafting.setup.capital_slots[0];
        // The last seat drafts first.
        let pick = Command::SubmitSetupChoice {
            choice: SetupChoice::Capital { hex: slot },
        };
        assert_eq!(apply_command(&drafting, &pick, &p("p1")).unwrap(), drafting);
        let picked = apply_command(&drafting, &pick, &p("p2")).unwrap();
        assert_eq!(picked.revision, drafting.revision + 1);
    }
}
