//! Property-based tests for engine invariants.
//!
//! Run with: cargo test --release prop_engine

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use bridgehold::board::MAX_PLAYERS_PER_HEX;
use bridgehold::catalog::{Age, CardId};
use bridgehold::config::LobbyPlayer;
use bridgehold::engine::{apply_command, create_new_game};
use bridgehold::game::{BlockPayload, GameState};
use bridgehold::movegen::{candidate_targets, pending_players, random_command};
use bridgehold::resolve::effects::{apply_card, is_card_playable, CardPlay};
use bridgehold::resolve::market::{build_row, row_split};
use bridgehold::resolve::{phase, run_until_blocked, MAX_DRIVER_STEPS};
use bridgehold::rng::RngState;
use bridgehold::selfplay::{play_game, replay, SelfPlayConfig};

const MOVEMENT_CARDS: [&str; 7] = [
    "pontoon",
    "forced_march",
    "ferry_network",
    "sapper",
    "pathfinder",
    "double_column",
    "waygate",
];

fn quick(players: usize) -> SelfPlayConfig {
    SelfPlayConfig {
        num_games: 1,
        players,
        threads: 1,
        seed: 1,
        max_commands: 150,
        quiet: true,
        ..Default::default()
    }
}

fn lobby(players: usize) -> Vec<LobbyPlayer> {
    (1..=players).map(|i| LobbyPlayer::new(format!("p{i}"))).collect()
}

/// Steps the driver by hand, checking the board after every step.
fn drive_checked(state: &mut GameState) -> Result<(), TestCaseError> {
    let mut steps = 0;
    while !state.is_blocked() && steps < MAX_DRIVER_STEPS {
        phase::step(state);
        steps += 1;
        let violations = state.board.invariant_violations();
        prop_assert!(
            violations.is_empty(),
            "round {} {}: {:?}",
            state.round,
            state.phase,
            violations
        );
        for rec in state.board.hexes.values() {
            prop_assert!(rec.occupants.len() <= MAX_PLAYERS_PER_HEX);
        }
    }
    Ok(())
}

/// Every movement or bridge target that passes the playability check must
/// resolve without skipping an effect.
fn check_movement_cards(state: &GameState) -> Result<(), TestCaseError> {
    for player in pending_players(state) {
        for id in MOVEMENT_CARDS {
            let Some(card) = state.config.catalog.get(&CardId::from(id)) else {
                continue;
            };
            for targets in candidate_targets(state, &player, card) {
                if !is_card_playable(state, &player, card, &targets) {
                    continue;
                }
                let mut scratch = state.clone();
                let play = CardPlay {
                    player: &player,
                    card,
                    instance: None,
                    targets: &targets,
                };
                let outcome = apply_card(&mut scratch, &play);
                prop_assert_eq!(outcome.skipped, 0, "{} by {} with {:?}", id, player, targets);
                prop_assert!(scratch.board.invariant_violations().is_empty());
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Shuffling permutes without losing or duplicating items.
    #[test]
    fn prop_shuffle_is_permutation(state in any::<u32>(), len in 0usize..64) {
        let items: Vec<usize> = (0..len).collect();
        let (shuffled, _) = RngState::new(state).shuffle(items.clone());
        let mut sorted = shuffled.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, items);
    }

    /// Dice rolls stay on the die.
    #[test]
    fn prop_roll_in_range(state in any::<u32>(), sides in 1u32..20) {
        let (v, _) = RngState::new(state).roll_die(sides);
        prop_assert!(v >= 1 && v <= sides);
    }

    /// The market row never exceeds the seat count or what the decks hold.
    #[test]
    fn prop_row_split_bounded(
        players in 2usize..=6,
        preview in 0usize..4,
        current_len in 0usize..20,
        next_len in 0usize..20,
    ) {
        let (from_current, from_next) = row_split(players, preview, current_len, next_len);
        prop_assert!(from_current <= current_len);
        prop_assert!(from_next <= next_len);
        prop_assert_eq!(from_current + from_next, players.min(current_len + next_len));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A revealed row never repeats a card id and holds one card per seat
    /// while enough distinct cards remain.
    #[test]
    fn prop_market_row_ids_unique(seed in any::<u64>(), players in 2usize..=6) {
        let mut state = create_new_game(SelfPlayConfig::default().game, seed, &lobby(players)).unwrap();
        state.round = 1;
        let available: BTreeSet<CardId> = state.market_decks[&Age::I].iter().cloned().collect();
        let deck_before = state.market_decks[&Age::I].len();

        let count = build_row(&mut state);
        let ids: BTreeSet<&CardId> = state.market.row.iter().map(|c| &c.card_id).collect();
        prop_assert_eq!(ids.len(), count);
        prop_assert_eq!(count, players.min(available.len()));
        prop_assert_eq!(state.market_decks[&Age::I].len(), deck_before - count);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Random legal play keeps the board consistent and replays exactly.
    #[test]
    fn prop_random_games_hold_invariants(seed in 1u64..1_000_000, players in 2usize..=4) {
        let config = quick(players);
        let mut rng = SmallRng::seed_from_u64(seed);
        let record = play_game(&config, 0, seed, &mut rng).unwrap();
        let state = replay(&config, &record).unwrap();

        prop_assert!(state.board.invariant_violations().is_empty());
        for rec in state.board.hexes.values() {
            prop_assert!(rec.occupants.len() <= MAX_PLAYERS_PER_HEX);
        }
        prop_assert_eq!(state.revision, record.revision);
        prop_assert_eq!(state.log.len(), record.log_len);
        prop_assert_eq!(state.winner, record.winner);
    }

    /// Two replays of one record stay identical after every command, and
    /// the board holds its invariants after every driver step.
    #[test]
    fn prop_replay_matches_at_every_step(seed in 1u64..1_000_000, players in 2usize..=4) {
        let config = quick(players);
        let mut rng = SmallRng::seed_from_u64(seed);
        let record = play_game(&config, 0, seed, &mut rng).unwrap();

        let mut a = create_new_game(config.game.clone(), record.seed, &lobby(players)).unwrap();
        let mut b = create_new_game(config.game.clone(), record.seed, &lobby(players)).unwrap();
        prop_assert_eq!(&a, &b);
        for (i, entry) in record.commands.iter().enumerate() {
            drive_checked(&mut a)?;
            drive_checked(&mut b)?;
            a = apply_command(&a, &entry.command, &entry.player).unwrap();
            b = apply_command(&b, &entry.command, &entry.player).unwrap();
            prop_assert!(a == b, "diverged after command {}", i);
            prop_assert_eq!(
                serde_json::to_string(&a.log).unwrap(),
                serde_json::to_string(&b.log).unwrap()
            );
        }
        drive_checked(&mut a)?;
        drive_checked(&mut b)?;
        prop_assert!(a == b);

        let replayed = replay(&config, &record).unwrap();
        prop_assert!(a == replayed, "hand-stepped driver disagrees with run_until_blocked");
        prop_assert_eq!(a.revision, record.revision);
    }

    /// Movement and bridge cards that pass the playability check on a live
    /// action step resolve with every effect applied.
    #[test]
    fn prop_playable_movement_cards_resolve_fully(seed in 1u64..1_000_000, players in 2usize..=4) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut state = create_new_game(quick(players).game, seed, &lobby(players)).unwrap();
        for _ in 0..150 {
            state = run_until_blocked(&state);
            let declaring = state
                .block
                .as_ref()
                .is_some_and(|b| matches!(b.payload, BlockPayload::ActionDeclarations { .. }));
            if declaring {
                check_movement_cards(&state)?;
            }
            let Some(player) = pending_players(&state).into_iter().next() else {
                break;
            };
            let Some(command) = random_command(&state, &player, &mut rng) else {
                break;
            };
            state = apply_command(&state, &command, &player).unwrap();
        }
    }
}
