//! Integration tests for the bridgehold engine.
//!
//! Drives whole games through the public entry points, and runs the host
//! binary over its JSON-lines protocol.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::process::{Command as Process, Stdio};

use bridgehold::board::PlayerId;
use bridgehold::config::{Faction, GameConfig, LobbyPlayer};
use bridgehold::engine::{apply_command, build_view, create_new_game, run_until_blocked};
use bridgehold::error::EngineError;
use bridgehold::game::{ActionDeclaration, BlockPayload, Command, GameState, Phase};
use bridgehold::movegen::{legal_commands, pending_players};
use bridgehold::resolve::action::resolution_order;
use bridgehold::resolve::phase;

fn p(id: &str) -> PlayerId {
    PlayerId::new(id)
}

fn lobby(ids: &[&str]) -> Vec<LobbyPlayer> {
    ids.iter().map(|id| LobbyPlayer::new(*id)).collect()
}

/// Plays the first legal command for whoever is pending until `stop` holds.
fn play_defaults_until(state: GameState, stop: impl Fn(&GameState) -> bool) -> GameState {
    let mut state = run_until_blocked(&state);
    for _ in 0..500 {
        if stop(&state) {
            return state;
        }
        let player = pending_players(&state)
            .into_iter()
            .next()
            .expect("someone should be pending");
        let command = legal_commands(&state, &player)
            .into_iter()
            .next()
            .expect("a legal command should exist");
        let next = apply_command(&state, &command, &player).unwrap();
        assert_eq!(next.revision, state.revision + 1, "{} was rejected", command.name());
        state = run_until_blocked(&next);
    }
    panic!("condition never reached");
}

fn first_action_step(seed: u64) -> GameState {
    let state = create_new_game(GameConfig::default(), seed, &lobby(&["p1", "p2"])).unwrap();
    play_defaults_until(state, |s| {
        matches!(
            s.block.as_ref().map(|b| &b.payload),
            Some(BlockPayload::ActionDeclarations { .. })
        )
    })
}

#[test]
fn reinforce_then_done_reaches_sieges() {
    let state = first_action_step(7);
    assert_eq!(state.phase, Phase::RoundAction);
    assert_eq!(state.round, 1);

    let capital = state.player(&p("p1")).unwrap().capital.unwrap();
    let forces = state.board.force_count(&p("p1"), capital);
    let mana = state.player(&p("p1")).unwrap().resources.mana;
    let gold = state.player(&p("p1")).unwrap().resources.gold;
    assert!(mana >= 1);

    let reinforce = Command::SubmitAction {
        declaration: ActionDeclaration::CapitalReinforce,
    };
    let done = Command::SubmitAction {
        declaration: ActionDeclaration::Done,
    };
    let mut state = apply_command(&state, &reinforce, &p("p1")).unwrap();
    state = apply_command(&state, &done, &p("p2")).unwrap();

    for _ in 0..100 {
        if state.phase == Phase::RoundSieges {
            break;
        }
        phase::step(&mut state);
    }
    assert_eq!(state.phase, Phase::RoundSieges);

    let me = state.player(&p("p1")).unwrap();
    assert_eq!(state.board.force_count(&p("p1"), capital), forces + 1);
    assert_eq!(me.resources.mana, mana - 1);
    assert_eq!(me.resources.gold, gold - 1);
    assert!(state.player(&p("p2")).unwrap().done_this_round);
    assert!(state.log.iter().any(|e| e.kind == "action.reinforced"));
    assert!(state.log.iter().any(|e| e.kind == "phase.round.sieges"));
}

#[test]
fn equal_inputs_give_equal_games() {
    let a = first_action_step(99);
    let b = first_action_step(99);
    assert_eq!(a, b);
    let c = first_action_step(100);
    assert_ne!(a.board, c.board);
}

#[test]
fn text_and_numeric_seeds_are_both_accepted() {
    let a = create_new_game(GameConfig::default(), "harbor", &lobby(&["a", "b"])).unwrap();
    let b = create_new_game(GameConfig::default(), "harbor", &lobby(&["a", "b"])).unwrap();
    assert_eq!(a, b);
}

#[test]
fn lobby_errors() {
    let config = GameConfig::default();
    assert!(matches!(
        create_new_game(config.clone(), 1u64, &lobby(&["solo"])),
        Err(EngineError::InvalidLobby(_))
    ));
    assert!(matches!(
        create_new_game(config.clone(), 1u64, &lobby(&["a", "a"])),
        Err(EngineError::InvalidLobby(_))
    ));
    assert!(matches!(
        create_new_game(config, 1u64, &lobby(&["a", "b", "c", "d", "e", "f", "g"])),
        Err(EngineError::InvalidLobby(_))
    ));
}

#[test]
fn only_the_host_advances_setup() {
    let state = create_new_game(GameConfig::default(), 5u64, &lobby(&["a", "b", "c"])).unwrap();
    assert!(matches!(
        apply_command(&state, &Command::AdvanceSetup, &p("b")),
        Err(EngineError::NotHost { .. })
    ));
    assert!(matches!(
        apply_command(&state, &Command::AdvanceSetup, &p("zed")),
        Err(EngineError::UnknownPlayer(_))
    ));
    let next = apply_command(&state, &Command::AdvanceSetup, &p("a")).unwrap();
    assert_eq!(next.revision, state.revision + 1);
    // Capital draft is open; advancing again must wait.
    assert!(matches!(
        apply_command(&next, &Command::AdvanceSetup, &p("a")),
        Err(EngineError::StillWaiting { .. })
    ));
}

#[test]
fn rejected_commands_leave_state_untouched() {
    let state = first_action_step(3);
    let bogus = Command::SubmitMarketBid {
        bid: bridgehold::game::Bid::Buy { amount: 1 },
    };
    let next = apply_command(&state, &bogus, &p("p1")).unwrap();
    assert_eq!(next, state);
}

#[test]
fn action_order_uses_faction_then_lead() {
    let seated = vec![
        LobbyPlayer::new("p1").with_faction(Faction::Bastion),
        LobbyPlayer::new("p2").with_faction(Faction::Veil),
        LobbyPlayer::new("p3"),
    ];
    let config = GameConfig {
        faction_priority: vec![Faction::Veil, Faction::Bastion],
        ..GameConfig::default()
    };
    let mut state = create_new_game(config, 1u64, &seated).unwrap();
    state.lead_seat = 2;
    let declarations: BTreeMap<PlayerId, ActionDeclaration> = ["p1", "p2", "p3"]
        .into_iter()
        .map(|id| (p(id), ActionDeclaration::Done))
        .collect();
    let order: Vec<PlayerId> = resolution_order(&state, &declarations)
        .into_iter()
        .map(|e| e.player)
        .collect();
    assert_eq!(order, vec![p("p2"), p("p1"), p("p3")]);
}

#[test]
fn occupancy_holds_through_several_rounds() {
    let state = create_new_game(GameConfig::default(), 21u64, &lobby(&["p1", "p2", "p3"])).unwrap();
    let state = play_defaults_until(state, |s| s.round >= 3 || s.winner.is_some());
    assert!(state.board.invariant_violations().is_empty());
    for rec in state.board.hexes.values() {
        assert!(rec.occupants.len() <= 2);
    }
}

#[test]
fn view_hides_other_hands() {
    let state = first_action_step(7);
    let view = build_view(&state, Some(&p("p1")));
    assert_eq!(view.viewer, Some(p("p1")));
    let json = serde_json::to_value(&view).unwrap();
    let spectator = serde_json::to_value(build_view(&state, None)).unwrap();
    assert_ne!(json, spectator);
}

/// Sends lines to the host binary and collects its stdout lines.
fn run_host(args: &[&str], lines: &[&str]) -> Vec<serde_json::Value> {
    let exe = env!("CARGO_BIN_EXE_bridgehold");
    let mut child = Process::new(exe)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start bridgehold");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for line in lines {
        writeln!(stdin, "{}", line).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let out: Vec<serde_json::Value> = reader
        .lines()
        .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
        .collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    out
}

#[test]
fn host_reports_opening_state() {
    let out = run_host(&["--players", "a,b", "--seed", "7"], &[]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["kind"], "update");
    assert_eq!(out[0]["phase"], "setup");
    assert_eq!(out[0]["block"], "setup.deckPreview");
    assert_eq!(out[0]["events"][0]["type"], "game.created");
}

#[test]
fn host_applies_commands_and_answers_views() {
    let out = run_host(
        &["--players", "a,b", "--seed", "7"],
        &[
            r#"{"op":"command","player":"a","command":{"type":"AdvanceSetup"}}"#,
            r#"{"op":"command","player":"b","command":{"type":"AdvanceSetup"}}"#,
            r#"{"op":"view","viewer":"b"}"#,
            "quit",
            r#"{"op":"view"}"#,
        ],
    );
    assert_eq!(out.len(), 4);
    assert_eq!(out[1]["block"], "setup.capitalDraft");
    assert_eq!(out[1]["events"][0]["type"], "setup.stepOpened");
    assert_eq!(out[2]["kind"], "error");
    assert_eq!(out[3]["kind"], "view");
}
