use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use bridgehold::config::{GameConfig, LobbyPlayer};
use bridgehold::engine::{apply_command, create_new_game, run_until_blocked};
use bridgehold::game::GameState;
use bridgehold::movegen::{legal_commands, pending_players};
use bridgehold::selfplay::{play_game, SelfPlayConfig};

fn lobby(n: usize) -> Vec<LobbyPlayer> {
    (1..=n).map(|i| LobbyPlayer::new(format!("p{i}"))).collect()
}

/// Plays the first legal command until round 2 starts.
fn into_round_two(players: usize) -> GameState {
    let mut state = create_new_game(GameConfig::default(), 17u64, &lobby(players)).unwrap();
    while state.round < 2 && state.winner.is_none() {
        state = run_until_blocked(&state);
        let Some(player) = pending_players(&state).into_iter().next() else {
            break;
        };
        let Some(cmd) = legal_commands(&state, &player).into_iter().next() else {
            break;
        };
        state = apply_command(&state, &cmd, &player).unwrap();
    }
    state
}

fn bench_create_new_game(c: &mut Criterion) {
    let config = std::sync::Arc::new(GameConfig::default());
    let players = lobby(4);
    c.bench_function("create_new_game_4p", |b| {
        b.iter(|| create_new_game(config.clone(), black_box(42u64), black_box(&players)).unwrap())
    });
}

fn bench_run_until_blocked(c: &mut Criterion) {
    let state = into_round_two(3);
    c.bench_function("run_until_blocked_round_two", |b| {
        b.iter(|| run_until_blocked(black_box(&state)))
    });
}

fn bench_legal_commands(c: &mut Criterion) {
    let state = run_until_blocked(&into_round_two(3));
    let player = pending_players(&state).into_iter().next();
    c.bench_function("legal_commands_round_two", |b| {
        b.iter(|| match &player {
            Some(p) => legal_commands(black_box(&state), p).len(),
            None => 0,
        })
    });
}

fn bench_random_game(c: &mut Criterion) {
    let config = SelfPlayConfig {
        players: 3,
        max_commands: 300,
        quiet: true,
        ..Default::default()
    };
    let mut group = c.benchmark_group("selfplay");
    group.sample_size(10);
    group.bench_function("random_game_300_commands", |b| {
        b.iter(|| {
            let mut rng = SmallRng::seed_from_u64(5);
            play_game(&config, 0, black_box(5), &mut rng).unwrap()
        })
    });
    group.finish();
}

fn bench_state_clone(c: &mut Criterion) {
    let state = into_round_two(4);
    c.bench_function("game_state_clone", |b| b.iter(|| black_box(&state).clone()));
}

criterion_group!(
    benches,
    bench_create_new_game,
    bench_run_until_blocked,
    bench_legal_commands,
    bench_random_game,
    bench_state_clone,
);
criterion_main!(benches);
