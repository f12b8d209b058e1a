//! Random self-play.
//!
//! Plays whole games by letting every pending player submit a uniformly
//! random legal command, driving the engine between commands. Records the
//! command stream so a game can be replayed and checked for determinism.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::PlayerId;
use crate::config::{GameConfig, LobbyPlayer};
use crate::engine::{apply_command, create_new_game, run_until_blocked};
use crate::error::EngineError;
use crate::game::{Command, GameState};
use crate::movegen::{pending_players, random_command};

/// Configuration for self-play runs.
#[derive(Clone)]
pub struct SelfPlayConfig {
    /// Number of games to play.
    pub num_games: usize,
    /// Seats per game.
    pub players: usize,
    /// Number of parallel threads for concurrent games.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Commands after which a game is abandoned.
    pub max_commands: usize,
    /// Suppress per-game progress output.
    pub quiet: bool,
    pub game: Arc<GameConfig>,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            num_games: 10,
            players: 3,
            threads: 4,
            seed: 0,
            max_commands: 5_000,
            quiet: false,
            game: Arc::new(GameConfig::default()),
        }
    }
}

/// One submitted command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub player: PlayerId,
    pub command: Command,
}

/// A complete self-play game record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: usize,
    pub seed: u64,
    pub players: usize,
    pub winner: Option<PlayerId>,
    /// Last round reached.
    pub rounds: u32,
    /// True if the game reached game over within the command limit.
    pub finished: bool,
    pub revision: u64,
    pub log_len: usize,
    pub commands: Vec<CommandRecord>,
}

fn lobby(players: usize) -> Vec<LobbyPlayer> {
    (1..=players).map(|i| LobbyPlayer::new(format!("p{i}"))).collect()
}

/// Plays one game from `seed` with random legal commands.
pub fn play_game(config: &SelfPlayConfig, game_id: usize, seed: u64, rng: &mut impl Rng) -> Result<GameRecord, EngineError> {
    let mut state = create_new_game(config.game.clone(), seed, &lobby(config.players))?;
    let mut commands = Vec::new();

    while commands.len() < config.max_commands {
        state = run_until_blocked(&state);
        let Some(player) = pending_players(&state).into_iter().next() else {
            break;
        };
        let Some(command) = random_command(&state, &player, rng) else {
            log::warn!(
                "game {}: no legal command for {} in {}",
                game_id,
                player,
                state.phase
            );
            break;
        };
        state = apply_command(&state, &command, &player)?;
        commands.push(CommandRecord { player, command });
    }
    let state = run_until_blocked(&state);

    Ok(GameRecord {
        game_id,
        seed,
        players: config.players,
        winner: state.winner.clone(),
        rounds: state.round,
        finished: state.winner.is_some(),
        revision: state.revision,
        log_len: state.log.len(),
        commands,
    })
}

/// Re-applies a recorded game and returns the final state.
pub fn replay(config: &SelfPlayConfig, record: &GameRecord) -> Result<GameState, EngineError> {
    let mut state = create_new_game(config.game.clone(), record.seed, &lobby(record.players))?;
    for entry in &record.commands {
        state = run_until_blocked(&state);
        state = apply_command(&state, &entry.command, &entry.player)?;
    }
    Ok(run_until_blocked(&state))
}

/// True if replaying `record` lands on the same outcome.
pub fn verify_replay(config: &SelfPlayConfig, record: &GameRecord) -> bool {
    match replay(config, record) {
        Ok(state) => {
            state.revision == record.revision
                && state.log.len() == record.log_len
                && state.winner == record.winner
        }
        Err(e) => {
            log::error!("replay of game {} failed: {}", record.game_id, e);
            false
        }
    }
}

fn game_seed(config: &SelfPlayConfig, i: usize) -> u64 {
    if config.seed != 0 {
        config.seed.wrapping_add(i as u64)
    } else {
        rand::random()
    }
}

fn report(config: &SelfPlayConfig, n: usize, game: &GameRecord, started: Instant) {
    if config.quiet {
        return;
    }
    let outcome = match &game.winner {
        Some(w) => format!("{} wins", w),
        None => "unfinished".to_string(),
    };
    eprintln!(
        "Game {}/{}: {} after {} rounds, {} commands ({:.1}s)",
        n,
        config.num_games,
        outcome,
        game.rounds,
        game.commands.len(),
        started.elapsed().as_secs_f64(),
    );
}

pub fn run_self_play(config: &SelfPlayConfig) -> Vec<GameRecord> {
    let mut games = Vec::with_capacity(config.num_games);
    run_self_play_with_callback(config, |game| {
        games.push(game);
    });
    games.sort_by_key(|g| g.game_id);
    games
}

pub fn run_self_play_with_callback<F>(config: &SelfPlayConfig, on_game: F)
where
    F: FnMut(GameRecord) + Send,
{
    if config.threads > 1 {
        run_self_play_parallel(config, on_game);
    } else {
        run_self_play_sequential(config, on_game);
    }
}

fn run_self_play_sequential<F>(config: &SelfPlayConfig, mut on_game: F)
where
    F: FnMut(GameRecord),
{
    for i in 0..config.num_games {
        let seed = game_seed(config, i);
        let mut rng = SmallRng::seed_from_u64(seed);
        let started = Instant::now();
        match play_game(config, i, seed, &mut rng) {
            Ok(game) => {
                report(config, i + 1, &game, started);
                on_game(game);
            }
            Err(e) => log::error!("game {} failed: {}", i, e),
        }
    }
}

fn run_self_play_parallel<F>(config: &SelfPlayConfig, mut on_game: F)
where
    F: FnMut(GameRecord) + Send,
{
    use rayon::prelude::*;
    use std::sync::mpsc;

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            log::warn!("thread pool unavailable ({}), running sequentially", e);
            return run_self_play_sequential(config, on_game);
        }
    };

    let completed = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel::<GameRecord>();
    let worker_config = config.clone();
    let handle = std::thread::spawn(move || {
        pool.install(|| {
            (0..worker_config.num_games)
                .into_par_iter()
                .for_each_with(tx, |tx, i| {
                    let seed = game_seed(&worker_config, i);
                    let mut rng = SmallRng::seed_from_u64(seed);
                    let started = Instant::now();
                    match play_game(&worker_config, i, seed, &mut rng) {
                        Ok(game) => {
                            let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                            report(&worker_config, n, &game, started);
                            let _ = tx.send(game);
                        }
                        Err(e) => log::error!("game {} failed: {}", i, e),
                    }
                });
        });
    });

    for game in rx {
        on_game(game);
    }

    if handle.join().is_err() {
        log::error!("self-play worker thread panicked");
    }
}

/// Writes one JSON record per line.
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

pub fn print_summary(games: &[GameRecord]) {
    let total = games.len();
    let finished = games.iter().filter(|g| g.finished).count();
    let total_rounds: u64 = games.iter().map(|g| g.rounds as u64).sum();
    let total_commands: usize = games.iter().map(|g| g.commands.len()).sum();
    let mut wins: std::collections::BTreeMap<&PlayerId, usize> = Default::default();
    for game in games {
        if let Some(w) = &game.winner {
            *wins.entry(w).or_default() += 1;
        }
    }

    eprintln!("=== Self-Play Summary ===");
    eprintln!("Games: {}", total);
    eprintln!("Finished: {}", finished);
    eprintln!(
        "Avg rounds/game: {:.1}",
        total_rounds as f64 / total.max(1) as f64
    );
    eprintln!(
        "Avg commands/game: {:.1}",
        total_commands as f64 / total.max(1) as f64
    );
    eprintln!("Win distribution:");
    for (seat, count) in wins {
        let pct = 100.0 * count as f64 / total.max(1) as f64;
        eprintln!("  {:>8}: {} ({:.1}%)", seat, count, pct);
    }
}
