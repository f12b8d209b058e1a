//! Random self-play CLI.
//!
//! Plays games with random legal commands and writes one JSON record per
//! game, including the command stream needed to replay it.
//!
//! Usage:
//!   cargo run --release --bin selfplay -- [OPTIONS]
//!
//! Options:
//!   --games N         Number of games to play (default: 10)
//!   --players N       Seats per game (default: 3)
//!   --max-commands N  Commands before a game is abandoned (default: 5000)
//!   --threads N       Number of parallel threads (default: 4)
//!   --seed N          Random seed, 0 for entropy (default: 0)
//!   --config FILE     Game configuration JSON (default: built-in)
//!   --verify          Replay every game and check it matches
//!   --output FILE     Output file path (default: stdout)
//!   --quiet           Suppress summary output

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use bridgehold::config::GameConfig;
use bridgehold::selfplay::{self, SelfPlayConfig};

fn parse_value<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|v| v.parse::<T>()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("invalid {} value", flag);
            print_usage();
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = SelfPlayConfig::default();
    let mut output_path: Option<String> = None;
    let mut quiet = false;
    let mut verify = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--games" => {
                i += 1;
                config.num_games = parse_value(&args, i, "--games");
            }
            "--players" => {
                i += 1;
                config.players = parse_value(&args, i, "--players");
            }
            "--max-commands" => {
                i += 1;
                config.max_commands = parse_value(&args, i, "--max-commands");
            }
            "--threads" => {
                i += 1;
                config.threads = parse_value(&args, i, "--threads");
            }
            "--seed" => {
                i += 1;
                config.seed = parse_value(&args, i, "--seed");
            }
            "--config" => {
                i += 1;
                let path: String = parse_value(&args, i, "--config");
                match GameConfig::load(Path::new(&path)) {
                    Ok(game) => config.game = Arc::new(game),
                    Err(e) => {
                        eprintln!("{}", e);
                        process::exit(1);
                    }
                }
            }
            "--output" => {
                i += 1;
                output_path = Some(parse_value(&args, i, "--output"));
            }
            "--verify" => {
                verify = true;
            }
            "--quiet" => {
                quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    config.quiet = quiet;

    if !quiet {
        eprintln!(
            "Self-play: {} games, {} players, max {} commands, {} threads",
            config.num_games, config.players, config.max_commands, config.threads
        );
    }

    let start = Instant::now();
    let games = selfplay::run_self_play(&config);
    let elapsed = start.elapsed();

    if !quiet {
        eprintln!(
            "Completed {} games in {:.1}s",
            games.len(),
            elapsed.as_secs_f64()
        );
        selfplay::print_summary(&games);
    }

    if verify {
        let mismatched: Vec<usize> = games
            .iter()
            .filter(|g| !selfplay::verify_replay(&config, g))
            .map(|g| g.game_id)
            .collect();
        if mismatched.is_empty() {
            if !quiet {
                eprintln!("Replay check passed for {} games", games.len());
            }
        } else {
            eprintln!("Replay mismatch in games {:?}", mismatched);
            process::exit(2);
        }
    }

    let written = match &output_path {
        Some(path) => File::create(path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            selfplay::write_jsonl(&games, &mut writer)
        }),
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            selfplay::write_jsonl(&games, &mut writer)
        }
    };
    match (written, output_path) {
        (Err(e), _) => {
            eprintln!("failed to write output: {}", e);
            process::exit(1);
        }
        (Ok(()), Some(path)) if !quiet => eprintln!("Wrote {} games to {}", games.len(), path),
        _ => {}
    }
}

fn print_usage() {
    eprintln!("Usage: selfplay [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --games N         Number of games to play (default: 10)");
    eprintln!("  --players N       Seats per game (default: 3)");
    eprintln!("  --max-commands N  Commands before a game is abandoned (default: 5000)");
    eprintln!("  --threads N       Number of parallel threads (default: 4)");
    eprintln!("  --seed N          Random seed, 0 for entropy (default: 0)");
    eprintln!("  --config FILE     Game configuration JSON (default: built-in)");
    eprintln!("  --verify          Replay every game and check it matches");
    eprintln!("  --output FILE     Output file path (default: stdout)");
    eprintln!("  --quiet           Suppress summary output");
    eprintln!("  --help            Show this help");
}
