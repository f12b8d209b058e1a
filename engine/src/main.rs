//! Bridgehold -- hosts one game over JSON lines.
//!
//! Reads one request per stdin line and writes one response per stdout
//! line. See [`bridgehold::protocol`] for the message shapes.
//!
//! Usage:
//!   bridgehold --players a,b,c [--seed N|TEXT] [--config FILE]

use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

use bridgehold::config::{GameConfig, LobbyPlayer};
use bridgehold::engine::create_new_game;
use bridgehold::protocol::Session;
use bridgehold::rng::Seed;

fn print_usage() {
    eprintln!("Usage: bridgehold --players ID,ID[,ID...] [--seed N|TEXT] [--config FILE]");
}

fn parse_seed(text: &str) -> Seed {
    match text.parse::<u64>() {
        Ok(n) => Seed::from(n),
        Err(_) => Seed::from(text),
    }
}

/// Runs the host loop, reading requests from stdin and writing responses
/// to stdout.
fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut players: Vec<LobbyPlayer> = Vec::new();
    let mut seed = Seed::from(0u64);
    let mut config = GameConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--players" => {
                i += 1;
                let Some(list) = args.get(i) else {
                    print_usage();
                    process::exit(1);
                };
                players = list.split(',').map(|id| LobbyPlayer::new(id.trim())).collect();
            }
            "--seed" => {
                i += 1;
                let Some(text) = args.get(i) else {
                    print_usage();
                    process::exit(1);
                };
                seed = parse_seed(text);
            }
            "--config" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    print_usage();
                    process::exit(1);
                };
                config = match GameConfig::load(Path::new(path)) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("{}", e);
                        process::exit(1);
                    }
                };
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

    let state = match create_new_game(config, seed, &players) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut session = Session::new(state);

    let opening = serde_json::to_string(&session.update(true)).unwrap_or_default();
    if writeln!(out, "{}", opening).and_then(|_| out.flush()).is_err() {
        return;
    }

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        let response = session.handle_line(line);
        if writeln!(out, "{}", response).and_then(|_| out.flush()).is_err() {
            break;
        }
    }
}
