//! A single hosted game fed by JSON lines.

use serde::{Deserialize, Serialize};

use crate::board::PlayerId;
use crate::engine::{apply_command, build_view, run_until_blocked};
use crate::game::{Command, GameEvent, GameState, GameView};

/// One input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// Apply a command for `player`, then drive the game.
    Command { player: PlayerId, command: Command },
    /// Project the current state for `viewer` (spectator if absent).
    View {
        #[serde(default)]
        viewer: Option<PlayerId>,
    },
}

/// One output line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    Update {
        accepted: bool,
        revision: u64,
        round: u32,
        phase: String,
        block: Option<String>,
        waiting_for: Vec<PlayerId>,
        /// Log entries appended since the previous update.
        events: Vec<GameEvent>,
        winner: Option<PlayerId>,
    },
    View {
        view: Box<GameView>,
    },
    Error {
        message: String,
    },
}

pub fn parse_request(line: &str) -> Result<Request, serde_json::Error> {
    serde_json::from_str(line)
}

/// Holds the current snapshot and how much of its log was already reported.
pub struct Session {
    state: GameState,
    reported: usize,
}

impl Session {
    pub fn new(state: GameState) -> Self {
        Session {
            state: run_until_blocked(&state),
            reported: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// An update listing events not yet reported.
    pub fn update(&mut self, accepted: bool) -> Response {
        let state = &self.state;
        let events = state.log.get(self.reported..).unwrap_or_default().to_vec();
        self.reported = state.log.len();
        Response::Update {
            accepted,
            revision: state.revision,
            round: state.round,
            phase: state.phase.name().to_string(),
            block: state.block.as_ref().map(|b| b.kind().to_string()),
            waiting_for: state
                .block
                .as_ref()
                .map(|b| b.waiting_for.iter().cloned().collect())
                .unwrap_or_default(),
            events,
            winner: state.winner.clone(),
        }
    }

    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Command { player, command } => match apply_command(&self.state, &command, &player) {
                Ok(next) => {
                    let accepted = next.revision != self.state.revision;
                    self.state = run_until_blocked(&next);
                    self.update(accepted)
                }
                Err(e) => {
                    log::info!("rejected {} from {}: {}", command.name(), player, e);
                    Response::Error {
                        message: e.to_string(),
                    }
                }
            },
            Request::View { viewer } => Response::View {
                view: Box::new(build_view(&self.state, viewer.as_ref())),
            },
        }
    }

    /// Parses and handles one line, returning the JSON response line.
    pub fn handle_line(&mut self, line: &str) -> String {
        let response = match parse_request(line) {
            Ok(request) => self.handle(request),
            Err(e) => Response::Error {
                message: format!("bad request: {}", e),
            },
        };
        serde_json::to_string(&response).unwrap_or_else(|e| format!("{{\"kind\":\"error\",\"message\":\"{}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, LobbyPlayer};
    use crate::engine::create_new_game;

    fn session() -> Session {
        let lobby = vec![LobbyPlayer::new("a"), LobbyPlayer::new("b")];
        Session::new(create_new_game(GameConfig::default(), 11u64, &lobby).unwrap())
    }

    #[test]
    fn first_update_reports_creation_events() {
        let mut s = session();
        let Response::Update { events, block, .. } = s.update(false) else {
            panic!("expected update");
        };
        assert_eq!(events[0].kind, "game.created");
        assert_eq!(block.as_deref(), Some("setup.deckPreview"));
        let Response::Update { events, .. } = s.update(false) else {
            panic!("expected update");
        };
        assert!(events.is_empty());
    }

    #[test]
    fn advance_line_moves_to_capital_draft() {
        let mut s = session();
        s.update(false);
        let out = s.handle_line(r#"{"op":"command","player":"a","command":{"type":"AdvanceSetup"}}"#);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["kind"], "update");
        assert_eq!(v["accepted"], true);
        assert_eq!(v["block"], "setup.capitalDraft");
        assert_eq!(v["waitingFor"][0], "b");
    }

    #[test]
    fn structural_errors_are_reported() {
        let mut s = session();
        let out = s.handle_line(r#"{"op":"command","player":"b","command":{"type":"AdvanceSetup"}}"#);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["kind"], "error");
        let out = s.handle_line("not json");
        assert!(out.contains("bad request"));
    }

    #[test]
    fn view_request_hides_other_hands() {
        let mut s = session();
        let out = s.handle_line(r#"{"op":"view","viewer":"a"}"#);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["kind"], "view");
        assert_eq!(v["view"]["viewer"], "a");
    }
}
