//! Event log records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the append-only game log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl GameEvent {
    pub fn new(kind: &str, payload: Value) -> Self {
        GameEvent {
            kind: kind.to_string(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_type_and_payload() {
        let e = GameEvent::new("phase.round.reset", serde_json::json!({ "round": 1 }));
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"type":"phase.round.reset","payload":{"round":1}}"#);
    }
}
