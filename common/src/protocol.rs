use serde::{Deserialize, Serialize};

/// Remote-callable operations. The transport delivers a broadcast message to
/// every peer, including the sender, and each peer executes the same handler
/// against its own replica.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "method")]
pub enum PeerMessage {
    /// Reset transient state and show whose turn it is.
    #[serde(rename = "startTheGame")]
    StartTheGame,
    /// Full board snapshot as fixed-width tokens. `is_initial_setup` marks
    /// the snapshot that placed the bombs, so receivers mirror the one-time
    /// neighbor-count setup.
    #[serde(rename = "updateBoard")]
    UpdateBoard {
        tokens: Vec<String>,
        is_initial_setup: bool,
    },
    #[serde(rename = "gameOver")]
    GameOver { lost: bool },
    #[serde(rename = "clearGrid")]
    ClearGrid,
}

/// A broadcast frame: the message plus the transport-level identity of the
/// sending peer (its player index).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Envelope {
    pub sender: usize,
    pub message: PeerMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_round_trip_as_json() {
        let envelope = Envelope {
            sender: 2,
            message: PeerMessage::UpdateBoard {
                tokens: vec!["000013".to_string()],
                is_initial_setup: true,
            },
        };
        let text = serde_json::to_string(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn method_tag_names_the_operation() {
        let text = serde_json::to_string(&PeerMessage::GameOver { lost: true }).unwrap();
        assert!(text.contains("\"method\":\"gameOver\""));
    }
}
