//! Typed view of inbound matchmaking messages.

use serde::Deserialize;
use serde_json::Value;

/// An inbound socket message, dispatched on its `name` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Status(StatusUpdate),
    Play {
        match_id: Option<String>,
        session_id: Option<String>,
    },
    Unknown {
        name: Option<String>,
    },
}

/// `StatusUpdate` payloads, keyed by `payload.state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Connecting,
    Waiting {
        total_players: Option<u64>,
        connected_players: Option<u64>,
    },
    Queued {
        ticket_id: Option<String>,
        queued_players: Option<u64>,
        estimated_wait_sec: Option<u64>,
    },
    SessionAssignment {
        match_id: Option<String>,
        session_id: Option<String>,
    },
    Other(Option<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    state: Option<String>,
    total_players: Option<u64>,
    connected_players: Option<u64>,
    ticket_id: Option<String>,
    queued_players: Option<u64>,
    estimated_wait_sec: Option<u64>,
    match_id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    name: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
    match_id: Option<String>,
    session_id: Option<String>,
}

impl InboundMessage {
    /// Interpret a parsed JSON object.
    pub fn from_value(value: Value) -> Self {
        let raw: RawMessage = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(_) => return Self::Unknown { name: None },
        };
        let payload: RawPayload = raw
            .payload
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        match raw.name.as_deref() {
            Some("StatusUpdate") => Self::Status(match payload.state.as_deref() {
                Some("Connecting") => StatusUpdate::Connecting,
                Some("Waiting") => StatusUpdate::Waiting {
                    total_players: payload.total_players,
                    connected_players: payload.connected_players,
                },
                Some("Queued") => StatusUpdate::Queued {
                    ticket_id: payload.ticket_id,
                    queued_players: payload.queued_players,
                    estimated_wait_sec: payload.estimated_wait_sec,
                },
                Some("SessionAssignment") => StatusUpdate::SessionAssignment {
                    match_id: payload.match_id,
                    session_id: payload.session_id,
                },
                _ => StatusUpdate::Other(payload.state),
            }),
            Some("Play") => Self::Play {
                match_id: payload.match_id.or(raw.match_id),
                session_id: payload.session_id.or(raw.session_id),
            },
            _ => Self::Unknown { name: raw.name },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_states() {
        let waiting = InboundMessage::from_value(json!({
            "name": "StatusUpdate",
            "payload": {"state": "Waiting", "totalPlayers": 4, "connectedPlayers": 2}
        }));
        assert_eq!(
            waiting,
            InboundMessage::Status(StatusUpdate::Waiting {
                total_players: Some(4),
                connected_players: Some(2)
            })
        );

        let queued = InboundMessage::from_value(json!({
            "name": "StatusUpdate",
            "payload": {"state": "Queued", "ticketId": "t-1", "estimatedWaitSec": 12}
        }));
        assert!(matches!(
            queued,
            InboundMessage::Status(StatusUpdate::Queued { ticket_id: Some(ref t), estimated_wait_sec: Some(12), .. }) if t == "t-1"
        ));
    }

    #[test]
    fn test_session_assignment() {
        let message = InboundMessage::from_value(json!({
            "name": "StatusUpdate",
            "payload": {"state": "SessionAssignment", "matchId": "m-1"}
        }));
        assert_eq!(
            message,
            InboundMessage::Status(StatusUpdate::SessionAssignment {
                match_id: Some("m-1".into()),
                session_id: None
            })
        );
    }

    #[test]
    fn test_play_reads_payload_or_top_level() {
        let nested = InboundMessage::from_value(json!({
            "name": "Play",
            "payload": {"matchId": "m-1", "sessionId": "s-1"}
        }));
        let flat = InboundMessage::from_value(json!({
            "name": "Play", "matchId": "m-1", "sessionId": "s-1"
        }));
        assert_eq!(nested, flat);
    }

    #[test]
    fn test_unknown_and_unexpected_shapes() {
        assert_eq!(
            InboundMessage::from_value(json!({"name": "Ping"})),
            InboundMessage::Unknown {
                name: Some("Ping".into())
            }
        );
        assert_eq!(
            InboundMessage::from_value(json!({"name": 5})),
            InboundMessage::Unknown { name: None }
        );
        assert_eq!(
            InboundMessage::from_value(json!({"name": "StatusUpdate", "payload": "odd"})),
            InboundMessage::Status(StatusUpdate::Other(None))
        );
    }
}
