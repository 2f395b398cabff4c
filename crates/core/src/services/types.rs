//! Wire types for the remote services.

use serde::{Deserialize, Serialize};

/// A server-hosted match instance as reported by the session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    pub session_id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub playlist_name: String,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub players: u32,
    #[serde(default)]
    pub max_players: u32,
}

/// Single-use code exchanged for a full access token.
///
/// Not `Clone`: launching borrows it, in-game authentication consumes it.
#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct ExchangeCredential {
    pub code: String,
    #[serde(rename = "expiresInSeconds", default)]
    pub expires_in: u64,
    #[serde(rename = "creatingClientId", default)]
    pub issuing_client_id: String,
}

/// Result of the in-game authentication exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameSession {
    pub access_token: String,
    pub account_id: String,
    #[serde(default)]
    pub display_name: String,
}

/// Token returned by the client-credentials grant.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// Signed bundle granting temporary access to the matchmaking socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakingTicket {
    pub ticket_type: String,
    pub payload: String,
    pub signature: String,
    pub service_url: String,
}

/// Parameters of a ticket request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    pub account_id: String,
    pub platform: String,
    pub region: String,
    pub playlist: String,
    pub build_id: String,
}

impl TicketRequest {
    /// `<build>:0:<region>:<playlist>`
    pub fn bucket_id(&self) -> String {
        format!("{}:0:{}:{}", self.build_id, self.region, self.playlist)
    }
}

/// Address of a resolved game server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub server_address: String,
    pub server_port: u16,
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

/// Payload posted to the external backend once a session is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handoff {
    pub session_id: String,
    pub match_id: String,
    pub server_address: String,
    pub server_port: u16,
    pub region: String,
    pub playlist_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_descriptor_wire_names() {
        let json = r#"{
            "sessionId": "s-1",
            "region": "EU",
            "playlistName": "solo",
            "started": false,
            "players": 3,
            "maxPlayers": 100
        }"#;
        let session: SessionDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(session.session_id, "s-1");
        assert_eq!(session.playlist_name, "solo");
        assert_eq!(session.max_players, 100);
    }

    #[test]
    fn test_session_descriptor_defaults() {
        let session: SessionDescriptor = serde_json::from_str(r#"{"sessionId":"s-2"}"#).unwrap();
        assert!(!session.started);
        assert_eq!(session.players, 0);
    }

    #[test]
    fn test_exchange_credential_wire_names() {
        let json = r#"{"code":"abc","expiresInSeconds":300,"creatingClientId":"cid"}"#;
        let credential: ExchangeCredential = serde_json::from_str(json).unwrap();
        assert_eq!(credential.code, "abc");
        assert_eq!(credential.expires_in, 300);
        assert_eq!(credential.issuing_client_id, "cid");
    }

    #[test]
    fn test_handoff_serializes_camel_case() {
        let handoff = Handoff {
            session_id: "s".into(),
            match_id: "m".into(),
            server_address: "10.0.0.1".into(),
            server_port: 7777,
            region: "EU".into(),
            playlist_name: "solo".into(),
        };
        let value = serde_json::to_value(&handoff).unwrap();
        assert_eq!(value["sessionId"], "s");
        assert_eq!(value["serverPort"], 7777);
        assert_eq!(value["playlistName"], "solo");
    }

    #[test]
    fn test_bucket_id() {
        let request = TicketRequest {
            account_id: "acc".into(),
            platform: "Windows".into(),
            region: "EU".into(),
            playlist: "solo".into(),
            build_id: "1234".into(),
        };
        assert_eq!(request.bucket_id(), "1234:0:EU:solo");
    }
}
