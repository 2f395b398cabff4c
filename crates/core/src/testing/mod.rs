//! Testing utilities and mock implementations.
//!
//! Every collaborator the orchestrator talks to sits behind a trait, and each
//! trait has a mock here so attempts can be driven end to end without a game
//! client, remote services or a real socket.
//!
//! # Example
//!
//! ```rust,ignore
//! use matchlink_core::testing::{fixtures, MockSessionSource, MockConnector};
//!
//! let source = MockSessionSource::new();
//! source.set_sessions(vec![fixtures::session("s-1", false, 0)]).await;
//!
//! let connector = MockConnector::new();
//! connector.push_stream(vec![r#"{"name":"Play","matchId":"m-1"}"#.into()]).await;
//! ```

mod mock_game;
mod mock_services;
mod mock_socket;

pub use mock_game::{MockGameFiles, MockGameProcess, MockProcessControl, MockProcessTable};
pub use mock_services::{MockAccountApi, MockBackend, MockMatchmakingApi, MockSessionSource};
pub use mock_socket::{MockConnector, MockFrameStream};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::services::{ExchangeCredential, GameSession, SessionDescriptor};

    /// Create a session in region `EU` on the default playlist.
    pub fn session(id: &str, started: bool, players: u32) -> SessionDescriptor {
        SessionDescriptor {
            session_id: id.to_string(),
            region: "EU".to_string(),
            playlist_name: "playlist_default".to_string(),
            started,
            players,
            max_players: 100,
        }
    }

    /// Create an exchange credential carrying `code`.
    pub fn credential(code: &str) -> ExchangeCredential {
        ExchangeCredential {
            code: code.to_string(),
            expires_in: 300,
            issuing_client_id: "launcher-client".to_string(),
        }
    }

    /// Create an in-game session for `account_id`.
    pub fn game_session(account_id: &str) -> GameSession {
        GameSession {
            access_token: format!("game-token-{}", account_id),
            account_id: account_id.to_string(),
            display_name: format!("player-{}", account_id),
        }
    }
}
