//! Matchmaking client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the matchmaking protocol client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingConfig {
    /// Platform reported in the ticket request.
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Game build identifier used in the bucket id.
    #[serde(default)]
    pub build_id: String,

    /// Playlist used when a session does not name one.
    #[serde(default = "default_playlist")]
    pub default_playlist: String,

    /// Leading word of the socket authorization value.
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    /// Socket connect attempts before giving up.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Fixed delay between connect attempts (milliseconds).
    #[serde(default = "default_connect_backoff")]
    pub connect_backoff_ms: u64,

    /// Length of the hex client identifier.
    #[serde(default = "default_client_id_len")]
    pub client_id_len: usize,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            build_id: String::new(),
            default_playlist: default_playlist(),
            auth_scheme: default_auth_scheme(),
            connect_attempts: default_connect_attempts(),
            connect_backoff_ms: default_connect_backoff(),
            client_id_len: default_client_id_len(),
        }
    }
}

fn default_platform() -> String {
    "Windows".to_string()
}

fn default_playlist() -> String {
    "playlist_default".to_string()
}

fn default_auth_scheme() -> String {
    "Signed".to_string()
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_connect_backoff() -> u64 {
    2_000 // 2 seconds
}

fn default_client_id_len() -> usize {
    16
}
