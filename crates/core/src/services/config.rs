//! Remote service configuration.

use serde::{Deserialize, Serialize};

/// Base URLs of the account and game services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Account service base URL (exchange codes, OAuth).
    pub account_base_url: String,

    /// Game service base URL (session list, tickets, session lookup).
    pub game_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ServicesConfig {
    /// Host of the account service, used for the `Host` header.
    pub fn account_host(&self) -> String {
        host_of(&self.account_base_url)
    }

    /// Host of the game service, used for the `Host` header.
    pub fn game_host(&self) -> String {
        host_of(&self.game_base_url)
    }
}

/// Credentials handed to the process by an external collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Account-scoped bearer token.
    #[serde(default)]
    pub account_token: Option<String>,

    /// OAuth client id of the game client.
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret of the game client.
    #[serde(default)]
    pub client_secret: String,
}

/// External backend receiving resolved sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Endpoint the hand-off is POSTed to.
    pub url: String,

    /// Optional bearer token for the backend.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    15
}

fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str().map(|h| match u.port() {
                Some(port) => format!("{}:{}", h, port),
                None => h.to_string(),
            })
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_derived_from_urls() {
        let config = ServicesConfig {
            account_base_url: "https://account.example.com/api".into(),
            game_base_url: "http://127.0.0.1:8080".into(),
            timeout_secs: 15,
        };
        assert_eq!(config.account_host(), "account.example.com");
        assert_eq!(config.game_host(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_url_has_empty_host() {
        assert_eq!(host_of("not a url"), "");
    }

    #[test]
    fn test_deserialize_minimal() {
        let toml = r#"
            account_base_url = "https://a"
            game_base_url = "https://g"
        "#;
        let config: ServicesConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.timeout_secs, 15);
    }
}
