//! Bearer credential holder and request header construction.
//!
//! One [`TokenStore`] exists per run. It is shared by every network-facing
//! component and never fails: a missing credential simply produces an empty
//! authorization value, and the remote's 401 is the authoritative signal.

use std::sync::RwLock;

use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, HOST};
use uuid::Uuid;

/// Prefix of account-API correlation ids.
pub const CORRELATION_PREFIX: &str = "MATCHLINK";

/// Length of the random suffix of account-API correlation ids.
pub const CORRELATION_SUFFIX_LEN: usize = 20;

/// Header carrying the per-request correlation id.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Which header set to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    /// Account service: lowercase `bearer`, prefixed random correlation id.
    Account,
    /// Game service: `Bearer`, UUID correlation id.
    Game,
}

/// Shared credential store.
#[derive(Debug, Default)]
pub struct TokenStore {
    account_host: String,
    game_host: String,
    token: RwLock<Option<String>>,
    access_token: RwLock<Option<String>>,
}

impl TokenStore {
    /// Create a store that stamps the given `Host` values.
    pub fn new(account_host: impl Into<String>, game_host: impl Into<String>) -> Self {
        Self {
            account_host: account_host.into(),
            game_host: game_host.into(),
            token: RwLock::new(None),
            access_token: RwLock::new(None),
        }
    }

    /// Set the account-scoped bearer token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    /// Set the game-scoped access token obtained by in-game authentication.
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    /// Forget the game-scoped access token.
    pub fn clear_access_token(&self) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Build the header set for `kind`.
    ///
    /// A fresh correlation id is generated on every call.
    pub fn headers(&self, kind: HeaderKind) -> HeaderMap {
        let (scheme, credential, host, correlation) = match kind {
            HeaderKind::Account => (
                "bearer",
                self.token(),
                self.account_host.as_str(),
                account_correlation_id(),
            ),
            HeaderKind::Game => (
                "Bearer",
                self.access_token(),
                self.game_host.as_str(),
                Uuid::new_v4().to_string(),
            ),
        };

        let mut headers = HeaderMap::new();
        let authorization = format!("{} {}", scheme, credential.unwrap_or_default());
        insert(&mut headers, AUTHORIZATION, authorization.trim_end());
        if !host.is_empty() {
            insert(&mut headers, HOST, host);
        }
        insert(
            &mut headers,
            HeaderName::from_static(CORRELATION_HEADER),
            &correlation,
        );
        headers
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => {
            tracing::warn!(header = %name, "Dropping header with invalid characters");
        }
    }
}

/// `<prefix>-<20 random alphanumerics>`.
pub fn account_correlation_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CORRELATION_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", CORRELATION_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
        headers.get(name).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_account_headers() {
        let store = TokenStore::new("account.example.com", "game.example.com");
        store.set_token("abc");

        let headers = store.headers(HeaderKind::Account);
        assert_eq!(header(&headers, "authorization"), "bearer abc");
        assert_eq!(header(&headers, "host"), "account.example.com");
        assert!(header(&headers, CORRELATION_HEADER).starts_with("MATCHLINK-"));
    }

    #[test]
    fn test_game_headers_use_access_token() {
        let store = TokenStore::new("account.example.com", "game.example.com");
        store.set_token("account-token");
        store.set_access_token("game-token");

        let headers = store.headers(HeaderKind::Game);
        assert_eq!(header(&headers, "authorization"), "Bearer game-token");
        assert_eq!(header(&headers, "host"), "game.example.com");
        assert!(Uuid::parse_str(header(&headers, CORRELATION_HEADER)).is_ok());
    }

    #[test]
    fn test_missing_token_yields_empty_credential() {
        let store = TokenStore::new("a", "g");
        let headers = store.headers(HeaderKind::Account);
        assert_eq!(header(&headers, "authorization"), "bearer");

        let headers = store.headers(HeaderKind::Game);
        assert_eq!(header(&headers, "authorization"), "Bearer");
    }

    #[test]
    fn test_correlation_ids_are_fresh() {
        let a = account_correlation_id();
        let b = account_correlation_id();
        assert_ne!(a, b);

        let suffix = a.strip_prefix("MATCHLINK-").unwrap();
        assert_eq!(suffix.len(), CORRELATION_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_clear_access_token() {
        let store = TokenStore::new("a", "g");
        store.set_access_token("x");
        assert_eq!(store.access_token().as_deref(), Some("x"));
        store.clear_access_token();
        assert!(store.access_token().is_none());
        assert!(!store.has_token());
    }

    #[test]
    fn test_writes_survive_poisoned_lock() {
        let store = std::sync::Arc::new(TokenStore::new("a", "g"));
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.token.write().unwrap();
            let _access = poisoner.access_token.write().unwrap();
            panic!("poison both slots");
        })
        .join();
        assert!(store.token.is_poisoned());

        store.set_token("fresh");
        store.set_access_token("game");
        assert_eq!(store.token().as_deref(), Some("fresh"));
        assert_eq!(store.access_token().as_deref(), Some("game"));

        store.clear_access_token();
        assert!(store.access_token().is_none());
        let headers = store.headers(HeaderKind::Account);
        assert_eq!(header(&headers, "authorization"), "bearer fresh");
    }
}
