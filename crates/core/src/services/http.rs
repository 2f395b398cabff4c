//! reqwest-backed implementation of the account and game service seams.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::token::{HeaderKind, TokenStore};

use super::config::{CredentialsConfig, ServicesConfig};
use super::error::ServiceError;
use super::traits::{AccountApi, MatchmakingApi, SessionSource};
use super::types::{
    ClientToken, ExchangeCredential, GameSession, MatchmakingTicket, ServerInfo,
    SessionDescriptor, TicketRequest,
};

/// HTTP client for the account and game services.
pub struct HttpGameServices {
    client: Client,
    config: ServicesConfig,
    credentials: CredentialsConfig,
    tokens: Arc<TokenStore>,
}

impl HttpGameServices {
    pub fn new(
        config: ServicesConfig,
        credentials: CredentialsConfig,
        tokens: Arc<TokenStore>,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            credentials,
            tokens,
        })
    }

    fn account_url(&self, path: &str) -> String {
        format!("{}{}", self.config.account_base_url.trim_end_matches('/'), path)
    }

    fn game_url(&self, path: &str) -> String {
        format!("{}{}", self.config.game_base_url.trim_end_matches('/'), path)
    }

    /// Build the ticket URL with its query parameters.
    fn build_ticket_url(&self, request: &TicketRequest) -> String {
        format!(
            "{}?partyPlayerIds={}&bucketId={}&player.platform={}&player.subregions={}",
            self.game_url(&format!(
                "/matchmaking/ticket/{}",
                urlencoding::encode(&request.account_id)
            )),
            urlencoding::encode(&request.account_id),
            urlencoding::encode(&request.bucket_id()),
            urlencoding::encode(&request.platform),
            urlencoding::encode(&request.region),
        )
    }

    async fn oauth_token<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<T, ServiceError> {
        let response = self
            .client
            .post(self.account_url("/oauth/token"))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(endpoint, e))?;
        read_json(endpoint, response).await
    }
}

/// Decode a JSON response, classifying non-success statuses.
pub(crate) async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, ServiceError> {
    let response = check_status(endpoint, response).await?;
    response.json::<T>().await.map_err(|e| ServiceError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Turn 401 and other non-success statuses into errors.
pub(crate) async fn check_status(
    endpoint: &str,
    response: Response,
) -> Result<Response, ServiceError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ServiceError::Unauthorized {
            endpoint: endpoint.to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }
    Ok(response)
}

#[async_trait]
impl SessionSource for HttpGameServices {
    async fn list_sessions(&self, region: &str) -> Result<Vec<SessionDescriptor>, ServiceError> {
        let url = format!(
            "{}?region={}",
            self.game_url("/sessions"),
            urlencoding::encode(region)
        );
        let response = self
            .client
            .get(&url)
            .headers(self.tokens.headers(HeaderKind::Account))
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("session list", e))?;
        read_json("session list", response).await
    }
}

#[async_trait]
impl AccountApi for HttpGameServices {
    async fn mint_exchange_code(&self) -> Result<ExchangeCredential, ServiceError> {
        let response = self
            .client
            .get(self.account_url("/oauth/exchange"))
            .headers(self.tokens.headers(HeaderKind::Account))
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("exchange mint", e))?;
        let credential: ExchangeCredential = read_json("exchange mint", response).await?;
        debug!(
            expires_in = credential.expires_in,
            client = %credential.issuing_client_id,
            "Minted exchange credential"
        );
        Ok(credential)
    }

    async fn authenticate(
        &self,
        credential: ExchangeCredential,
    ) -> Result<GameSession, ServiceError> {
        let client_token: ClientToken = self
            .oauth_token("client credentials", &[("grant_type", "client_credentials")])
            .await?;
        debug!(
            expires_in = client_token.expires_in,
            "Client credentials accepted"
        );

        let session: GameSession = self
            .oauth_token(
                "exchange grant",
                &[
                    ("grant_type", "exchange_code"),
                    ("exchange_code", credential.code.as_str()),
                ],
            )
            .await?;

        self.tokens.set_access_token(session.access_token.clone());
        info!(
            account_id = %session.account_id,
            display_name = %session.display_name,
            "In-game authentication succeeded"
        );
        Ok(session)
    }
}

#[async_trait]
impl MatchmakingApi for HttpGameServices {
    async fn request_ticket(
        &self,
        access_token: &str,
        request: &TicketRequest,
    ) -> Result<MatchmakingTicket, ServiceError> {
        let mut headers = self.tokens.headers(HeaderKind::Game);
        if let Ok(value) = format!("Bearer {}", access_token).parse() {
            headers.insert(AUTHORIZATION, value);
        }

        let response = self
            .client
            .get(self.build_ticket_url(request))
            .headers(headers)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("matchmaking ticket", e))?;
        read_json("matchmaking ticket", response).await
    }

    async fn lookup_session(
        &self,
        session_id: &str,
        kind: HeaderKind,
    ) -> Result<ServerInfo, ServiceError> {
        let url = self.game_url(&format!(
            "/matchmaking/session/{}",
            urlencoding::encode(session_id)
        ));
        let response = self
            .client
            .get(&url)
            .headers(self.tokens.headers(kind))
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("session lookup", e))?;
        read_json("session lookup", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services() -> HttpGameServices {
        HttpGameServices::new(
            ServicesConfig {
                account_base_url: "https://account.example.com/".into(),
                game_base_url: "https://game.example.com".into(),
                timeout_secs: 5,
            },
            CredentialsConfig::default(),
            Arc::new(TokenStore::new("account.example.com", "game.example.com")),
        )
        .unwrap()
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let s = services();
        assert_eq!(
            s.account_url("/oauth/token"),
            "https://account.example.com/oauth/token"
        );
        assert_eq!(s.game_url("/sessions"), "https://game.example.com/sessions");
    }

    #[test]
    fn test_build_ticket_url() {
        let s = services();
        let url = s.build_ticket_url(&TicketRequest {
            account_id: "acc 1".into(),
            platform: "Windows".into(),
            region: "EU".into(),
            playlist: "solo".into(),
            build_id: "42".into(),
        });

        assert!(url.starts_with("https://game.example.com/matchmaking/ticket/acc%201?"));
        assert!(url.contains("partyPlayerIds=acc%201"));
        assert!(url.contains("bucketId=42%3A0%3AEU%3Asolo"));
        assert!(url.contains("player.platform=Windows"));
        assert!(url.contains("player.subregions=EU"));
    }
}
