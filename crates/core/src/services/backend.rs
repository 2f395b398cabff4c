//! HTTP client for the external backend receiving resolved sessions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::info;

use super::config::BackendConfig;
use super::error::ServiceError;
use super::http::check_status;
use super::traits::Backend;
use super::types::Handoff;

pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Request(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn post_handoff(&self, handoff: &Handoff) -> Result<(), ServiceError> {
        let mut request = self.client.post(&self.config.url).json(handoff);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("backend handoff", e))?;
        let response = check_status("backend handoff", response).await?;

        // Only a plain 200 counts as accepted.
        if response.status() != StatusCode::OK {
            return Err(ServiceError::Status {
                endpoint: "backend handoff".to_string(),
                status: response.status().as_u16(),
                body: String::new(),
            });
        }

        info!(
            session_id = %handoff.session_id,
            server = %format!("{}:{}", handoff.server_address, handoff.server_port),
            "Session handed off to backend"
        );
        Ok(())
    }
}
