//! HTTP embed provider

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

use super::{EmbedData, EmbedError, EmbedProvider};
use crate::config::EmbedsConfig;

const ID_PLACEHOLDER: &str = "{id}";

/// Fetches embed snapshots from a JSON endpoint such as
/// `https://embeds.example.com/tweets/{id}.json`
pub struct HttpEmbedProvider {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpEmbedProvider {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self, EmbedError> {
        if !endpoint.contains(ID_PLACEHOLDER) {
            return Err(EmbedError::Config(format!(
                "endpoint {endpoint:?} must contain {ID_PLACEHOLDER}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token,
        })
    }

    /// Provider for `endpoint`, reading the token from the environment
    /// variable named by `embeds.token_env`
    pub fn from_config(endpoint: &str, config: &EmbedsConfig) -> Result<Self, EmbedError> {
        let token = match config.token_env.as_deref() {
            Some(var) => match std::env::var(var) {
                Ok(token) if !token.is_empty() => Some(token),
                _ => {
                    tracing::warn!("Embed token variable {} is not set", var);
                    None
                }
            },
            None => None,
        };
        Self::new(
            endpoint,
            token,
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }

    fn url_for(&self, id: &str) -> String {
        self.endpoint.replace(ID_PLACEHOLDER, id)
    }
}

/// Map a non-success status to the error reported for that ID
fn status_error(status: StatusCode) -> EmbedError {
    match status {
        StatusCode::NOT_FOUND => EmbedError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => EmbedError::RateLimited,
        other => EmbedError::Status(other.as_u16()),
    }
}

#[async_trait]
impl EmbedProvider for HttpEmbedProvider {
    async fn fetch(&self, id: &str) -> Result<EmbedData, EmbedError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(EmbedError::NotFound);
        }

        let url = self.url_for(id);
        tracing::debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| EmbedError::Decode(e.to_string()))
    }
}
