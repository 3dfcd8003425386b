use super::types::{ProviderError, ProviderKind};
use serde_json::Value;
use std::io::Read;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ERROR_BODY_CHARS: usize = 2000;

/// Base URL, credentials and HTTP agent for one provider.
#[derive(Clone)]
pub struct ApiEndpoint {
    provider: ProviderKind,
    api_base: String,
    api_key: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for ApiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEndpoint")
            .field("provider", &self.provider)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl ApiEndpoint {
    pub fn new(provider: ProviderKind, api_base: &str, api_key: &str) -> Self {
        Self {
            provider,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            agent: ureq::AgentBuilder::new().timeout(DEFAULT_TIMEOUT).build(),
        }
    }

    /// Reads the key from `api_key_env`, falling back to the provider default base URL.
    pub fn from_env(
        provider: ProviderKind,
        api_base: Option<&str>,
        api_key_env: &str,
    ) -> Result<Self, ProviderError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider,
                env: api_key_env.to_string(),
            })?;
        let base = api_base
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| provider.default_api_base());
        Ok(Self::new(provider, base, &api_key))
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn request(&self, path: &str) -> ureq::Request {
        let request = self.agent.post(&self.endpoint(path));
        match self.provider {
            ProviderKind::Anthropic => request
                .set("x-api-key", &self.api_key)
                .set("anthropic-version", "2023-06-01"),
            _ => request.set("Authorization", &format!("Bearer {}", self.api_key)),
        }
    }

    pub fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let response = self
            .request(path)
            .set("Content-Type", "application/json")
            .send_json(body.clone())
            .map_err(|err| self.map_ureq_error(err))?;
        response
            .into_json::<Value>()
            .map_err(|err| ProviderError::ParseFailure {
                provider: self.provider,
                reason: format!("response body is not json: {err}"),
            })
    }

    pub fn post_json_for_bytes(&self, path: &str, body: &Value) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .request(path)
            .set("Content-Type", "application/json")
            .send_json(body.clone())
            .map_err(|err| self.map_ureq_error(err))?;
        read_body(self.provider, response)
    }

    /// Unauthenticated GET, used to download generated assets.
    pub fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| self.map_ureq_error(err))?;
        read_body(self.provider, response)
    }

    fn map_ureq_error(&self, err: ureq::Error) -> ProviderError {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                ProviderError::Status {
                    provider: self.provider,
                    status,
                    body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                }
            }
            ureq::Error::Transport(transport) => ProviderError::Transport {
                provider: self.provider,
                reason: transport.to_string(),
            },
        }
    }
}

fn read_body(provider: ProviderKind, response: ureq::Response) -> Result<Vec<u8>, ProviderError> {
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|err| ProviderError::Transport {
            provider,
            reason: format!("failed to read response body: {err}"),
        })?;
    Ok(bytes)
}

pub(crate) fn parse_failure(provider: ProviderKind, reason: impl Into<String>) -> ProviderError {
    ProviderError::ParseFailure {
        provider,
        reason: reason.into(),
    }
}
