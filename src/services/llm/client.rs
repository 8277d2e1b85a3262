use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::config::{ServiceConfig, API_KEY_VAR};
use crate::error::{ConfigError, TransportError};
use crate::planner::prompt::Prompt;

/// The external reasoning service. Untrusted, slow, rate limited.
/// Returns raw reply text on success; the caller owns validation, timeouts
/// and the "no retry" policy.
pub trait ReasoningService: Send + Sync + 'static {
    fn generate(&self, prompt: &Prompt) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// HTTP client for a llama-server style `/completion` endpoint.
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    base_url: String,
    api_key: String,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct CompletionRequest {
    prompt: String,
    stream: bool,
    n_predict: usize,
    temperature: f32,
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

impl LlmService {
    /// Fails once, at startup, when no credential is configured.
    pub fn from_config(config: &ServiceConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ConfigError::MissingCredential(API_KEY_VAR))?;

        Ok(Self {
            client: Client::builder()
                .timeout(timeout) // network-level bound; the engine applies its own too
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ReasoningService for LlmService {
    async fn generate(&self, prompt: &Prompt) -> Result<String, TransportError> {
        let request_body = CompletionRequest {
            prompt: prompt.render(),
            stream: false, // One-shot only
            n_predict: self.max_tokens,
            temperature: self.temperature,
            stop: vec!["User:".to_string(), "System:".to_string()],
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let resp_json: CompletionResponse = response.json().await?;
        Ok(resp_json.content.trim().to_string())
    }
}
