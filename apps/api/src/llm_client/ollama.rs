//! Ollama backend for locally hosted models (`/api/generate`, non-streaming).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    endpoint, http_client, post_json_with_retry, GenerationConfig, LlmError, LlmProvider,
    ProviderKind, RetryPolicy,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    config: GenerationConfig,
    retry: RetryPolicy,
}

impl OllamaProvider {
    pub fn new(
        base_url: String,
        config: GenerationConfig,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response: GenerateResponse = post_json_with_retry(
            &self.client,
            &endpoint(&self.base_url, "/api/generate"),
            &[],
            &request,
            self.retry,
        )
        .await?;

        debug!(
            "Ollama call succeeded: prompt_eval_count={:?}, eval_count={:?}",
            response.prompt_eval_count, response.eval_count
        );

        if response.response.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(response.response)
    }
}
