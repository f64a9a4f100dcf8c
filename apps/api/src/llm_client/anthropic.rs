//! Anthropic Messages API backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    endpoint, http_client, post_json_with_retry, GenerationConfig, LlmError, LlmProvider,
    ProviderKind, RetryPolicy,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Reply body shared with Claude models served through Bedrock.
#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    config: GenerationConfig,
    retry: RetryPolicy,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        config: GenerationConfig,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
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
impl LlmProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: LlmResponse = post_json_with_retry(
            &self.client,
            &endpoint(&self.base_url, "/v1/messages"),
            &[
                ("x-api-key", self.api_key.clone()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
            &request,
            self.retry,
        )
        .await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Anthropic call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        response
            .text()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::new(
            "ak-test".to_string(),
            Some(server.uri()),
            GenerationConfig {
                model: "claude-3-haiku-20240307".to_string(),
                temperature: 0.7,
                max_tokens: 2000,
            },
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        })
    }

    #[test]
    fn test_text_skips_non_text_blocks() {
        let response: LlmResponse = serde_json::from_value(json!({
            "content": [
                {"type": "tool_use"},
                {"type": "text", "text": "answer"}
            ]
        }))
        .unwrap();
        assert_eq!(response.text(), Some("answer"));
    }

    #[tokio::test]
    async fn test_generate_sends_headers_and_system_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({"system": "json only", "max_tokens": 2000})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "{\"score\": 80}"}],
                "usage": {"input_tokens": 12, "output_tokens": 6}
            })))
            .mount(&server)
            .await;

        let reply = provider(&server)
            .generate("analyze", Some("json only"))
            .await
            .unwrap();
        assert_eq!(reply, "{\"score\": 80}");
    }

    #[tokio::test]
    async fn test_overloaded_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ok"}]
            })))
            .mount(&server)
            .await;

        assert_eq!(provider(&server).generate("x", None).await.unwrap(), "ok");
    }
}
