//! LLM Client: the single point of entry for every model call in the service.
//!
//! Each backend (OpenAI, Anthropic, Bedrock, Ollama) implements `LlmProvider`.
//! The provider is chosen once from configuration and shared through `AppState`;
//! call sites only see the trait.
//!
//! Structured calls go through `generate_structured`, which hands the raw reply to
//! the normalizer and logs whether it had to be repaired.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::normalizer::{normalize, ExpectedSchema, NormalizedResult};

pub mod anthropic;
pub mod bedrock;
pub mod ollama;
pub mod openai;
pub mod prompts;

pub use anthropic::AnthropicProvider;
pub use bedrock::BedrockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Missing credentials: set {0}")]
    MissingCredentials(&'static str),

    #[error("Unknown LLM provider '{0}'")]
    UnknownProvider(String),

    #[error("Model '{0}' is not supported by this provider")]
    UnsupportedModel(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Provider selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Bedrock,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Bedrock,
        ProviderKind::Ollama,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Bedrock => "bedrock",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Well-known models offered in the settings UI. Ollama lists common local
    /// models; any installed model name is accepted.
    pub fn available_models(self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAi => &[
                "gpt-4-turbo-preview",
                "gpt-4",
                "gpt-4-32k",
                "gpt-3.5-turbo",
                "gpt-3.5-turbo-16k",
            ],
            ProviderKind::Anthropic => &[
                "claude-3-opus-20240229",
                "claude-3-sonnet-20240229",
                "claude-3-haiku-20240307",
                "claude-2.1",
                "claude-2.0",
            ],
            ProviderKind::Bedrock => &[
                "anthropic.claude-3-opus-20240229-v1:0",
                "anthropic.claude-3-sonnet-20240229-v1:0",
                "anthropic.claude-3-haiku-20240307-v1:0",
                "anthropic.claude-v2:1",
                "anthropic.claude-v2",
                "amazon.titan-text-express-v1",
                "amazon.titan-text-lite-v1",
            ],
            ProviderKind::Ollama => &[
                "llama3",
                "llama2",
                "mistral",
                "mixtral",
                "phi3",
                "gemma",
                "codellama",
                "neural-chat",
            ],
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4-turbo-preview",
            ProviderKind::Anthropic => "claude-3-sonnet-20240229",
            ProviderKind::Bedrock => "anthropic.claude-3-sonnet-20240229-v1:0",
            ProviderKind::Ollama => "llama3",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| LlmError::UnknownProvider(s.to_string()))
    }
}

/// Sampling parameters shared by every provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Provider trait
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    /// Sends one prompt and returns the raw reply text.
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError>;

    /// Sends one prompt and normalizes the reply against `schema`. Transport
    /// failures are errors; malformed replies never are.
    async fn generate_structured(
        &self,
        prompt: &str,
        system: Option<&str>,
        schema: &ExpectedSchema,
    ) -> Result<NormalizedResult, LlmError> {
        let raw = self.generate(prompt, system).await?;
        let result = normalize(&raw, schema);

        if result.repaired {
            warn!(
                contract = %schema.name,
                provider = %self.kind(),
                model = self.model(),
                tier = ?result.tier,
                adjustments = ?result.adjustments,
                "LLM reply needed repair"
            );
        } else {
            debug!(contract = %schema.name, "LLM reply parsed cleanly");
        }

        Ok(result)
    }
}

/// Constructs the provider named in `settings`. Fails if its credentials are missing.
pub async fn build_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let config = GenerationConfig {
        model: settings.model.clone(),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    };
    let timeout = Duration::from_secs(settings.timeout_secs);

    let provider: Arc<dyn LlmProvider> = match settings.provider {
        ProviderKind::OpenAi => {
            let api_key = settings
                .openai_api_key
                .clone()
                .ok_or(LlmError::MissingCredentials("OPENAI_API_KEY"))?;
            Arc::new(OpenAiProvider::new(
                api_key,
                settings.openai_base_url.clone(),
                config,
                timeout,
            )?)
        }
        ProviderKind::Anthropic => {
            let api_key = settings
                .anthropic_api_key
                .clone()
                .ok_or(LlmError::MissingCredentials("ANTHROPIC_API_KEY"))?;
            Arc::new(AnthropicProvider::new(
                api_key,
                settings.anthropic_base_url.clone(),
                config,
                timeout,
            )?)
        }
        ProviderKind::Bedrock => Arc::new(BedrockProvider::from_settings(settings, config).await?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            settings.ollama_base_url.clone(),
            config,
            timeout,
        )?),
    };

    info!(
        "LLM provider initialized: {} (model: {})",
        provider.kind(),
        provider.model()
    );
    Ok(provider)
}

// ────────────────────────────────────────────────────────────────────────────
// Shared HTTP plumbing
// ────────────────────────────────────────────────────────────────────────────

/// Retry schedule for HTTP providers. `max_retries` counts attempts; the delay
/// doubles after each failure (1s, then 2s by default).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Error bodies come as `{"error": {"message": ..}}` (OpenAI, Anthropic) or
/// `{"error": ".."}` (Ollama).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorPayload {
    Nested { error: ApiErrorBody },
    Flat { error: String },
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn api_error_message(body: String) -> String {
    match serde_json::from_str::<ApiErrorPayload>(&body) {
        Ok(ApiErrorPayload::Nested { error }) => error.message,
        Ok(ApiErrorPayload::Flat { error }) => error,
        Err(_) => body,
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, LlmError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// POSTs `body` as JSON and decodes the reply.
/// Retries on 429 (rate limit), 5xx and transport errors with exponential backoff.
pub(crate) async fn post_json_with_retry<B, R>(
    client: &Client,
    url: &str,
    headers: &[(&'static str, String)],
    body: &B,
    retry: RetryPolicy,
) -> Result<R, LlmError>
where
    B: Serialize + ?Sized + Sync,
    R: DeserializeOwned,
{
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..retry.max_retries {
        if attempt > 0 {
            let delay = retry.base_delay * (1 << (attempt - 1));
            warn!(
                "LLM call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            last_error = Some(if status.as_u16() == 429 {
                LlmError::RateLimited {
                    retries: retry.max_retries,
                }
            } else {
                LlmError::Api {
                    status: status.as_u16(),
                    message: api_error_message(body),
                }
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            });
        }

        return Ok(response.json().await?);
    }

    Err(last_error.unwrap_or(LlmError::RateLimited {
        retries: retry.max_retries,
    }))
}

/// Joins base URL and path without doubling the slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Canned provider for handler and service tests.
#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    pub struct StubProvider {
        reply: Result<String, u16>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl StubProvider {
        pub fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn last_prompt(&self) -> String {
            self.prompts
                .lock()
                .unwrap()
                .last()
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Ollama
        }

        fn model(&self) -> &str {
            "stub"
        }

        async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "stubbed failure".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubProvider;
    use super::*;
    use crate::normalizer::{FieldSpec, RecoveryTier};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_provider_kind_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" ollama ".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!(matches!(
            "gemini".parse::<ProviderKind>(),
            Err(LlmError::UnknownProvider(name)) if name == "gemini"
        ));
    }

    #[test]
    fn test_default_model_is_listed() {
        for kind in ProviderKind::ALL {
            assert!(kind.available_models().contains(&kind.default_model()));
        }
    }

    #[test]
    fn test_api_error_message_shapes() {
        assert_eq!(
            api_error_message(r#"{"error": {"message": "bad key", "type": "auth"}}"#.to_string()),
            "bad key"
        );
        assert_eq!(
            api_error_message(r#"{"error": "model not found"}"#.to_string()),
            "model not found"
        );
        assert_eq!(api_error_message("plain".to_string()), "plain");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("http://localhost:11434/", "/api/generate"),
            "http://localhost:11434/api/generate"
        );
    }

    #[tokio::test]
    async fn test_generate_structured_normalizes_reply() {
        let stub = StubProvider::replying("Sure! {'score': 91}");
        let schema =
            ExpectedSchema::object("s", vec![FieldSpec::number("score", 0.0, 100.0)]);

        let result = stub.generate_structured("rate", None, &schema).await.unwrap();
        assert_eq!(result.fields["score"], json!(91));
        assert_eq!(result.tier, RecoveryTier::SyntaxRepair);
        assert_eq!(stub.last_prompt(), "rate");
    }

    #[tokio::test]
    async fn test_generate_structured_propagates_transport_errors() {
        let stub = StubProvider::failing(503);
        let schema = ExpectedSchema::object("s", vec![]);
        let err = stub.generate_structured("x", None, &schema).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = Client::new();
        let reply: serde_json::Value = post_json_with_retry(
            &client,
            &format!("{}/flaky", server.uri()),
            &[],
            &json!({}),
            fast_retry(),
        )
        .await
        .unwrap();
        assert_eq!(reply, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bad"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": {"message": "invalid api key"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = post_json_with_retry::<_, serde_json::Value>(
            &Client::new(),
            &format!("{}/bad", server.uri()),
            &[],
            &json!({}),
            fast_retry(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Api { status: 401, ref message } if message == "invalid api key"
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let err = post_json_with_retry::<_, serde_json::Value>(
            &Client::new(),
            &server.uri(),
            &[],
            &json!({}),
            fast_retry(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { retries: 3 }));
    }
}
