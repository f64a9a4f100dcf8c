//! AWS Bedrock backend. Claude models take an Anthropic messages body; Titan
//! models take `inputText` with a generation config.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::config::Credentials;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::anthropic::LlmResponse;
use super::{GenerationConfig, LlmError, LlmProvider, ProviderKind};
use crate::config::LlmSettings;

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFamily {
    Claude,
    Titan,
}

impl ModelFamily {
    fn of(model_id: &str) -> Result<Self, LlmError> {
        if model_id.contains("anthropic.claude") {
            Ok(ModelFamily::Claude)
        } else if model_id.contains("amazon.titan") {
            Ok(ModelFamily::Titan)
        } else {
            Err(LlmError::UnsupportedModel(model_id.to_string()))
        }
    }

    fn request_body(self, prompt: &str, system: Option<&str>, config: &GenerationConfig) -> Value {
        match self {
            ModelFamily::Claude => {
                let mut body = json!({
                    "anthropic_version": BEDROCK_ANTHROPIC_VERSION,
                    "max_tokens": config.max_tokens,
                    "temperature": config.temperature,
                    "messages": [{"role": "user", "content": prompt}],
                });
                if let Some(system) = system {
                    body["system"] = Value::String(system.to_string());
                }
                body
            }
            // Titan has no system slot; the system prompt is prepended.
            ModelFamily::Titan => {
                let input = match system {
                    Some(system) => format!("{system}\n\n{prompt}"),
                    None => prompt.to_string(),
                };
                json!({
                    "inputText": input,
                    "textGenerationConfig": {
                        "maxTokenCount": config.max_tokens,
                        "temperature": config.temperature,
                    },
                })
            }
        }
    }

    fn reply_text(self, body: &[u8]) -> Result<String, LlmError> {
        let text = match self {
            ModelFamily::Claude => serde_json::from_slice::<LlmResponse>(body)?
                .text()
                .map(str::to_string),
            ModelFamily::Titan => serde_json::from_slice::<TitanResponse>(body)?
                .results
                .into_iter()
                .next()
                .map(|r| r.output_text),
        };
        text.filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[derive(Debug, Deserialize)]
struct TitanResponse {
    results: Vec<TitanResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitanResult {
    output_text: String,
}

#[derive(Clone)]
pub struct BedrockProvider {
    client: Client,
    family: ModelFamily,
    config: GenerationConfig,
}

impl BedrockProvider {
    /// Uses static credentials when both keys are configured, otherwise the
    /// default AWS credential chain.
    pub async fn from_settings(
        settings: &LlmSettings,
        config: GenerationConfig,
    ) -> Result<Self, LlmError> {
        let family = ModelFamily::of(&config.model)?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.aws_region.clone()));
        if let (Some(key_id), Some(secret)) = (
            settings.aws_access_key_id.as_deref(),
            settings.aws_secret_access_key.as_deref(),
        ) {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "prep-static",
            ));
        }
        let sdk_config = loader.load().await;

        Ok(Self {
            client: Client::new(&sdk_config),
            family,
            config,
        })
    }
}

#[async_trait]
impl LlmProvider for BedrockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bedrock
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let body = self.family.request_body(prompt, system, &self.config);

        let output = self
            .client
            .invoke_model()
            .model_id(&self.config.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(serde_json::to_vec(&body)?))
            .send()
            .await
            .map_err(|e| LlmError::Provider(format!("Bedrock: {}", DisplayErrorContext(&e))))?;

        debug!("Bedrock call succeeded: model={}", self.config.model);

        self.family.reply_text(output.body().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GenerationConfig {
        GenerationConfig {
            model: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            temperature: 0.5,
            max_tokens: 512,
        }
    }

    #[test]
    fn test_family_from_model_id() {
        assert_eq!(
            ModelFamily::of("anthropic.claude-v2").unwrap(),
            ModelFamily::Claude
        );
        assert_eq!(
            ModelFamily::of("amazon.titan-text-lite-v1").unwrap(),
            ModelFamily::Titan
        );
        assert!(matches!(
            ModelFamily::of("meta.llama3-8b"),
            Err(LlmError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_claude_body_carries_version_and_system() {
        let body = ModelFamily::Claude.request_body("hi", Some("be terse"), &config());
        assert_eq!(body["anthropic_version"], BEDROCK_ANTHROPIC_VERSION);
        assert_eq!(body["system"], "be terse");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_titan_body_prepends_system() {
        let body = ModelFamily::Titan.request_body("hi", Some("be terse"), &config());
        assert_eq!(body["inputText"], "be terse\n\nhi");
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 512);
    }

    #[test]
    fn test_reply_text_per_family() {
        let claude = br#"{"content": [{"type": "text", "text": "claude says"}]}"#;
        assert_eq!(ModelFamily::Claude.reply_text(claude).unwrap(), "claude says");

        let titan = br#"{"results": [{"outputText": "titan says", "tokenCount": 3}]}"#;
        assert_eq!(ModelFamily::Titan.reply_text(titan).unwrap(), "titan says");

        let empty = br#"{"results": []}"#;
        assert!(matches!(
            ModelFamily::Titan.reply_text(empty),
            Err(LlmError::EmptyContent)
        ));
    }
}
