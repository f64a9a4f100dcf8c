use anyhow::{bail, Context, Result};

use crate::llm_client::{ollama, ProviderKind};

/// Application configuration loaded from environment variables.
/// Fails at startup if the selected provider's credentials are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmSettings,
}

/// Provider selection and sampling settings, passed explicitly to `build_provider`.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub ollama_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider: ProviderKind = get("LLM_PROVIDER")
            .unwrap_or_else(|| ProviderKind::Ollama.as_str().to_string())
            .parse()
            .context("LLM_PROVIDER must be one of openai, anthropic, bedrock, ollama")?;

        let llm = LlmSettings {
            provider,
            model: get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            temperature: parse_or(get("LLM_TEMPERATURE"), 0.7, "LLM_TEMPERATURE")?,
            max_tokens: parse_or(get("LLM_MAX_TOKENS"), 2000, "LLM_MAX_TOKENS")?,
            timeout_secs: parse_or(get("LLM_TIMEOUT_SECS"), 120, "LLM_TIMEOUT_SECS")?,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_base_url: get("ANTHROPIC_BASE_URL"),
            aws_region: get("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            ollama_base_url: get("OLLAMA_BASE_URL")
                .unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string()),
        };

        if !(0.0..=2.0).contains(&llm.temperature) {
            bail!("LLM_TEMPERATURE must be between 0.0 and 2.0");
        }
        match llm.provider {
            ProviderKind::OpenAi if llm.openai_api_key.is_none() => {
                bail!("Required environment variable 'OPENAI_API_KEY' is not set")
            }
            ProviderKind::Anthropic if llm.anthropic_api_key.is_none() => {
                bail!("Required environment variable 'ANTHROPIC_API_KEY' is not set")
            }
            _ => {}
        }

        Ok(Config {
            port: parse_or(get("PORT"), 8080, "PORT")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            llm,
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T, key: &str) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
    }
}
