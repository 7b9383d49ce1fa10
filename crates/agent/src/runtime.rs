use std::sync::Arc;
use std::time::Duration;

use quotecraft_core::config::{LlmConfig, LlmProvider};
use quotecraft_core::QuoteService;
use tracing::info;

use crate::gemini::GeminiClient;
use crate::llm::LlmError;
use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;
use crate::quote_service::{LlmQuoteService, StaticQuoteService};

/// Builds the quote service selected by `config.provider`.
pub fn build_quote_service(config: &LlmConfig) -> Result<Arc<dyn QuoteService>, LlmError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let service: Arc<dyn QuoteService> = match config.provider {
        LlmProvider::Gemini => {
            let api_key = required_key(config)?;
            let client =
                GeminiClient::new(api_key, config.base_url.clone(), &config.model, timeout)?;
            Arc::new(LlmQuoteService::new(client, config.quote_count, config.temperature))
        }
        LlmProvider::OpenAi => {
            let api_key = required_key(config)?;
            let client =
                OpenAiClient::new(api_key, config.base_url.clone(), &config.model, timeout)?;
            Arc::new(LlmQuoteService::new(client, config.quote_count, config.temperature))
        }
        LlmProvider::Ollama => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                LlmError::Misconfiguration("llm.base_url is required for ollama".to_string())
            })?;
            let client = OllamaClient::new(base_url, &config.model, timeout)?;
            Arc::new(LlmQuoteService::new(client, config.quote_count, config.temperature))
        }
        LlmProvider::Static => Arc::new(StaticQuoteService::default()),
    };

    info!(
        event_name = "agent.quote_service.ready",
        provider = config.provider.as_str(),
        model = %config.model,
        timeout_secs = config.timeout_secs,
        "quote service initialized"
    );

    Ok(service)
}

/// Short human label for the configured provider, e.g. `gemini (gemini-2.5-flash)`.
pub fn describe_provider(config: &LlmConfig) -> String {
    match config.provider {
        LlmProvider::Static => "static".to_string(),
        provider => format!("{} ({})", provider.as_str(), config.model),
    }
}

fn required_key(config: &LlmConfig) -> Result<secrecy::SecretString, LlmError> {
    config.api_key.clone().ok_or_else(|| {
        LlmError::Misconfiguration(format!(
            "llm.api_key is required for the {} provider",
            config.provider.as_str()
        ))
    })
}
