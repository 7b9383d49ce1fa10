//! Local Ollama `/api/generate` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{
    build_http_client, execute, join_url, parse_body, CompletionRequest, LlmClient, LlmError,
};

const PROVIDER: &str = "ollama";

#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self { http: build_http_client(timeout)?, base_url: base_url.into(), model: model.into() })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(
            event_name = "agent.llm.request",
            provider = PROVIDER,
            model = %self.model,
            base_url = %self.base_url,
            "invoking ollama"
        );

        let body = GenerateRequest {
            model: &self.model,
            system: &request.system,
            prompt: &request.prompt,
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: request.temperature },
        };

        let http_request = self.http.post(join_url(&self.base_url, "api/generate")).json(&body);
        let raw = execute(http_request, PROVIDER).await?;
        let response: GenerateResponse = parse_body(&raw, PROVIDER)?;

        if response.response.trim().is_empty() {
            return Err(LlmError::MalformedResponse("ollama returned an empty response".to_string()));
        }
        Ok(response.response)
    }
}
