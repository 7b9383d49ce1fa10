//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{
    build_http_client, execute, join_url, parse_body, CompletionRequest, LlmClient, LlmError,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const PROVIDER: &str = "openai";

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: SecretString,
        base_url: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(LlmError::Misconfiguration("openai api key is empty".to_string()));
        }

        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: model.into(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
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
            temperature = request.temperature,
            "invoking openai"
        );

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: request.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let http_request = self
            .http
            .post(join_url(&self.base_url, "v1/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body);

        let raw = execute(http_request, PROVIDER).await?;
        let response: ChatResponse = parse_body(&raw, PROVIDER)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::MalformedResponse("openai returned no message content".to_string()))
    }
}
