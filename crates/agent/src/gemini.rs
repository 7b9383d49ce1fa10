//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{
    build_http_client, execute, join_url, parse_body, CompletionRequest, LlmClient, LlmError,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const PROVIDER: &str = "gemini";

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: SecretString,
        base_url: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(LlmError::Misconfiguration("gemini api key is empty".to_string()));
        }

        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        join_url(&self.base_url, &format!("v1beta/models/{}:generateContent", self.model))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn candidate_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    if let Some(reason) = response.prompt_feedback.and_then(|feedback| feedback.block_reason) {
        return Err(LlmError::MalformedResponse(format!("gemini blocked the prompt: {reason}")));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(LlmError::MalformedResponse("gemini returned no candidates".to_string()));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(LlmError::MalformedResponse(format!(
            "gemini returned an empty candidate (finish reason: {reason})"
        )));
    }

    Ok(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
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
            "invoking gemini"
        );

        let body = GenerateContentRequest {
            system_instruction: Content { role: None, parts: vec![Part { text: &request.system }] },
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: &request.prompt }] }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type: "application/json",
            },
        };

        let http_request = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body);

        let raw = execute(http_request, PROVIDER).await?;
        candidate_text(parse_body(&raw, PROVIDER)?)
    }
}
