use std::time::Duration;

use async_trait::async_trait;
use quotecraft_core::QuoteServiceError;
use thiserror::Error;
use tracing::debug;

/// One instruction/prompt pair sent to a model.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    MalformedResponse(String),
    #[error("llm client misconfigured: {0}")]
    Misconfiguration(String),
}

impl From<LlmError> for QuoteServiceError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::Auth(message) => Self::Auth(message),
            LlmError::RateLimited(message) => Self::RateLimited(message),
            LlmError::Upstream { status, message } => Self::Upstream { status, message },
            LlmError::Transport(message) | LlmError::Misconfiguration(message) => {
                Self::Transport(message)
            }
            LlmError::Timeout(message) => Self::Timeout(message),
            LlmError::MalformedResponse(message) => Self::MalformedResponse(message),
        }
    }
}

/// Text completion against one model provider. Implementations return the raw
/// model output; interpreting it is the caller's job.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .map_err(|err| LlmError::Misconfiguration(format!("failed to build HTTP client: {err}")))
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Sends the request and returns the body of a 2xx response.
pub(crate) async fn execute(
    request: reqwest::RequestBuilder,
    provider: &'static str,
) -> Result<String, LlmError> {
    let response = request.send().await.map_err(|err| transport_error(provider, err))?;
    let status = response.status();
    let body = response.text().await.map_err(|err| transport_error(provider, err))?;

    debug!(
        event_name = "agent.llm.response",
        provider,
        status = status.as_u16(),
        body_bytes = body.len(),
        "llm provider responded"
    );

    if status.is_success() {
        Ok(body)
    } else {
        Err(classify_status(status.as_u16(), &body))
    }
}

pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(
    body: &str,
    provider: &'static str,
) -> Result<T, LlmError> {
    serde_json::from_str(body).map_err(|err| {
        LlmError::MalformedResponse(format!("could not decode {provider} response: {err}"))
    })
}

fn transport_error(provider: &'static str, error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout(format!("{provider} did not respond in time"))
    } else {
        LlmError::Transport(format!("could not reach {provider}: {error}"))
    }
}

/// Maps a non-success status and its body onto an error kind.
pub fn classify_status(status: u16, body: &str) -> LlmError {
    let message = error_message(body).unwrap_or_else(|| default_reason(status).to_string());
    match status {
        401 | 403 => LlmError::Auth(message),
        429 => LlmError::RateLimited(message),
        _ => LlmError::Upstream { status, message },
    }
}

fn default_reason(status: u16) -> &'static str {
    match status {
        401 => "unauthorized",
        403 => "forbidden",
        429 => "rate limited",
        500..=599 => "upstream service error",
        _ => "unexpected upstream response",
    }
}

// Providers report errors as {"error": {"message": ...}} or {"error": "..."}.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => match value.get("error") {
            Some(serde_json::Value::String(message)) => Some(message.clone()),
            Some(error) => error.get("message").and_then(|m| m.as_str()).map(str::to_owned),
            None => value.get("message").and_then(|m| m.as_str()).map(str::to_owned),
        },
        Err(_) => Some(trimmed.chars().take(200).collect()),
    };

    message.map(|message| message.trim().to_owned()).filter(|message| !message.is_empty())
}
