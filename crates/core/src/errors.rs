use thiserror::Error;

use crate::generation::GenerationTransitionError;

/// Shown when a generation failure carries no descriptive message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Failure reported by a quote service. Causes are opaque to the controller beyond
/// whether a descriptive message is available.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuoteServiceError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("unknown failure")]
    Unknown,
}

impl QuoteServiceError {
    /// The failure's own descriptive message, if it carries a non-blank one.
    pub fn description(&self) -> Option<&str> {
        let message = match self {
            Self::Auth(message)
            | Self::RateLimited(message)
            | Self::MalformedResponse(message)
            | Self::Transport(message)
            | Self::Timeout(message)
            | Self::Upstream { message, .. } => message.as_str(),
            Self::Unknown => return None,
        };
        let message = message.trim();
        (!message.is_empty()).then_some(message)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::RateLimited(_) => "rate_limited",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
            Self::Upstream { .. } => "upstream",
            Self::Unknown => "unknown",
        }
    }
}

/// User-facing text for a generation failure.
pub fn normalize_failure(error: &QuoteServiceError) -> String {
    error.description().map(str::to_owned).unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_owned())
}

/// Banner text for a normalized failure message. The generic fallback is
/// shown as is.
pub fn failure_banner(message: &str) -> String {
    if message == UNKNOWN_ERROR_MESSAGE {
        message.to_owned()
    } else {
        format!("Failed to generate quotes: {message}")
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    GenerationTransition(#[from] GenerationTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("session `{0}` was not found")]
    SessionNotFound(String),
    #[error("all {0} session slots are busy generating")]
    SessionCapacity(usize),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested session does not exist. Start a new one.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(_) => {
                Self::BadRequest { message: "domain validation failed".to_owned(), correlation_id }
            }
            ApplicationError::SessionNotFound(id) => {
                Self::NotFound { message: format!("session `{id}` was not found"), correlation_id }
            }
            ApplicationError::SessionCapacity(limit) => Self::ServiceUnavailable {
                message: format!("all {limit} session slots are busy generating"),
                correlation_id,
            },
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
