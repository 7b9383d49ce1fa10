pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod generation;

pub use audit::{AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use domain::quote::{Keywords, QuoteData, QuoteEntry};
pub use errors::{
    failure_banner, normalize_failure, ApplicationError, DomainError, InterfaceError,
    QuoteServiceError, UNKNOWN_ERROR_MESSAGE,
};
pub use generation::{
    GenerationController, GenerationSnapshot, GenerationState, GuardRejection, Phase, PhaseKind,
    QuoteService, RequestOutcome,
};
