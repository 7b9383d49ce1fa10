use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, warn};
use uuid::Uuid;

use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use crate::errors::{normalize_failure, UNKNOWN_ERROR_MESSAGE};
use crate::generation::engine::GenerationEngine;
use crate::generation::service::QuoteService;
use crate::generation::states::{
    GenerationEvent, GenerationSnapshot, GenerationState, GuardRejection, RequestOutcome,
    TransitionOutcome,
};

/// Drives one session's generation lifecycle against a [`QuoteService`].
///
/// At most one request is in flight per controller: the guard check and the
/// transition to `Loading` happen in a single critical section on the state
/// cell, and the cell is never locked across the service call. Every state
/// change is published to subscribers.
pub struct GenerationController<S: ?Sized> {
    service: Arc<S>,
    state: Arc<watch::Sender<GenerationState>>,
    engine: GenerationEngine,
    audit: Arc<dyn AuditSink>,
    session_id: Option<String>,
    actor: String,
}

impl<S> GenerationController<S>
where
    S: QuoteService + ?Sized,
{
    pub fn new(service: Arc<S>) -> Self {
        Self::with_audit(service, Arc::new(TracingAuditSink))
    }

    pub fn with_audit(service: Arc<S>, audit: Arc<dyn AuditSink>) -> Self {
        let engine = GenerationEngine::new();
        let (state, _) = watch::channel(engine.initial_state());
        Self {
            service,
            state: Arc::new(state),
            engine,
            audit,
            session_id: None,
            actor: "controller".to_owned(),
        }
    }

    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn state(&self) -> GenerationState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> GenerationSnapshot {
        self.state.borrow().snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Receiver notified on every state change, for re-rendering.
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    pub fn set_keywords(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|state| state.set_keywords(text));
    }

    /// Runs one request to settlement. A rejected call changes nothing and
    /// invokes nothing.
    pub async fn request_generation(&self) -> RequestOutcome {
        match self.start_generation() {
            Ok(pending) => pending.run().await,
            Err(reason) => RequestOutcome::Rejected { reason },
        }
    }

    /// Applies the guard and moves to `Loading`, returning the rest of the
    /// request as a value that can be awaited or spawned.
    ///
    /// If the returned request is dropped before it settles, the state is
    /// settled as failed with the generic message.
    pub fn start_generation(&self) -> Result<PendingGeneration<S>, GuardRejection> {
        let engine = self.engine;
        let context = AuditContext::new(
            self.session_id.clone(),
            Uuid::new_v4().to_string(),
            self.actor.clone(),
        );

        let mut decision: Result<(String, TransitionOutcome), GuardRejection> =
            Err(GuardRejection::AlreadyLoading);
        self.state.send_if_modified(|state| {
            decision = engine.guard(state).and_then(|()| {
                let keywords = state.keywords().trimmed().to_owned();
                engine
                    .apply(state, GenerationEvent::RequestAccepted)
                    .map(|transition| (keywords, transition))
                    .map_err(|_| GuardRejection::AlreadyLoading)
            });
            decision.is_ok()
        });

        match decision {
            Err(reason) => {
                self.audit.emit(
                    AuditEvent::new(
                        &context,
                        "generation.request_rejected",
                        AuditCategory::Ingress,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("reason", reason.as_str()),
                );
                Err(reason)
            }
            Ok((keywords, transition)) => {
                self.audit.emit(
                    AuditEvent::new(
                        &context,
                        "generation.started",
                        AuditCategory::Generation,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", transition.from))
                    .with_metadata("to", format!("{:?}", transition.to))
                    .with_metadata("keywords", keywords.clone()),
                );
                Ok(PendingGeneration {
                    service: Arc::clone(&self.service),
                    keywords,
                    settlement: Settlement {
                        state: Arc::clone(&self.state),
                        engine,
                        audit: Arc::clone(&self.audit),
                        context,
                        settled: false,
                    },
                })
            }
        }
    }
}

/// An accepted request whose service call has not settled yet.
pub struct PendingGeneration<S: ?Sized> {
    service: Arc<S>,
    keywords: String,
    settlement: Settlement,
}

impl<S> PendingGeneration<S>
where
    S: QuoteService + ?Sized,
{
    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn correlation_id(&self) -> &str {
        &self.settlement.context.correlation_id
    }

    pub async fn run(mut self) -> RequestOutcome {
        let result = self.service.generate(&self.keywords).await;
        match result {
            Ok(quotes) => {
                let quote_count = quotes.len();
                self.settlement.settle(
                    GenerationEvent::ServiceResolved(quotes),
                    "generation.succeeded",
                    AuditOutcome::Success,
                    vec![("quote_count", quote_count.to_string())],
                );
                RequestOutcome::Succeeded { quote_count }
            }
            Err(failure) => {
                let message = normalize_failure(&failure);
                self.settlement.settle(
                    GenerationEvent::ServiceRejected(message.clone()),
                    "generation.failed",
                    AuditOutcome::Failed,
                    vec![("error_kind", failure.kind().to_owned()), ("error", failure.to_string())],
                );
                RequestOutcome::Failed { message }
            }
        }
    }
}

struct Settlement {
    state: Arc<watch::Sender<GenerationState>>,
    engine: GenerationEngine,
    audit: Arc<dyn AuditSink>,
    context: AuditContext,
    settled: bool,
}

impl Settlement {
    fn settle(
        &mut self,
        event: GenerationEvent,
        event_type: &'static str,
        outcome: AuditOutcome,
        metadata: Vec<(&'static str, String)>,
    ) {
        self.settled = true;
        let engine = self.engine;

        let mut applied = None;
        self.state.send_if_modified(|state| {
            let result = engine.apply(state, event);
            let changed = result.is_ok();
            applied = Some(result);
            changed
        });

        match applied {
            Some(Ok(transition)) => {
                let audit_event = metadata.into_iter().fold(
                    AuditEvent::new(&self.context, event_type, AuditCategory::Generation, outcome)
                        .with_metadata("from", format!("{:?}", transition.from))
                        .with_metadata("to", format!("{:?}", transition.to)),
                    |event, (key, value)| event.with_metadata(key, value),
                );
                self.audit.emit(audit_event);
            }
            Some(Err(transition_error)) => {
                error!(
                    event_name = "generation.settlement_rejected",
                    correlation_id = %self.context.correlation_id,
                    session_id = self.context.session_id.as_deref().unwrap_or("unknown"),
                    error = %transition_error,
                    "settlement did not apply to the current phase"
                );
            }
            None => {}
        }
    }
}

impl Drop for Settlement {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!(
            event_name = "generation.abandoned",
            correlation_id = %self.context.correlation_id,
            session_id = self.context.session_id.as_deref().unwrap_or("unknown"),
            "in-flight generation dropped before settlement"
        );
        self.settle(
            GenerationEvent::ServiceRejected(UNKNOWN_ERROR_MESSAGE.to_owned()),
            "generation.abandoned",
            AuditOutcome::Failed,
            Vec::new(),
        );
    }
}
