use thiserror::Error;

use crate::generation::states::{
    GenerationEvent, GenerationEventKind, GenerationState, GuardRejection, Phase, PhaseKind,
    TransitionOutcome,
};

/// Pure transition table for the generation lifecycle:
/// `Idle -> Loading -> {Succeeded, Failed}`, and back to `Loading` from either
/// settled phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenerationEngine;

impl GenerationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_state(&self) -> GenerationState {
        GenerationState::new()
    }

    /// Checks whether a new request may start from `state`.
    pub fn guard(&self, state: &GenerationState) -> Result<(), GuardRejection> {
        if state.keywords().is_blank() {
            return Err(GuardRejection::EmptyKeywords);
        }
        if state.is_loading() {
            return Err(GuardRejection::AlreadyLoading);
        }
        Ok(())
    }

    /// Applies `event` to `state`. The state is left untouched when the
    /// transition is rejected.
    pub fn apply(
        &self,
        state: &mut GenerationState,
        event: GenerationEvent,
    ) -> Result<TransitionOutcome, GenerationTransitionError> {
        let from = state.phase_kind();
        let kind = event.kind();

        let next = match (state.phase(), event) {
            (Phase::Idle | Phase::Succeeded(_) | Phase::Failed(_), GenerationEvent::RequestAccepted) => {
                Phase::Loading
            }
            (Phase::Loading, GenerationEvent::ServiceResolved(quotes)) => Phase::Succeeded(quotes),
            (Phase::Loading, GenerationEvent::ServiceRejected(message)) => Phase::Failed(message),
            _ => {
                return Err(GenerationTransitionError::InvalidTransition { state: from, event: kind });
            }
        };

        state.replace_phase(next);
        Ok(TransitionOutcome { from, to: state.phase_kind(), event: kind })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: PhaseKind, event: GenerationEventKind },
}

#[cfg(test)]
mod tests {
    use crate::domain::quote::{QuoteData, QuoteEntry};
    use crate::generation::engine::{GenerationEngine, GenerationTransitionError};
    use crate::generation::states::{
        GenerationEvent, GenerationEventKind, GenerationState, GuardRejection, Phase, PhaseKind,
    };

    fn quotes() -> QuoteData {
        QuoteData::new(vec![QuoteEntry::new("Courage is grace under pressure.")])
    }

    #[test]
    fn happy_path_reaches_succeeded() {
        let engine = GenerationEngine::new();
        let mut state = engine.initial_state();

        let started =
            engine.apply(&mut state, GenerationEvent::RequestAccepted).expect("idle -> loading");
        assert_eq!(started.from, PhaseKind::Idle);
        assert_eq!(started.to, PhaseKind::Loading);

        let settled = engine
            .apply(&mut state, GenerationEvent::ServiceResolved(quotes()))
            .expect("loading -> succeeded");
        assert_eq!(settled.to, PhaseKind::Succeeded);
        assert_eq!(settled.event, GenerationEventKind::ServiceResolved);
        assert_eq!(state.quotes(), Some(&quotes()));
    }

    #[test]
    fn settled_phases_cycle_back_to_loading() {
        let engine = GenerationEngine::new();
        let mut state = GenerationState::new();

        engine.apply(&mut state, GenerationEvent::RequestAccepted).expect("start");
        engine
            .apply(&mut state, GenerationEvent::ServiceRejected("rate limited".to_owned()))
            .expect("fail");
        assert_eq!(state.error_message(), Some("rate limited"));

        engine.apply(&mut state, GenerationEvent::RequestAccepted).expect("failed -> loading");
        assert_eq!(state.phase(), &Phase::Loading);
        assert!(state.error_message().is_none());

        engine.apply(&mut state, GenerationEvent::ServiceResolved(quotes())).expect("resolve");
        engine.apply(&mut state, GenerationEvent::RequestAccepted).expect("succeeded -> loading");
        assert!(state.quotes().is_none());
    }

    #[test]
    fn settlement_outside_loading_is_rejected_and_leaves_state_alone() {
        let engine = GenerationEngine::new();
        let mut state = GenerationState::new();

        let error = engine
            .apply(&mut state, GenerationEvent::ServiceResolved(quotes()))
            .expect_err("idle cannot settle");

        assert_eq!(
            error,
            GenerationTransitionError::InvalidTransition {
                state: PhaseKind::Idle,
                event: GenerationEventKind::ServiceResolved,
            }
        );
        assert_eq!(state.phase(), &Phase::Idle);
    }

    #[test]
    fn loading_cannot_accept_a_second_request() {
        let engine = GenerationEngine::new();
        let mut state = GenerationState::new();
        engine.apply(&mut state, GenerationEvent::RequestAccepted).expect("start");

        let error = engine
            .apply(&mut state, GenerationEvent::RequestAccepted)
            .expect_err("loading -> loading is not a transition");
        assert!(matches!(error, GenerationTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn guard_rejects_blank_keywords_before_loading() {
        let engine = GenerationEngine::new();
        let mut state = GenerationState::new();

        state.set_keywords("   ");
        assert_eq!(engine.guard(&state), Err(GuardRejection::EmptyKeywords));

        state.set_keywords("rain");
        assert_eq!(engine.guard(&state), Ok(()));

        engine.apply(&mut state, GenerationEvent::RequestAccepted).expect("start");
        assert_eq!(engine.guard(&state), Err(GuardRejection::AlreadyLoading));
    }
}
