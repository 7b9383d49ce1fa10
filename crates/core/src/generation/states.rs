use serde::{Deserialize, Serialize};

use crate::domain::quote::{Keywords, QuoteData};

/// Lifecycle phase of the current generation request.
///
/// The payload of the settled phases is carried by the variant, so quotes and
/// error message can never be present together, and neither exists while loading.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Succeeded(QuoteData),
    Failed(String),
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::Idle => PhaseKind::Idle,
            Self::Loading => PhaseKind::Loading,
            Self::Succeeded(_) => PhaseKind::Succeeded,
            Self::Failed(_) => PhaseKind::Failed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl PhaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationState {
    keywords: Keywords,
    phase: Phase,
}

impl GenerationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the keywords unconditionally. The phase is left untouched, so
    /// edits made while a request is in flight do not affect it.
    pub fn set_keywords(&mut self, text: impl Into<String>) {
        self.keywords = Keywords::new(text);
    }

    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn quotes(&self) -> Option<&QuoteData> {
        match &self.phase {
            Phase::Succeeded(quotes) => Some(quotes),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    pub fn snapshot(&self) -> GenerationSnapshot {
        GenerationSnapshot {
            keywords: self.keywords.as_str().to_owned(),
            phase: self.phase_kind(),
            is_loading: self.is_loading(),
            quotes: self.quotes().cloned(),
            error_message: self.error_message().map(str::to_owned),
        }
    }

    pub(crate) fn replace_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

/// Read-only view handed to presentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSnapshot {
    pub keywords: String,
    pub phase: PhaseKind,
    pub is_loading: bool,
    pub quotes: Option<QuoteData>,
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationEvent {
    RequestAccepted,
    ServiceResolved(QuoteData),
    ServiceRejected(String),
}

impl GenerationEvent {
    pub fn kind(&self) -> GenerationEventKind {
        match self {
            Self::RequestAccepted => GenerationEventKind::RequestAccepted,
            Self::ServiceResolved(_) => GenerationEventKind::ServiceResolved,
            Self::ServiceRejected(_) => GenerationEventKind::ServiceRejected,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationEventKind {
    RequestAccepted,
    ServiceResolved,
    ServiceRejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PhaseKind,
    pub to: PhaseKind,
    pub event: GenerationEventKind,
}

/// Why a generation request was ignored. Never surfaced to the user as an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardRejection {
    EmptyKeywords,
    AlreadyLoading,
}

impl GuardRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyKeywords => "empty_keywords",
            Self::AlreadyLoading => "already_loading",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestOutcome {
    Rejected { reason: GuardRejection },
    Succeeded { quote_count: usize },
    Failed { message: String },
}

impl RequestOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::quote::{QuoteData, QuoteEntry};
    use crate::generation::states::{GenerationState, Phase, PhaseKind};

    #[test]
    fn new_state_is_idle_with_empty_keywords() {
        let state = GenerationState::new();

        assert_eq!(state.phase(), &Phase::Idle);
        assert_eq!(state.keywords().as_str(), "");
        assert!(state.quotes().is_none());
        assert!(state.error_message().is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn accessors_follow_the_phase_payload() {
        let mut state = GenerationState::new();
        let quotes = QuoteData::new(vec![QuoteEntry::new("...")]);

        state.replace_phase(Phase::Succeeded(quotes.clone()));
        assert_eq!(state.quotes(), Some(&quotes));
        assert_eq!(state.error_message(), None);

        state.replace_phase(Phase::Failed("rate limited".to_owned()));
        assert_eq!(state.quotes(), None);
        assert_eq!(state.error_message(), Some("rate limited"));

        state.replace_phase(Phase::Loading);
        assert_eq!(state.quotes(), None);
        assert_eq!(state.error_message(), None);
    }

    #[test]
    fn set_keywords_leaves_phase_untouched() {
        let mut state = GenerationState::new();
        state.replace_phase(Phase::Loading);

        state.set_keywords("rain");

        assert_eq!(state.keywords().as_str(), "rain");
        assert_eq!(state.phase_kind(), PhaseKind::Loading);
    }

    #[test]
    fn snapshot_exposes_phase_derived_flags() {
        let mut state = GenerationState::new();
        state.set_keywords(" courage ");
        state.replace_phase(Phase::Failed("rate limited".to_owned()));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.keywords, " courage ");
        assert_eq!(snapshot.phase, PhaseKind::Failed);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.error_message.as_deref(), Some("rate limited"));
        assert!(snapshot.quotes.is_none());

        let json = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(json["phase"], "failed");
    }
}
