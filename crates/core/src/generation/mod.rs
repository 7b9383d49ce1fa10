pub mod controller;
pub mod engine;
pub mod service;
pub mod states;

pub use controller::{GenerationController, PendingGeneration};
pub use engine::{GenerationEngine, GenerationTransitionError};
pub use service::QuoteService;
pub use states::{
    GenerationEvent, GenerationEventKind, GenerationSnapshot, GenerationState, GuardRejection,
    Phase, PhaseKind, RequestOutcome, TransitionOutcome,
};
