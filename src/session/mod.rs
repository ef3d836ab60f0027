//! Per-conversation state and persona derivation

pub mod persona;
pub mod state;

pub use persona::{Persona, PersonaClassifier, Signal, Signals};
pub use state::{
    DialoguePhase, HistoryEntry, PendingCandidate, PendingUpdate, PhaseKind, SessionState,
    Speaker,
};
