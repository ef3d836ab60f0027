//! Turn-by-turn dialogue handling

pub mod orchestrator;
pub mod response;

pub use orchestrator::DialogueOrchestrator;
pub use response::{Reply, ReplyKind, TurnOutput};
