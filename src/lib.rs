//! Account Planner - conversational company research assistant
//!
//! Researches a company over a multi-turn conversation and maintains a
//! five-section account plan (Overview, Products, Competitors, Opportunities,
//! Risks) that the user can refine section by section.
//!
//! ## Turn pipeline
//!
//! utterance -> IntentClassifier + EntityNormalizer -> clarification gate
//! -> handler (DocumentBuilder) -> SessionState -> persona styling -> reply
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use account_planner::{AgentConfig, DialogueOrchestrator};
//!
//! # async fn run() -> account_planner::error::Result<()> {
//! let mut agent = DialogueOrchestrator::offline(AgentConfig::default())?;
//! let out = agent.process_turn("Research Microsoft").await;
//! println!("{}", out.display_text);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Thresholds and generator settings
pub mod config;

// Mention -> canonical entity
pub mod entity_linking;

// Utterance -> intent
pub mod intent;

// Per-conversation state and persona
pub mod session;

// Account plan document, builder and rendering
pub mod document;

// Fact lookup and text generation collaborators
pub mod research;

// The per-turn state machine
pub mod dialogue;

pub use config::AgentConfig;
pub use dialogue::{DialogueOrchestrator, TurnOutput};
pub use document::{Document, DocumentBuilder, SectionKey};
pub use entity_linking::{Candidate, EntityIndex, EntityNormalizer, Resolution, ResolutionMethod};
pub use error::{AgentError, CollaboratorError, ConfigError};
pub use intent::{Intent, IntentClassifier};
pub use session::{DialoguePhase, Persona, SessionState};
