//! External collaborators: fact lookup and text generation
//!
//! The dialogue core only sees the [`FactLookup`] and [`TextGenerator`]
//! traits. Bundled implementations cover offline use ([`StaticFactLookup`],
//! [`OfflineGenerator`]) and the Anthropic API ([`ClaudeGenerator`]).

pub mod extraction;
pub mod llm_client;
pub mod lookup;
pub mod prompts;

pub use extraction::NameExtractor;
pub use llm_client::{ClaudeGenerator, OfflineGenerator, SchemaDescriptor, TextGenerator};
pub use lookup::{FactLookup, Facts, LookupOutcome, StaticFactLookup};
pub use prompts::PromptRenderer;
