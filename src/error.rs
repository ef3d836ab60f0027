//! Error handling for the account planner
//!
//! Every failure the dialogue core can observe is one of these types. None of
//! them is fatal to a session: the orchestrator turns each into a user-visible
//! message and leaves the session at its pre-turn values.

use thiserror::Error;

/// Main error type for the dialogue core
#[derive(Error, Debug)]
pub enum AgentError {
    /// No candidate entity was found for a mention
    #[error("No entity matched '{mention}'")]
    ResolutionFailed { mention: String },

    /// An update targeted a section outside the fixed five
    #[error("Unknown section '{section}'")]
    InvalidSection { section: String },

    /// An update or render needs a document that does not exist yet
    #[error("No document exists yet")]
    NoDocument,

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failures reported by the lookup or generation collaborators
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    /// Output did not conform to the requested schema
    #[error("Output does not match schema '{schema}': {reason}")]
    Malformed { schema: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CollaboratorError {
    pub fn malformed(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        CollaboratorError::Malformed {
            schema: schema.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Entity catalog could not be loaded: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
