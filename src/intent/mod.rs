//! Intent classification
//!
//! Every utterance maps to exactly one [`Intent`]. Classification is a fixed,
//! ordered list of rule matchers (see [`classifier::RULES`]); the first rule
//! that produces an intent wins.

pub mod classifier;

pub use classifier::IntentClassifier;

use serde::{Deserialize, Serialize};

/// What the user asked for in one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "args", rename_all = "snake_case")]
pub enum Intent {
    Help,
    Exit,
    ShowPlan,

    /// Accept the pending candidate (CLARIFYING only)
    Confirm,
    /// Reject the pending candidate, or cancel a pending update
    Deny,
    /// Pick numbered option `n` (1-based, CLARIFYING only)
    Select(usize),

    Research {
        mention: String,
    },

    /// `update <section> with: <content>`. A missing or pronoun section
    /// ("update it with ...") is `None`.
    Update {
        section: Option<String>,
        content: Option<String>,
    },

    /// Free text answering "which section?" (AWAITING_UPDATE_TARGET only)
    SectionAnswer {
        text: String,
    },

    /// Conversational input unrelated to the task
    OffTopic,
    /// Noise that matches no rule
    Unknown,
}

impl Intent {
    /// Control intents behave identically in every phase.
    pub fn is_control(&self) -> bool {
        matches!(self, Intent::Help | Intent::Exit | Intent::ShowPlan)
    }

    /// Intents that answer a pending clarification.
    pub fn resolves_clarification(&self) -> bool {
        matches!(self, Intent::Confirm | Intent::Deny | Intent::Select(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Intent::Help => "help",
            Intent::Exit => "exit",
            Intent::ShowPlan => "show_plan",
            Intent::Confirm => "confirm",
            Intent::Deny => "deny",
            Intent::Select(_) => "select",
            Intent::Research { .. } => "research",
            Intent::Update { .. } => "update",
            Intent::SectionAnswer { .. } => "section_answer",
            Intent::OffTopic => "off_topic",
            Intent::Unknown => "unknown",
        }
    }
}
