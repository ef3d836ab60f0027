//! Reply types and user-facing wording
//!
//! Handlers build a [`Reply`]; the orchestrator styles it for the current
//! persona and returns a [`TurnOutput`] to the host loop.

use serde::{Deserialize, Serialize};

use crate::document::render::{render_plan, render_section};
use crate::document::{Document, SectionKey};
use crate::entity_linking::{Candidate, ResolutionMethod};
use crate::session::{PendingCandidate, Persona};

// ---------------------------------------------------------------------------
// TurnOutput
// ---------------------------------------------------------------------------

/// Result of processing one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutput {
    pub display_text: String,
    pub session_ended: bool,
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Kind of reply. Decides which persona styling applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Info,
    Question,
    Plan,
    Error,
}

/// An unstyled reply plus what it was about
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub kind: ReplyKind,
    /// Entity a plan was delivered for in this reply
    pub focus: Option<Candidate>,
    pub ends_session: bool,
}

impl Reply {
    pub fn info(text: impl Into<String>) -> Self {
        Self::with_kind(text, ReplyKind::Info)
    }

    pub fn question(text: impl Into<String>) -> Self {
        Self::with_kind(text, ReplyKind::Question)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::with_kind(text, ReplyKind::Error)
    }

    pub fn plan(text: impl Into<String>, focus: Candidate) -> Self {
        Self {
            focus: Some(focus),
            ..Self::with_kind(text, ReplyKind::Plan)
        }
    }

    pub fn ending(mut self) -> Self {
        self.ends_session = true;
        self
    }

    fn with_kind(text: impl Into<String>, kind: ReplyKind) -> Self {
        Self {
            text: text.into(),
            kind,
            focus: None,
            ends_session: false,
        }
    }

    /// Whether a supportive closing line may be appended
    pub fn allows_closing(&self) -> bool {
        matches!(self.kind, ReplyKind::Info)
    }
}

// ---------------------------------------------------------------------------
// Wording
// ---------------------------------------------------------------------------

const HELP_TEXT: &str = "Here's how I can help you:

Research a company
  Just tell me a company name. Examples:
  - \"Research Microsoft\"
  - \"Tell me about Tesla\"
  - \"Apple\"

View your account plan
  - \"Show plan\"

Update plan sections
  - \"Update risks with: <your content>\"
  - \"Change competitors to: <new list>\"
  Sections: Overview, Products, Competitors, Opportunities, Risks

Exit
  - \"exit\" or \"quit\"

What would you like to do?";

const HELP_TEXT_SHORT: &str =
    "Commands: Research <company>, Show plan, Update <section> with: <content>, Exit";

const OFF_TOPIC_REDIRECTS: [&str; 3] = [
    "That's an interesting topic! However, I specialize in company research. Is there a company you'd like me to help you research today?",
    "I appreciate the conversation! My focus is company research and account plans. Would you like to explore a specific company?",
    "I'd love to help with that, but my specialty is company research. If you have a company in mind, I'm your assistant!",
];

pub const UPDATE_EXAMPLE: &str =
    "Update risks with: Regulatory compliance concerns in European markets";

pub fn greeting() -> &'static str {
    "Hello! I'm your company research assistant. Tell me a company name and I'll build an account plan for it. Type 'help' for commands."
}

pub fn help(persona: Persona) -> Reply {
    match persona {
        Persona::Efficient => Reply::info(HELP_TEXT_SHORT),
        _ => Reply::question(HELP_TEXT),
    }
}

pub fn farewell(document: Option<&Document>) -> Reply {
    let text = match document {
        Some(doc) => format!(
            "Goodbye! Your account plan for {} is ready. Come back anytime for updates or to research another company!",
            doc.entity.display_name
        ),
        None => "Goodbye! Feel free to return whenever you need company research assistance."
            .to_string(),
    };
    Reply::info(text).ending()
}

/// Redirect for off-topic input; rotates with the turn number.
pub fn off_topic(persona: Persona, turn: usize) -> Reply {
    match persona {
        Persona::Efficient => {
            Reply::question("I'm focused on company research. Which company should I research?")
        }
        _ => Reply::question(OFF_TOPIC_REDIRECTS[turn % OFF_TOPIC_REDIRECTS.len()]),
    }
}

pub fn unknown(utterance: &str) -> Reply {
    if utterance.trim().is_empty() {
        return Reply::question("I didn't receive any input. How can I help you today?");
    }
    Reply::question(format!(
        "I'm not sure what you mean by '{}'. Tell me a company name to research, or type 'help'.",
        utterance.trim()
    ))
}

pub fn not_found(mention: &str) -> Reply {
    Reply::error(format!(
        "I couldn't find a company matching '{}'. Could you check the name and try again?",
        mention.trim()
    ))
}

pub fn no_document() -> Reply {
    Reply::error(
        "You don't have an account plan yet. Tell me a company name and I'll research it for you!",
    )
}

pub fn update_usage() -> Reply {
    Reply::info(format!(
        "Please say which section to update and what to write. For example: '{}'",
        UPDATE_EXAMPLE
    ))
}

pub fn which_section() -> Reply {
    Reply::question(format!(
        "Which section should I update? ({})",
        section_list()
    ))
}

pub fn invalid_section(section: &str) -> Reply {
    Reply::error(format!(
        "Unknown section: '{}'. Valid sections are: {}.",
        section,
        section_list()
    ))
}

pub fn update_cancelled() -> Reply {
    Reply::info("Okay, I won't change the plan.")
}

pub fn nothing_to_confirm() -> Reply {
    Reply::info("There's nothing waiting for confirmation. Tell me a company name to research.")
}

/// Transparent failure. Collaborator detail is logged, never shown.
pub fn collaborator_failure() -> Reply {
    Reply::error("Sorry, I couldn't complete that right now. Please try the same request again.")
}

pub fn restate_name() -> Reply {
    Reply::question("No problem! Please tell me the correct company name you'd like to research.")
}

pub fn selection_out_of_range(max: usize) -> Reply {
    Reply::question(format!(
        "I'm sorry, I didn't catch that. Please enter a number from 1 to {} or type the company name.",
        max
    ))
}

/// Confirmation question for a candidate below the auto-accept floor
pub fn confirmation(pending: &PendingCandidate) -> Reply {
    let name = &pending.candidate.display_name;
    let mut text = match pending.method {
        ResolutionMethod::Alias => format!(
            "I assume you mean {}, based on your reference to '{}'. Is that right?",
            name, pending.mention
        ),
        ResolutionMethod::Extracted => format!(
            "It sounds like you're asking about {}. Should I research it?",
            name
        ),
        _ => format!("Did you mean {}?", name),
    };

    if pending.options.len() > 1 {
        text.push_str("\n\nOr pick one:");
        for (i, option) in pending.options.iter().enumerate() {
            text.push_str(&format!("\n  {}. {}", i + 1, option.display_name));
        }
    }
    text.push_str("\n\nReply 'yes' to confirm, 'no' to cancel");
    if pending.options.len() > 1 {
        text.push_str(", or a number to choose");
    }
    text.push('.');
    Reply::question(text)
}

/// Delivered plan after a fresh build
pub fn research_result(document: &Document, persona: Persona) -> Reply {
    let name = &document.entity.display_name;
    let mut text = String::new();
    if document.gap_count() == SectionKey::ALL.len() {
        text.push_str(&format!(
            "I found limited information about {}. Every section is marked as a gap; you can fill them in with updates.\n\n",
            name
        ));
    } else if document.has_gaps() {
        let gaps: Vec<&str> = document
            .sections()
            .filter(|(_, s)| s.gap)
            .map(|(k, _)| k.display_name())
            .collect();
        text.push_str(&format!("Note: limited data for {}.\n\n", gaps.join(", ")));
    }

    match persona {
        Persona::Efficient => {}
        Persona::Confused => text.push_str(&format!(
            "Here is the plan for {}. Start with the Overview and Products sections below.\n\n",
            name
        )),
        _ => text.push_str(&format!("Here is the account plan for {}:\n\n", name)),
    }
    text.push_str(&render_plan(document));
    Reply::plan(text, document.entity.clone())
}

/// Confirmation after a section update
pub fn update_result(document: &Document, key: SectionKey, persona: Persona) -> Reply {
    match persona {
        Persona::Efficient => Reply::info(format!(
            "Updated {}.\n\n{}\n\nUse 'show plan' to see the full document.",
            key,
            render_section(document, key)
        )),
        _ => Reply::plan(
            format!(
                "Updated the {} section. Here's the updated plan:\n\n{}",
                key,
                render_plan(document)
            ),
            document.entity.clone(),
        ),
    }
}

pub fn show_plan(document: &Document) -> Reply {
    Reply::plan(render_plan(document), document.entity.clone())
}

fn section_list() -> String {
    SectionKey::ALL
        .iter()
        .map(|k| k.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_linking::EntityId;

    fn candidate(name: &str) -> Candidate {
        Candidate {
            id: EntityId::from_name(name),
            display_name: name.into(),
        }
    }

    #[test]
    fn test_alias_confirmation_wording() {
        let pending = PendingCandidate {
            candidate: candidate("Amazon"),
            confidence: 0.65,
            mention: "that cloud company".into(),
            method: ResolutionMethod::Alias,
            options: vec![candidate("Amazon")],
        };
        let reply = confirmation(&pending);
        assert!(reply
            .text
            .starts_with("I assume you mean Amazon, based on your reference to 'that cloud company'."));
        assert!(!reply.text.contains("1."));
        assert_eq!(reply.kind, ReplyKind::Question);
    }

    #[test]
    fn test_fuzzy_confirmation_lists_options() {
        let pending = PendingCandidate {
            candidate: candidate("Microsoft"),
            confidence: 0.7,
            mention: "microsfot".into(),
            method: ResolutionMethod::Fuzzy,
            options: vec![candidate("Microsoft"), candidate("Micron")],
        };
        let text = confirmation(&pending).text;
        assert!(text.starts_with("Did you mean Microsoft?"));
        assert!(text.contains("1. Microsoft"));
        assert!(text.contains("2. Micron"));
        assert!(text.ends_with("or a number to choose."));
    }

    #[test]
    fn test_off_topic_rotates() {
        let a = off_topic(Persona::Neutral, 0).text;
        let b = off_topic(Persona::Neutral, 1).text;
        assert_ne!(a, b);
        assert_eq!(a, off_topic(Persona::Chatty, 3).text);
    }

    #[test]
    fn test_help_short_for_efficient() {
        assert_eq!(help(Persona::Efficient).text, HELP_TEXT_SHORT);
        assert!(help(Persona::Neutral).text.contains("Update risks with"));
    }

    #[test]
    fn test_farewell_ends_session() {
        assert!(farewell(None).ends_session);
    }

    #[test]
    fn test_invalid_section_lists_valid_names() {
        let text = invalid_section("weather").text;
        assert!(text.contains("'weather'"));
        assert!(text.contains("Overview, Products, Competitors, Opportunities, Risks"));
    }
}
