//! Rule-ordered intent classifier
//!
//! Precedence (first match wins):
//!
//! 1. **control**: closed vocabulary: help, exit/quit, show plan
//! 2. **clarification**: yes/no/number/candidate name while CLARIFYING;
//!    free text (or a cancel word) while AWAITING_UPDATE_TARGET
//! 3. **command**: `research <x>`, `update <section> with: <content>`,
//!    a bare recognizable entity reference, or any sentence naming a known
//!    company
//! 4. **fallback**: OffTopic (question or conversational filler) or Unknown,
//!    only for text with no entity mention and no command keyword
//!
//! Classification is pure: it reads the phase but never mutates session state.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::Intent;
use crate::entity_linking::normalize::{clean_text, normalize_entity_text};
use crate::entity_linking::EntityNormalizer;
use crate::session::{DialoguePhase, PendingCandidate};

// =============================================================================
// PATTERNS
// =============================================================================

static HELP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:help|h|\?|help\?|commands|what can you do\??|how does this work\??)$").unwrap()
});

static EXIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:exit|quit|q|bye|goodbye|good bye|end session|i'?m done)$").unwrap()
});

static SHOW_PLAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:show|view|display|print|see|open)(?: me)?(?: the| my)?(?: account)? (?:plan|report|document)|show plan|plan)$",
    )
    .unwrap()
});

static SELECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:option\s*|number\s*|#)?(\d{1,2})$").unwrap());

static RESEARCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+|can you\s+|could you\s+)?(?:research|look\s+up|lookup|investigate|analy[sz]e|tell\s+me\s+about|find\s+out\s+about|find|search\s+for|search|get\s+info(?:rmation)?\s+(?:on|about)|information\s+on|learn\s+about|(?:create|build|make|generate)\s+(?:an?\s+)?(?:account\s+)?plan\s+for|plan\s+for)\s+(?P<mention>.+?)[\s.!?]*$",
    )
    .unwrap()
});

static UPDATE_WITH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+)?(?:update|change|modify|edit|revise)\s+(?:(?:the\s+)?(?P<section>[^:]+?)\s+)?(?:with|to)\b\s*[:.]?\s*(?P<content>.+)$",
    )
    .unwrap()
});

static UPDATE_COLON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+)?(?:update|change|modify|edit|revise)\s+(?:the\s+)?(?P<section>[^:]+?)\s*:\s*(?P<content>.+)$",
    )
    .unwrap()
});

static UPDATE_BARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+)?(?:update|change|modify|edit|revise)(?:\s+(?:the\s+)?(?P<section>.+?))?[\s.!?]*$",
    )
    .unwrap()
});

const AFFIRMATIVES: &[&str] = &[
    "yes", "y", "yeah", "yea", "yep", "yup", "sure", "correct", "ok", "okay", "right",
    "confirm", "exactly", "absolutely", "definitely", "affirmative",
];

const NEGATIVES: &[&str] = &["no", "n", "nope", "nah", "wrong", "incorrect", "negative"];

const CANCEL_WORDS: &[&str] = &["cancel", "never mind", "nevermind", "forget it", "stop"];

const ORDINALS: &[&str] = &["first", "second", "third"];

/// Section words that refer to the whole plan, not a section
const WHOLE_PLAN_WORDS: &[&str] = &[
    "it", "this", "that", "plan", "the plan", "account plan", "document", "report", "doc",
];

/// Words that mark an utterance as conversational rather than noise
const CONVERSATIONAL_WORDS: &[&str] = &[
    "um", "uh", "umm", "uhh", "hmm", "er", "erm", "well", "like", "hi", "hello", "hey",
    "thanks", "thank", "lol", "haha", "so", "i", "im", "you", "me", "my", "we", "know",
    "think", "guess", "maybe", "weather", "how", "what", "why", "who", "joke", "today",
    "please", "sorry", "cool", "nice", "great", "awesome", "good", "morning", "day",
];

/// Bare entity references longer than this are treated as conversation.
const MAX_BARE_REFERENCE_WORDS: usize = 6;

// =============================================================================
// RULES
// =============================================================================

/// Prepared forms of one utterance shared by all rules
#[derive(Debug)]
pub struct Utterance {
    /// Whitespace-collapsed original text
    pub text: String,
    /// Lowercased, trailing punctuation and "please" removed
    pub control: String,
    /// Normalized word tokens
    pub words: Vec<String>,
}

impl Utterance {
    pub fn new(raw: &str) -> Self {
        let text = clean_text(raw);
        let words = normalize_entity_text(&text, false)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self {
            control: control_form(&text),
            text,
            words,
        }
    }
}

/// A single classification rule
pub type Rule = fn(&IntentClassifier, &Utterance, &DialoguePhase) -> Option<Intent>;

/// Classification rules in precedence order
pub const RULES: &[(&str, Rule)] = &[
    ("control", control_rule),
    ("clarification", clarification_rule),
    ("command", command_rule),
    ("fallback", fallback_rule),
];

/// Maps utterances to intents
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    normalizer: Arc<EntityNormalizer>,
}

impl IntentClassifier {
    pub fn new(normalizer: Arc<EntityNormalizer>) -> Self {
        Self { normalizer }
    }

    /// Classify one utterance in the context of the current phase.
    pub fn classify(&self, utterance: &str, phase: &DialoguePhase) -> Intent {
        let prepared = Utterance::new(utterance);
        for (name, rule) in RULES {
            if let Some(intent) = rule(self, &prepared, phase) {
                tracing::debug!(rule = name, intent = intent.name(), "Intent classified");
                return intent;
            }
        }
        Intent::Unknown
    }
}

fn control_rule(_: &IntentClassifier, u: &Utterance, _: &DialoguePhase) -> Option<Intent> {
    if HELP_RE.is_match(&u.control) {
        Some(Intent::Help)
    } else if EXIT_RE.is_match(&u.control) {
        Some(Intent::Exit)
    } else if SHOW_PLAN_RE.is_match(&u.control) {
        Some(Intent::ShowPlan)
    } else {
        None
    }
}

fn clarification_rule(c: &IntentClassifier, u: &Utterance, phase: &DialoguePhase) -> Option<Intent> {
    match phase {
        DialoguePhase::Idle => None,
        DialoguePhase::Clarifying(pending) => classify_answer(c, u, pending),
        DialoguePhase::AwaitingUpdateTarget(_) => {
            if u.text.is_empty() || is_command(&u.text) {
                None
            } else if is_cancel(u) {
                Some(Intent::Deny)
            } else {
                Some(Intent::SectionAnswer {
                    text: u.text.trim_end_matches(['.', '!']).trim().to_string(),
                })
            }
        }
    }
}

fn classify_answer(c: &IntentClassifier, u: &Utterance, pending: &PendingCandidate) -> Option<Intent> {
    let first = u.words.first()?;
    // "yes", "yes please", "yep that's it"; longer sentences are fresh input
    if u.words.len() <= 4 && AFFIRMATIVES.contains(&first.as_str()) && !is_command(&u.text) {
        return Some(Intent::Confirm);
    }
    if u.words.len() <= 4 && NEGATIVES.contains(&first.as_str()) && !is_command(&u.text) {
        return Some(Intent::Deny);
    }

    if let Some(caps) = SELECT_RE.captures(&u.control) {
        return caps[1].parse().ok().map(Intent::Select);
    }
    if u.words.len() <= 2 {
        if let Some(pos) = ORDINALS.iter().position(|o| u.words.iter().any(|w| w == o)) {
            return Some(Intent::Select(pos + 1));
        }
    }

    // Typing a presented name answers the question
    if c.normalizer.names_entity(&u.text, &pending.candidate.id) {
        return Some(Intent::Confirm);
    }
    pending
        .options
        .iter()
        .position(|option| c.normalizer.names_entity(&u.text, &option.id))
        .map(|pos| Intent::Select(pos + 1))
}

fn command_rule(c: &IntentClassifier, u: &Utterance, _: &DialoguePhase) -> Option<Intent> {
    if let Some(intent) = parse_update(&u.text) {
        return Some(intent);
    }

    if let Some(caps) = RESEARCH_RE.captures(&u.text) {
        let mention = caps["mention"].trim().to_string();
        if !mention.is_empty() {
            return Some(Intent::Research { mention });
        }
    }

    // A bare company name or descriptive reference is a research request
    if !u.text.contains('?')
        && !u.words.is_empty()
        && u.words.len() <= MAX_BARE_REFERENCE_WORDS
        && c.normalizer.recognizes(&u.text)
    {
        return Some(Intent::Research {
            mention: u.text.trim_end_matches(['.', '!']).to_string(),
        });
    }

    // A sentence naming a known company ("I'm interested in Microsoft",
    // "Tesla?"). Ambiguity is left to the clarification gate.
    if !c.normalizer.entities_in(&u.text).is_empty() {
        return Some(Intent::Research {
            mention: u.text.trim_end_matches(['.', '!', '?']).trim().to_string(),
        });
    }

    None
}

fn fallback_rule(_: &IntentClassifier, u: &Utterance, _: &DialoguePhase) -> Option<Intent> {
    let conversational = u.text.contains('?')
        || u.words.iter().any(|w| CONVERSATIONAL_WORDS.contains(&w.as_str()));
    if conversational {
        Some(Intent::OffTopic)
    } else {
        Some(Intent::Unknown)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Lowercase, drop trailing punctuation and a leading/trailing "please"
fn control_form(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut form = lower.trim().trim_end_matches(['.', '!', ',']).trim();
    if let Some(rest) = form.strip_prefix("please ") {
        form = rest.trim();
    }
    if let Some(rest) = form.strip_suffix(" please") {
        form = rest.trim_end_matches(',').trim();
    }
    form.to_string()
}

/// "no", "cancel", "never mind" and friends
fn is_cancel(u: &Utterance) -> bool {
    let negative = u.words.len() <= 2
        && u.words.first().is_some_and(|w| NEGATIVES.contains(&w.as_str()));
    negative || CANCEL_WORDS.contains(&u.control.as_str())
}

fn is_command(text: &str) -> bool {
    RESEARCH_RE.is_match(text)
        || UPDATE_WITH_RE.is_match(text)
        || UPDATE_COLON_RE.is_match(text)
        || UPDATE_BARE_RE.is_match(text)
}

/// Parse `update <section> with: <content>` and its variants
fn parse_update(text: &str) -> Option<Intent> {
    let (section, content) = if let Some(caps) = UPDATE_WITH_RE.captures(text) {
        (
            caps.name("section").map(|m| m.as_str().to_string()),
            Some(caps["content"].to_string()),
        )
    } else if let Some(caps) = UPDATE_COLON_RE.captures(text) {
        (
            Some(caps["section"].to_string()),
            Some(caps["content"].to_string()),
        )
    } else if let Some(caps) = UPDATE_BARE_RE.captures(text) {
        (caps.name("section").map(|m| m.as_str().to_string()), None)
    } else {
        return None;
    };

    Some(Intent::Update {
        section: section.and_then(|s| section_argument(&s)),
        content: content.map(|c| strip_quotes(&c)).filter(|c| !c.is_empty()),
    })
}

/// Section argument, or `None` when it names the whole plan
fn section_argument(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    let trimmed = lower
        .strip_suffix(" section")
        .unwrap_or(&lower)
        .trim()
        .to_string();
    if trimmed.is_empty() || WHOLE_PLAN_WORDS.contains(&trimmed.as_str()) {
        None
    } else {
        Some(trimmed)
    }
}

fn strip_quotes(content: &str) -> String {
    content
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}'))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::entity_linking::{Candidate, EntityId, ResolutionMethod};

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(Arc::new(EntityNormalizer::with_builtin_catalog(
            &AgentConfig::default(),
        )))
    }

    fn clarifying() -> DialoguePhase {
        let amazon = Candidate {
            id: EntityId::from_name("Amazon"),
            display_name: "Amazon".into(),
        };
        let google = Candidate {
            id: EntityId::from_name("Google"),
            display_name: "Google".into(),
        };
        DialoguePhase::Clarifying(PendingCandidate {
            candidate: amazon.clone(),
            confidence: 0.65,
            mention: "that cloud company".into(),
            method: ResolutionMethod::Alias,
            options: vec![amazon, google],
        })
    }

    fn awaiting() -> DialoguePhase {
        DialoguePhase::AwaitingUpdateTarget(crate::session::PendingUpdate {
            content: "new text".into(),
        })
    }

    #[test]
    fn test_control_words_in_every_phase() {
        let c = classifier();
        for phase in [DialoguePhase::Idle, clarifying(), awaiting()] {
            assert_eq!(c.classify("help", &phase), Intent::Help);
            assert_eq!(c.classify("Help!", &phase), Intent::Help);
            assert_eq!(c.classify("quit", &phase), Intent::Exit);
            assert_eq!(c.classify("Exit.", &phase), Intent::Exit);
            assert_eq!(c.classify("show plan", &phase), Intent::ShowPlan);
            assert_eq!(c.classify("please show me the plan", &phase), Intent::ShowPlan);
        }
    }

    #[test]
    fn test_research_command() {
        let c = classifier();
        assert_eq!(
            c.classify("Research Microsoft", &DialoguePhase::Idle),
            Intent::Research {
                mention: "Microsoft".into()
            }
        );
        assert_eq!(
            c.classify("can you look up that cloud company?", &DialoguePhase::Idle),
            Intent::Research {
                mention: "that cloud company".into()
            }
        );
    }

    #[test]
    fn test_bare_entity_is_research() {
        let c = classifier();
        assert_eq!(
            c.classify("Tesla", &DialoguePhase::Idle),
            Intent::Research {
                mention: "Tesla".into()
            }
        );
        assert_eq!(
            c.classify("the search engine company", &DialoguePhase::Idle),
            Intent::Research {
                mention: "the search engine company".into()
            }
        );
    }

    #[test]
    fn test_update_with_section_and_content() {
        let c = classifier();
        assert_eq!(
            c.classify("Update risks with: new regulation.", &DialoguePhase::Idle),
            Intent::Update {
                section: Some("risks".into()),
                content: Some("new regulation.".into()),
            }
        );
        assert_eq!(
            c.classify("change the Competitors section to \"Google, Apple\"", &DialoguePhase::Idle),
            Intent::Update {
                section: Some("competitors".into()),
                content: Some("Google, Apple".into()),
            }
        );
        assert_eq!(
            c.classify("edit overview: A cloud leader", &DialoguePhase::Idle),
            Intent::Update {
                section: Some("overview".into()),
                content: Some("A cloud leader".into()),
            }
        );
    }

    #[test]
    fn test_update_without_section() {
        let c = classifier();
        assert_eq!(
            c.classify("update it with: more detail", &DialoguePhase::Idle),
            Intent::Update {
                section: None,
                content: Some("more detail".into()),
            }
        );
        assert_eq!(
            c.classify("update with: more detail", &DialoguePhase::Idle),
            Intent::Update {
                section: None,
                content: Some("more detail".into()),
            }
        );
        assert_eq!(
            c.classify("update the plan", &DialoguePhase::Idle),
            Intent::Update {
                section: None,
                content: None,
            }
        );
    }

    #[test]
    fn test_clarification_answers() {
        let c = classifier();
        let phase = clarifying();
        assert_eq!(c.classify("yes", &phase), Intent::Confirm);
        assert_eq!(c.classify("Y", &phase), Intent::Confirm);
        assert_eq!(c.classify("yep, that's it", &phase), Intent::Confirm);
        assert_eq!(c.classify("no", &phase), Intent::Deny);
        assert_eq!(c.classify("nope.", &phase), Intent::Deny);
        assert_eq!(c.classify("2", &phase), Intent::Select(2));
        assert_eq!(c.classify("option 1", &phase), Intent::Select(1));
        assert_eq!(c.classify("the second", &phase), Intent::Select(2));
        assert_eq!(c.classify("Amazon", &phase), Intent::Confirm);
        assert_eq!(c.classify("google", &phase), Intent::Select(2));
    }

    #[test]
    fn test_yes_outside_clarification_is_not_confirm() {
        let c = classifier();
        assert_ne!(c.classify("yes", &DialoguePhase::Idle), Intent::Confirm);
        assert_ne!(c.classify("2", &DialoguePhase::Idle), Intent::Select(2));
    }

    #[test]
    fn test_new_command_while_clarifying_is_fresh() {
        let c = classifier();
        assert_eq!(
            c.classify("research Tesla", &clarifying()),
            Intent::Research {
                mention: "Tesla".into()
            }
        );
    }

    #[test]
    fn test_section_answer_while_awaiting_target() {
        let c = classifier();
        assert_eq!(
            c.classify("Risks.", &awaiting()),
            Intent::SectionAnswer {
                text: "Risks".into()
            }
        );
        assert_eq!(c.classify("never mind", &awaiting()), Intent::Deny);
        assert_eq!(c.classify("no", &awaiting()), Intent::Deny);
        assert_eq!(
            c.classify("research Tesla", &awaiting()),
            Intent::Research {
                mention: "Tesla".into()
            }
        );
    }

    #[test]
    fn test_sentence_naming_company_is_research() {
        let c = classifier();
        for (utterance, mention) in [
            ("I'm interested in Microsoft", "I'm interested in Microsoft"),
            ("Microsoft?", "Microsoft"),
            ("I was reading about Amazon yesterday", "I was reading about Amazon yesterday"),
            ("what about Tesla?", "what about Tesla"),
        ] {
            assert_eq!(
                c.classify(utterance, &DialoguePhase::Idle),
                Intent::Research {
                    mention: mention.into()
                },
                "{}",
                utterance
            );
        }
    }

    #[test]
    fn test_descriptor_chatter_is_off_topic() {
        let c = classifier();
        for utterance in ["I want a new car", "book me a hotel", "I like the coffee"] {
            assert_eq!(
                c.classify(utterance, &DialoguePhase::Idle),
                Intent::OffTopic,
                "{}",
                utterance
            );
        }
    }

    #[test]
    fn test_fallback_off_topic_vs_unknown() {
        let c = classifier();
        assert_eq!(
            c.classify("um, i don't know what to do", &DialoguePhase::Idle),
            Intent::OffTopic
        );
        assert_eq!(
            c.classify("what's the weather like?", &DialoguePhase::Idle),
            Intent::OffTopic
        );
        assert_eq!(c.classify("asdf qwer", &DialoguePhase::Idle), Intent::Unknown);
        assert_eq!(c.classify("", &DialoguePhase::Idle), Intent::Unknown);
        assert_eq!(c.classify("   ", &DialoguePhase::Idle), Intent::Unknown);
    }
}
