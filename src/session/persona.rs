//! Behavioral signals and persona derivation
//!
//! Signals are monotonic counters; the persona is recomputed from them on
//! every turn and never stored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::config::PersonaThresholds;
use crate::intent::Intent;

static CONFUSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\bi (?:don'?t|do not) (?:know|understand|get)\b|\bwhat (?:do you mean|should i|is this|is that)\b|\bconfus(?:ed|ing)\b|\bnot sure\b|\bhelp me understand\b|\?\s*\?|\bhuh\b|\bu+m+\b|\bu+h+\b|\bhm+\b|\bi guess\b|\blost\b)",
    )
    .unwrap()
});

static EFFICIENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^(?:just|only|quick(?:ly)?)\b|\bskip\b|\bget to the point\b|\bbrief(?:ly)?\b|\btl;?dr\b|\bfast\b|\bhurry\b|\basap\b)",
    )
    .unwrap()
});

static PLEASANTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:Sure!|Of course!|Absolutely!|Great question!|Hello!|Hi there!|Great!|No problem!|I'd be happy to help\.?|Let me)[\s.,]*",
    )
    .unwrap()
});

const SUPPORTIVE_CLOSING: &str = "Remember, you can ask me to explain anything further!";

/// Structured commands this short count as direct requests.
const TERSE_COMMAND_WORDS: usize = 2;

// ============================================================================
// Signals
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Confusion,
    DirectRequest,
    Chatty,
}

/// Cumulative signal counters. Never decremented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    confusion_count: u32,
    direct_request_count: u32,
    chatty_count: u32,
}

impl Signals {
    pub fn confusion_count(&self) -> u32 {
        self.confusion_count
    }

    pub fn direct_request_count(&self) -> u32 {
        self.direct_request_count
    }

    pub fn chatty_count(&self) -> u32 {
        self.chatty_count
    }

    pub fn total(&self) -> u32 {
        self.confusion_count + self.direct_request_count + self.chatty_count
    }

    pub fn record(&mut self, signal: Signal) {
        let counter = match signal {
            Signal::Confusion => &mut self.confusion_count,
            Signal::DirectRequest => &mut self.direct_request_count,
            Signal::Chatty => &mut self.chatty_count,
        };
        *counter = counter.saturating_add(1);
    }
}

// ============================================================================
// Persona
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Neutral,
    Confused,
    Efficient,
    Chatty,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Persona::Neutral => "neutral",
            Persona::Confused => "confused",
            Persona::Efficient => "efficient",
            Persona::Chatty => "chatty",
        })
    }
}

impl Persona {
    /// Apply this persona's style to a reply.
    ///
    /// `allow_closing` is false for errors and full plan renderings, which
    /// never get the supportive closing line.
    pub fn style(self, reply: &str, allow_closing: bool) -> String {
        match self {
            Persona::Efficient => {
                let stripped = PLEASANTRY_RE.replace(reply.trim_start(), "");
                capitalize_first(&stripped)
            }
            Persona::Confused => {
                let trimmed = reply.trim_end();
                if allow_closing && !trimmed.ends_with(['?', '!']) {
                    format!("{}\n\n{}", trimmed, SUPPORTIVE_CLOSING)
                } else {
                    reply.to_string()
                }
            }
            Persona::Neutral | Persona::Chatty => reply.to_string(),
        }
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Detects per-turn signals and derives the persona from counters
#[derive(Debug, Clone)]
pub struct PersonaClassifier {
    thresholds: PersonaThresholds,
}

impl PersonaClassifier {
    pub fn new(thresholds: PersonaThresholds) -> Self {
        Self { thresholds }
    }

    /// The single signal an utterance contributes, if any.
    ///
    /// Priority is confusion, then chatty, then direct request.
    pub fn detect_signal(&self, utterance: &str, intent: &Intent) -> Option<Signal> {
        if CONFUSION_RE.is_match(utterance) {
            return Some(Signal::Confusion);
        }
        if matches!(intent, Intent::OffTopic) {
            return Some(Signal::Chatty);
        }

        let terse = utterance.split_whitespace().count() <= TERSE_COMMAND_WORDS
            && matches!(intent, Intent::Research { .. } | Intent::ShowPlan);
        if terse || EFFICIENCY_RE.is_match(utterance.trim()) {
            return Some(Signal::DirectRequest);
        }
        None
    }

    /// Derive the persona from cumulative counters after `turns` user turns.
    pub fn classify(&self, signals: &Signals, turns: usize) -> Persona {
        let turns = u32::try_from(turns).unwrap_or(u32::MAX);
        let t = &self.thresholds;

        if signals.confusion_count() >= t.confusion {
            Persona::Confused
        } else if signals.direct_request_count() >= t.efficient
            && signals.direct_request_count().saturating_mul(2) >= turns
        {
            Persona::Efficient
        } else if signals.chatty_count() >= t.chatty
            && signals.chatty_count().saturating_mul(3) >= turns
        {
            Persona::Chatty
        } else {
            Persona::Neutral
        }
    }
}
