//! Session state for one conversation
//!
//! The phase carries its own payload: a pending candidate exists only inside
//! `DialoguePhase::Clarifying`, so "pending is set iff CLARIFYING" holds by
//! construction rather than by bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use super::persona::{Signal, Signals};
use crate::document::Document;
use crate::entity_linking::{Candidate, EntityId, Resolution, ResolutionMethod};

// ============================================================================
// Dialogue phase
// ============================================================================

/// A candidate awaiting user confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCandidate {
    pub candidate: Candidate,
    pub confidence: f32,
    /// The user's original wording
    pub mention: String,
    pub method: ResolutionMethod,
    /// Numbered options shown to the user; the candidate is always first
    pub options: Vec<Candidate>,
}

impl PendingCandidate {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        Self {
            candidate: resolution.candidate.clone(),
            confidence: resolution.confidence,
            mention: resolution.mention.clone(),
            method: resolution.method,
            options: resolution.options(),
        }
    }

    /// Option `n` (1-based)
    pub fn option(&self, n: usize) -> Option<&Candidate> {
        n.checked_sub(1).and_then(|i| self.options.get(i))
    }
}

/// Replacement content waiting for a section name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub content: String,
}

/// Conversation phase. Governs whether input is read as a clarification
/// answer or as a fresh request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialoguePhase {
    #[default]
    Idle,
    Clarifying(PendingCandidate),
    AwaitingUpdateTarget(PendingUpdate),
}

impl DialoguePhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            DialoguePhase::Idle => PhaseKind::Idle,
            DialoguePhase::Clarifying(_) => PhaseKind::Clarifying,
            DialoguePhase::AwaitingUpdateTarget(_) => PhaseKind::AwaitingUpdateTarget,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DialoguePhase::Idle)
    }
}

/// Payload-free phase tag, for logging and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Idle,
    Clarifying,
    AwaitingUpdateTarget,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhaseKind::Idle => "IDLE",
            PhaseKind::Clarifying => "CLARIFYING",
            PhaseKind::AwaitingUpdateTarget => "AWAITING_UPDATE_TARGET",
        })
    }
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One conversation entry. Entries are never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
    /// Entity the assistant delivered a plan for in this entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<Candidate>,
}

// ============================================================================
// SessionState
// ============================================================================

/// Everything the dialogue core knows about one conversation.
///
/// Read access is public; mutation is reserved to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    // ========================================================================
    // Identity
    // ========================================================================
    pub id: Uuid,
    pub created_at: DateTime<Utc>,

    // ========================================================================
    // State machine
    // ========================================================================
    phase: DialoguePhase,

    // ========================================================================
    // Conversation
    // ========================================================================
    history: Vec<HistoryEntry>,
    current_entity: Option<Candidate>,
    signals: Signals,
    document: Option<Document>,

    /// Candidates the user answered "no" to
    rejected: HashSet<EntityId>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            phase: DialoguePhase::Idle,
            history: Vec::new(),
            current_entity: None,
            signals: Signals::default(),
            document: None,
            rejected: HashSet::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn phase(&self) -> &DialoguePhase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn pending_candidate(&self) -> Option<&PendingCandidate> {
        match &self.phase {
            DialoguePhase::Clarifying(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn current_entity(&self) -> Option<&Candidate> {
        self.current_entity.as_ref()
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn rejected(&self) -> &HashSet<EntityId> {
        &self.rejected
    }

    /// Number of user utterances so far
    pub fn turn_count(&self) -> usize {
        self.history
            .iter()
            .filter(|e| e.speaker == Speaker::User)
            .count()
    }

    /// Texts for contextual alias resolution, oldest first.
    ///
    /// User utterances contribute their text, assistant entries contribute
    /// the name of the entity they delivered a plan for. The latest user
    /// utterance (the one being resolved) is excluded.
    pub fn resolution_context(&self) -> Vec<&str> {
        let prior = match self.history.last() {
            Some(last) if last.speaker == Speaker::User => &self.history[..self.history.len() - 1],
            _ => &self.history[..],
        };
        prior
            .iter()
            .filter_map(|entry| match entry.speaker {
                Speaker::User => Some(entry.text.as_str()),
                Speaker::Assistant => entry.focus.as_ref().map(|c| c.display_name.as_str()),
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Mutation (orchestrator only)
    // ------------------------------------------------------------------------

    pub(crate) fn set_phase(&mut self, phase: DialoguePhase) {
        self.phase = phase;
    }

    pub(crate) fn record_user(&mut self, text: &str) {
        self.history.push(HistoryEntry {
            speaker: Speaker::User,
            text: text.to_string(),
            at: Utc::now(),
            focus: None,
        });
    }

    pub(crate) fn record_assistant(&mut self, text: &str, focus: Option<Candidate>) {
        self.history.push(HistoryEntry {
            speaker: Speaker::Assistant,
            text: text.to_string(),
            at: Utc::now(),
            focus,
        });
    }

    pub(crate) fn record_signal(&mut self, signal: Signal) {
        self.signals.record(signal);
    }

    /// Commit a finished research: focus entity and its document together.
    pub(crate) fn complete_research(&mut self, document: Document) {
        self.current_entity = Some(document.entity.clone());
        self.document = Some(document);
    }

    pub(crate) fn replace_document(&mut self, document: Document) {
        self.document = Some(document);
    }

    pub(crate) fn reject(&mut self, id: EntityId) {
        self.rejected.insert(id);
    }
}
