//! Account plan document
//!
//! A [`Document`] always holds all five fixed sections. Missing facts are an
//! explicit gap marker on a section, never an absent key: the sections live
//! in a fixed-size array indexed by [`SectionKey`], so a partial document
//! cannot be constructed.

pub mod builder;
pub mod render;

pub use builder::{DocumentBuilder, SectionUpdate};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::entity_linking::Candidate;
use crate::error::AgentError;

// ============================================================================
// Section keys
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Overview,
    Products,
    Competitors,
    Opportunities,
    Risks,
}

impl SectionKey {
    pub const ALL: [SectionKey; 5] = [
        SectionKey::Overview,
        SectionKey::Products,
        SectionKey::Competitors,
        SectionKey::Opportunities,
        SectionKey::Risks,
    ];

    /// Parse a user-supplied section name, accepting common aliases
    /// ("company overview", "services", "competition", "risk").
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw
            .trim()
            .trim_end_matches(['.', '!', '?', ':'])
            .trim()
            .to_lowercase();
        let key = key.strip_prefix("the ").unwrap_or(&key);
        let key = key.strip_suffix(" section").unwrap_or(key).trim();

        match key {
            "overview" | "company overview" | "summary" | "about" => Some(SectionKey::Overview),
            "products" | "product" | "services" | "products/services" | "products and services"
            | "key products" | "offerings" => Some(SectionKey::Products),
            "competitors" | "competitor" | "competition" | "competitive landscape" => {
                Some(SectionKey::Competitors)
            }
            "opportunities" | "opportunity" | "growth opportunities" => {
                Some(SectionKey::Opportunities)
            }
            "risks" | "risk" | "key risks" | "threats" => Some(SectionKey::Risks),
            _ => None,
        }
    }

    /// Title used in rendering and export
    pub fn display_name(self) -> &'static str {
        match self {
            SectionKey::Overview => "Overview",
            SectionKey::Products => "Products",
            SectionKey::Competitors => "Competitors",
            SectionKey::Opportunities => "Opportunities",
            SectionKey::Risks => "Risks",
        }
    }

    /// Field name in the generation schema
    pub fn field_name(self) -> &'static str {
        match self {
            SectionKey::Overview => "overview",
            SectionKey::Products => "products",
            SectionKey::Competitors => "competitors",
            SectionKey::Opportunities => "opportunities",
            SectionKey::Risks => "risks",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SectionKey {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKey::parse(s).ok_or_else(|| AgentError::InvalidSection {
            section: s.trim().to_string(),
        })
    }
}

// ============================================================================
// Sections
// ============================================================================

/// One section's content plus its gap marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub content: String,
    /// Underlying data was missing or low-confidence
    pub gap: bool,
    pub gap_reason: Option<String>,
}

impl Section {
    pub fn filled(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            gap: false,
            gap_reason: None,
        }
    }

    pub fn gap(content: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            gap: true,
            gap_reason: Some(reason.into()),
        }
    }
}

/// An applied section update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub section: SectionKey,
    pub previous: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub entity: Candidate,
    sections: [Section; 5],
    pub sources: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    revisions: Vec<Revision>,
}

impl Document {
    /// Build a document by producing every section.
    pub fn from_fn(entity: Candidate, section: impl FnMut(SectionKey) -> Section) -> Self {
        let now = Utc::now();
        Self {
            entity,
            sections: SectionKey::ALL.map(section),
            sources: Vec::new(),
            generated_at: now,
            last_updated: now,
            revisions: Vec::new(),
        }
    }

    /// Document where every section is a gap with the same reason
    pub fn all_gaps(entity: Candidate, reason: &str) -> Self {
        Self::from_fn(entity, |key| {
            Section::gap(
                format!("No {} information available.", key.field_name()),
                reason,
            )
        })
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn section(&self, key: SectionKey) -> &Section {
        &self.sections[key.index()]
    }

    /// Sections in fixed order
    pub fn sections(&self) -> impl Iterator<Item = (SectionKey, &Section)> {
        SectionKey::ALL.into_iter().zip(self.sections.iter())
    }

    pub fn has_gaps(&self) -> bool {
        self.sections.iter().any(|s| s.gap)
    }

    pub fn gap_count(&self) -> usize {
        self.sections.iter().filter(|s| s.gap).count()
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    /// Replace one section's content. Returns `false` when the content is
    /// unchanged (no revision is recorded).
    pub(crate) fn replace_section(&mut self, key: SectionKey, content: &str) -> bool {
        let section = &mut self.sections[key.index()];
        if section.content == content && !section.gap {
            return false;
        }

        let now = Utc::now();
        self.revisions.push(Revision {
            section: key,
            previous: std::mem::replace(&mut section.content, content.to_string()),
            content: content.to_string(),
            at: now,
        });
        section.gap = false;
        section.gap_reason = None;
        self.last_updated = now;
        true
    }

    /// Export shape: section name → `{content, gap, gapReason}`
    pub fn export(&self) -> BTreeMap<String, ExportedSection> {
        self.sections()
            .map(|(key, section)| {
                (
                    key.display_name().to_string(),
                    ExportedSection {
                        content: section.content.clone(),
                        gap: section.gap,
                        gap_reason: section.gap_reason.clone(),
                    },
                )
            })
            .collect()
    }

    /// Export as a JSON value
    pub fn export_json(&self) -> serde_json::Value {
        serde_json::to_value(self.export()).unwrap_or_default()
    }
}

/// One section in the exported artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSection {
    pub content: String,
    pub gap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_linking::EntityId;

    fn amazon() -> Candidate {
        Candidate {
            id: EntityId::from_name("Amazon"),
            display_name: "Amazon".into(),
        }
    }

    fn sample() -> Document {
        Document::from_fn(amazon(), |key| Section::filled(format!("{} text", key)))
    }

    #[test]
    fn test_section_aliases() {
        assert_eq!(SectionKey::parse("Risks"), Some(SectionKey::Risks));
        assert_eq!(SectionKey::parse("risk"), Some(SectionKey::Risks));
        assert_eq!(SectionKey::parse("the company overview"), Some(SectionKey::Overview));
        assert_eq!(SectionKey::parse("services"), Some(SectionKey::Products));
        assert_eq!(SectionKey::parse("Competition."), Some(SectionKey::Competitors));
        assert_eq!(SectionKey::parse("opportunities section"), Some(SectionKey::Opportunities));
        assert_eq!(SectionKey::parse("weather"), None);
    }

    #[test]
    fn test_from_str_invalid_section() {
        let err = "weather".parse::<SectionKey>().unwrap_err();
        assert!(matches!(err, AgentError::InvalidSection { section } if section == "weather"));
    }

    #[test]
    fn test_all_gaps_has_five_sections() {
        let doc = Document::all_gaps(amazon(), "Not found");
        assert_eq!(doc.sections().count(), 5);
        assert_eq!(doc.gap_count(), 5);
        assert!(doc
            .sections()
            .all(|(_, s)| s.gap_reason.as_deref() == Some("Not found")));
    }

    #[test]
    fn test_replace_section_records_revision() {
        let mut doc = sample();
        assert!(doc.replace_section(SectionKey::Risks, "New regulation"));
        assert_eq!(doc.section(SectionKey::Risks).content, "New regulation");
        assert_eq!(doc.revisions().len(), 1);
        assert_eq!(doc.revisions()[0].previous, "Risks text");

        // Same content again is a no-op
        assert!(!doc.replace_section(SectionKey::Risks, "New regulation"));
        assert_eq!(doc.revisions().len(), 1);
    }

    #[test]
    fn test_replace_clears_gap() {
        let mut doc = Document::all_gaps(amazon(), "Not found");
        doc.replace_section(SectionKey::Overview, "Written by hand");
        let overview = doc.section(SectionKey::Overview);
        assert!(!overview.gap);
        assert!(overview.gap_reason.is_none());
        assert!(doc.section(SectionKey::Risks).gap);
    }

    #[test]
    fn test_export_shape() {
        let doc = Document::all_gaps(amazon(), "Not found");
        let json = doc.export_json();
        assert_eq!(json["Risks"]["gap"], true);
        assert_eq!(json["Risks"]["gapReason"], "Not found");

        let json = sample().export_json();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 5);
        assert!(json["Overview"].get("gapReason").is_none());
    }
}
