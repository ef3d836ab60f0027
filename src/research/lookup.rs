//! Entity fact lookup
//!
//! `lookup(name) -> Facts | NotFound`. Implementations must be side-effect
//! free and idempotent for the same input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::document::SectionKey;
use crate::entity_linking::normalize::normalize_entity_text;
use crate::error::{CollaboratorError, ConfigError};

/// Built-in reference data for well-known companies
const BUILTIN_FACTS: &str = include_str!("../../data/company_facts.json");

/// Facts about one company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facts {
    pub name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub founded: Option<String>,
    pub headquarters: Option<String>,
    pub products: Vec<String>,
    pub services: Vec<String>,
    pub competitors: Vec<String>,
    pub key_people: Vec<String>,
    pub revenue: Option<String>,
    pub employees: Option<String>,
    pub sources: Vec<String>,
}

impl Facts {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sections whose underlying facts are missing, with a reason
    pub fn gaps(&self) -> Vec<(SectionKey, &'static str)> {
        let mut gaps = Vec::new();
        if is_blank(&self.description) {
            gaps.push((SectionKey::Overview, "Company description not found"));
        }
        if self.products.is_empty() && self.services.is_empty() {
            gaps.push((SectionKey::Products, "Product/service information not found"));
        }
        if self.competitors.is_empty() {
            gaps.push((SectionKey::Competitors, "Competitor information not found"));
        }
        if is_blank(&self.industry) {
            gaps.push((SectionKey::Opportunities, "Industry/sector information not found"));
            gaps.push((SectionKey::Risks, "Industry/sector information not found"));
        }
        gaps
    }

    pub fn gap_for(&self, key: SectionKey) -> Option<&'static str> {
        self.gaps()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, reason)| reason)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Facts),
    NotFound,
}

/// Entity fact retrieval
#[async_trait]
pub trait FactLookup: Send + Sync {
    async fn lookup(&self, entity_name: &str) -> Result<LookupOutcome, CollaboratorError>;
}

/// In-memory facts table keyed by normalized company name
#[derive(Debug, Clone, Default)]
pub struct StaticFactLookup {
    facts: HashMap<String, Facts>,
}

impl StaticFactLookup {
    pub fn new(facts: impl IntoIterator<Item = (String, Facts)>) -> Self {
        Self {
            facts: facts
                .into_iter()
                .map(|(key, f)| (normalize_entity_text(&key, true), f))
                .collect(),
        }
    }

    /// Table loaded from the bundled reference data
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_FACTS)
    }

    /// Parse `{ "<name>": { ...facts... }, ... }`
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let table: HashMap<String, Facts> = serde_json::from_str(json)?;
        Ok(Self::new(table))
    }

    pub fn with_facts(mut self, key: &str, facts: Facts) -> Self {
        self.facts.insert(normalize_entity_text(key, true), facts);
        self
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[async_trait]
impl FactLookup for StaticFactLookup {
    async fn lookup(&self, entity_name: &str) -> Result<LookupOutcome, CollaboratorError> {
        let key = normalize_entity_text(entity_name, true);
        match self.facts.get(&key) {
            Some(facts) => {
                tracing::debug!(entity = entity_name, "Facts found");
                Ok(LookupOutcome::Found(facts.clone()))
            }
            None => {
                tracing::debug!(entity = entity_name, "No facts for entity");
                Ok(LookupOutcome::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let lookup = StaticFactLookup::builtin().unwrap();
        assert_eq!(lookup.len(), 12);
    }

    #[tokio::test]
    async fn test_lookup_is_case_and_suffix_insensitive() {
        let lookup = StaticFactLookup::builtin().unwrap();
        for name in ["Microsoft", "microsoft", "MICROSOFT Corporation"] {
            match lookup.lookup(name).await.unwrap() {
                LookupOutcome::Found(facts) => assert_eq!(facts.name, "Microsoft Corporation"),
                LookupOutcome::NotFound => panic!("Expected facts for {name}"),
            }
        }
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let lookup = StaticFactLookup::builtin().unwrap();
        assert_eq!(
            lookup.lookup("Acme Widgets").await.unwrap(),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn test_complete_facts_have_no_gaps() {
        let lookup = StaticFactLookup::builtin().unwrap();
        for facts in lookup.facts.values() {
            assert!(facts.gaps().is_empty(), "{} has gaps", facts.name);
        }
    }

    #[test]
    fn test_sparse_facts_gaps() {
        let facts = Facts {
            description: Some("A widget maker".into()),
            products: vec!["Widgets".into()],
            ..Facts::named("Acme")
        };
        let gaps: Vec<SectionKey> = facts.gaps().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            gaps,
            vec![
                SectionKey::Competitors,
                SectionKey::Opportunities,
                SectionKey::Risks
            ]
        );
        assert!(facts.gap_for(SectionKey::Overview).is_none());
    }
}
