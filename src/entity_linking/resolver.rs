//! Mention → entity resolution with confidence
//!
//! Resolution priority:
//!
//! 1. **Direct**: the whole mention is a known name or alias (confidence 1.0)
//! 2. **Contained**: the mention contains a known name ("the Microsoft account")
//! 3. **Alias**: a descriptive reference ("that cloud company") resolved
//!    against recent history, then against catalog attributes
//! 4. **Fuzzy**: misspelled names, scaled by string similarity
//!
//! Inferred resolutions (alias, fuzzy, extracted) always carry a confidence
//! strictly below the auto-accept floor, so they always reach the
//! clarification gate. Candidates the user already rejected are excluded
//! from inferred resolutions but never from literal ones.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::descriptor::{Descriptor, DescriptorTable};
use super::index::{EntityId, EntityIndex};
use super::mention::MentionExtractor;
use super::normalize::{
    is_non_entity_phrase, is_stopword, normalize_entity_text, strip_command_prefix,
};
use crate::config::AgentConfig;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Keys and windows shorter than this never take part in fuzzy matching.
const MIN_FUZZY_CHARS: usize = 3;

/// Alternatives offered alongside the top candidate.
pub const MAX_ALTERNATIVES: usize = 2;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Direct,
    Contained,
    Alias,
    Fuzzy,
    Extracted,
}

impl ResolutionMethod {
    /// Whether the candidate was inferred rather than literally named.
    pub fn is_inferred(self) -> bool {
        matches!(
            self,
            ResolutionMethod::Alias | ResolutionMethod::Fuzzy | ResolutionMethod::Extracted
        )
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionMethod::Direct => "direct",
            ResolutionMethod::Contained => "contained",
            ResolutionMethod::Alias => "alias",
            ResolutionMethod::Fuzzy => "fuzzy",
            ResolutionMethod::Extracted => "extracted",
        };
        f.write_str(s)
    }
}

/// A resolvable entity: canonical id plus display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub id: EntityId,
    pub display_name: String,
}

/// Result of resolving one mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub candidate: Candidate,
    /// Confidence in [0, 1]
    pub confidence: f32,
    pub method: ResolutionMethod,
    /// Runner-up candidates, best first
    pub alternatives: Vec<Candidate>,
    /// The mention text as the user wrote it (command prefix removed)
    pub mention: String,
}

impl Resolution {
    /// Whether this resolution must be confirmed before acting on it.
    pub fn requires_confirmation(&self, auto_accept_floor: f32) -> bool {
        self.confidence < auto_accept_floor
    }

    /// Top candidate followed by alternatives
    pub fn options(&self) -> Vec<Candidate> {
        std::iter::once(self.candidate.clone())
            .chain(self.alternatives.iter().cloned())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// EntityNormalizer
// ---------------------------------------------------------------------------

/// Resolves free-text mentions against the entity index
#[derive(Debug, Clone)]
pub struct EntityNormalizer {
    index: EntityIndex,
    descriptors: DescriptorTable,
    mentions: MentionExtractor,
    auto_accept_floor: f32,
    alias_confidence: f32,
    fuzzy_floor: f32,
    fuzzy_weight: f32,
    extraction_confidence: f32,
    history_window: usize,
}

impl EntityNormalizer {
    pub fn new(index: EntityIndex, descriptors: DescriptorTable, config: &AgentConfig) -> Self {
        Self {
            index,
            descriptors,
            mentions: MentionExtractor,
            auto_accept_floor: config.auto_accept_floor,
            alias_confidence: config.alias_confidence,
            fuzzy_floor: config.fuzzy_floor,
            fuzzy_weight: config.fuzzy_weight,
            extraction_confidence: config.extraction_confidence,
            history_window: config.history_window,
        }
    }

    /// Normalizer over the built-in catalog and descriptor table
    pub fn with_builtin_catalog(config: &AgentConfig) -> Self {
        Self::new(EntityIndex::builtin(), DescriptorTable::default(), config)
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    pub fn auto_accept_floor(&self) -> f32 {
        self.auto_accept_floor
    }

    pub fn candidate(&self, id: &EntityId) -> Candidate {
        Candidate {
            id: id.clone(),
            display_name: self.index.display_name(id),
        }
    }

    /// Resolve a mention.
    ///
    /// `history` holds the texts of earlier conversation entries, oldest
    /// first, excluding the utterance being resolved. Returns `None` when no
    /// candidate exists at all.
    pub fn resolve(
        &self,
        mention: &str,
        history: &[&str],
        rejected: &HashSet<EntityId>,
    ) -> Option<Resolution> {
        let stripped = strip_command_prefix(mention).trim();
        if is_non_entity_phrase(stripped) {
            return None;
        }

        let norm = normalize_entity_text(stripped, true);

        // 1. Whole mention is a name or alias
        let exact = self.index.lookup_exact(&norm);
        if !exact.is_empty() {
            return Some(self.literal(exact, stripped, ResolutionMethod::Direct));
        }

        // 2. A name appears inside the mention
        let contained = self.mentions.entities_in(stripped, &self.index);
        if !contained.is_empty() {
            return Some(self.literal(contained, stripped, ResolutionMethod::Contained));
        }

        // 3. Descriptive reference. A descriptor that matches nothing does not
        // fall through to fuzzy: "the cloud company" is not a misspelling.
        if let Some(descriptor) = self.descriptors.parse(stripped) {
            return self.resolve_descriptor(&descriptor, stripped, history, rejected);
        }

        // 4. Misspelled name
        self.resolve_fuzzy(&norm, stripped, rejected)
    }

    /// Whether a mention names exactly this entity (used for "typing the name confirms")
    pub fn names_entity(&self, mention: &str, id: &EntityId) -> bool {
        let norm = normalize_entity_text(strip_command_prefix(mention), true);
        !norm.is_empty() && self.index.lookup_exact(&norm).contains(id)
    }

    /// Whether the utterance is a name on its own, or a descriptive reference
    /// that names a kind of organization ("the cloud company")
    pub fn recognizes(&self, utterance: &str) -> bool {
        let stripped = strip_command_prefix(utterance);
        if is_non_entity_phrase(stripped) {
            return false;
        }
        let norm = normalize_entity_text(stripped, true);
        !self.index.lookup_exact(&norm).is_empty()
            || self
                .descriptors
                .parse(stripped)
                .is_some_and(|d| d.is_standalone())
    }

    /// Entities literally mentioned in a text, in order of appearance
    pub fn entities_in(&self, text: &str) -> Vec<EntityId> {
        self.mentions.entities_in(text, &self.index)
    }

    /// Build an extracted resolution for a name produced by the generation backend.
    ///
    /// Known names map onto their catalog entry; unknown names get a derived
    /// id. Confidence is always capped below the floor.
    pub fn extracted(
        &self,
        name: &str,
        mention: &str,
        rejected: &HashSet<EntityId>,
    ) -> Option<Resolution> {
        let norm = normalize_entity_text(name, true);
        if norm.is_empty() || is_non_entity_phrase(&norm) {
            return None;
        }

        let candidate = match self.index.lookup_exact(&norm).first() {
            Some(id) => self.candidate(id),
            None => Candidate {
                id: EntityId::from_name(name),
                display_name: name.trim().to_string(),
            },
        };
        if rejected.contains(&candidate.id) {
            return None;
        }

        Some(Resolution {
            candidate,
            confidence: self.capped(self.extraction_confidence),
            method: ResolutionMethod::Extracted,
            alternatives: vec![],
            mention: mention.trim().to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Literal match; several candidates make it ambiguous and capped.
    fn literal(&self, ids: Vec<EntityId>, mention: &str, method: ResolutionMethod) -> Resolution {
        let mut options = ids.iter().map(|id| self.candidate(id));
        // Callers only pass non-empty id lists.
        let candidate = options.next().unwrap_or_else(|| Candidate {
            id: EntityId::from_name(mention),
            display_name: mention.to_string(),
        });
        let alternatives: Vec<Candidate> = options.take(MAX_ALTERNATIVES).collect();
        let confidence = if alternatives.is_empty() {
            1.0
        } else {
            self.capped(self.alias_confidence)
        };

        tracing::debug!(
            mention,
            candidate = %candidate.id,
            %method,
            confidence,
            "Literal entity match"
        );

        Resolution {
            candidate,
            confidence,
            method,
            alternatives,
            mention: mention.to_string(),
        }
    }

    fn resolve_descriptor(
        &self,
        descriptor: &Descriptor,
        mention: &str,
        history: &[&str],
        rejected: &HashSet<EntityId>,
    ) -> Option<Resolution> {
        let matches_descriptor = |id: &EntityId| {
            descriptor.is_bare_reference()
                || self
                    .index
                    .get(id)
                    .is_some_and(|r| descriptor.attributes.iter().any(|a| r.has_attribute(a)))
        };

        // Newest history entry first; within an entry, the last mention first.
        let from_history = history
            .iter()
            .rev()
            .take(self.history_window)
            .flat_map(|text| self.mentions.entities_in(text, &self.index).into_iter().rev())
            .find(|id| !rejected.contains(id) && matches_descriptor(id));

        if let Some(id) = from_history {
            tracing::debug!(mention, candidate = %id, "Descriptor resolved from history");
            return Some(Resolution {
                candidate: self.candidate(&id),
                confidence: self.capped(self.alias_confidence),
                method: ResolutionMethod::Alias,
                alternatives: vec![],
                mention: mention.to_string(),
            });
        }

        if descriptor.is_bare_reference() {
            return None;
        }

        // Catalog fallback: entities sharing the most requested attributes first.
        let mut scored: Vec<(usize, usize, EntityId)> = Vec::new();
        for attribute in &descriptor.attributes {
            for id in self.index.with_attribute(attribute) {
                if rejected.contains(&id) || scored.iter().any(|(_, _, s)| *s == id) {
                    continue;
                }
                let hits = self.index.get(&id).map_or(0, |r| {
                    descriptor
                        .attributes
                        .iter()
                        .filter(|a| r.has_attribute(a))
                        .count()
                });
                scored.push((hits, scored.len(), id));
            }
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut options = scored.into_iter().map(|(_, _, id)| self.candidate(&id));
        let candidate = options.next()?;

        tracing::debug!(mention, candidate = %candidate.id, "Descriptor resolved from catalog");
        Some(Resolution {
            candidate,
            confidence: self.capped(self.alias_confidence),
            method: ResolutionMethod::Alias,
            alternatives: options.take(MAX_ALTERNATIVES).collect(),
            mention: mention.to_string(),
        })
    }

    fn resolve_fuzzy(
        &self,
        norm: &str,
        mention: &str,
        rejected: &HashSet<EntityId>,
    ) -> Option<Resolution> {
        let windows = fuzzy_windows(norm, self.index.max_name_tokens());
        if windows.is_empty() {
            return None;
        }

        let mut best: HashMap<&EntityId, f32> = HashMap::new();
        for (key, id) in self.index.match_keys() {
            if key.chars().count() < MIN_FUZZY_CHARS || rejected.contains(id) {
                continue;
            }
            for window in &windows {
                let sim = similarity(window, key);
                if sim >= self.fuzzy_floor {
                    let entry = best.entry(id).or_insert(0.0);
                    if sim > *entry {
                        *entry = sim;
                    }
                }
            }
        }

        let mut ranked: Vec<(&EntityId, f32)> = best.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let (top_id, top_sim) = *ranked.first()?;
        let confidence = self.capped((top_sim * self.fuzzy_weight).clamp(0.0, 1.0));

        tracing::debug!(
            mention,
            candidate = %top_id,
            similarity = top_sim,
            confidence,
            "Fuzzy entity match"
        );

        Some(Resolution {
            candidate: self.candidate(top_id),
            confidence,
            method: ResolutionMethod::Fuzzy,
            alternatives: ranked
                .iter()
                .skip(1)
                .take(MAX_ALTERNATIVES)
                .map(|(id, _)| self.candidate(id))
                .collect(),
            mention: mention.to_string(),
        })
    }

    /// Inferred confidence never reaches the floor.
    fn capped(&self, confidence: f32) -> f32 {
        let ceiling = (self.auto_accept_floor - 0.01).max(0.0);
        confidence.min(ceiling)
    }
}

/// Token windows of a normalized mention worth comparing against names
fn fuzzy_windows(norm: &str, max_tokens: usize) -> Vec<String> {
    let tokens: Vec<&str> = norm.split_whitespace().collect();
    let mut windows = Vec::new();
    for start in 0..tokens.len() {
        for len in 1..=max_tokens.max(1).min(tokens.len() - start) {
            let span = &tokens[start..start + len];
            if span.iter().all(|t| is_stopword(t)) {
                continue;
            }
            let window = span.join(" ");
            if window.chars().count() >= MIN_FUZZY_CHARS && !windows.contains(&window) {
                windows.push(window);
            }
        }
    }
    windows
}

/// Blend of Jaro-Winkler (rewards shared prefixes) and normalized Levenshtein
/// (penalises unrelated words that happen to share a first letter).
fn similarity(a: &str, b: &str) -> f32 {
    let jw = strsim::jaro_winkler(a, b);
    let lev = strsim::normalized_levenshtein(a, b);
    ((jw + lev) / 2.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_linking::index::EntityRecord;

    fn normalizer() -> EntityNormalizer {
        EntityNormalizer::with_builtin_catalog(&AgentConfig::default())
    }

    fn small_normalizer() -> EntityNormalizer {
        let index = EntityIndex::new(vec![
            EntityRecord::new("Amazon")
                .with_aliases(&["AWS"])
                .with_attributes(&["cloud", "ecommerce"]),
            EntityRecord::new("Microsoft").with_attributes(&["cloud", "software"]),
            EntityRecord::new("Google").with_attributes(&["search", "cloud"]),
            EntityRecord::new("Tesla").with_attributes(&["electric_vehicles"]),
        ]);
        EntityNormalizer::new(index, DescriptorTable::default(), &AgentConfig::default())
    }

    fn none() -> HashSet<EntityId> {
        HashSet::new()
    }

    #[test]
    fn test_direct_match_is_certain() {
        let n = normalizer();
        for mention in ["Microsoft", "microsoft", "MICROSOFT", "Research Microsoft", "Apple, Inc."] {
            let r = n.resolve(mention, &[], &none()).unwrap();
            assert_eq!(r.method, ResolutionMethod::Direct, "{mention}");
            assert_eq!(r.confidence, 1.0);
            assert!(!r.requires_confirmation(n.auto_accept_floor()));
        }
    }

    #[test]
    fn test_alias_name_is_direct() {
        let r = normalizer().resolve("facebook", &[], &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Meta");
        assert_eq!(r.method, ResolutionMethod::Direct);
    }

    #[test]
    fn test_contained_single_entity() {
        let r = normalizer()
            .resolve("research the Tesla account", &[], &none())
            .unwrap();
        assert_eq!(r.candidate.display_name, "Tesla");
        assert_eq!(r.method, ResolutionMethod::Contained);
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn test_contained_multiple_entities_is_ambiguous() {
        let n = small_normalizer();
        let r = n.resolve("compare Microsoft and Google", &[], &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Microsoft");
        assert_eq!(r.alternatives[0].display_name, "Google");
        assert!(r.requires_confirmation(n.auto_accept_floor()));
    }

    #[test]
    fn test_descriptor_resolves_from_history_below_floor() {
        let n = small_normalizer();
        let history = ["Research Amazon", "Here is the plan for Amazon."];
        let r = n.resolve("that cloud company", &history, &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Amazon");
        assert_eq!(r.method, ResolutionMethod::Alias);
        assert!(r.confidence < n.auto_accept_floor());
        assert!(r.alternatives.is_empty());
    }

    #[test]
    fn test_descriptor_prefers_most_recent_match() {
        let n = small_normalizer();
        let history = ["research amazon", "now research google"];
        let r = n.resolve("the cloud company", &history, &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Google");
    }

    #[test]
    fn test_descriptor_skips_entities_without_attribute() {
        let n = small_normalizer();
        let history = ["research amazon", "research tesla"];
        let r = n.resolve("the cloud company", &history, &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Amazon");
    }

    #[test]
    fn test_history_window_limits_lookback() {
        let config = AgentConfig {
            history_window: 1,
            ..AgentConfig::default()
        };
        let n = EntityNormalizer::new(
            small_normalizer().index().clone(),
            DescriptorTable::default(),
            &config,
        );
        let history = ["research tesla", "hello there"];
        assert!(n.resolve("that company", &history, &none()).is_none());
    }

    #[test]
    fn test_descriptor_catalog_fallback_offers_alternatives() {
        let n = small_normalizer();
        let r = n.resolve("the cloud company", &[], &none()).unwrap();
        assert_eq!(r.method, ResolutionMethod::Alias);
        assert_eq!(r.candidate.display_name, "Amazon");
        assert_eq!(r.alternatives.len(), 2);
        assert!(r.confidence < n.auto_accept_floor());
    }

    #[test]
    fn test_bare_reference_needs_history() {
        let n = small_normalizer();
        assert!(n.resolve("that company", &[], &none()).is_none());
        let r = n.resolve("that company", &["tell me about tesla"], &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Tesla");
    }

    #[test]
    fn test_rejected_candidates_are_excluded_from_inference() {
        let n = small_normalizer();
        let history = ["research amazon"];
        let rejected: HashSet<EntityId> = [EntityId::from_name("Amazon")].into_iter().collect();

        let r = n.resolve("the cloud company", &history, &rejected).unwrap();
        assert_ne!(r.candidate.display_name, "Amazon");

        // Literal names are never excluded
        let r = n.resolve("Amazon", &[], &rejected).unwrap();
        assert_eq!(r.method, ResolutionMethod::Direct);
    }

    #[test]
    fn test_fuzzy_misspelling_requires_confirmation() {
        let n = normalizer();
        let r = n.resolve("research microsft", &[], &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Microsoft");
        assert_eq!(r.method, ResolutionMethod::Fuzzy);
        assert!(r.requires_confirmation(n.auto_accept_floor()));

        let r = n.resolve("amazn", &[], &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Amazon");
    }

    #[test]
    fn test_fuzzy_below_floor_is_none() {
        let n = small_normalizer();
        assert!(n.resolve("weather forecast", &[], &none()).is_none());
        assert!(n.resolve("qzx", &[], &none()).is_none());
    }

    #[test]
    fn test_non_entity_words_never_resolve() {
        let n = normalizer();
        for word in ["yes", "no", "help", "it", "", "  ", "42"] {
            assert!(n.resolve(word, &[], &none()).is_none(), "{word:?}");
        }
    }

    #[test]
    fn test_extracted_is_capped() {
        let n = normalizer();
        let r = n.extracted("Acme Widgets", "the widget people", &none()).unwrap();
        assert_eq!(r.method, ResolutionMethod::Extracted);
        assert_eq!(r.candidate.id.as_str(), "acme-widgets");
        assert!(r.requires_confirmation(n.auto_accept_floor()));

        let r = n.extracted("netflix", "that streaming thing", &none()).unwrap();
        assert_eq!(r.candidate.display_name, "Netflix");
    }

    #[test]
    fn test_names_entity() {
        let n = normalizer();
        assert!(n.names_entity("Amazon", &EntityId::from_name("Amazon")));
        assert!(n.names_entity("aws", &EntityId::from_name("Amazon")));
        assert!(!n.names_entity("Google", &EntityId::from_name("Amazon")));
    }
}
