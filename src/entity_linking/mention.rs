//! Mention extraction from utterances
//!
//! Finds spans of an utterance that literally name a known entity
//! ("compare Goldman Sachs and Microsoft") using n-gram scanning against the
//! entity index. Used both for "contained" resolution of the current mention
//! and for scanning conversation history for previously discussed entities.

use smallvec::SmallVec;

use super::index::{EntityId, EntityIndex};
use super::normalize::{is_stopword, normalize_entity_text};

/// A literal entity mention inside an utterance
#[derive(Debug, Clone, PartialEq)]
pub struct MentionSpan {
    /// Start byte position in the original text
    pub start: usize,
    /// End byte position in the original text (exclusive)
    pub end: usize,
    /// Original text of the mention
    pub text: String,
    /// Normalized form used for the lookup
    pub normalized: String,
    /// Entities whose name or alias equals the span
    pub candidate_ids: SmallVec<[EntityId; 4]>,
}

impl MentionSpan {
    fn token_len(&self) -> usize {
        self.normalized.split_whitespace().count()
    }
}

/// Extracts exact entity mention spans from utterances
#[derive(Debug, Clone, Copy, Default)]
pub struct MentionExtractor;

impl MentionExtractor {
    /// Extract non-overlapping mention spans, in utterance order.
    pub fn extract(&self, utterance: &str, index: &EntityIndex) -> Vec<MentionSpan> {
        let words = tokenize_with_positions(utterance);
        if words.is_empty() {
            return vec![];
        }

        let max_ngram = index.max_name_tokens().max(1);
        let mut candidates: Vec<MentionSpan> = Vec::new();

        for start_idx in 0..words.len() {
            for ngram_len in 1..=max_ngram.min(words.len() - start_idx) {
                let span_words = &words[start_idx..start_idx + ngram_len];
                let (char_start, _, _) = &span_words[0];
                let (_, char_end, _) = &span_words[ngram_len - 1];

                let text = &utterance[*char_start..*char_end];
                let normalized = normalize_entity_text(text, true);
                if normalized.is_empty() || (ngram_len == 1 && is_stopword(&normalized)) {
                    continue;
                }

                let ids = index.lookup_exact(&normalized);
                if ids.is_empty() {
                    continue;
                }

                candidates.push(MentionSpan {
                    start: *char_start,
                    end: *char_end,
                    text: text.to_string(),
                    normalized,
                    candidate_ids: ids.into_iter().collect(),
                });
            }
        }

        select_non_overlapping(candidates)
    }

    /// Distinct entities mentioned in the utterance, in order of first appearance.
    pub fn entities_in(&self, utterance: &str, index: &EntityIndex) -> Vec<EntityId> {
        let mut seen: Vec<EntityId> = Vec::new();
        for span in self.extract(utterance, index) {
            for id in span.candidate_ids {
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
        }
        seen
    }
}

/// Tokenize with byte positions: Vec<(start, end, token_lower)>
fn tokenize_with_positions(s: &str) -> Vec<(usize, usize, String)> {
    let mut result = Vec::new();
    let mut in_word = false;
    let mut word_start = 0;

    for (i, c) in s.char_indices() {
        if c.is_alphanumeric() {
            if !in_word {
                word_start = i;
                in_word = true;
            }
        } else if in_word {
            result.push((word_start, i, s[word_start..i].to_lowercase()));
            in_word = false;
        }
    }

    if in_word {
        result.push((word_start, s.len(), s[word_start..].to_lowercase()));
    }

    result
}

/// Greedy non-overlapping selection preferring longer spans, returned in text order
fn select_non_overlapping(mut candidates: Vec<MentionSpan>) -> Vec<MentionSpan> {
    candidates.sort_by(|a, b| {
        b.token_len()
            .cmp(&a.token_len())
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut selected: Vec<MentionSpan> = Vec::new();
    for candidate in candidates {
        let overlaps = selected
            .iter()
            .any(|s| candidate.start < s.end && s.start < candidate.end);
        if !overlaps {
            selected.push(candidate);
        }
    }

    selected.sort_by_key(|s| s.start);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_linking::index::EntityRecord;

    fn test_index() -> EntityIndex {
        EntityIndex::new(vec![
            EntityRecord::new("Goldman Sachs"),
            EntityRecord::new("Goldman"),
            EntityRecord::new("Microsoft"),
            EntityRecord::new("Amazon").with_aliases(&["AWS"]),
        ])
    }

    #[test]
    fn test_extract_prefers_longest_span() {
        let spans = MentionExtractor.extract("Set up Goldman Sachs please", &test_index());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Goldman Sachs");
        assert_eq!(spans[0].candidate_ids[0], EntityId::from_name("Goldman Sachs"));
    }

    #[test]
    fn test_extract_multiple_in_order() {
        let spans = MentionExtractor.extract("compare microsoft and AWS", &test_index());
        let names: Vec<_> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(names, vec!["microsoft", "AWS"]);
    }

    #[test]
    fn test_entities_in_deduplicates() {
        let ids = MentionExtractor.entities_in("Amazon, aws and amazon again", &test_index());
        assert_eq!(ids, vec![EntityId::from_name("Amazon")]);
    }

    #[test]
    fn test_extract_nothing() {
        assert!(MentionExtractor.extract("what's the weather?", &test_index()).is_empty());
        assert!(MentionExtractor.extract("", &test_index()).is_empty());
    }
}
