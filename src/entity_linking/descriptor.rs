//! Descriptive references ("the cloud company", "that iphone maker")
//!
//! A `DescriptorTable` maps descriptor words and phrases to the attribute
//! tags carried by `EntityRecord`s. `parse` decides whether a mention is a
//! descriptive reference at all and which attributes it asks for; the
//! resolver then looks for an entity with those attributes in history.

use super::normalize::normalize_entity_text;

/// Words that mark a reference as pointing back at something ("that company")
const DETERMINERS: &[&str] = &["the", "that", "this", "same", "those", "a", "an"];

/// Nouns that name the kind of thing being referred to
const HEAD_NOUNS: &[&str] = &[
    "company",
    "companies",
    "firm",
    "corporation",
    "business",
    "one",
    "maker",
    "makers",
    "manufacturer",
    "provider",
    "giant",
    "brand",
    "app",
    "platform",
    "startup",
    "service",
    "player",
    "vendor",
    "guys",
];

/// Descriptor phrase → attribute tag
const BUILTIN_DESCRIPTORS: &[(&str, &str)] = &[
    ("cloud computing", "cloud"),
    ("cloud", "cloud"),
    ("search engine", "search"),
    ("search", "search"),
    ("iphone", "smartphones"),
    ("smartphone", "smartphones"),
    ("phone", "smartphones"),
    ("laptop", "computers"),
    ("computer", "computers"),
    ("pc", "computers"),
    ("electric vehicle", "electric_vehicles"),
    ("electric car", "electric_vehicles"),
    ("ev", "electric_vehicles"),
    ("car", "automotive"),
    ("automaker", "automotive"),
    ("auto", "automotive"),
    ("graphics card", "gpus"),
    ("gpu", "gpus"),
    ("semiconductor", "semiconductors"),
    ("processor", "semiconductors"),
    ("chip", "semiconductors"),
    ("music streaming", "music_streaming"),
    ("music", "music_streaming"),
    ("video streaming", "streaming"),
    ("streaming", "streaming"),
    ("ride hailing", "ride_hailing"),
    ("ride sharing", "ride_hailing"),
    ("ride", "ride_hailing"),
    ("taxi", "ride_hailing"),
    ("online shopping", "ecommerce"),
    ("e commerce", "ecommerce"),
    ("ecommerce", "ecommerce"),
    ("shopping", "ecommerce"),
    ("retail", "retail"),
    ("social media", "social_media"),
    ("social network", "social_media"),
    ("social", "social_media"),
    ("indian it", "indian_it"),
    ("it services", "it_services"),
    ("outsourcing", "it_services"),
    ("consulting", "consulting"),
    ("software", "software"),
    ("payment", "payments"),
    ("fintech", "fintech"),
    ("artificial intelligence", "ai"),
    ("ai", "ai"),
    ("crm", "crm"),
    ("database", "databases"),
    ("networking", "networking"),
    ("video game", "gaming"),
    ("gaming", "gaming"),
    ("console", "gaming"),
    ("coffee", "coffee"),
    ("sportswear", "sportswear"),
    ("sneaker", "sportswear"),
    ("shoe", "sportswear"),
    ("soda", "beverages"),
    ("beverage", "beverages"),
    ("drink", "beverages"),
    ("pharmaceutical", "pharmaceuticals"),
    ("pharma", "pharmaceuticals"),
    ("vaccine", "pharmaceuticals"),
    ("drug", "pharmaceuticals"),
    ("aircraft", "aerospace"),
    ("airplane", "aerospace"),
    ("plane", "aerospace"),
    ("aerospace", "aerospace"),
    ("rocket", "space"),
    ("space", "space"),
    ("food delivery", "food_delivery"),
    ("delivery", "delivery"),
    ("video conferencing", "video_conferencing"),
    ("video call", "video_conferencing"),
    ("messaging", "messaging"),
    ("chat", "messaging"),
    ("travel", "travel"),
    ("hotel", "travel"),
    ("advertising", "advertising"),
    ("ad", "advertising"),
    ("email", "email"),
    ("printer", "printers"),
    ("telecom", "telecom"),
    ("erp", "erp"),
    ("data analytics", "data_analytics"),
    ("analytics", "data_analytics"),
    ("file storage", "file_storage"),
    ("storage", "file_storage"),
    ("design software", "creative_tools"),
    ("creative", "creative_tools"),
];

/// What a descriptive mention asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Attribute tags named by the mention, in mention order
    pub attributes: Vec<String>,
    /// Whether the mention names a kind of organization ("company", "maker")
    pub head_noun: bool,
}

impl Descriptor {
    /// "that company" names no attribute; it points at the most recent entity.
    pub fn is_bare_reference(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Whether the mention can stand alone as a reference outside a research
    /// command. "the cloud company" can; "a new car" and "the coffee" cannot.
    pub fn is_standalone(&self) -> bool {
        self.head_noun
    }
}

/// Descriptor phrase table
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    /// (phrase tokens, attribute), longest phrases first
    entries: Vec<(Vec<String>, String)>,
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new(
            BUILTIN_DESCRIPTORS
                .iter()
                .map(|(p, a)| (p.to_string(), a.to_string())),
        )
    }
}

impl DescriptorTable {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut entries: Vec<(Vec<String>, String)> = entries
            .into_iter()
            .map(|(phrase, attribute)| {
                let tokens = normalize_entity_text(&phrase, false)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                (tokens, attribute)
            })
            .filter(|(tokens, _): &(Vec<String>, String)| !tokens.is_empty())
            .collect();
        // Stable sort keeps table order among phrases of equal length.
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { entries }
    }

    /// Add a phrase mapping (externally supplied attribute tables)
    pub fn with_entry(mut self, phrase: &str, attribute: &str) -> Self {
        let mut all: Vec<(String, String)> = self
            .entries
            .drain(..)
            .map(|(tokens, attr)| (tokens.join(" "), attr))
            .collect();
        all.push((phrase.to_string(), attribute.to_string()));
        Self::new(all)
    }

    /// Parse a mention as a descriptive reference.
    ///
    /// Returns `None` when the mention is not descriptive: it needs a
    /// determiner or head noun, plus either a known descriptor phrase or
    /// both a determiner and a head noun ("that company").
    pub fn parse(&self, mention: &str) -> Option<Descriptor> {
        let norm = normalize_entity_text(mention, false);
        let tokens: Vec<&str> = norm.split_whitespace().collect();
        if tokens.is_empty() {
            return None;
        }

        let has_determiner = tokens.iter().any(|t| DETERMINERS.contains(t));
        let has_head_noun = tokens.iter().any(|t| HEAD_NOUNS.contains(t));
        if !has_determiner && !has_head_noun {
            return None;
        }

        let attributes = self.attributes_in(&tokens);
        if attributes.is_empty() && !(has_determiner && has_head_noun) {
            return None;
        }

        Some(Descriptor {
            attributes,
            head_noun: has_head_noun,
        })
    }

    /// Attribute tags named anywhere in the token sequence
    fn attributes_in(&self, tokens: &[&str]) -> Vec<String> {
        let mut consumed = vec![false; tokens.len()];
        let mut found: Vec<(usize, String)> = Vec::new();

        for (phrase, attribute) in &self.entries {
            let n = phrase.len();
            if n > tokens.len() {
                continue;
            }
            for start in 0..=tokens.len() - n {
                if consumed[start..start + n].iter().any(|c| *c) {
                    continue;
                }
                let matches = phrase
                    .iter()
                    .zip(&tokens[start..start + n])
                    .all(|(p, t)| token_matches(p, t));
                if matches {
                    consumed[start..start + n].iter_mut().for_each(|c| *c = true);
                    if !found.iter().any(|(_, a)| a == attribute) {
                        found.push((start, attribute.clone()));
                    }
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, a)| a).collect()
    }
}

/// Singular phrase word matches itself or a simple plural
fn token_matches(phrase_word: &str, token: &str) -> bool {
    token == phrase_word
        || token
            .strip_suffix('s')
            .is_some_and(|stem| stem == phrase_word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_company() {
        let table = DescriptorTable::default();
        let d = table.parse("that cloud company").unwrap();
        assert_eq!(d.attributes, vec!["cloud"]);
        assert!(!d.is_bare_reference());
    }

    #[test]
    fn test_multiword_phrase_wins() {
        let table = DescriptorTable::default();
        let d = table.parse("the electric car maker").unwrap();
        assert_eq!(d.attributes, vec!["electric_vehicles"]);

        let d = table.parse("the search engine giant").unwrap();
        assert_eq!(d.attributes, vec!["search"]);
    }

    #[test]
    fn test_plural_and_hyphen() {
        let table = DescriptorTable::default();
        let d = table.parse("the e-commerce company").unwrap();
        assert_eq!(d.attributes, vec!["ecommerce"]);
        let d = table.parse("that company making chips").unwrap();
        assert_eq!(d.attributes, vec!["semiconductors"]);
    }

    #[test]
    fn test_bare_reference() {
        let table = DescriptorTable::default();
        assert!(table.parse("that company").unwrap().is_bare_reference());
        assert!(table.parse("the same one").unwrap().is_bare_reference());
    }

    #[test]
    fn test_not_descriptive() {
        let table = DescriptorTable::default();
        assert!(table.parse("Microsoft").is_none());
        assert!(table.parse("cloud").is_none());
        assert!(table.parse("the weather").is_none());
        assert!(table.parse("").is_none());
    }

    #[test]
    fn test_standalone_needs_head_noun() {
        let table = DescriptorTable::default();
        assert!(table.parse("the search engine company").unwrap().is_standalone());
        assert!(table.parse("that company").unwrap().is_standalone());
        assert!(!table.parse("a new car").unwrap().is_standalone());
        assert!(!table.parse("the coffee").unwrap().is_standalone());
    }

    #[test]
    fn test_custom_entry() {
        let table = DescriptorTable::default().with_entry("widget", "widgets");
        let d = table.parse("the widget company").unwrap();
        assert_eq!(d.attributes, vec!["widgets"]);
    }
}
