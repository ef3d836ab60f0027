//! Text normalization for entity matching
//!
//! Every comparison between a user mention and the entity index goes through
//! these functions so that "Apple, Inc.", "APPLE" and "apple" meet on the
//! same key:
//! - Unicode NFKC fold
//! - Lowercase conversion
//! - Punctuation replaced by whitespace
//! - Whitespace collapsing
//! - Optional legal suffix removal

use unicode_normalization::UnicodeNormalization;

/// Legal suffixes dropped when building match keys
const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "llc",
    "ltd",
    "limited",
    "plc",
    "ag",
    "gmbh",
    "co",
    "lp",
    "llp",
    "nv",
    "bv",
    "pty",
];

/// Verbs and phrases that introduce a research request ("Research Apple").
/// Longest first so "look up" wins over "look".
const COMMAND_PREFIXES: &[&str] = &[
    "get information on",
    "tell me about",
    "information on",
    "get info on",
    "learn about",
    "investigate",
    "research",
    "analyse",
    "analyze",
    "look up",
    "lookup",
    "search",
    "find",
];

/// Words that are never entity names on their own.
const NON_ENTITY_WORDS: &[&str] = &[
    // confirmations
    "yes", "no", "ok", "okay", "sure", "proceed", "continue", "go", "go ahead", "fine",
    "alright", "right", "correct", "yep", "yup", "nope", "nah", "y", "n",
    // greetings and farewells
    "hi", "hello", "hey", "hii", "greetings", "good morning", "good afternoon",
    "good evening", "bye", "goodbye", "thanks", "thank you",
    // commands
    "help", "stop", "exit", "quit", "cancel", "reset", "clear", "undo", "show", "display",
    "view", "see", "print", "plan",
    // pronouns
    "it", "that", "this", "them", "they", "those", "these",
    // function words
    "what", "who", "where", "when", "why", "how", "which", "is", "are", "was", "were", "be",
    "do", "does", "did", "have", "has", "had", "a", "an", "the", "and", "or", "but", "if",
    "then", "me", "my", "i", "you",
    // selections
    "one", "two", "three", "first", "second", "third",
];

/// Normalize entity text for matching.
///
/// # Examples
///
/// ```
/// use account_planner::entity_linking::normalize::normalize_entity_text;
///
/// assert_eq!(normalize_entity_text("Apple, Inc.", true), "apple");
/// assert_eq!(normalize_entity_text("Apple, Inc.", false), "apple inc");
/// assert_eq!(normalize_entity_text("  Coca-Cola  ", true), "coca cola");
/// ```
pub fn normalize_entity_text(s: &str, strip_legal_suffixes: bool) -> String {
    let folded: String = s.nfkc().collect();

    let stripped: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();

    let tokens = stripped.split_whitespace();
    let filtered: Vec<&str> = if strip_legal_suffixes {
        let all: Vec<&str> = tokens.collect();
        // Never strip a name down to nothing ("Co" alone stays "co").
        let kept: Vec<&str> = all
            .iter()
            .copied()
            .filter(|t| !LEGAL_SUFFIXES.contains(t))
            .collect();
        if kept.is_empty() {
            all
        } else {
            kept
        }
    } else {
        tokens.collect()
    };

    filtered.join(" ")
}

/// Collapse runs of whitespace and trim.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip a leading research verb: "Research Apple" → "Apple".
///
/// Returns the input unchanged when no prefix matches on a word boundary.
pub fn strip_command_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    for prefix in COMMAND_PREFIXES {
        if let Some(rest) = lower.strip_prefix(prefix) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                // Lowercasing ASCII prefixes keeps byte offsets aligned.
                return trimmed[prefix.len()..].trim_start();
            }
        }
    }
    trimmed
}

/// Check whether a (normalized or raw) phrase can never name an entity.
pub fn is_non_entity_phrase(text: &str) -> bool {
    let norm = normalize_entity_text(text, false);
    if norm.is_empty() {
        return true;
    }
    if norm.chars().all(|c| c.is_ascii_digit() || c == ' ') {
        return true;
    }
    NON_ENTITY_WORDS.contains(&norm.as_str())
}

/// Check whether a single normalized token is a function word or command word.
pub fn is_stopword(token: &str) -> bool {
    NON_ENTITY_WORDS.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_with_suffix_strip() {
        assert_eq!(normalize_entity_text("Apple, Inc.", true), "apple");
        assert_eq!(
            normalize_entity_text("Microsoft Corporation", true),
            "microsoft"
        );
        assert_eq!(
            normalize_entity_text("Johnson & Johnson", true),
            "johnson johnson"
        );
    }

    #[test]
    fn test_suffix_only_name_survives() {
        assert_eq!(normalize_entity_text("Co.", true), "co");
    }

    #[test]
    fn test_unicode_normalization() {
        assert_eq!(normalize_entity_text("Ａｐｐｌｅ", false), "apple");
        assert_eq!(
            normalize_entity_text("Société Générale", false),
            "société générale"
        );
    }

    #[test]
    fn test_strip_command_prefix() {
        assert_eq!(strip_command_prefix("Research Microsoft"), "Microsoft");
        assert_eq!(strip_command_prefix("tell me about  Tesla"), "Tesla");
        assert_eq!(strip_command_prefix("look up the cloud company"), "the cloud company");
        // No word boundary: "Findus" is a name, not "find us"
        assert_eq!(strip_command_prefix("Findus"), "Findus");
        assert_eq!(strip_command_prefix("Apple"), "Apple");
    }

    #[test]
    fn test_non_entity_phrases() {
        assert!(is_non_entity_phrase("yes"));
        assert!(is_non_entity_phrase("Thank you!"));
        assert!(is_non_entity_phrase("2."));
        assert!(is_non_entity_phrase("   "));
        assert!(!is_non_entity_phrase("Amazon"));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  update   risks\twith: x "), "update risks with: x");
    }
}
