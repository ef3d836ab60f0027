//! Agent configuration
//!
//! All thresholds used by the resolver, the clarification gate and the
//! persona classifier live here so they can be calibrated in one place.
//! Values come from defaults, then `.env` / `ACCOUNT_PLANNER_*` variables.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Resolutions at or above this confidence are accepted without asking.
pub const DEFAULT_AUTO_ACCEPT_FLOOR: f32 = 0.85;

/// Confidence assigned to descriptive (alias) resolutions. Always below the floor.
pub const DEFAULT_ALIAS_CONFIDENCE: f32 = 0.65;

/// Minimum name similarity for a fuzzy candidate to exist at all.
pub const DEFAULT_FUZZY_FLOOR: f32 = 0.75;

/// Fuzzy confidence = similarity * weight.
pub const DEFAULT_FUZZY_WEIGHT: f32 = 0.85;

/// Confidence assigned to names extracted by the generation backend.
pub const DEFAULT_EXTRACTION_CONFIDENCE: f32 = 0.60;

/// How many history entries alias resolution looks back through.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

pub const DEFAULT_CONFUSION_THRESHOLD: u32 = 2;
pub const DEFAULT_EFFICIENT_THRESHOLD: u32 = 2;
pub const DEFAULT_CHATTY_THRESHOLD: u32 = 2;

const ENV_PREFIX: &str = "ACCOUNT_PLANNER_";

/// Default model for the HTTP generation backend
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub auto_accept_floor: f32,
    pub alias_confidence: f32,
    pub fuzzy_floor: f32,
    pub fuzzy_weight: f32,
    pub extraction_confidence: f32,
    pub history_window: usize,
    pub persona: PersonaThresholds,
    pub generator: GeneratorConfig,
}

/// Counter thresholds for persona derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaThresholds {
    pub confusion: u32,
    pub efficient: u32,
    pub chatty: u32,
}

/// Settings for the HTTP text-generation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            auto_accept_floor: DEFAULT_AUTO_ACCEPT_FLOOR,
            alias_confidence: DEFAULT_ALIAS_CONFIDENCE,
            fuzzy_floor: DEFAULT_FUZZY_FLOOR,
            fuzzy_weight: DEFAULT_FUZZY_WEIGHT,
            extraction_confidence: DEFAULT_EXTRACTION_CONFIDENCE,
            history_window: DEFAULT_HISTORY_WINDOW,
            persona: PersonaThresholds::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Default for PersonaThresholds {
    fn default() -> Self {
        Self {
            confusion: DEFAULT_CONFUSION_THRESHOLD,
            efficient: DEFAULT_EFFICIENT_THRESHOLD,
            chatty: DEFAULT_CHATTY_THRESHOLD,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(v) = var("AUTO_ACCEPT_FLOOR") {
            config.auto_accept_floor = parse_value("AUTO_ACCEPT_FLOOR", &v)?;
        }
        if let Some(v) = var("ALIAS_CONFIDENCE") {
            config.alias_confidence = parse_value("ALIAS_CONFIDENCE", &v)?;
        }
        if let Some(v) = var("FUZZY_FLOOR") {
            config.fuzzy_floor = parse_value("FUZZY_FLOOR", &v)?;
        }
        if let Some(v) = var("FUZZY_WEIGHT") {
            config.fuzzy_weight = parse_value("FUZZY_WEIGHT", &v)?;
        }
        if let Some(v) = var("EXTRACTION_CONFIDENCE") {
            config.extraction_confidence = parse_value("EXTRACTION_CONFIDENCE", &v)?;
        }
        if let Some(v) = var("HISTORY_WINDOW") {
            config.history_window = parse_value("HISTORY_WINDOW", &v)?;
        }
        if let Some(v) = var("CONFUSION_THRESHOLD") {
            config.persona.confusion = parse_value("CONFUSION_THRESHOLD", &v)?;
        }
        if let Some(v) = var("EFFICIENT_THRESHOLD") {
            config.persona.efficient = parse_value("EFFICIENT_THRESHOLD", &v)?;
        }
        if let Some(v) = var("CHATTY_THRESHOLD") {
            config.persona.chatty = parse_value("CHATTY_THRESHOLD", &v)?;
        }
        if let Some(v) = var("MODEL") {
            config.generator.model = v;
        }
        config.generator.api_key = lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Check ranges and the alias policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("auto_accept_floor", self.auto_accept_floor),
            ("alias_confidence", self.alias_confidence),
            ("fuzzy_floor", self.fuzzy_floor),
            ("fuzzy_weight", self.fuzzy_weight),
            ("extraction_confidence", self.extraction_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(key, value, "must be within [0, 1]"));
            }
        }

        // Inferred references must always reach the clarification gate.
        if self.alias_confidence >= self.auto_accept_floor {
            return Err(invalid(
                "alias_confidence",
                self.alias_confidence,
                "must be below auto_accept_floor",
            ));
        }
        if self.extraction_confidence >= self.auto_accept_floor {
            return Err(invalid(
                "extraction_confidence",
                self.extraction_confidence,
                "must be below auto_accept_floor",
            ));
        }
        if self.history_window == 0 {
            return Err(invalid("history_window", 0, "must be at least 1"));
        }
        Ok(())
    }

    /// Whether the HTTP generation backend can be used
    pub fn has_remote_generator(&self) -> bool {
        self.generator.api_key.is_some()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(&format!("{}{}", ENV_PREFIX, key), raw, "could not be parsed"))
}

fn invalid(key: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.alias_confidence < config.auto_accept_floor);
        assert!(!config.has_remote_generator());
    }

    #[test]
    fn test_env_overrides() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("ACCOUNT_PLANNER_AUTO_ACCEPT_FLOOR", "0.9"),
            ("ACCOUNT_PLANNER_HISTORY_WINDOW", "4"),
            ("ACCOUNT_PLANNER_MODEL", "test-model"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.auto_accept_floor, 0.9);
        assert_eq!(config.history_window, 4);
        assert_eq!(config.generator.model, "test-model");
        assert!(config.has_remote_generator());
    }

    #[test]
    fn test_alias_confidence_cannot_reach_floor() {
        let result = AgentConfig::from_lookup(lookup_from(&[(
            "ACCOUNT_PLANNER_ALIAS_CONFIDENCE",
            "0.95",
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_unparseable_value() {
        let result =
            AgentConfig::from_lookup(lookup_from(&[("ACCOUNT_PLANNER_FUZZY_FLOOR", "high")]));
        match result {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "ACCOUNT_PLANNER_FUZZY_FLOOR")
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config =
            AgentConfig::from_lookup(lookup_from(&[("ANTHROPIC_API_KEY", "   ")])).unwrap();
        assert!(!config.has_remote_generator());
    }
}
