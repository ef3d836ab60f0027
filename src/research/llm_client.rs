//! Text-generation backend
//!
//! `generate(prompt, schema) -> structured value | error`. Callers always
//! supply an explicit [`SchemaDescriptor`] and validate the returned value
//! against it before use; a generator never hands back unchecked text.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

use super::lookup::Facts;
use crate::config::GeneratorConfig;
use crate::document::SectionKey;
use crate::entity_linking::normalize::{is_non_entity_phrase, strip_command_prefix};
use crate::error::CollaboratorError;

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Delimiters of the facts block embedded in document prompts
pub const FACTS_OPEN: &str = "<facts>";
pub const FACTS_CLOSE: &str = "</facts>";

/// Delimiters of the mention embedded in extraction prompts
pub const MENTION_OPEN: &str = "<mention>";
pub const MENTION_CLOSE: &str = "</mention>";

static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap());

// ============================================================================
// Schema descriptors
// ============================================================================

/// Named JSON Schema the generated value must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    pub name: String,
    pub schema: Value,
}

impl SchemaDescriptor {
    pub const DOCUMENT_SECTIONS: &'static str = "document_sections";
    pub const CANONICAL_NAME: &'static str = "canonical_name";

    /// Five fixed section keys, each a string
    pub fn document_sections() -> Self {
        let properties: serde_json::Map<String, Value> = SectionKey::ALL
            .iter()
            .map(|key| (key.field_name().to_string(), json!({ "type": "string" })))
            .collect();
        let required: Vec<&str> = SectionKey::ALL.iter().map(|k| k.field_name()).collect();

        Self {
            name: Self::DOCUMENT_SECTIONS.to_string(),
            schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false
            }),
        }
    }

    /// A single canonical company name, or null when none can be extracted
    pub fn canonical_name() -> Self {
        Self {
            name: Self::CANONICAL_NAME.to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "canonical_name": { "type": ["string", "null"] }
                },
                "required": ["canonical_name"],
                "additionalProperties": false
            }),
        }
    }

    /// Validate a generated value, collecting every violation.
    pub fn validate(&self, value: &Value) -> Result<(), CollaboratorError> {
        let validator = jsonschema::validator_for(&self.schema)
            .map_err(|e| CollaboratorError::malformed(&self.name, format!("Invalid schema: {}", e)))?;

        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CollaboratorError::malformed(&self.name, errors.join("; ")))
        }
    }
}

// ============================================================================
// TextGenerator
// ============================================================================

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a structured value for the prompt, shaped by `schema`.
    async fn generate(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, CollaboratorError>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;
}

// ============================================================================
// Claude
// ============================================================================

/// Anthropic Messages API implementation of `TextGenerator`
pub struct ClaudeGenerator {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ClaudeGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Build from generator settings; `None` when no API key is configured.
    pub fn from_config(config: &GeneratorConfig) -> Option<Self> {
        config
            .api_key
            .as_ref()
            .map(|key| Self::new(key.clone(), config.model.clone()))
    }
}

#[async_trait]
impl TextGenerator for ClaudeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, CollaboratorError> {
        let system = format!(
            "You are a business research assistant preparing account plans.\n\n\
             IMPORTANT: Return ONLY valid JSON matching this JSON Schema. \
             No markdown, no explanation, just JSON.\n\n{}",
            schema.schema
        );

        let request_body = json!({
            "model": self.model,
            "max_tokens": 2048,
            "system": system,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });

        tracing::debug!(model = %self.model, schema = %schema.name, "Sending generation request");

        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() {
            return Err(CollaboratorError::Generation(format!(
                "API error {}: {}",
                status, body["error"]["message"]
            )));
        }

        let content = body["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|b| b["type"] == "text"))
            .and_then(|block| block["text"].as_str())
            .unwrap_or("");

        parse_json_with_repair(content, &schema.name)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Parse JSON with repair attempts for common completion issues
pub fn parse_json_with_repair(content: &str, schema_name: &str) -> Result<Value, CollaboratorError> {
    if let Ok(v) = serde_json::from_str(content) {
        return Ok(v);
    }

    if let Some(caps) = CODE_BLOCK_RE.captures(content) {
        if let Ok(v) = serde_json::from_str(&caps[1]) {
            tracing::debug!("Extracted JSON from markdown code block");
            return Ok(v);
        }
    }

    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str(&content[start..=end]) {
                tracing::debug!("Extracted JSON object from content");
                return Ok(v);
            }
        }
    }

    let preview: String = content.chars().take(200).collect();
    Err(CollaboratorError::malformed(
        schema_name,
        format!("response is not JSON: {}", preview),
    ))
}

// ============================================================================
// Offline
// ============================================================================

/// Deterministic generator working from the facts embedded in the prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    fn document_sections(&self, prompt: &str) -> Result<Value, CollaboratorError> {
        let block = between(prompt, FACTS_OPEN, FACTS_CLOSE).ok_or_else(|| {
            CollaboratorError::Generation("prompt carries no facts block".to_string())
        })?;
        let facts: Facts = serde_json::from_str(block)
            .map_err(|e| CollaboratorError::Generation(format!("unreadable facts block: {}", e)))?;
        Ok(fallback_sections(&facts))
    }

    fn canonical_name(&self, prompt: &str) -> Value {
        let mention = between(prompt, MENTION_OPEN, MENTION_CLOSE).unwrap_or("");
        json!({ "canonical_name": proper_name(mention) })
    }
}

#[async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, CollaboratorError> {
        match schema.name.as_str() {
            SchemaDescriptor::DOCUMENT_SECTIONS => self.document_sections(prompt),
            SchemaDescriptor::CANONICAL_NAME => Ok(self.canonical_name(prompt)),
            other => Err(CollaboratorError::Generation(format!(
                "offline generator has no template for schema '{}'",
                other
            ))),
        }
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

/// Section text derived directly from facts
pub fn fallback_sections(facts: &Facts) -> Value {
    let name = if facts.name.trim().is_empty() {
        "This company"
    } else {
        facts.name.as_str()
    };
    let industry = facts
        .industry
        .as_deref()
        .filter(|i| !i.trim().is_empty())
        .unwrap_or("their industry");

    let overview = facts
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("{} is a company operating in {}.", name, industry));

    let offerings: Vec<&str> = facts
        .products
        .iter()
        .chain(facts.services.iter())
        .map(String::as_str)
        .collect();
    let products = if offerings.is_empty() {
        format!("{} offers various products and services in {}.", name, industry)
    } else {
        offerings.join(", ")
    };

    let competitors = if facts.competitors.is_empty() {
        format!("Key competitors include other major players in {}.", industry)
    } else {
        facts.competitors.join(", ")
    };

    json!({
        "overview": overview,
        "products": products,
        "competitors": competitors,
        "opportunities": format!(
            "Potential opportunities for {} include: digital transformation initiatives, \
             expansion into new markets, strategic technology partnerships, and innovation in {}.",
            name, industry
        ),
        "risks": format!(
            "Key risks for {} include: competitive pressure from established and emerging players, \
             regulatory and compliance challenges, market volatility, cybersecurity threats, \
             and talent retention in {}.",
            name, industry
        ),
    })
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = start + text[start..].find(close)?;
    Some(text[start..end].trim())
}

/// Capitalized words of a mention, if it reads like a proper name
fn proper_name(mention: &str) -> Option<String> {
    let stripped = strip_command_prefix(mention);
    let words: Vec<&str> = stripped
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '&' && c != '-'))
        .filter(|w| !w.is_empty())
        .skip_while(|w| w.chars().next().is_some_and(char::is_lowercase))
        .take_while(|w| !w.chars().next().is_some_and(char::is_lowercase))
        .collect();

    let name = words.join(" ");
    if name.is_empty() || is_non_entity_phrase(&name) {
        None
    } else {
        Some(name)
    }
}
