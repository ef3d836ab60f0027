//! Company-name extraction through the generation backend
//!
//! Runs only when rule-based resolution finds nothing. The backend is asked
//! for a single canonical name under the `canonical_name` schema; anything
//! that fails validation is treated as "no name".

use serde::Deserialize;
use std::sync::Arc;

use super::llm_client::{SchemaDescriptor, TextGenerator};
use super::prompts::PromptRenderer;
use crate::error::CollaboratorError;

#[derive(Debug, Deserialize)]
struct ExtractedName {
    canonical_name: Option<String>,
}

pub struct NameExtractor {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptRenderer>,
    schema: SchemaDescriptor,
}

impl NameExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Arc<PromptRenderer>) -> Self {
        Self {
            generator,
            prompts,
            schema: SchemaDescriptor::canonical_name(),
        }
    }

    /// Ask the backend which company the mention names.
    ///
    /// `Ok(None)` when the backend names no company; errors are collaborator
    /// failures the caller may log and treat as "not found".
    pub async fn extract(&self, mention: &str) -> Result<Option<String>, CollaboratorError> {
        let prompt = self.prompts.extraction_prompt(mention)?;
        let value = self.generator.generate(&prompt, &self.schema).await?;
        self.schema.validate(&value)?;

        let extracted: ExtractedName = serde_json::from_value(value)
            .map_err(|e| CollaboratorError::malformed(&self.schema.name, e.to_string()))?;

        let name = extracted
            .canonical_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        tracing::debug!(
            mention,
            extracted = ?name,
            model = self.generator.model_name(),
            "Name extraction finished"
        );
        Ok(name)
    }
}
