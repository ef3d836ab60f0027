//! Document Builder
//!
//! Fresh builds go lookup → prompt → generate → validate → document.
//! Updates replace one section in a copy of the document, so a failed or
//! rejected update never leaves a half-modified plan behind.

use serde::Deserialize;
use std::sync::Arc;

use super::{Document, Section, SectionKey};
use crate::entity_linking::Candidate;
use crate::error::{AgentError, CollaboratorError};
use crate::research::llm_client::{SchemaDescriptor, TextGenerator};
use crate::research::lookup::{FactLookup, Facts, LookupOutcome};
use crate::research::prompts::PromptRenderer;

/// Replacement content for one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionUpdate {
    pub section: String,
    pub content: String,
}

/// Generated section texts, shaped by `SchemaDescriptor::document_sections`
#[derive(Debug, Deserialize)]
struct GeneratedSections {
    overview: String,
    products: String,
    competitors: String,
    opportunities: String,
    risks: String,
}

impl GeneratedSections {
    fn get(&self, key: SectionKey) -> &str {
        match key {
            SectionKey::Overview => &self.overview,
            SectionKey::Products => &self.products,
            SectionKey::Competitors => &self.competitors,
            SectionKey::Opportunities => &self.opportunities,
            SectionKey::Risks => &self.risks,
        }
    }
}

pub struct DocumentBuilder {
    lookup: Arc<dyn FactLookup>,
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptRenderer>,
    schema: SchemaDescriptor,
}

impl DocumentBuilder {
    pub fn new(
        lookup: Arc<dyn FactLookup>,
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptRenderer>,
    ) -> Self {
        Self {
            lookup,
            generator,
            prompts,
            schema: SchemaDescriptor::document_sections(),
        }
    }

    /// Build or update in one call.
    ///
    /// - no update → fresh build for `entity`
    /// - update with an existing document → single-section replacement
    /// - update without a document → `NoDocument`
    pub async fn build_or_update(
        &self,
        entity: &Candidate,
        existing: Option<&Document>,
        update: Option<&SectionUpdate>,
    ) -> Result<Document, AgentError> {
        match (existing, update) {
            (_, None) => self.build(entity).await,
            (Some(document), Some(update)) => {
                self.update(document, &update.section, &update.content)
            }
            (None, Some(_)) => Err(AgentError::NoDocument),
        }
    }

    /// Fresh build from looked-up facts.
    pub async fn build(&self, entity: &Candidate) -> Result<Document, AgentError> {
        let facts = match self.lookup.lookup(&entity.display_name).await? {
            LookupOutcome::Found(facts) => facts,
            LookupOutcome::NotFound => {
                tracing::info!(entity = %entity.id, "No facts found, building gap document");
                let reason = format!("No information found for {}", entity.display_name);
                return Ok(Document::all_gaps(entity.clone(), &reason));
            }
        };

        let facts_json = serde_json::to_value(&facts)
            .map_err(|e| CollaboratorError::Generation(format!("facts not serializable: {}", e)))?;
        let prompt = self.prompts.document_prompt(&entity.display_name, &facts_json)?;

        let value = self.generator.generate(&prompt, &self.schema).await?;
        self.schema.validate(&value)?;
        let generated: GeneratedSections = serde_json::from_value(value)
            .map_err(|e| CollaboratorError::malformed(&self.schema.name, e.to_string()))?;

        let document = Document::from_fn(entity.clone(), |key| section_from(key, &generated, &facts))
            .with_sources(facts.sources.clone());

        tracing::info!(
            entity = %entity.id,
            model = self.generator.model_name(),
            gaps = document.gap_count(),
            "Document built"
        );
        Ok(document)
    }

    /// Replace one section's content, returning the updated copy.
    ///
    /// Fails with `InvalidSection` for names outside the fixed five. The
    /// other four sections, and their gap markers, are carried over as is.
    pub fn update(
        &self,
        document: &Document,
        section: &str,
        content: &str,
    ) -> Result<Document, AgentError> {
        let key: SectionKey = section.parse()?;
        let mut updated = document.clone();
        if updated.replace_section(key, content.trim()) {
            tracing::info!(section = %key, entity = %document.entity.id, "Section updated");
        } else {
            tracing::debug!(section = %key, "Section content unchanged");
        }
        Ok(updated)
    }
}

fn section_from(key: SectionKey, generated: &GeneratedSections, facts: &Facts) -> Section {
    let content = generated.get(key).trim();
    if content.is_empty() {
        return Section::gap(
            format!("No {} information available.", key.field_name()),
            "No content was generated for this section",
        );
    }
    match facts.gap_for(key) {
        Some(reason) => Section::gap(content, reason),
        None => Section::filled(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_linking::EntityId;
    use crate::research::llm_client::OfflineGenerator;
    use crate::research::lookup::StaticFactLookup;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FailingLookup;

    #[async_trait]
    impl FactLookup for FailingLookup {
        async fn lookup(&self, _: &str) -> Result<LookupOutcome, CollaboratorError> {
            Err(CollaboratorError::Lookup("service unavailable".into()))
        }
    }

    struct FixedGenerator(Value);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _: &str, _: &SchemaDescriptor) -> Result<Value, CollaboratorError> {
            Ok(self.0.clone())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn candidate(name: &str) -> Candidate {
        Candidate {
            id: EntityId::from_name(name),
            display_name: name.into(),
        }
    }

    fn builder_with(lookup: impl FactLookup + 'static, generator: impl TextGenerator + 'static) -> DocumentBuilder {
        DocumentBuilder::new(
            Arc::new(lookup),
            Arc::new(generator),
            Arc::new(PromptRenderer::new().unwrap()),
        )
    }

    fn offline_builder() -> DocumentBuilder {
        builder_with(StaticFactLookup::builtin().unwrap(), OfflineGenerator)
    }

    #[tokio::test]
    async fn test_build_known_company_has_no_gaps() {
        let doc = offline_builder().build(&candidate("Microsoft")).await.unwrap();
        assert_eq!(doc.sections().count(), 5);
        assert!(!doc.has_gaps());
        assert!(doc.section(SectionKey::Products).content.contains("Azure"));
        assert_eq!(doc.sources, vec!["Built-in reference data".to_string()]);
    }

    #[tokio::test]
    async fn test_build_not_found_is_all_gaps() {
        let doc = offline_builder().build(&candidate("Acme Widgets")).await.unwrap();
        assert_eq!(doc.gap_count(), 5);
        assert_eq!(
            doc.section(SectionKey::Risks).gap_reason.as_deref(),
            Some("No information found for Acme Widgets")
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_is_collaborator_error() {
        let builder = builder_with(FailingLookup, OfflineGenerator);
        let err = builder.build(&candidate("Microsoft")).await.unwrap_err();
        assert!(matches!(err, AgentError::Collaborator(CollaboratorError::Lookup(_))));
    }

    #[tokio::test]
    async fn test_malformed_generation_is_error() {
        let builder = builder_with(
            StaticFactLookup::builtin().unwrap(),
            FixedGenerator(json!({ "overview": "only one section" })),
        );
        let err = builder.build(&candidate("Microsoft")).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Collaborator(CollaboratorError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_sparse_facts_mark_gaps() {
        let lookup = StaticFactLookup::default().with_facts(
            "Acme",
            Facts {
                description: Some("Makes widgets.".into()),
                products: vec!["Widget".into()],
                ..Facts::named("Acme")
            },
        );
        let doc = builder_with(lookup, OfflineGenerator)
            .build(&candidate("Acme"))
            .await
            .unwrap();
        assert!(!doc.section(SectionKey::Overview).gap);
        assert!(doc.section(SectionKey::Competitors).gap);
        // Gap sections still carry generated content
        assert!(!doc.section(SectionKey::Competitors).content.is_empty());
    }

    #[tokio::test]
    async fn test_empty_generated_section_is_gap() {
        let builder = builder_with(
            StaticFactLookup::builtin().unwrap(),
            FixedGenerator(json!({
                "overview": "Overview text",
                "products": "  ",
                "competitors": "Apple",
                "opportunities": "Cloud",
                "risks": "Regulation"
            })),
        );
        let doc = builder.build(&candidate("Microsoft")).await.unwrap();
        assert!(doc.section(SectionKey::Products).gap);
        assert_eq!(doc.gap_count(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_only_target() {
        let builder = offline_builder();
        let doc = builder.build(&candidate("Microsoft")).await.unwrap();
        let updated = builder.update(&doc, "Risks", "New regulation.").unwrap();

        assert_eq!(updated.section(SectionKey::Risks).content, "New regulation.");
        for key in SectionKey::ALL.into_iter().filter(|k| *k != SectionKey::Risks) {
            assert_eq!(updated.section(key), doc.section(key));
        }
        // Input document is untouched
        assert_ne!(doc.section(SectionKey::Risks).content, "New regulation.");
    }

    #[tokio::test]
    async fn test_update_invalid_section() {
        let builder = offline_builder();
        let doc = builder.build(&candidate("Microsoft")).await.unwrap();
        let err = builder.update(&doc, "weather", "sunny").unwrap_err();
        assert!(matches!(err, AgentError::InvalidSection { section } if section == "weather"));
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let builder = offline_builder();
        let doc = builder.build(&candidate("Microsoft")).await.unwrap();
        let once = builder.update(&doc, "risks", "X").unwrap();
        let twice = builder.update(&once, "risks", "X").unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_build_or_update_dispatch() {
        let builder = offline_builder();
        let msft = candidate("Microsoft");
        let update = SectionUpdate {
            section: "risks".into(),
            content: "X".into(),
        };

        let err = builder.build_or_update(&msft, None, Some(&update)).await.unwrap_err();
        assert!(matches!(err, AgentError::NoDocument));

        let doc = builder.build_or_update(&msft, None, None).await.unwrap();
        let updated = builder
            .build_or_update(&msft, Some(&doc), Some(&update))
            .await
            .unwrap();
        assert_eq!(updated.section(SectionKey::Risks).content, "X");
    }
}
