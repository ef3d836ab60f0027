//! Prompt templates for the generation backend

use handlebars::Handlebars;
use serde_json::Value;

use super::llm_client::{FACTS_CLOSE, FACTS_OPEN, MENTION_CLOSE, MENTION_OPEN};
use crate::error::CollaboratorError;

pub const DOCUMENT_TEMPLATE: &str = "document_sections";
pub const EXTRACTION_TEMPLATE: &str = "canonical_name";

const DOCUMENT_PROMPT: &str = r#"Create an account plan for {{{name}}}.

Write five concise sections grounded in the facts below:
1. OVERVIEW: what the company does, where it is based, its scale.
2. PRODUCTS: key products and services.
3. COMPETITORS: main competitors.
4. OPPORTUNITIES: potential business opportunities for engaging with this company.
5. RISKS: potential risks, challenges, or concerns.

If a fact is missing, say so briefly instead of inventing it.

{{{facts_open}}}
{{{json facts}}}
{{{facts_close}}}
"#;

const EXTRACTION_PROMPT: &str = r#"The user referred to a company in the message below.
Return the canonical company name, or null if no company is named.

{{{mention_open}}}{{{mention}}}{{{mention_close}}}
"#;

/// Registered prompt templates
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, CollaboratorError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_helper("json", Box::new(json_helper));
        handlebars
            .register_template_string(DOCUMENT_TEMPLATE, DOCUMENT_PROMPT)
            .map_err(|e| CollaboratorError::Generation(format!("template error: {}", e)))?;
        handlebars
            .register_template_string(EXTRACTION_TEMPLATE, EXTRACTION_PROMPT)
            .map_err(|e| CollaboratorError::Generation(format!("template error: {}", e)))?;
        Ok(Self { handlebars })
    }

    /// Document prompt with the facts embedded as JSON
    pub fn document_prompt(&self, name: &str, facts: &Value) -> Result<String, CollaboratorError> {
        self.render(
            DOCUMENT_TEMPLATE,
            &serde_json::json!({
                "name": name,
                "facts": facts,
                "facts_open": FACTS_OPEN,
                "facts_close": FACTS_CLOSE,
            }),
        )
    }

    pub fn extraction_prompt(&self, mention: &str) -> Result<String, CollaboratorError> {
        self.render(
            EXTRACTION_TEMPLATE,
            &serde_json::json!({
                "mention": mention,
                "mention_open": MENTION_OPEN,
                "mention_close": MENTION_CLOSE,
            }),
        )
    }

    fn render(&self, template: &str, data: &Value) -> Result<String, CollaboratorError> {
        self.handlebars
            .render(template, data)
            .map_err(|e| CollaboratorError::Generation(format!("template render failed: {}", e)))
    }
}

fn json_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    if let Some(v) = h.param(0) {
        out.write(&serde_json::to_string(v.value()).unwrap_or_default())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_prompt_embeds_facts() {
        let renderer = PromptRenderer::new().unwrap();
        let prompt = renderer
            .document_prompt("Acme", &serde_json::json!({ "name": "Acme & Sons" }))
            .unwrap();
        assert!(prompt.contains("account plan for Acme"));
        assert!(prompt.contains(r#"<facts>
{"name":"Acme & Sons"}
</facts>"#));
    }

    #[test]
    fn test_extraction_prompt() {
        let renderer = PromptRenderer::new().unwrap();
        let prompt = renderer.extraction_prompt("the <b>widget</b> people").unwrap();
        assert!(prompt.contains("<mention>the <b>widget</b> people</mention>"));
    }
}
