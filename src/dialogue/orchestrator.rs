//! Dialogue Orchestrator: the per-turn state machine
//!
//! # Dispatch
//!
//! | Phase                  | Intent                   | Next phase             |
//! |------------------------|--------------------------|------------------------|
//! | any                    | Help / ShowPlan / Exit   | unchanged              |
//! | IDLE                   | Research (≥ floor)       | IDLE (plan built)      |
//! | IDLE                   | Research (< floor)       | CLARIFYING             |
//! | IDLE                   | Update, no section       | AWAITING_UPDATE_TARGET |
//! | CLARIFYING             | Confirm / Select(n)      | IDLE (plan built)      |
//! | CLARIFYING             | Deny                     | IDLE                   |
//! | AWAITING_UPDATE_TARGET | SectionAnswer            | IDLE (section updated) |
//! | AWAITING_UPDATE_TARGET | Deny                     | IDLE                   |
//! | CLARIFYING / AWAITING  | anything else            | cancelled, then as IDLE|
//!
//! A failing handler leaves the phase as it was when the handler started,
//! and focus entity and document are only written after a successful
//! collaborator call.

use std::sync::Arc;

use super::response::{self, Reply, TurnOutput};
use crate::config::AgentConfig;
use crate::document::{DocumentBuilder, SectionKey, SectionUpdate};
use crate::entity_linking::{Candidate, EntityIndex, EntityNormalizer, Resolution};
use crate::error::{AgentError, Result};
use crate::intent::{Intent, IntentClassifier};
use crate::research::{
    FactLookup, NameExtractor, OfflineGenerator, PromptRenderer, StaticFactLookup, TextGenerator,
};
use crate::session::{
    DialoguePhase, PendingCandidate, PendingUpdate, Persona, PersonaClassifier, SessionState,
};

pub struct DialogueOrchestrator {
    config: AgentConfig,
    normalizer: Arc<EntityNormalizer>,
    classifier: IntentClassifier,
    personas: PersonaClassifier,
    builder: DocumentBuilder,
    extractor: Option<NameExtractor>,
    session: SessionState,
}

impl DialogueOrchestrator {
    pub fn new(config: AgentConfig, normalizer: Arc<EntityNormalizer>, builder: DocumentBuilder) -> Self {
        Self {
            classifier: IntentClassifier::new(normalizer.clone()),
            personas: PersonaClassifier::new(config.persona.clone()),
            config,
            normalizer,
            builder,
            extractor: None,
            session: SessionState::new(),
        }
    }

    /// Assemble an orchestrator from collaborators.
    ///
    /// `catalog` replaces the built-in entity catalog when given.
    pub fn from_collaborators(
        config: AgentConfig,
        catalog: Option<EntityIndex>,
        lookup: Arc<dyn FactLookup>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let prompts = Arc::new(PromptRenderer::new()?);
        let normalizer = Arc::new(match catalog {
            Some(index) => EntityNormalizer::new(index, Default::default(), &config),
            None => EntityNormalizer::with_builtin_catalog(&config),
        });
        let builder = DocumentBuilder::new(lookup, generator, prompts);
        Ok(Self::new(config, normalizer, builder))
    }

    /// Fully offline orchestrator: built-in catalog, built-in facts and the
    /// deterministic generator.
    pub fn offline(config: AgentConfig) -> Result<Self> {
        let lookup = Arc::new(StaticFactLookup::builtin()?);
        Self::from_collaborators(config, None, lookup, Arc::new(OfflineGenerator))
    }

    /// Enable name extraction for mentions the rules cannot resolve.
    pub fn with_extractor(mut self, extractor: NameExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Persona derived from the current counters
    pub fn persona(&self) -> Persona {
        self.personas
            .classify(self.session.signals(), self.session.turn_count())
    }

    pub fn greeting(&self) -> &'static str {
        response::greeting()
    }

    // ========================================================================
    // Turn processing
    // ========================================================================

    /// Process one utterance to completion.
    pub async fn process_turn(&mut self, raw: &str) -> TurnOutput {
        let utterance = raw.trim();
        let intent = self.classifier.classify(utterance, self.session.phase());

        self.session.record_user(utterance);
        let signal = self.personas.detect_signal(utterance, &intent);
        if let Some(signal) = signal {
            self.session.record_signal(signal);
        }
        let persona = self.persona();

        tracing::debug!(
            session = %self.session.id,
            intent = ?intent,
            signal = ?signal,
            %persona,
            phase = %self.session.phase_kind(),
            "Turn classified"
        );

        if !intent.is_control() && !self.answers_phase(&intent) && !self.session.phase().is_idle() {
            tracing::info!(
                phase = %self.session.phase_kind(),
                intent = intent.name(),
                "Pending question abandoned"
            );
            self.session.set_phase(DialoguePhase::Idle);
        }

        let phase_at_dispatch = self.session.phase().clone();
        let reply = match self.dispatch(&intent, utterance, persona).await {
            Ok(reply) => reply,
            Err(err) => {
                self.session.set_phase(phase_at_dispatch);
                self.failure_reply(err)
            }
        };

        let text = persona.style(&reply.text, reply.allows_closing());
        self.session.record_assistant(&text, reply.focus.clone());

        tracing::debug!(
            phase = %self.session.phase_kind(),
            kind = ?reply.kind,
            ended = reply.ends_session,
            "Turn complete"
        );
        TurnOutput {
            display_text: text,
            session_ended: reply.ends_session,
        }
    }

    /// Whether the intent answers the question the current phase is asking
    fn answers_phase(&self, intent: &Intent) -> bool {
        match self.session.phase() {
            DialoguePhase::Idle => false,
            DialoguePhase::Clarifying(_) => intent.resolves_clarification(),
            DialoguePhase::AwaitingUpdateTarget(_) => {
                matches!(intent, Intent::SectionAnswer { .. } | Intent::Deny)
            }
        }
    }

    async fn dispatch(&mut self, intent: &Intent, utterance: &str, persona: Persona) -> Result<Reply> {
        match intent {
            Intent::Help => Ok(response::help(persona)),
            Intent::Exit => Ok(response::farewell(self.session.document())),
            Intent::ShowPlan => self
                .session
                .document()
                .map(response::show_plan)
                .ok_or(AgentError::NoDocument),

            Intent::Research { mention } => self.handle_research(mention, persona).await,
            Intent::Confirm => self.handle_selection(1, persona).await,
            Intent::Select(n) => self.handle_selection(*n, persona).await,
            Intent::Deny => Ok(self.handle_deny()),

            Intent::Update { section, content } => {
                self.handle_update(section.as_deref(), content.as_deref(), persona)
                    .await
            }
            Intent::SectionAnswer { text } => self.handle_section_answer(text, persona).await,

            Intent::OffTopic => Ok(response::off_topic(persona, self.session.turn_count())),
            Intent::Unknown => Ok(response::unknown(utterance)),
        }
    }

    fn failure_reply(&self, err: AgentError) -> Reply {
        match err {
            AgentError::ResolutionFailed { mention } => {
                tracing::info!(mention, "No entity matched");
                response::not_found(&mention)
            }
            AgentError::InvalidSection { section } => {
                tracing::info!(section, "Invalid section");
                response::invalid_section(&section)
            }
            AgentError::NoDocument => response::no_document(),
            AgentError::Collaborator(e) => {
                tracing::warn!(error = %e, "Collaborator call failed");
                response::collaborator_failure()
            }
            // Unreachable from turn handlers: configuration is validated in
            // `from_collaborators`, before the first turn.
            AgentError::Config(e) => {
                tracing::error!(error = %e, "Configuration error surfaced during a turn");
                response::collaborator_failure()
            }
        }
    }

    // ========================================================================
    // Research
    // ========================================================================

    async fn handle_research(&mut self, mention: &str, persona: Persona) -> Result<Reply> {
        let resolution = self
            .resolve(mention)
            .await
            .ok_or_else(|| AgentError::ResolutionFailed {
                mention: mention.to_string(),
            })?;

        tracing::info!(
            mention,
            candidate = %resolution.candidate.id,
            confidence = resolution.confidence,
            method = %resolution.method,
            alternatives = resolution.alternatives.len(),
            "Mention resolved"
        );

        if resolution.requires_confirmation(self.config.auto_accept_floor) {
            let pending = PendingCandidate::from_resolution(&resolution);
            let reply = response::confirmation(&pending);
            self.session.set_phase(DialoguePhase::Clarifying(pending));
            return Ok(reply);
        }

        self.research(&resolution.candidate, persona).await
    }

    /// Rule-based resolution, then name extraction when configured
    async fn resolve(&self, mention: &str) -> Option<Resolution> {
        let context = self.session.resolution_context();
        if let Some(resolution) = self
            .normalizer
            .resolve(mention, &context, self.session.rejected())
        {
            return Some(resolution);
        }

        let extractor = self.extractor.as_ref()?;
        match extractor.extract(mention).await {
            Ok(Some(name)) => self
                .normalizer
                .extracted(&name, mention, self.session.rejected()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, mention, "Name extraction failed");
                None
            }
        }
    }

    async fn research(&mut self, candidate: &Candidate, persona: Persona) -> Result<Reply> {
        let document = self.builder.build_or_update(candidate, None, None).await?;
        let reply = response::research_result(&document, persona);
        self.session.set_phase(DialoguePhase::Idle);
        self.session.complete_research(document);
        Ok(reply)
    }

    /// Confirm (`n == 1`) or pick option `n` of the pending clarification
    async fn handle_selection(&mut self, n: usize, persona: Persona) -> Result<Reply> {
        let Some(pending) = self.session.pending_candidate() else {
            return Ok(response::nothing_to_confirm());
        };
        let Some(chosen) = pending.option(n).cloned() else {
            return Ok(response::selection_out_of_range(pending.options.len()));
        };

        tracing::info!(candidate = %chosen.id, option = n, "Clarification accepted");
        self.research(&chosen, persona).await
    }

    fn handle_deny(&mut self) -> Reply {
        match self.session.phase().clone() {
            DialoguePhase::Clarifying(pending) => {
                tracing::info!(candidate = %pending.candidate.id, "Clarification rejected");
                self.session.reject(pending.candidate.id);
                self.session.set_phase(DialoguePhase::Idle);
                response::restate_name()
            }
            DialoguePhase::AwaitingUpdateTarget(_) => {
                self.session.set_phase(DialoguePhase::Idle);
                response::update_cancelled()
            }
            DialoguePhase::Idle => response::nothing_to_confirm(),
        }
    }

    // ========================================================================
    // Updates
    // ========================================================================

    async fn handle_update(
        &mut self,
        section: Option<&str>,
        content: Option<&str>,
        persona: Persona,
    ) -> Result<Reply> {
        if self.session.current_entity().is_none() {
            return Err(AgentError::NoDocument);
        }

        match (section, content) {
            (Some(section), Some(content)) => self.apply_update(section, content, persona).await,
            (None, Some(content)) => {
                self.session
                    .set_phase(DialoguePhase::AwaitingUpdateTarget(PendingUpdate {
                        content: content.to_string(),
                    }));
                Ok(response::which_section())
            }
            (Some(section), None) => {
                section.parse::<SectionKey>()?;
                Ok(response::update_usage())
            }
            (None, None) => Ok(response::update_usage()),
        }
    }

    async fn handle_section_answer(&mut self, section: &str, persona: Persona) -> Result<Reply> {
        let DialoguePhase::AwaitingUpdateTarget(pending) = self.session.phase().clone() else {
            return Ok(response::unknown(section));
        };
        self.apply_update(section, &pending.content, persona).await
    }

    async fn apply_update(&mut self, section: &str, content: &str, persona: Persona) -> Result<Reply> {
        let key: SectionKey = section.parse()?;
        let document = self.session.document().ok_or(AgentError::NoDocument)?;
        let update = SectionUpdate {
            section: section.to_string(),
            content: content.to_string(),
        };
        let updated = self
            .builder
            .build_or_update(&document.entity, Some(document), Some(&update))
            .await?;

        let reply = response::update_result(&updated, key, persona);
        self.session.set_phase(DialoguePhase::Idle);
        self.session.replace_document(updated);
        Ok(reply)
    }
}
