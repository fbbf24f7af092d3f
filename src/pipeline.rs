// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ORQUESTRADOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Grafo fixo e linear: Pending → Researched → Synthesized → Drafted.
// O orquestrador é o único dono do estado; cada estágio só avança depois
// do artefato estar comprometido. Retry com backoff para falhas
// transitórias, re-prompt corretivo para saída malformada, deadline
// checado nas fronteiras de estágio.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::agents::{
    render_fallback, AgentKind, DraftingAgent, ResearchAgent, SynthesisAgent,
    CORRECTIVE_INSTRUCTION,
};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineFailure};
use crate::llm::LlmClient;
use crate::search::{SearchClient, SearchError};
use crate::state::{ResearchState, Stage};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Orquestrador do pipeline de pesquisa multi-agente.
pub struct Orchestrator {
    search: Arc<dyn SearchClient>,
    research: ResearchAgent,
    synthesis: SynthesisAgent,
    drafting: DraftingAgent,
    config: PipelineConfig,
}

impl Orchestrator {
    /// Monta o pipeline sobre os clientes de busca e modelo.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            search,
            research: ResearchAgent::new(llm.clone()),
            synthesis: SynthesisAgent::new(llm.clone()),
            drafting: DraftingAgent::new(llm),
            config,
        }
    }

    /// Executa o pipeline completo para uma pergunta.
    ///
    /// Sucesso retorna o estado em `Drafted` com `draft` preenchido
    /// (possivelmente em modo degradado). Falha retorna o relatório
    /// estruturado com o estado parcial.
    pub async fn run(&self, query: &str) -> Result<ResearchState, PipelineFailure> {
        let query = query.trim();
        let mut state = ResearchState::new(query);

        if let Err(e) = self.validate_query(query) {
            return Err(self.fail(state, AgentKind::Research, e));
        }

        let started = Instant::now();
        log::info!(
            "🚀 Pipeline iniciado [{}]: \"{}\"",
            state.execution_id,
            query
        );

        // ───────────────────────── RESEARCH ─────────────────────────
        let fetched = self
            .with_retries(AgentKind::Research, |_| self.fetch_sources(query))
            .await;
        match fetched {
            Ok(sources) => state.sources = sources,
            Err(e) => return Err(self.fail(state, AgentKind::Research, e)),
        }

        let extracted = self
            .with_retries(AgentKind::Research, |hint| {
                self.research.extract_notes(query, &state.sources, hint)
            })
            .await;
        match extracted {
            Ok(notes) => state.notes = notes,
            Err(e) => return Err(self.fail(state, AgentKind::Research, e)),
        }
        state.advance_to(Stage::Researched, "Research phase completed.");

        if let Err(e) = self.check_deadline(&started) {
            return Err(self.fail(state, AgentKind::Synthesis, e));
        }

        // ───────────────────────── SYNTHESIS ─────────────────────────
        let synthesized = self
            .with_retries(AgentKind::Synthesis, |hint| {
                self.synthesis.synthesize(query, &state.notes, hint)
            })
            .await;
        match synthesized {
            Ok(outline) => state.outline = outline,
            Err(e) => return Err(self.fail(state, AgentKind::Synthesis, e)),
        }
        state.advance_to(Stage::Synthesized, "Synthesis phase completed.");

        if let Err(e) = self.check_deadline(&started) {
            return Err(self.fail(state, AgentKind::Draft, e));
        }

        // ───────────────────────── DRAFTING ─────────────────────────
        // Único estágio com fallback: esgotar as tentativas degrada a
        // saída em vez de falhar a execução inteira. Outline vazio nem
        // chega ao modelo.
        let draft = if state.outline.sections.is_empty() {
            log::warn!("📭 Outline vazio - renderização degradada direta");
            render_fallback(query, &state.outline, &state.notes)
        } else {
            let attempt = self.with_retries(AgentKind::Draft, |hint| {
                self.drafting
                    .draft(query, &state.outline, &state.notes, &state.sources, hint)
            });
            match attempt.await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!(
                        "⚠️ Drafting esgotou as tentativas ({}) - modo degradado",
                        e
                    );
                    render_fallback(query, &state.outline, &state.notes)
                }
            }
        };
        state.draft = Some(draft);
        state.advance_to(Stage::Drafted, "Answer drafting phase completed.");

        log::info!(
            "✅ Pipeline concluído [{}] em {:?}",
            state.execution_id,
            started.elapsed()
        );
        Ok(state)
    }

    fn validate_query(&self, query: &str) -> Result<(), PipelineError> {
        if query.is_empty() {
            return Err(PipelineError::UnsupportedQuery("query is empty".into()));
        }
        if query.chars().count() > self.config.max_query_len {
            return Err(PipelineError::UnsupportedQuery(format!(
                "query exceeds {} characters",
                self.config.max_query_len
            )));
        }
        Ok(())
    }

    async fn fetch_sources(
        &self,
        query: &str,
    ) -> Result<Vec<crate::types::SourceSnippet>, PipelineError> {
        self.search
            .fetch(query, self.config.max_results)
            .await
            .map_err(|e| match e {
                SearchError::Unavailable(msg) | SearchError::Auth(msg) => {
                    PipelineError::SearchUnavailable(msg)
                }
                SearchError::InvalidQuery(msg) => PipelineError::UnsupportedQuery(msg),
            })
    }

    /// Laço de tentativas de um estágio.
    ///
    /// `max_retries` é o total de tentativas: 3 falhas transitórias
    /// consecutivas esgotam o orçamento padrão.
    /// - transiente: backoff exponencial a partir da base e repete;
    /// - malformada: repete imediatamente com a instrução corretiva;
    /// - qualquer outro erro: propaga na hora.
    async fn with_retries<T, F, Fut>(
        &self,
        agent: AgentKind,
        mut op: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut(Option<&'static str>) -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let attempts = self.config.max_retries.max(1);
        let mut hint: Option<&'static str> = None;

        for attempt in 1..=attempts {
            match op(hint).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let wait = self.backoff_for(attempt);
                    log::warn!(
                        "🔁 {} tentativa {}/{} falhou ({}) - aguardando {:?}",
                        agent,
                        attempt,
                        attempts,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) if e.is_malformed() && attempt < attempts => {
                    log::warn!(
                        "🔁 {} tentativa {}/{}: saída malformada ({}) - re-prompt corretivo",
                        agent,
                        attempt,
                        attempts,
                        e
                    );
                    hint = Some(CORRECTIVE_INSTRUCTION);
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("retry loop always returns within the final attempt")
    }

    /// Espera antes da próxima tentativa: dobra a cada falha, com o
    /// expoente limitado para que orçamentos de retry grandes não
    /// estourem a aritmética nem produzam esperas de dias.
    fn backoff_for(&self, attempt: u32) -> std::time::Duration {
        let exp = attempt.saturating_sub(1).min(10);
        self.config.backoff_base.saturating_mul(1u32 << exp)
    }

    fn check_deadline(&self, started: &Instant) -> Result<(), PipelineError> {
        let elapsed = started.elapsed();
        if elapsed >= self.config.timeout {
            return Err(PipelineError::Timeout {
                elapsed_ms: elapsed.as_millis(),
            });
        }
        Ok(())
    }

    fn fail(
        &self,
        mut state: ResearchState,
        agent: AgentKind,
        error: PipelineError,
    ) -> PipelineFailure {
        let stage_reached = state.stage;
        log::error!(
            "❌ Pipeline falhou [{}] no agente {}: {}",
            state.execution_id,
            agent,
            error
        );
        state.fail(error.to_string());
        PipelineFailure {
            stage_reached,
            failed_agent: agent,
            error,
            partial: state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::DEGRADED_OUTPUT_MARKER;
    use crate::llm::MockLlmClient;
    use crate::search::MockSearchClient;
    use crate::types::SourceSnippet;
    use std::time::Duration;

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            backoff_base: Duration::from_millis(1),
            ..PipelineConfig::default()
        }
    }

    fn snippets() -> Vec<SourceSnippet> {
        vec![
            SourceSnippet::new("https://a.com", "Moon", "Lunar gravity pulls the ocean."),
            SourceSnippet::new("https://b.com", "Sun", "Solar gravity modulates the range."),
        ]
    }

    fn scripted_llm() -> Arc<MockLlmClient> {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_response(Ok(r#"{"claims": [
            {"claim": "Lunar gravity drives tides", "sources": [1], "confidence": "high"},
            {"claim": "Solar gravity modulates tidal range", "sources": [2], "confidence": "medium"}
        ]}"#
            .into()));
        llm.push_response(Ok(
            r#"{"themes": [{"theme": "Tidal forces", "claims": ["c1", "c2"]}]}"#.into(),
        ));
        llm.push_response(Ok(
            "## Tidal forces\n- The Moon pulls the ocean [1]\n- The Sun modulates it [2]".into(),
        ));
        llm
    }

    #[tokio::test]
    async fn test_happy_path_reaches_drafted() {
        let search = Arc::new(MockSearchClient::with_results(snippets()));
        let orchestrator = Orchestrator::new(scripted_llm(), search, fast_config());

        let state = orchestrator.run("What causes tides?").await.unwrap();

        assert_eq!(state.stage, Stage::Drafted);
        assert_eq!(state.sources.len(), 2);
        assert_eq!(state.notes.len(), 2);
        assert_eq!(state.outline.sections.len(), 1);
        let draft = state.draft.unwrap();
        assert!(draft.contains("[1]") && draft.contains("[2]"));
        assert_eq!(
            state.trace,
            vec![
                "Research phase completed.",
                "Synthesis phase completed.",
                "Answer drafting phase completed.",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_any_call() {
        let search = Arc::new(MockSearchClient::with_results(snippets()));
        let llm = Arc::new(MockLlmClient::new());
        let orchestrator = Orchestrator::new(llm.clone(), search.clone(), fast_config());

        let failure = orchestrator.run("   ").await.unwrap_err();

        assert!(matches!(failure.error, PipelineError::UnsupportedQuery(_)));
        assert_eq!(failure.stage_reached, Stage::Pending);
        assert_eq!(search.call_count(), 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_query_rejected() {
        let config = PipelineConfig {
            max_query_len: 10,
            ..fast_config()
        };
        let orchestrator = Orchestrator::new(
            Arc::new(MockLlmClient::new()),
            Arc::new(MockSearchClient::with_results(snippets())),
            config,
        );

        let failure = orchestrator.run("a query far beyond ten chars").await.unwrap_err();
        assert!(matches!(failure.error, PipelineError::UnsupportedQuery(_)));
    }

    #[tokio::test]
    async fn test_three_search_failures_exhaust_default_budget() {
        // Exatamente 3 falhas seguidas esgotam as 3 tentativas padrão;
        // nenhuma quarta chamada é emitida.
        let search = Arc::new(MockSearchClient::failing_then(3, snippets()));
        let orchestrator =
            Orchestrator::new(Arc::new(MockLlmClient::new()), search.clone(), fast_config());

        let failure = orchestrator.run("What causes tides?").await.unwrap_err();

        assert_eq!(search.call_count(), 3);
        assert_eq!(failure.stage_reached, Stage::Pending);
        assert_eq!(failure.failed_agent, AgentKind::Research);
        assert!(matches!(failure.error, PipelineError::SearchUnavailable(_)));
        assert_eq!(failure.partial.stage, Stage::Failed);
        assert!(failure.partial.notes.is_empty());
        assert!(failure.partial.draft.is_none());
    }

    #[tokio::test]
    async fn test_oversized_retry_budget_does_not_overflow_backoff() {
        let config = PipelineConfig {
            max_retries: 40,
            backoff_base: Duration::ZERO,
            ..PipelineConfig::default()
        };
        let search = Arc::new(MockSearchClient::new());
        for _ in 0..40 {
            search.push_response(Err(SearchError::Unavailable("503".into())));
        }
        let orchestrator =
            Orchestrator::new(Arc::new(MockLlmClient::new()), search.clone(), config);

        let failure = orchestrator.run("What causes tides?").await.unwrap_err();

        assert_eq!(search.call_count(), 40);
        assert!(matches!(failure.error, PipelineError::SearchUnavailable(_)));
    }

    #[tokio::test]
    async fn test_transient_search_failure_recovers() {
        let search = Arc::new(MockSearchClient::failing_then(2, snippets()));
        let orchestrator = Orchestrator::new(scripted_llm(), search.clone(), fast_config());

        let state = orchestrator.run("What causes tides?").await.unwrap();

        assert_eq!(state.stage, Stage::Drafted);
        assert_eq!(search.call_count(), 3);
    }

    #[tokio::test]
    async fn test_malformed_then_valid_costs_exactly_two_calls() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_response(Ok("here are your claims, enjoy!".into()));
        llm.push_response(Ok(
            r#"{"claims": [{"claim": "Lunar gravity drives tides", "sources": [1]}]}"#.into(),
        ));
        llm.push_response(Ok(r#"{"themes": [{"theme": "Causes", "claims": ["c1"]}]}"#.into()));
        llm.push_response(Ok("## Causes\n- The Moon [1]".into()));
        let search = Arc::new(MockSearchClient::with_results(snippets()));
        let orchestrator = Orchestrator::new(llm.clone(), search, fast_config());

        let state = orchestrator.run("What causes tides?").await.unwrap();

        assert_eq!(state.stage, Stage::Drafted);
        // 2 para research (malformada + corrigida), 1 síntese, 1 draft.
        assert_eq!(llm.call_count(), 4);
    }

    #[tokio::test]
    async fn test_draft_exhaustion_degrades_instead_of_failing() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_response(Ok(
            r#"{"claims": [{"claim": "Lunar gravity drives tides", "sources": [1]}]}"#.into(),
        ));
        llm.push_response(Ok(r#"{"themes": [{"theme": "Causes", "claims": ["c1"]}]}"#.into()));
        for _ in 0..3 {
            llm.push_response(Ok("dangling citation [9]".into()));
        }
        let search = Arc::new(MockSearchClient::with_results(snippets()));
        let orchestrator = Orchestrator::new(llm, search, fast_config());

        let state = orchestrator.run("What causes tides?").await.unwrap();

        assert_eq!(state.stage, Stage::Drafted);
        let draft = state.draft.unwrap();
        assert!(draft.starts_with(DEGRADED_OUTPUT_MARKER));
        assert!(draft.contains("Lunar gravity drives tides"));
    }

    #[tokio::test]
    async fn test_timeout_detected_at_stage_boundary() {
        let config = PipelineConfig {
            timeout: Duration::ZERO,
            ..fast_config()
        };
        let search = Arc::new(MockSearchClient::with_results(snippets()));
        let orchestrator = Orchestrator::new(scripted_llm(), search, config);

        let failure = orchestrator.run("What causes tides?").await.unwrap_err();

        assert!(matches!(failure.error, PipelineError::Timeout { .. }));
        assert_eq!(failure.stage_reached, Stage::Researched);
        assert!(!failure.partial.notes.is_empty());
    }

    #[tokio::test]
    async fn test_empty_search_results_flow_through() {
        let search = Arc::new(MockSearchClient::with_results(vec![]));
        let llm = Arc::new(MockLlmClient::new());
        let orchestrator = Orchestrator::new(llm.clone(), search, fast_config());

        let state = orchestrator.run("What causes tides?").await.unwrap();

        assert_eq!(state.stage, Stage::Drafted);
        assert!(state.notes.is_empty());
        assert!(state.outline.sections.is_empty());
        // Sem evidência nenhuma chamada de modelo é gasta.
        assert_eq!(llm.call_count(), 0);
        let draft = state.draft.unwrap();
        assert!(draft.starts_with(DEGRADED_OUTPUT_MARKER));
    }

    #[tokio::test]
    async fn test_idempotent_outline_with_identical_mocks() {
        let run = || async {
            let search = Arc::new(MockSearchClient::with_results(snippets()));
            let orchestrator = Orchestrator::new(scripted_llm(), search, fast_config());
            orchestrator.run("What causes tides?").await.unwrap()
        };
        let first = run().await;
        let second = run().await;
        assert_eq!(first.outline, second.outline);
        assert_eq!(first.notes, second.notes);
    }
}
