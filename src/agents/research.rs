// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RESEARCH AGENT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Extrai claims estruturados das evidências via chamada de modelo.
// Garantia central: toda nota cita >= 1 fonte presente em `sources`;
// claims sem suporte são rejeitados, nunca fabricados.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::{extract_json, prompts, AgentKind};
use crate::error::PipelineError;
use crate::llm::{ChatPrompt, LlmClient, LlmError};
use crate::types::{ClaimId, Confidence, Note, Notes, SourceId, SourceSnippet};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Schema cru da resposta do modelo (índices ainda não validados).
#[derive(Deserialize)]
struct RawNotes {
    #[serde(default)]
    claims: Vec<RawClaim>,
}

#[derive(Deserialize)]
struct RawClaim {
    claim: String,
    #[serde(default)]
    sources: Vec<usize>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    contradicts: Vec<usize>,
}

fn parse_confidence(raw: Option<&str>) -> Confidence {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("high") => Confidence::High,
        Some("low") => Confidence::Low,
        _ => Confidence::Medium,
    }
}

/// Agente de pesquisa: evidências → notas com atribuição de fontes.
pub struct ResearchAgent {
    llm: Arc<dyn LlmClient>,
}

impl ResearchAgent {
    /// Cria o agente sobre o cliente LLM compartilhado.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Extrai notas de pesquisa dos snippets.
    ///
    /// `hint` é a instrução corretiva anexada em re-prompts após
    /// `MalformedModelOutput`.
    pub async fn extract_notes(
        &self,
        query: &str,
        sources: &[SourceSnippet],
        hint: Option<&str>,
    ) -> Result<Notes, PipelineError> {
        // Sem evidências não há o que extrair: caso NoResultsFound,
        // notas vazias são válidas e nenhuma chamada de modelo é gasta.
        if sources.is_empty() {
            log::warn!("📭 Nenhuma evidência disponível - notas vazias");
            return Ok(Notes::new());
        }

        let prompt = self.build_prompt(query, sources, hint);
        let raw = self
            .llm
            .complete(&prompt, AgentKind::Research.temperature(), "research_notes")
            .await
            .map_err(map_llm_error)?;

        let notes = parse_notes(&raw, sources.len())?;
        log::info!(
            "📝 Research: {} claims extraídos de {} fontes",
            notes.len(),
            sources.len()
        );
        Ok(notes)
    }

    fn build_prompt(
        &self,
        query: &str,
        sources: &[SourceSnippet],
        hint: Option<&str>,
    ) -> ChatPrompt {
        let mut snippets = String::new();
        for (i, s) in sources.iter().enumerate() {
            snippets.push_str(&format!(
                "[{}] {} ({})\n{}\n\n",
                i + 1,
                s.title,
                s.url,
                s.text
            ));
        }

        let mut user = format!(
            "Research Query: {}\n\nSource snippets:\n{}",
            query, snippets
        );
        if let Some(hint) = hint {
            user.push_str("\n\n");
            user.push_str(hint);
        }

        ChatPrompt::new(prompts::RESEARCHER_SYSTEM, user)
    }
}

fn map_llm_error(e: LlmError) -> PipelineError {
    match e {
        LlmError::Unavailable(msg) | LlmError::Auth(msg) => PipelineError::ModelUnavailable(msg),
        LlmError::EmptyResponse => {
            PipelineError::MalformedModelOutput("empty model response".into())
        }
    }
}

/// Valida a saída crua do modelo contra as fontes disponíveis.
///
/// Ids de fonte fora do intervalo são descartados; um claim que fica sem
/// nenhuma fonte válida é rejeitado por inteiro. Referências de contradição
/// são remapeadas para os claims aceitos e simetrizadas.
fn parse_notes(raw: &str, source_count: usize) -> Result<Notes, PipelineError> {
    let payload = extract_json(raw)
        .ok_or_else(|| PipelineError::MalformedModelOutput("no JSON object in response".into()))?;
    let parsed: RawNotes = serde_json::from_str(payload)
        .map_err(|e| PipelineError::MalformedModelOutput(e.to_string()))?;

    // Primeira passada: aceitar claims com >= 1 fonte válida e mapear
    // posição crua (1-based) → id do claim aceito.
    let mut accepted: Vec<(ClaimId, Note)> = Vec::new();
    let mut raw_to_id: BTreeMap<usize, ClaimId> = BTreeMap::new();

    for (raw_index, raw_claim) in parsed.claims.iter().enumerate() {
        let mut sources: Vec<SourceId> = Vec::new();
        for &n in &raw_claim.sources {
            if n >= 1 && n <= source_count {
                let id = SourceId(n);
                if !sources.contains(&id) {
                    sources.push(id);
                }
            } else {
                log::warn!(
                    "⚠️ Claim {} cita fonte inexistente [{}] - referência descartada",
                    raw_index + 1,
                    n
                );
            }
        }

        if sources.is_empty() {
            log::warn!(
                "🚫 Claim sem fonte válida rejeitado: \"{}\"",
                raw_claim.claim.chars().take(80).collect::<String>()
            );
            continue;
        }

        let id = ClaimId::from_index(accepted.len());
        raw_to_id.insert(raw_index + 1, id.clone());
        accepted.push((
            id,
            Note {
                claim: raw_claim.claim.clone(),
                sources,
                confidence: parse_confidence(raw_claim.confidence.as_deref()),
                contradicts: Vec::new(),
            },
        ));
    }

    // Segunda passada: resolver contradições sobre os claims aceitos.
    let mut pairs: Vec<(ClaimId, ClaimId)> = Vec::new();
    for (raw_index, raw_claim) in parsed.claims.iter().enumerate() {
        let Some(this_id) = raw_to_id.get(&(raw_index + 1)) else {
            continue;
        };
        for &other in &raw_claim.contradicts {
            if let Some(other_id) = raw_to_id.get(&other) {
                if other_id != this_id {
                    pairs.push((this_id.clone(), other_id.clone()));
                }
            }
        }
    }

    let mut notes: Notes = accepted.into_iter().collect();
    for (a, b) in pairs {
        link_contradiction(&mut notes, &a, &b);
    }
    Ok(notes)
}

/// Registra a contradição nos dois lados (relação simétrica).
fn link_contradiction(notes: &mut Notes, a: &ClaimId, b: &ClaimId) {
    if let Some(note) = notes.get_mut(a) {
        if !note.contradicts.contains(b) {
            note.contradicts.push(b.clone());
        }
    }
    if let Some(note) = notes.get_mut(b) {
        if !note.contradicts.contains(a) {
            note.contradicts.push(a.clone());
        }
    }
}
