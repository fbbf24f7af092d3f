// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DRAFTING AGENT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Transforma outline + notas na resposta final em markdown, com citações
// [n] validadas contra as fontes coletadas. Quando o modelo esgota as
// tentativas, `render_fallback` produz uma renderização determinística do
// outline em vez de falhar o pipeline inteiro.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::{prompts, AgentKind};
use crate::error::PipelineError;
use crate::llm::{ChatPrompt, LlmClient, LlmError};
use crate::types::{Notes, Outline, SourceSnippet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Primeira linha da resposta quando o drafting caiu no modo degradado.
pub const DEGRADED_OUTPUT_MARKER: &str =
    "> **Note:** generated in degraded mode - outline rendered without narrative prose.";

static CITATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// Agente de drafting: outline + notas → resposta final citada.
pub struct DraftingAgent {
    llm: Arc<dyn LlmClient>,
}

impl DraftingAgent {
    /// Cria o agente sobre o cliente LLM compartilhado.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Redige a resposta final em markdown.
    ///
    /// Toda citação `[n]` do texto retornado é validada: um marcador que
    /// não resolve para uma fonte coletada torna a resposta
    /// `MalformedModelOutput` (citação pendurada nunca chega ao usuário).
    pub async fn draft(
        &self,
        query: &str,
        outline: &Outline,
        notes: &Notes,
        sources: &[SourceSnippet],
        hint: Option<&str>,
    ) -> Result<String, PipelineError> {
        let prompt = self.build_prompt(query, outline, notes, sources, hint);
        let raw = self
            .llm
            .complete(&prompt, AgentKind::Draft.temperature(), "draft_markdown")
            .await
            .map_err(map_llm_error)?;

        let text = raw.trim();
        if text.is_empty() {
            return Err(PipelineError::MalformedModelOutput("empty draft".into()));
        }
        validate_citations(text, sources.len())?;

        log::info!("✍️ Draft: {} caracteres gerados", text.len());
        Ok(text.to_string())
    }

    fn build_prompt(
        &self,
        query: &str,
        outline: &Outline,
        notes: &Notes,
        sources: &[SourceSnippet],
        hint: Option<&str>,
    ) -> ChatPrompt {
        let mut body = String::new();

        body.push_str("Outline:\n");
        for section in &outline.sections {
            body.push_str(&format!("## {}\n", section.theme));
            for id in &section.claims {
                if let Some(note) = notes.get(id) {
                    let cites = note
                        .sources
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join("");
                    body.push_str(&format!("- {} {}\n", note.claim, cites));
                }
            }
            for (a, b) in &section.contradictions {
                body.push_str(&format!(
                    "- CONTRADICTION between {} and {}: present both sides explicitly.\n",
                    a.as_str(),
                    b.as_str()
                ));
            }
        }

        body.push_str("\nAvailable sources:\n");
        for (i, s) in sources.iter().enumerate() {
            body.push_str(&format!("[{}] {} - {}\n", i + 1, s.title, s.url));
        }

        let mut user = format!("Research Query: {}\n\n{}", query, body);
        if let Some(hint) = hint {
            user.push_str("\n\n");
            user.push_str(hint);
        }

        ChatPrompt::new(prompts::DRAFTER_SYSTEM, user)
    }
}

fn map_llm_error(e: LlmError) -> PipelineError {
    match e {
        LlmError::Unavailable(msg) | LlmError::Auth(msg) => PipelineError::ModelUnavailable(msg),
        LlmError::EmptyResponse => PipelineError::MalformedModelOutput("empty draft".into()),
    }
}

/// Rejeita rascunhos com marcadores `[n]` fora de `1..=source_count`.
fn validate_citations(text: &str, source_count: usize) -> Result<(), PipelineError> {
    for cap in CITATION_RE.captures_iter(text) {
        let n: usize = cap[1].parse().unwrap_or(0);
        if n < 1 || n > source_count {
            return Err(PipelineError::MalformedModelOutput(format!(
                "draft cites nonexistent source [{}]",
                &cap[1]
            )));
        }
    }
    Ok(())
}

/// Renderização degradada: o outline vira a resposta, sem prosa do modelo.
///
/// Usada pelo orquestrador quando o drafting esgota as tentativas; todas
/// as citações vêm diretamente das notas, então são válidas por construção.
pub fn render_fallback(query: &str, outline: &Outline, notes: &Notes) -> String {
    let mut out = String::new();
    out.push_str(DEGRADED_OUTPUT_MARKER);
    out.push_str("\n\n");
    out.push_str(&format!("# {}\n", query));

    for section in &outline.sections {
        out.push_str(&format!("\n## {}\n", section.theme));
        for id in &section.claims {
            if let Some(note) = notes.get(id) {
                let cites = note
                    .sources
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join("");
                out.push_str(&format!("- {} {}\n", note.claim, cites));
            }
        }
        for (a, b) in &section.contradictions {
            let left = notes.get(a).map(|n| n.claim.as_str()).unwrap_or(a.as_str());
            let right = notes.get(b).map(|n| n.claim.as_str()).unwrap_or(b.as_str());
            out.push_str(&format!(
                "- **Conflicting evidence:** \"{}\" vs \"{}\"\n",
                left, right
            ));
        }
    }

    out
}
