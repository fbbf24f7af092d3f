// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SYNTHESIS AGENT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Organiza notas em um outline temático. O agrupamento vem do modelo;
// a preservação dos dois lados de cada contradição é imposta aqui,
// deterministicamente, depois do parse.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::{extract_json, prompts, AgentKind};
use crate::error::PipelineError;
use crate::llm::{ChatPrompt, LlmClient, LlmError};
use crate::types::{ClaimId, Notes, Outline, ThemeSection};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Tema usado quando o modelo omite claims do outline.
const CATCH_ALL_THEME: &str = "Additional findings";

#[derive(Deserialize)]
struct RawOutline {
    #[serde(default)]
    themes: Vec<RawTheme>,
}

#[derive(Deserialize)]
struct RawTheme {
    theme: String,
    #[serde(default)]
    claims: Vec<String>,
}

/// Agente de síntese: notas → outline temático com contradições marcadas.
pub struct SynthesisAgent {
    llm: Arc<dyn LlmClient>,
}

impl SynthesisAgent {
    /// Cria o agente sobre o cliente LLM compartilhado.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Produz o outline temático cobrindo todas as notas.
    ///
    /// Invariantes garantidas independentemente do modelo:
    /// - todo claim aparece em exatamente uma seção (omitidos vão para
    ///   uma seção final de coleta);
    /// - pares contraditórios são marcados na seção dona de cada lado e
    ///   ambos os lados permanecem no outline.
    pub async fn synthesize(
        &self,
        query: &str,
        notes: &Notes,
        hint: Option<&str>,
    ) -> Result<Outline, PipelineError> {
        if notes.is_empty() {
            log::warn!("📭 Nenhuma nota para sintetizar - outline vazio");
            return Ok(Outline::default());
        }

        let prompt = self.build_prompt(query, notes, hint);
        let raw = self
            .llm
            .complete(&prompt, AgentKind::Synthesis.temperature(), "outline")
            .await
            .map_err(map_llm_error)?;

        let outline = parse_outline(&raw, notes)?;
        log::info!(
            "🗂️ Synthesis: {} temas cobrindo {} claims",
            outline.sections.len(),
            notes.len()
        );
        Ok(outline)
    }

    fn build_prompt(&self, query: &str, notes: &Notes, hint: Option<&str>) -> ChatPrompt {
        let mut listing = String::new();
        for (id, note) in notes {
            listing.push_str(&format!(
                "{}: {} (confidence: {:?}, sources: {})\n",
                id.as_str(),
                note.claim,
                note.confidence,
                note.sources
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            if !note.contradicts.is_empty() {
                listing.push_str(&format!(
                    "   (contradicts: {})\n",
                    note.contradicts
                        .iter()
                        .map(|c| c.as_str().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }

        let mut user = format!("Research Query: {}\n\nResearch notes:\n{}", query, listing);
        if let Some(hint) = hint {
            user.push_str("\n\n");
            user.push_str(hint);
        }

        ChatPrompt::new(prompts::SYNTHESIZER_SYSTEM, user)
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

fn parse_outline(raw: &str, notes: &Notes) -> Result<Outline, PipelineError> {
    let payload = extract_json(raw)
        .ok_or_else(|| PipelineError::MalformedModelOutput("no JSON object in response".into()))?;
    let parsed: RawOutline = serde_json::from_str(payload)
        .map_err(|e| PipelineError::MalformedModelOutput(e.to_string()))?;

    let mut seen: BTreeSet<ClaimId> = BTreeSet::new();
    let mut sections: Vec<ThemeSection> = Vec::new();

    for raw_theme in parsed.themes {
        let mut claims: Vec<ClaimId> = Vec::new();
        for raw_id in raw_theme.claims {
            let id = ClaimId(raw_id);
            if !notes.contains_key(&id) {
                // Id inventado pelo modelo: saída inutilizável, re-prompt.
                return Err(PipelineError::MalformedModelOutput(format!(
                    "outline references unknown claim id \"{}\"",
                    id.as_str()
                )));
            }
            // Duplicatas entre temas: primeira ocorrência vence.
            if seen.insert(id.clone()) {
                claims.push(id);
            }
        }
        if !claims.is_empty() {
            sections.push(ThemeSection::new(raw_theme.theme, claims));
        }
    }

    // Claims que o modelo omitiu são preservados numa seção de coleta.
    let omitted: Vec<ClaimId> = notes
        .keys()
        .filter(|id| !seen.contains(id))
        .cloned()
        .collect();
    if !omitted.is_empty() {
        log::warn!(
            "⚠️ Outline omitiu {} claims - anexando em \"{}\"",
            omitted.len(),
            CATCH_ALL_THEME
        );
        sections.push(ThemeSection::new(CATCH_ALL_THEME, omitted));
    }

    let mut outline = Outline { sections };
    mark_contradictions(&mut outline, notes);
    Ok(outline)
}

/// Marca cada par contraditório na seção dona de cada lado.
///
/// A relação já chega simétrica das notas; cada par é registrado uma vez
/// por seção envolvida, com ids em ordem canônica.
fn mark_contradictions(outline: &mut Outline, notes: &Notes) {
    let mut pairs: BTreeSet<(ClaimId, ClaimId)> = BTreeSet::new();
    for (id, note) in notes {
        for other in &note.contradicts {
            let pair = if id <= other {
                (id.clone(), other.clone())
            } else {
                (other.clone(), id.clone())
            };
            pairs.insert(pair);
        }
    }

    for section in &mut outline.sections {
        for (a, b) in &pairs {
            let owns = section.claims.contains(a) || section.claims.contains(b);
            if owns && !section.contradictions.contains(&(a.clone(), b.clone())) {
                section.contradictions.push((a.clone(), b.clone()));
            }
        }
    }
}
