// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AGENTES DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod drafting;
mod prompts;
mod research;
mod synthesis;

pub use drafting::{render_fallback, DraftingAgent, DEGRADED_OUTPUT_MARKER};
pub use prompts::CORRECTIVE_INSTRUCTION;
pub use research::ResearchAgent;
pub use synthesis::SynthesisAgent;

use std::fmt;

/// Papel de agente no pipeline fixo e linear.
///
/// Variante taggeada em vez de roles dinâmicos: pattern matching exaustivo
/// garante cobertura em tempo de compilação sobre as três fases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Coleta evidências e extrai claims
    Research,
    /// Agrupa claims em temas
    Synthesis,
    /// Escreve a resposta final
    Draft,
}

impl AgentKind {
    /// Temperatura usada na chamada de modelo de cada papel.
    pub fn temperature(&self) -> f32 {
        match self {
            AgentKind::Research => 0.3,
            AgentKind::Synthesis => 0.4,
            AgentKind::Draft => 0.7,
        }
    }

    /// Nome legível para logs e relatórios de falha.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Research => "research",
            AgentKind::Synthesis => "synthesis",
            AgentKind::Draft => "draft",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Isola o payload JSON de uma resposta de modelo.
///
/// Modelos frequentemente embrulham o JSON em cercas de código ou prosa;
/// recorta do primeiro `{` ao último `}` correspondente.
pub(crate) fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}
