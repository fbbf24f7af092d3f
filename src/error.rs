// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TAXONOMIA DE ERROS DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Resultado vazio de busca NÃO é erro: o fetcher retorna Vec vazio e o
// pipeline segue com evidência vazia.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::agents::AgentKind;
use crate::state::{ResearchState, Stage};

/// Erros que atravessam o pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// Serviço de busca fora do ar ou recusando autenticação
    #[error("search service unavailable: {0}")]
    SearchUnavailable(String),

    /// API do modelo fora do ar ou recusando autenticação
    #[error("model service unavailable: {0}")]
    ModelUnavailable(String),

    /// Saída do modelo não parseia no schema esperado
    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    /// Deadline da query cruzado em uma fronteira de estágio
    #[error("query timed out after {elapsed_ms}ms")]
    Timeout {
        /// Tempo decorrido quando o deadline foi detectado
        elapsed_ms: u128,
    },

    /// Query rejeitada antes de entrar no pipeline (vazia ou longa demais)
    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),
}

impl PipelineError {
    /// Falha transitória: elegível para retry com backoff exponencial.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::SearchUnavailable(_) | PipelineError::ModelUnavailable(_)
        )
    }

    /// Elegível para re-prompt corretivo (único tipo que é).
    pub fn is_malformed(&self) -> bool {
        matches!(self, PipelineError::MalformedModelOutput(_))
    }
}

/// Relatório estruturado de falha retornado ao chamador.
///
/// Nunca uma resposta vazia silenciosa: nomeia o último estágio concluído,
/// o componente que falhou, o motivo, e carrega o estado parcial para
/// diagnóstico.
#[derive(Debug, Clone)]
pub struct PipelineFailure {
    /// Último estágio concluído com sucesso
    pub stage_reached: Stage,
    /// Componente cuja execução esgotou as tentativas
    pub failed_agent: AgentKind,
    /// Motivo da falha
    pub error: PipelineError,
    /// Estado parcial com os artefatos coletados até a falha
    pub partial: ResearchState,
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pipeline failed at {} (last completed stage: {}): {}",
            self.failed_agent, self.stage_reached, self.error
        )
    }
}

impl std::error::Error for PipelineFailure {}
