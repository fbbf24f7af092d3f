//! # Research Pipeline - Pesquisa Multi-Agente
//!
//! Este crate implementa um pipeline de pesquisa multi-agente: recebe uma
//! pergunta, coleta evidências na web e produz uma resposta estruturada e
//! citada, passando por três agentes especializados encadeados sobre um
//! estado compartilhado.
//!
//! ## Como funciona?
//!
//! 1. **Research**: busca evidências (Tavily) e extrai claims atribuídos
//!    a fontes
//! 2. **Synthesis**: agrupa os claims em temas e marca contradições
//! 3. **Drafting**: redige a resposta final em markdown com citações `[n]`
//!
//! ## Arquitetura
//!
//! O grafo de estados é fixo e linear:
//!
//! ```text
//! Pending → Researched → Synthesized → Drafted
//!     └──────────┴────────────┴──→ Failed
//! ```
//!
//! O orquestrador é o único dono do [`state::ResearchState`]; cada agente
//! recebe exatamente o que precisa por referência e devolve seu artefato,
//! que só então é comprometido no estado. Não há claims sem fonte: um
//! claim que o modelo não consegue atribuir a uma evidência coletada é
//! descartado, nunca fabricado.
//!
//! ## Degradação e falha
//!
//! - Falhas transitórias (busca ou modelo fora do ar) ganham retry com
//!   backoff exponencial.
//! - Saída de modelo malformada ganha re-prompt imediato com instrução
//!   corretiva.
//! - O drafting tem fallback: esgotadas as tentativas, o outline é
//!   renderizado deterministicamente em vez de falhar a execução.
//! - Qualquer falha definitiva vira um [`error::PipelineFailure`] com o
//!   estágio alcançado, o agente culpado e o estado parcial.
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use research_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = load_pipeline_config();
//!     let llm = Arc::new(MistralClient::new(config.model_api_key.clone()));
//!     let search = Arc::new(TavilyClient::new(config.search_api_key.clone()));
//!     let pipeline = Orchestrator::new(llm, search, config);
//!
//!     match pipeline.run("What causes ocean tides?").await {
//!         Ok(state) => println!("{}", state.draft.unwrap_or_default()),
//!         Err(failure) => eprintln!("{}", failure),
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Tipos fundamentais compartilhados por todo o pipeline.
///
/// Define as estruturas de dados básicas:
/// - [`types::SourceSnippet`]: evidência recuperada da web
/// - [`types::Note`]: claim com fontes, confiança e contradições
/// - [`types::Outline`]: agrupamento temático dos claims
/// - [`types::SourceId`] / [`types::ClaimId`]: ids estáveis para citação
pub mod types;

/// Estado compartilhado e máquina de estágios.
///
/// - [`state::ResearchState`]: estado único que atravessa o pipeline
/// - [`state::Stage`]: Pending → Researched → Synthesized → Drafted | Failed
pub mod state;

/// Taxonomia de erros e relatório estruturado de falha.
pub mod error;

/// Cliente de busca web (Tavily) e trait [`search::SearchClient`].
///
/// Inclui deduplicação de resultados por URL normalizada e um mock
/// roteirizável para testes.
pub mod search;

/// Cliente de modelo (Mistral) e trait [`llm::LlmClient`].
pub mod llm;

/// Os três agentes do pipeline e seus prompts.
///
/// - [`agents::ResearchAgent`]: evidências → notas
/// - [`agents::SynthesisAgent`]: notas → outline temático
/// - [`agents::DraftingAgent`]: outline → resposta citada
pub mod agents;

/// Orquestrador: executa o grafo fixo com retries, timeout e fallback.
pub mod pipeline;

/// Servidor HTTP: expõe o pipeline em `POST /api/deep-research`.
pub mod server;

/// Configuração do pipeline via variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `TAVILY_API_KEY` / `MISTRAL_API_KEY`: credenciais (sem padrão)
/// - `PIPELINE_MODEL`: modelo (padrão: "mistral-large-latest")
/// - `PIPELINE_MAX_RESULTS`: resultados por busca (padrão: 8)
/// - `PIPELINE_MAX_RETRIES`: tentativas extras por estágio (padrão: 3)
/// - `PIPELINE_TIMEOUT_SECS`: orçamento de tempo (padrão: 120)
/// - `PIPELINE_MAX_QUERY_LEN`: tamanho máximo da pergunta (padrão: 2000)
pub mod config;

// Re-exports principais
pub use agents::{DraftingAgent, ResearchAgent, SynthesisAgent, DEGRADED_OUTPUT_MARKER};
pub use config::{load_pipeline_config, PipelineConfig};
pub use error::{PipelineError, PipelineFailure};
pub use pipeline::Orchestrator;
pub use state::{ResearchState, Stage};
pub use types::*;

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com imports comuns para uso rápido.
///
/// Importar tudo de uma vez:
/// ```rust,ignore
/// use research_pipeline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agents::{AgentKind, DraftingAgent, ResearchAgent, SynthesisAgent};
    pub use crate::config::{load_pipeline_config, PipelineConfig};
    pub use crate::error::{PipelineError, PipelineFailure};
    pub use crate::llm::{LlmClient, MistralClient, MockLlmClient};
    pub use crate::pipeline::Orchestrator;
    pub use crate::search::{MockSearchClient, SearchClient, TavilyClient};
    pub use crate::state::{ResearchState, Stage};
    pub use crate::types::*;
}
