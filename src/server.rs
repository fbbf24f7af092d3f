// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP SERVER - API DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//!
//! Expõe o pipeline como um serviço HTTP.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /api/deep-research` - Executa o pipeline para uma pergunta
//!
//! ## Uso
//!
//! ```bash
//! research-pipeline-cli --serve --port 5000
//! curl -X POST localhost:5000/api/deep-research \
//!     -H 'content-type: application/json' \
//!     -d '{"query": "What causes ocean tides?"}'
//! ```

use crate::error::PipelineError;
use crate::pipeline::Orchestrator;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

/// Estado compartilhado entre os handlers.
pub struct AppState {
    /// Pipeline pronto para executar queries (clientes stateless).
    pub pipeline: Orchestrator,
}

/// Corpo da requisição de pesquisa.
#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    /// Pergunta a pesquisar.
    #[serde(default)]
    pub query: String,
}

/// Fonte citada na resposta.
#[derive(Debug, Serialize)]
pub struct SourceRef {
    /// Título da página
    pub title: String,
    /// URL da fonte
    pub url: String,
}

/// Corpo da resposta de sucesso.
#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    /// Pergunta original
    pub query: String,
    /// Resposta final em markdown
    pub final_answer: String,
    /// Fontes na ordem dos marcadores `[n]`
    pub sources: Vec<SourceRef>,
    /// Fases concluídas, na ordem
    pub workflow_path: Vec<String>,
}

/// Corpo de erro da API.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Mensagem curta do erro
    pub error: String,
    /// Detalhe do motivo, quando houver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Último estágio concluído antes da falha
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_reached: Option<String>,
}

// ── GET /health ─────────────────────────────────

/// Health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── POST /api/deep-research ─────────────────────

/// Executa o pipeline para a pergunta do corpo da requisição.
pub async fn deep_research(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResearchRequest>,
) -> Response {
    if body.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "A non-empty 'query' is required".into(),
                details: None,
                stage_reached: None,
            }),
        )
            .into_response();
    }

    match state.pipeline.run(&body.query).await {
        Ok(result) => {
            let sources = result
                .sources
                .iter()
                .map(|s| SourceRef {
                    title: s.title.clone(),
                    url: s.url.clone(),
                })
                .collect();
            Json(ResearchResponse {
                query: result.query.clone(),
                final_answer: result.draft.unwrap_or_default(),
                sources,
                workflow_path: result.trace,
            })
            .into_response()
        }
        Err(failure) => {
            // Entrada rejeitada antes do pipeline é culpa do cliente.
            let status = match failure.error {
                PipelineError::UnsupportedQuery(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ApiError {
                    error: "An error occurred during research".into(),
                    details: Some(failure.to_string()),
                    stage_reached: Some(failure.stage_reached.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Monta o roteador da API sobre o estado compartilhado.
pub fn router(state: Arc<AppState>) -> Router {
    use tower_http::cors::CorsLayer;

    Router::new()
        .route("/health", get(health))
        .route("/api/deep-research", post(deep_research))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Inicia o servidor HTTP no endereço especificado.
///
/// Entry point chamado de main.rs quando `--serve` é passado.
pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("🌐 Research pipeline server em http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
