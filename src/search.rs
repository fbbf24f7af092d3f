// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EVIDENCE FETCHER - CLIENTE DE BUSCA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para recuperação de evidências na web.
// Resultado vazio é válido (NoResultsFound não é erro).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::types::SourceSnippet;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Limite superior de resultados por busca.
pub const MAX_RESULTS_CAP: usize = 20;

/// Erros do cliente de busca.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// Falha de rede ou serviço indisponível
    #[error("search API unavailable: {0}")]
    Unavailable(String),

    /// Credencial recusada
    #[error("search API auth failed: {0}")]
    Auth(String),

    /// Query vazia ou inválida para o provedor
    #[error("invalid search query: {0}")]
    InvalidQuery(String),
}

/// Trait principal para clientes de busca.
///
/// Handles process-wide, sem estado entre chamadas: seguros para uso
/// concorrente entre queries independentes.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Busca evidências para a query.
    ///
    /// Garantias:
    /// - resultados em ordem de relevância do provedor
    /// - URLs idênticas deduplicadas (primeira ocorrência vence)
    /// - no máximo `max_results` snippets (clampeado a 1..=20)
    async fn fetch(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SourceSnippet>, SearchError>;
}

/// Deduplica snippets por URL normalizada, preservando a ordem de ranking.
pub fn dedup_by_url(snippets: Vec<SourceSnippet>) -> Vec<SourceSnippet> {
    let mut seen = HashSet::new();
    snippets
        .into_iter()
        .filter(|s| seen.insert(normalize_url(&s.url)))
        .collect()
}

/// Normaliza uma URL para comparação (esquema/host em minúsculas, sem
/// fragmento, sem barra final).
fn normalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let mut s = parsed.to_string();
            while s.ends_with('/') {
                s.pop();
            }
            s
        }
        Err(_) => raw.trim_end_matches('/').to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO TAVILY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Cliente para a API de busca Tavily.
pub struct TavilyClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl TavilyClient {
    /// Cria o cliente com a credencial fornecida (nunca hardcoded).
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: "https://api.tavily.com/search".into(),
            client: reqwest::Client::new(),
        }
    }

    /// Substitui o endpoint (útil para testes contra um servidor local).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn fetch(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SourceSnippet>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("empty query".into()));
        }
        let max_results = max_results.clamp(1, MAX_RESULTS_CAP);

        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SearchError::Auth(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(SearchError::Unavailable(format!("HTTP {}", status)));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Unavailable(format!("invalid response body: {}", e)))?;

        let snippets: Vec<SourceSnippet> = parsed
            .results
            .into_iter()
            .map(|r| SourceSnippet::new(r.url, r.title, r.content))
            .collect();

        let snippets = dedup_by_url(snippets);
        log::info!(
            "🔍 Tavily: {} resultados para \"{}\"",
            snippets.len(),
            query.chars().take(60).collect::<String>()
        );
        Ok(snippets.into_iter().take(max_results).collect())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente mock com respostas roteirizadas.
///
/// Cada chamada a `fetch` consome a próxima resposta da fila; quando a fila
/// esvazia, a última resposta configurada com `with_results` é repetida
/// (ou Vec vazio se nada foi configurado).
#[derive(Default)]
pub struct MockSearchClient {
    scripted: Mutex<VecDeque<Result<Vec<SourceSnippet>, SearchError>>>,
    fallback: Option<Vec<SourceSnippet>>,
    calls: AtomicUsize,
}

impl MockSearchClient {
    /// Mock que sempre retorna Vec vazio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock que sempre retorna os snippets fornecidos.
    pub fn with_results(snippets: Vec<SourceSnippet>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: Some(snippets),
            calls: AtomicUsize::new(0),
        }
    }

    /// Enfileira uma resposta (sucesso ou falha) para a próxima chamada.
    pub fn push_response(&self, response: Result<Vec<SourceSnippet>, SearchError>) {
        self.scripted
            .lock()
            .expect("mock queue poisoned")
            .push_back(response);
    }

    /// Mock que falha `n` vezes e depois repete `snippets`.
    pub fn failing_then(n: usize, snippets: Vec<SourceSnippet>) -> Self {
        let mock = Self::with_results(snippets);
        for _ in 0..n {
            mock.push_response(Err(SearchError::Unavailable("connection refused".into())));
        }
        mock
    }

    /// Número de chamadas a `fetch` até agora.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn fetch(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<SourceSnippet>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .scripted
            .lock()
            .expect("mock queue poisoned")
            .pop_front();

        let result = match scripted {
            Some(response) => response,
            None => Ok(self.fallback.clone().unwrap_or_default()),
        };

        result.map(|snippets| {
            dedup_by_url(snippets)
                .into_iter()
                .take(max_results.clamp(1, MAX_RESULTS_CAP))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(url: &str) -> SourceSnippet {
        SourceSnippet::new(url, "Title", "text")
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let snippets = vec![
            SourceSnippet::new("https://a.com/x", "First", "1"),
            SourceSnippet::new("https://b.com", "Other", "2"),
            SourceSnippet::new("https://a.com/x", "Duplicate", "3"),
        ];
        let deduped = dedup_by_url(snippets);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "First");
    }

    #[test]
    fn test_dedup_normalizes_trailing_slash_and_fragment() {
        let snippets = vec![
            snippet("https://a.com/x"),
            snippet("https://a.com/x/"),
            snippet("https://a.com/x#section"),
        ];
        assert_eq!(dedup_by_url(snippets).len(), 1);
    }

    #[tokio::test]
    async fn test_mock_empty_is_valid() {
        let client = MockSearchClient::new();
        let results = client.fetch("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_mock_scripted_failures_then_success() {
        let client = MockSearchClient::failing_then(2, vec![snippet("https://a.com")]);

        assert!(client.fetch("q", 5).await.is_err());
        assert!(client.fetch("q", 5).await.is_err());
        let results = client.fetch("q", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_respects_max_results() {
        let client = MockSearchClient::with_results(vec![
            snippet("https://a.com"),
            snippet("https://b.com"),
            snippet("https://c.com"),
        ]);
        let results = client.fetch("q", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
