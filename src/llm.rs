// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE LLM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para interação com modelos de linguagem.
// O cliente retorna texto cru; o parse no schema esperado é responsabilidade
// do agente que fez a chamada.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Erros do cliente LLM.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// API fora do ar, rate limit ou falha de rede
    #[error("model API unavailable: {0}")]
    Unavailable(String),

    /// Credencial recusada
    #[error("model API auth failed: {0}")]
    Auth(String),

    /// Resposta sem conteúdo utilizável
    #[error("empty model response")]
    EmptyResponse,
}

/// Prompt estruturado: instruções de papel + payload de contexto.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    /// Instruções de sistema (papel do agente)
    pub system: String,
    /// Mensagem do usuário (contexto + tarefa)
    pub user: String,
}

impl ChatPrompt {
    /// Monta um prompt a partir das duas partes.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Trait principal para clientes LLM.
///
/// Handles process-wide e stateless por chamada: o mesmo cliente atende
/// queries concorrentes sem locking.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Envia o prompt e retorna o texto cru da resposta.
    ///
    /// `schema` é o nome do schema de saída esperado, usado apenas para
    /// logging e diagnóstico - o parse fica com o chamador.
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        temperature: f32,
        schema: &str,
    ) -> Result<String, LlmError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MISTRAL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// Cliente para a API de chat da Mistral.
pub struct MistralClient {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl MistralClient {
    /// Cria o cliente com a credencial fornecida (nunca hardcoded).
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "mistral-large-latest".into(),
            endpoint: "https://api.mistral.ai/v1/chat/completions".into(),
            client: reqwest::Client::new(),
        }
    }

    /// Substitui o modelo padrão.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Substitui o endpoint (útil para testes contra um servidor local).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl LlmClient for MistralClient {
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        temperature: f32,
        schema: &str,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature,
        };

        log::debug!(
            "🤖 Mistral: modelo={} temp={} schema={}",
            self.model,
            temperature,
            schema
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LlmError::Auth(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(LlmError::Unavailable(format!("HTTP {}", status)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unavailable(format!("invalid response body: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente mock com respostas roteirizadas.
///
/// Cada chamada consome a próxima resposta da fila; fila vazia repete a
/// resposta padrão. O contador de chamadas permite verificar quantas
/// chamadas de modelo um estágio consumiu.
#[derive(Default)]
pub struct MockLlmClient {
    scripted: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    /// Mock sem respostas configuradas (retorna EmptyResponse).
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock que sempre retorna `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: Some(response.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Enfileira uma resposta (sucesso ou falha) para a próxima chamada.
    pub fn push_response(&self, response: Result<String, LlmError>) {
        self.scripted
            .lock()
            .expect("mock queue poisoned")
            .push_back(response);
    }

    /// Número de chamadas a `complete` até agora.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        _prompt: &ChatPrompt,
        _temperature: f32,
        _schema: &str,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .scripted
            .lock()
            .expect("mock queue poisoned")
            .pop_front();

        match scripted {
            Some(response) => response,
            None => match &self.fallback {
                Some(text) => Ok(text.clone()),
                None => Err(LlmError::EmptyResponse),
            },
        }
    }
}
