// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Configuração de execução do pipeline: credenciais, modelo, retries e
// timeout. Tudo pode ser definido via .env; as chaves de API NUNCA têm
// valor padrão no código.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::time::Duration;

/// Configuração de execução do pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Chave da API de busca (Tavily). Sem padrão: vem do ambiente.
    pub search_api_key: String,

    /// Chave da API do modelo (Mistral). Sem padrão: vem do ambiente.
    pub model_api_key: String,

    /// Nome do modelo usado pelos três agentes.
    /// Padrão: "mistral-large-latest"
    pub model_name: String,

    /// Número de resultados pedidos por busca (1..=20).
    /// Padrão: 8
    pub max_results: usize,

    /// Total de tentativas por estágio: 3 falhas consecutivas esgotam
    /// o orçamento padrão. Padrão: 3
    pub max_retries: u32,

    /// Base do backoff exponencial entre tentativas.
    /// Padrão: 500ms (a espera dobra a cada falha)
    pub backoff_base: Duration,

    /// Orçamento de tempo da execução inteira, checado nas fronteiras
    /// de estágio. Padrão: 120s
    pub timeout: Duration,

    /// Comprimento máximo aceito para a pergunta.
    /// Padrão: 2000 caracteres
    pub max_query_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_api_key: String::new(),
            model_api_key: String::new(),
            model_name: "mistral-large-latest".to_string(),
            max_results: 8,
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            timeout: Duration::from_secs(120),
            max_query_len: 2000,
        }
    }
}

/// Carrega a configuração do pipeline a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `TAVILY_API_KEY`: chave da API de busca (obrigatória em produção)
/// - `MISTRAL_API_KEY`: chave da API do modelo (obrigatória em produção)
/// - `PIPELINE_MODEL`: nome do modelo (padrão: mistral-large-latest)
/// - `PIPELINE_MAX_RESULTS`: resultados por busca (padrão: 8)
/// - `PIPELINE_MAX_RETRIES`: total de tentativas por estágio (padrão: 3)
/// - `PIPELINE_TIMEOUT_SECS`: orçamento de tempo em segundos (padrão: 120)
/// - `PIPELINE_MAX_QUERY_LEN`: tamanho máximo da pergunta (padrão: 2000)
pub fn load_pipeline_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();

    if let Ok(key) = std::env::var("TAVILY_API_KEY") {
        config.search_api_key = key;
    }
    if let Ok(key) = std::env::var("MISTRAL_API_KEY") {
        config.model_api_key = key;
    }

    if let Ok(model) = std::env::var("PIPELINE_MODEL") {
        if !model.trim().is_empty() {
            log::info!("📦 PIPELINE_MODEL={}", model);
            config.model_name = model;
        }
    }

    if let Ok(raw) = std::env::var("PIPELINE_MAX_RESULTS") {
        if let Ok(n) = raw.parse::<usize>() {
            if n > 0 {
                config.max_results = n.min(crate::search::MAX_RESULTS_CAP);
                log::info!("📦 PIPELINE_MAX_RESULTS={}", config.max_results);
            }
        }
    }

    if let Ok(raw) = std::env::var("PIPELINE_MAX_RETRIES") {
        if let Ok(n) = raw.parse::<u32>() {
            if n >= 1 {
                config.max_retries = n;
                log::info!("📦 PIPELINE_MAX_RETRIES={}", n);
            }
        }
    }

    if let Ok(raw) = std::env::var("PIPELINE_TIMEOUT_SECS") {
        if let Ok(secs) = raw.parse::<u64>() {
            if secs > 0 {
                config.timeout = Duration::from_secs(secs);
                log::info!("📦 PIPELINE_TIMEOUT_SECS={}", secs);
            }
        }
    }

    if let Ok(raw) = std::env::var("PIPELINE_MAX_QUERY_LEN") {
        if let Ok(n) = raw.parse::<usize>() {
            if n > 0 {
                config.max_query_len = n;
                log::info!("📦 PIPELINE_MAX_QUERY_LEN={}", n);
            }
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.model_name, "mistral-large-latest");
        assert_eq!(config.max_results, 8);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base, Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.max_query_len, 2000);
        assert!(config.search_api_key.is_empty());
        assert!(config.model_api_key.is_empty());
    }
}
