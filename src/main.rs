// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RESEARCH PIPELINE CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// CLI para execução do pipeline de pesquisa multi-agente.
//
// Uso:
//   research-pipeline-cli "What causes ocean tides?"
//   research-pipeline-cli --max-results 5 "pergunta"
//   research-pipeline-cli --timeout 60 "pergunta complexa"
//   research-pipeline-cli --serve --port 5000  (modo servidor HTTP)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use research_pipeline::llm::MistralClient;
use research_pipeline::prelude::*;
use research_pipeline::search::TavilyClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tenta carregar o arquivo .env de múltiplos locais possíveis
fn load_dotenv() {
    let possible_paths = [
        // Diretório atual
        PathBuf::from(".env"),
        // Diretório pai
        PathBuf::from("../.env"),
        // Caminho absoluto em tempo de compilação (fallback)
        {
            let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            p.push(".env");
            p
        },
    ];

    for path in &possible_paths {
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => {
                    eprintln!(
                        "✓ Carregado .env de: {:?}",
                        path.canonicalize().unwrap_or(path.clone())
                    );
                    return;
                }
                Err(e) => {
                    eprintln!("⚠ Erro ao carregar {:?}: {}", path, e);
                }
            }
        }
    }

    if dotenvy::dotenv().is_ok() {
        eprintln!("✓ Carregado .env do diretório atual");
    } else {
        eprintln!("⚠ Nenhum arquivo .env encontrado. Certifique-se de que TAVILY_API_KEY e MISTRAL_API_KEY estão definidas.");
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Research Pipeline CLI v{}", research_pipeline::VERSION);
    eprintln!();
    eprintln!("Uso: {} <pergunta>", program);
    eprintln!();
    eprintln!("Opções:");
    eprintln!("  --max-results <n>   Resultados por busca, 1-20 (padrão: 8)");
    eprintln!("  --timeout <segundos> Orçamento de tempo da execução (padrão: 120)");
    eprintln!("  --serve             Modo servidor HTTP (POST /api/deep-research)");
    eprintln!("  --port <n>          Porta do servidor (padrão: 5000)");
    eprintln!();
    eprintln!("Exemplos:");
    eprintln!("  {} \"What causes ocean tides?\"", program);
    eprintln!("  {} --max-results 5 \"Is coffee good for you?\"", program);
    eprintln!("  {} --serve --port 5000", program);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Carregar .env PRIMEIRO, antes de qualquer coisa
    load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
    }

    let mut config = load_pipeline_config();
    let mut serve = false;
    let mut port: u16 = 5000;

    // Parse das flags antes da pergunta
    let mut rest = &args[1..];
    loop {
        match rest {
            [flag, value, tail @ ..] if flag.as_str() == "--max-results" => {
                match value.parse::<usize>() {
                    Ok(n) if n >= 1 => config.max_results = n.min(20),
                    _ => usage(&args[0]),
                }
                rest = tail;
            }
            [flag, value, tail @ ..] if flag.as_str() == "--timeout" => {
                match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                    _ => usage(&args[0]),
                }
                rest = tail;
            }
            [flag, tail @ ..] if flag.as_str() == "--serve" => {
                serve = true;
                rest = tail;
            }
            [flag, value, tail @ ..] if flag.as_str() == "--port" => {
                match value.parse::<u16>() {
                    Ok(n) => port = n,
                    _ => usage(&args[0]),
                }
                rest = tail;
            }
            _ => break,
        }
    }
    if !serve && rest.is_empty() {
        usage(&args[0]);
    }
    let question = rest.join(" ");

    if config.search_api_key.is_empty() {
        eprintln!("✗ Erro: TAVILY_API_KEY não encontrada!");
        eprintln!();
        eprintln!("Certifique-se de que:");
        eprintln!("  1. O arquivo .env existe no diretório do projeto");
        eprintln!("  2. O arquivo contém: TAVILY_API_KEY=sua-chave-aqui");
        eprintln!();
        eprintln!("Ou defina a variável de ambiente diretamente:");
        eprintln!("  export TAVILY_API_KEY=sua-chave-aqui");
        std::process::exit(1);
    }
    if config.model_api_key.is_empty() {
        eprintln!("✗ Erro: MISTRAL_API_KEY não encontrada!");
        eprintln!();
        eprintln!("Certifique-se de que:");
        eprintln!("  1. O arquivo .env existe no diretório do projeto");
        eprintln!("  2. O arquivo contém: MISTRAL_API_KEY=sua-chave-aqui");
        eprintln!();
        eprintln!("Ou defina a variável de ambiente diretamente:");
        eprintln!("  export MISTRAL_API_KEY=sua-chave-aqui");
        std::process::exit(1);
    }

    let llm: Arc<dyn LlmClient> = Arc::new(
        MistralClient::new(config.model_api_key.clone()).with_model(config.model_name.as_str()),
    );
    let search: Arc<dyn SearchClient> = Arc::new(TavilyClient::new(config.search_api_key.clone()));
    let model_name = config.model_name.clone();
    let pipeline = Orchestrator::new(llm, search, config);

    // Modo servidor: expõe o pipeline via HTTP e bloqueia até encerrar
    if serve {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        let state = Arc::new(research_pipeline::server::AppState { pipeline });
        return research_pipeline::server::start_server(addr, state).await;
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(" RESEARCH PIPELINE v{}", research_pipeline::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Pergunta: {}", question);
    println!("Modelo: {}", model_name);
    println!();
    println!("Iniciando pesquisa...");
    println!();

    let started = Instant::now();
    let result = pipeline.run(&question).await;

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(" RESULTADO");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    match result {
        Ok(state) => {
            println!("✓ Pesquisa concluída com sucesso!");
            println!();

            if let Some(draft) = &state.draft {
                println!("{}", draft);
                println!();
            }

            if !state.sources.is_empty() {
                println!("Fontes:");
                for (i, source) in state.sources.iter().enumerate() {
                    println!("  [{}] {} - {}", i + 1, source.title, source.url);
                }
                println!();
            }

            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!(" EXECUÇÃO");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!();
            println!("⏱️  Tempo total: {:.2}s", started.elapsed().as_secs_f64());
            println!("📝 Claims: {}", state.notes.len());
            println!("🗂️  Temas: {}", state.outline.sections.len());
            println!("🔗 Fases:");
            for phase in &state.trace {
                println!("    - {}", phase);
            }
            println!();
        }
        Err(failure) => {
            println!("✗ Pesquisa falhou");
            println!("Erro: {}", failure);
            println!();
            println!("Estágio alcançado: {}", failure.stage_reached);
            if !failure.partial.sources.is_empty() {
                println!(
                    "Artefatos parciais: {} fontes, {} claims",
                    failure.partial.sources.len(),
                    failure.partial.notes.len()
                );
            }
            println!();
            std::process::exit(1);
        }
    }

    Ok(())
}
