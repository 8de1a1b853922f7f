mod compose;
mod config;
mod error;
mod llm;
mod server;

use std::path::PathBuf;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::compose::TemplateTable;
use crate::config::Config;
use crate::server::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything reads env vars
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    if args.iter().any(|a| a == "--default-config") {
        print!("{}", Config::default_config_contents());
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let config = match Config::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if args.iter().any(|a| a == "--check") {
        if !run_checks(&config) {
            std::process::exit(1);
        }
        return;
    }

    let state = match AppState::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to initialize: {e}");
            std::process::exit(1);
        }
    };

    info!(
        bind = %config.server.bind,
        model = %config.llm.model,
        provider = state.gateway.provider_name().unwrap_or("none"),
        "preroll starting"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let server_handle = {
        let shutdown_rx = shutdown_tx.subscribe();
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = server::serve(&config, state, shutdown_rx).await {
                error!("server error: {e}");
                std::process::exit(1);
            }
        })
    };

    info!("preroll is running, press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl+c: {e}");
    }

    info!("shutdown signal received, stopping...");
    let _ = shutdown_tx.send(());
    let _ = server_handle.await;
    info!("preroll stopped");
}

/// Print the resolved configuration and report problems.  Returns false if
/// the service could not start as configured.
fn run_checks(config: &Config) -> bool {
    let mut ok = true;
    info!("running pre-flight checks...");

    info!("config: OK");
    info!("  bind: {}", config.server.bind);
    info!("  base_url: {}", config.llm.base_url);
    info!("  model: {}", config.llm.model);
    info!("  temperature: {}", config.llm.temperature);
    info!("  max_tokens: {}", config.llm.max_tokens);
    info!("  timeout_secs: {}", config.llm.timeout_secs);
    info!("  max_prompt_chars: {}", config.prompt.max_prompt_chars);
    info!("  allowed_origins: {:?}", config.allowed_origins());

    match config.llm.api_key() {
        Some(_) => info!("GROQ_API_KEY: set"),
        None => {
            error!("GROQ_API_KEY: NOT SET (generation requests will return 500)");
            ok = false;
        }
    }

    match TemplateTable::by_version(&config.prompt.template_set) {
        Ok(table) => info!("templates: OK ({}, {} generation types)", table.version(), table.len()),
        Err(e) => {
            error!("templates: {e}");
            ok = false;
        }
    }

    ok
}

fn print_usage() {
    println!(
        "preroll - film pre-production brief relay to a chat-completion provider

USAGE:
    preroll [OPTIONS]

OPTIONS:
    --config <PATH>     Path to config file (default: ~/.config/preroll/config.toml)
    --default-config    Print default config to stdout and exit
    --check             Validate config, then exit
    -h, --help          Print this help message

ENDPOINTS:
    POST /generate        Templated generation (alias: /api/generate)
    POST /assist          Free-form assistant
    ANY  /, /health       Liveness probe

ENVIRONMENT:
    GROQ_API_KEY          Required for generation. Provider API key.
    GROQ_MODEL            Model identifier (default: llama-3.1-8b-instant)
    GROQ_BASE_URL         OpenAI-compatible base URL (default: https://api.groq.com/openai/v1)
    GROQ_TEMPERATURE      Sampling temperature (default: 0.4)
    GROQ_MAX_TOKENS       Max output tokens (default: 1400)
    GROQ_TIMEOUT_SECS     Completion timeout, 0 = none (default: 60)
    MAX_PROMPT_CHARS      Max assembled prompt length (default: 3000)
    FRONTEND_ORIGINS      Comma-separated extra CORS origins
    PREROLL_BIND          Listen address (default: 127.0.0.1:8000)
    RUST_LOG              Optional. Tracing filter (default: info).
"
    );
}
