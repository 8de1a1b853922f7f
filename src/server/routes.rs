use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{any, post};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::compose::{PromptComposer, TemplateTable};
use crate::config::Config;
use crate::error::{PrerollError, Result};
use crate::llm::{CompletionGateway, CompletionProvider, GroqProvider, SamplingConfig};

use super::handlers;

/// State shared across all routes.  Everything in it is immutable after
/// startup.
#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<PromptComposer>,
    pub gateway: CompletionGateway,
    /// Sampling for templated generation.
    pub structured: SamplingConfig,
    /// Sampling for the free-form assistant.
    pub assist: SamplingConfig,
}

impl AppState {
    /// Build state from config.  A missing API key is not fatal: the
    /// service starts and reports the misconfiguration per request.
    pub fn from_config(config: &Config) -> Result<Self> {
        let templates = TemplateTable::by_version(&config.prompt.template_set)?;
        info!(
            template_set = templates.version(),
            templates = templates.len(),
            max_prompt_chars = config.prompt.max_prompt_chars,
            "prompt templates loaded"
        );

        let provider: Option<Arc<dyn CompletionProvider>> = match GroqProvider::new(&config.llm) {
            Ok(p) => Some(Arc::new(p)),
            Err(PrerollError::ProviderConfig) => {
                warn!("GROQ_API_KEY not set; generation requests will fail until it is configured");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Self::new(
            PromptComposer::new(templates, config.prompt.max_prompt_chars),
            CompletionGateway::new(provider, config.llm.timeout_secs),
            config,
        ))
    }

    pub fn new(composer: PromptComposer, gateway: CompletionGateway, config: &Config) -> Self {
        Self {
            composer: Arc::new(composer),
            gateway,
            structured: SamplingConfig::structured(&config.llm),
            assist: SamplingConfig::assist(&config.llm),
        }
    }
}

pub fn build(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", any(handlers::health))
        .route("/health", any(handlers::health))
        .route("/generate", post(handlers::generate))
        .route("/api/generate", post(handlers::generate))
        .route("/assist", post(handlers::assist))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    info!(origins = ?allowed_origins, "CORS origins configured");

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}
