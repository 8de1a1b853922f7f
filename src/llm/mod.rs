pub mod gateway;
pub mod groq;

use crate::config::LlmConfig;
use crate::error::Result;

pub use gateway::CompletionGateway;
pub use groq::GroqProvider;

/// Sampling parameters for a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SamplingConfig {
    /// Sampling for structured (templated) generation.
    pub fn structured(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Sampling for the free-form assistant.
    pub fn assist(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.assist_temperature,
            max_tokens: config.assist_max_tokens,
        }
    }
}

// -- Provider trait ---------------------------------------------------------

/// A chat-completion backend.  The gateway talks to the upstream model only
/// through this trait, so tests can substitute an in-process fake.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Human-readable name of this provider (e.g. "Groq API").
    fn name(&self) -> &str;

    /// Send one system turn and one user turn; return the first choice's
    /// message text.
    async fn complete(&self, system: &str, user: &str, sampling: &SamplingConfig) -> Result<String>;
}
