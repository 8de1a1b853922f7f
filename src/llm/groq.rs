use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{PrerollError, Result};
use crate::llm::{CompletionProvider, SamplingConfig};

/// Completion provider backed by Groq's OpenAI-compatible chat completions
/// endpoint.  Any API speaking the same protocol works by pointing
/// `base_url` at it.
pub struct GroqProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

// -- OpenAI-compatible request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GroqProvider {
    /// Build a provider from config.  Fails with `ProviderConfig` when no
    /// API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or(PrerollError::ProviderConfig)?.to_string();

        let client = Client::builder()
            .build()
            .map_err(|e| PrerollError::Config(format!("failed to create HTTP client: {e}")))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();

        info!(
            base_url = %base_url,
            model = %config.model,
            "Groq provider initialized"
        );

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[async_trait::async_trait]
impl CompletionProvider for GroqProvider {
    fn name(&self) -> &str {
        "Groq API"
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: &SamplingConfig,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &sampling.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };

        debug!(
            model = %sampling.model,
            prompt_chars = user.chars().count(),
            max_tokens = sampling.max_tokens,
            "invoking Groq API"
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PrerollError::ProviderRequest(format!("Groq request failed: {e}")))?;

        let status = resp.status();

        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            let error_msg = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(err_resp) => err_resp
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| error_text.clone()),
                Err(_) => error_text,
            };

            warn!(status = %status, error = %error_msg, "Groq API error");

            return Err(PrerollError::ProviderRequest(format!(
                "Groq API returned {status}: {error_msg}"
            )));
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| {
            PrerollError::ProviderRequest(format!("failed to parse Groq response: {e}"))
        })?;

        if let Some(ref usage) = chat_resp.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Groq usage"
            );
        }

        let choice = chat_resp.choices.into_iter().next().ok_or_else(|| {
            PrerollError::ProviderRequest("Groq returned no completion choices".into())
        })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
