use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::compose::ComposedPrompt;
use crate::error::{PrerollError, Result};
use crate::llm::{CompletionProvider, SamplingConfig};

/// Issues exactly one completion call per composed prompt and maps the
/// outcome onto the service's error contract.
///
/// A gateway built without a provider reports `ProviderConfig` on every
/// call, before any network activity.
#[derive(Clone)]
pub struct CompletionGateway {
    provider: Option<Arc<dyn CompletionProvider>>,
    timeout: Option<Duration>,
}

impl CompletionGateway {
    /// `timeout_secs == 0` disables the per-call timeout.
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, timeout_secs: u64) -> Self {
        Self {
            provider,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    /// Name of the configured provider, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    /// Run the completion and return the trimmed output.  Empty output is
    /// reported as a provider failure, never as success.
    pub async fn generate(
        &self,
        prompt: &ComposedPrompt,
        sampling: &SamplingConfig,
    ) -> Result<String> {
        let provider = self.provider.as_ref().ok_or(PrerollError::ProviderConfig)?;

        debug!(
            provider = provider.name(),
            generation_type = %prompt.generation_type,
            prompt_chars = prompt.user_chars(),
            "dispatching completion"
        );

        let call = provider.complete(&prompt.system_instruction, &prompt.user_text, sampling);
        let raw = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                PrerollError::ProviderRequest(format!(
                    "completion request timed out after {}s",
                    limit.as_secs()
                ))
            })??,
            None => call.await?,
        };

        let output = raw.trim();
        if output.is_empty() {
            return Err(PrerollError::ProviderRequest(format!(
                "{} returned empty output",
                provider.name()
            )));
        }

        info!(
            generation_type = %prompt.generation_type,
            model = %sampling.model,
            response_len = output.len(),
            "completion received"
        );

        Ok(output.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::LlmConfig;

    /// In-process provider that records calls and replays a canned result.
    pub(crate) struct FakeProvider {
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<(String, String, SamplingConfig)>>,
        reply: std::result::Result<String, String>,
        delay: Option<Duration>,
    }

    impl FakeProvider {
        pub fn replying(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                reply: Ok(text.to_string()),
                delay: None,
            }
        }

        pub fn failing(msg: &str) -> Self {
            Self {
                reply: Err(msg.to_string()),
                ..Self::replying("")
            }
        }

        pub fn slow(text: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::replying(text)
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CompletionProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(
            &self,
            system: &str,
            user: &str,
            sampling: &SamplingConfig,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string(), sampling.clone()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().map_err(PrerollError::ProviderRequest)
        }
    }

    fn prompt() -> ComposedPrompt {
        ComposedPrompt {
            generation_type: "Sound Design".into(),
            system_instruction: "SYSTEM".into(),
            user_text: "USER".into(),
        }
    }

    fn sampling() -> SamplingConfig {
        SamplingConfig::structured(&LlmConfig::default())
    }

    #[tokio::test]
    async fn missing_provider_is_config_error() {
        let gateway = CompletionGateway::new(None, 0);
        assert!(gateway.provider_name().is_none());
        let err = gateway.generate(&prompt(), &sampling()).await.unwrap_err();
        assert!(matches!(err, PrerollError::ProviderConfig));
        assert_eq!(err.to_string(), "GROQ_API_KEY not configured.");
    }

    #[tokio::test]
    async fn passes_system_then_user_and_trims_output() {
        let fake = Arc::new(FakeProvider::replying(
            "\n  {\"generation_type\": \"Sound Design\"}  \n",
        ));
        let gateway = CompletionGateway::new(Some(fake.clone()), 0);

        let out = gateway.generate(&prompt(), &sampling()).await.unwrap();
        assert_eq!(out, "{\"generation_type\": \"Sound Design\"}");
        assert_eq!(fake.call_count(), 1);

        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen[0].0, "SYSTEM");
        assert_eq!(seen[0].1, "USER");
        assert_eq!(seen[0].2, sampling());
    }

    #[tokio::test]
    async fn whitespace_output_is_provider_error() {
        let gateway = CompletionGateway::new(Some(Arc::new(FakeProvider::replying("  \n "))), 0);
        let err = gateway.generate(&prompt(), &sampling()).await.unwrap_err();
        assert!(matches!(err, PrerollError::ProviderRequest(_)));
        assert!(err.to_string().contains("empty output"));
    }

    #[tokio::test]
    async fn provider_failure_is_not_retried() {
        let fake = Arc::new(FakeProvider::failing("invalid api key"));
        let gateway = CompletionGateway::new(Some(fake.clone()), 0);
        let err = gateway.generate(&prompt(), &sampling()).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid api key");
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let fake = Arc::new(FakeProvider::slow("late", Duration::from_secs(30)));
        let gateway = CompletionGateway::new(Some(fake), 1);
        let err = gateway.generate(&prompt(), &sampling()).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 1s"), "got: {err}");
    }

    #[test]
    fn provider_name_reports_backend() {
        let gateway = CompletionGateway::new(Some(Arc::new(FakeProvider::replying("x"))), 0);
        assert_eq!(gateway.provider_name(), Some("fake"));
        assert_eq!(CompletionGateway::new(None, 0).provider_name(), None);
    }
}
