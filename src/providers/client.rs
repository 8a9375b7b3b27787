//! Retrying completion client shared by every pipeline stage.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{CompletionRequest, LlmProvider, Message, ProviderError};

/// Retry and sampling settings for [`CompletionClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Total attempts per call, including the first (minimum 1).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt.
    pub backoff_base: Duration,
    /// Upper bound on a single backoff delay.
    pub backoff_max: Duration,
    /// Maximum completion tokens per call.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1500),
            backoff_max: Duration::from_secs(30),
            max_tokens: Some(1024),
            temperature: Some(0.7),
        }
    }
}

/// A provider wrapped with retry-with-backoff for transient failures.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn LlmProvider>,
    settings: ClientSettings,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("model", &self.provider.model_id())
            .field("settings", &self.settings)
            .finish()
    }
}

impl CompletionClient {
    /// Wrap `provider` with the given settings.
    pub fn new(provider: Arc<dyn LlmProvider>, settings: ClientSettings) -> Self {
        Self { provider, settings }
    }

    /// Whether the underlying provider is the offline placeholder.
    pub fn is_offline(&self) -> bool {
        self.provider.is_offline()
    }

    /// Model identifier of the underlying provider.
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Send one system + user exchange and return the completion text.
    ///
    /// # Errors
    ///
    /// Returns the last [`ProviderError`] once retries are exhausted, or the
    /// first non-transient error immediately.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let request = CompletionRequest {
            messages: vec![Message::user(user)],
            system: (!system.is_empty()).then(|| system.to_owned()),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        self.complete_text(request).await
    }

    /// Send `request` with retry and return the completion text.
    ///
    /// # Errors
    ///
    /// Returns the last [`ProviderError`] once retries are exhausted, or the
    /// first non-transient error immediately.
    pub async fn complete_text(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut delay = self.settings.backoff_base;
        let mut attempt: u32 = 1;

        loop {
            match self.provider.complete(request.clone()).await {
                Ok(response) => {
                    debug!(
                        model = %response.model,
                        attempt,
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "completion received"
                    );
                    return Ok(response.text);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "transient completion failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2).min(self.settings.backoff_max);
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => {
                    warn!(error = %e, attempt, "completion failed");
                    return Err(e);
                }
            }
        }
    }
}
