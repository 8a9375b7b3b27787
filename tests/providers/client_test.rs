//! Retry behaviour of the completion client.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crm_narrator::providers::client::{ClientSettings, CompletionClient};
use crm_narrator::providers::offline::{OfflineProvider, OFFLINE_MODEL_ID, OFFLINE_PLACEHOLDER};
use crm_narrator::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, UsageStats,
};

/// Fails with `status` for the first `failures` calls, then echoes the
/// system prompt back.
struct FlakyProvider {
    calls: Arc<AtomicU32>,
    failures: u32,
    status: u16,
}

#[async_trait]
impl LlmProvider for FlakyProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let seen = self.calls.fetch_add(1, Ordering::SeqCst);
        if seen < self.failures {
            return Err(ProviderError::HttpStatus {
                status: self.status,
                body: "busy".to_owned(),
            });
        }
        Ok(CompletionResponse {
            text: request.system.unwrap_or_else(|| "<none>".to_owned()),
            usage: UsageStats::default(),
            model: "mock".to_owned(),
        })
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

fn settings(max_attempts: u32) -> ClientSettings {
    ClientSettings {
        max_attempts,
        backoff_base: Duration::from_millis(1),
        backoff_max: Duration::from_millis(2),
        ..ClientSettings::default()
    }
}

fn flaky_client(failures: u32, status: u16, max_attempts: u32) -> (CompletionClient, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let provider = FlakyProvider {
        calls: Arc::clone(&calls),
        failures,
        status,
    };
    (CompletionClient::new(Arc::new(provider), settings(max_attempts)), calls)
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let (client, calls) = flaky_client(2, 503, 3);
    let text = client.chat("시스템", "사용자").await.expect("third attempt succeeds");
    assert_eq!(text, "시스템");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_stop_at_max_attempts() {
    let (client, calls) = flaky_client(5, 429, 2);
    match client.chat("s", "u").await {
        Err(ProviderError::HttpStatus { status, .. }) => assert_eq!(status, 429),
        other => panic!("expected http status error, got: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (client, calls) = flaky_client(1, 400, 3);
    assert!(client.chat("s", "u").await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_system_prompt_is_omitted() {
    let (client, _) = flaky_client(0, 500, 1);
    let text = client.chat("", "u").await.expect("call succeeds");
    assert_eq!(text, "<none>");
}

#[test]
fn transient_classification() {
    let status = |status| ProviderError::HttpStatus {
        status,
        body: String::new(),
    };
    assert!(status(408).is_transient());
    assert!(status(429).is_transient());
    assert!(status(502).is_transient());
    assert!(!status(401).is_transient());
    assert!(!ProviderError::Parse("bad".to_owned()).is_transient());
    assert!(!ProviderError::Unavailable("no key".to_owned()).is_transient());
}

#[tokio::test]
async fn offline_provider_answers_with_placeholder() {
    let client = CompletionClient::new(Arc::new(OfflineProvider), ClientSettings::default());
    assert!(client.is_offline());
    assert_eq!(client.model_id(), OFFLINE_MODEL_ID);
    let text = client.chat("s", "u").await.expect("offline never fails");
    assert_eq!(text, OFFLINE_PLACEHOLDER);
}
