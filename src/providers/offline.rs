//! Placeholder provider for offline/degraded mode.

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError, UsageStats};

/// Placeholder text returned for every request.
pub const OFFLINE_PLACEHOLDER: &str = "[OFFLINE] 언어 모델이 연결되지 않아 기본 문안으로 대체합니다.";

/// Model identifier reported by [`OfflineProvider`].
pub const OFFLINE_MODEL_ID: &str = "offline/placeholder";

/// Provider that never leaves the process and always answers with
/// [`OFFLINE_PLACEHOLDER`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

#[async_trait]
impl LlmProvider for OfflineProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        Ok(CompletionResponse {
            text: OFFLINE_PLACEHOLDER.to_owned(),
            usage: UsageStats::default(),
            model: OFFLINE_MODEL_ID.to_owned(),
        })
    }

    fn model_id(&self) -> &str {
        OFFLINE_MODEL_ID
    }

    fn is_offline(&self) -> bool {
        true
    }
}
