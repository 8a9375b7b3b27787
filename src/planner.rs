//! Planner: the fixed four-slot outline plus persona context.
//!
//! The outline never varies; only the content generated per slot does. The
//! planner attaches the tone rules for the row's tone cluster, the persona
//! fields, the brand's must-include words and, when a model is available,
//! short context-expansion hints derived from a whitelist of persona fields.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::persona::PersonaRow;
use crate::data::rules::BrandRule;
use crate::data::tone::ToneMap;
use crate::providers::client::CompletionClient;

/// Persona fields the model may expand into context hints.
const EXPANDABLE_FIELDS: &[&str] = &[
    "preference",
    "shopping_pattern",
    "lifestyle",
    "skin_type",
    "skin_concern",
    "allergy_sensitivity",
    "texture_preference",
    "finish_preference",
    "scent_preference",
    "routine_step_count",
    "time_of_use",
    "seasonality",
    "environment_context",
    "price_sensitivity",
    "brand_loyalty",
    "repurchase_tendency",
    "shopping_channel",
    "review_dependency",
    "bundle_preference",
    "ingredient_avoid_list",
    "ethical_preference",
    "treatment_status",
    "message_tone_preference",
    "message_length_preference",
    "cta_style",
];

/// Hint expansion prompt. The model returns short phrases, never copy.
const HINT_PROMPT: &str = "\
다음 페르소나 정보를 바탕으로, 문장에서 활용할 수 있는 '상황·맥락 확장 힌트'만 정리하세요.

[절대 규칙]
- 마케팅 문구 작성 금지
- 완성된 문장 작성 금지
- 추천, 평가, 비교, 판단 표현 금지
- 감정 과장 금지
- 짧은 구(phrase) 형태로만, 한 줄에 하나씩 '- '로 시작
- 원문 값을 바꾸거나 대체하지 말 것

[출력 예시]
- 아침 출근 전 짧은 준비 시간
- 실내 냉난방이 반복되는 환경
- 업무 중 잦은 마스크 착용";

/// One of the four structural body slots, in outline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotTag {
    /// Lifestyle and environment context.
    Context,
    /// Skin concern linked to the product.
    Offer,
    /// Routine, time of day and usage flow.
    Usage,
    /// Soft repurchase nudge and close.
    Close,
}

impl SlotTag {
    /// The outline every plan carries.
    pub const OUTLINE: [SlotTag; 4] = [Self::Context, Self::Offer, Self::Usage, Self::Close];

    /// Slot description used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Context => "라이프스타일과 환경 맥락",
            Self::Offer => "피부 고민과 제품 연결",
            Self::Usage => "루틴/시간대/사용 흐름",
            Self::Close => "구매 텀 완곡 + 부드러운 마무리",
        }
    }
}

/// Why a plan cannot be generated from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The outline is empty.
    #[error("plan has no slot outline")]
    MissingOutline,
    /// The outline is not the four fixed slots in order.
    #[error("plan outline is malformed: expected 4 ordered slots, found {0}")]
    MalformedOutline(usize),
}

/// The immutable planning artifact for one persona row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePlan {
    /// Slot tags in body order.
    pub outline: Vec<SlotTag>,
    /// Tone description for the row's tone cluster; empty when unknown.
    pub tone_rules: String,
    /// Every populated persona attribute.
    pub persona_fields: BTreeMap<String, String>,
    /// Words or concepts the brand requires.
    pub brand_must_include: Vec<String>,
    /// Model-derived context phrases; empty offline or on failure.
    pub expansion_hints: String,
}

impl MessagePlan {
    /// A plan with the fixed outline and no enrichment.
    pub fn basic(row: &PersonaRow, rule: &BrandRule) -> Self {
        Self {
            outline: SlotTag::OUTLINE.to_vec(),
            tone_rules: String::new(),
            persona_fields: row.fields(),
            brand_must_include: rule.must_include.clone(),
            expansion_hints: String::new(),
        }
    }

    /// Check the outline precondition.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the outline is empty or not the four
    /// fixed slots in order.
    pub fn check(&self) -> Result<(), PlanError> {
        if self.outline.is_empty() {
            return Err(PlanError::MissingOutline);
        }
        if self.outline.as_slice() != SlotTag::OUTLINE.as_slice() {
            return Err(PlanError::MalformedOutline(self.outline.len()));
        }
        Ok(())
    }
}

/// Builds a [`MessagePlan`] per persona row.
#[derive(Debug)]
pub struct Planner {
    client: Arc<CompletionClient>,
    tone_map: ToneMap,
    expand_hints: bool,
}

impl Planner {
    /// Planner over `tone_map`. Hint expansion runs only when `expand_hints`
    /// is set and the client is backed by a real model.
    pub fn new(client: Arc<CompletionClient>, tone_map: ToneMap, expand_hints: bool) -> Self {
        Self {
            client,
            tone_map,
            expand_hints,
        }
    }

    /// Plan one row.
    pub async fn plan(&self, row: &PersonaRow, rule: &BrandRule) -> MessagePlan {
        let mut plan = MessagePlan::basic(row, rule);
        plan.tone_rules = row
            .brand_tone_cluster
            .as_deref()
            .and_then(|key| self.tone_map.get(key))
            .unwrap_or_default()
            .to_owned();

        if self.expand_hints && !self.client.is_offline() {
            plan.expansion_hints = self.expansion_hints(row).await;
        }
        debug!(
            persona_id = %row.persona_id,
            tone = !plan.tone_rules.is_empty(),
            hints = !plan.expansion_hints.is_empty(),
            "plan built"
        );
        plan
    }

    async fn expansion_hints(&self, row: &PersonaRow) -> String {
        let context: Vec<String> = EXPANDABLE_FIELDS
            .iter()
            .filter_map(|k| row.field(k).map(|v| format!("- {k}: {v}")))
            .collect();
        if context.is_empty() {
            return String::new();
        }
        let prompt = format!("{HINT_PROMPT}\n\n[입력 페르소나 맥락]\n{}", context.join("\n"));
        match self.client.chat("", &prompt).await {
            Ok(text) => text.trim().to_owned(),
            Err(e) => {
                warn!(persona_id = %row.persona_id, error = %e, "hint expansion failed, continuing without hints");
                String::new()
            }
        }
    }
}
