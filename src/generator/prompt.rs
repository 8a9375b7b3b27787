//! Prompt text for body, title and length-insert calls.

use std::fmt::Write as _;

use super::hints::{Literals, PersonaHints};
use crate::data::rules::BrandRule;
use crate::phrases::PhraseBook;
use crate::planner::MessagePlan;
use crate::validator::{tags, ErrorKind, LengthBands};

/// System prompt for body generation.
const BODY_SYSTEM: &str = "\
당신은 화장품 브랜드의 CRM 메시지 카피라이터입니다.
고객 한 명에게 보내는 개인화 메시지 본문을 해요체로 작성합니다.

[구조]
- 본문은 정확히 4개 문단이며, 문단 사이는 빈 줄 하나로 구분합니다.
- 1문단: 라이프스타일과 환경 맥락 속에서 피부 고민을 자연스럽게 꺼냅니다.
- 2문단: 연결어(이럴 때, 그래서, 그럴 땐 등)로 시작해 브랜드와 제품을 피부 고민에 연결합니다.
- 3문단: 루틴, 사용 시간대, 사용 흐름을 구체적으로 보여줍니다.
- 4문단: 구매 주기를 완곡하게 짚고 부드럽게 마무리합니다.

[문장부호]
- 1문단: 느낌표 금지, 물음표는 최대 1개, 이모지 금지
- 2·3문단: 물음표 금지, 느낌표는 최대 2개, 이모지 금지
- 4문단: 느낌표 최대 1개, 이모지 최대 1개, 물음표는 행동을 권하는 질문에만

[금지]
- 링크, URL, 마크다운 문법
- 'TITLE:', 'BODY:', '슬롯' 같은 라벨
- 브랜드를 두 개 붙여 쓰는 표현(예: 프리메라 메이크온)
- 문제를 되묻는 질문(예: 힘들진 않나요?)
- 아래 금지 표현 목록의 모든 문구";

/// System prompt for title generation.
const TITLE_SYSTEM: &str = "제목만 한 줄로 작성하세요. 설명이나 라벨은 붙이지 마세요.";

/// System prompt for the one-sentence length insert.
const INSERT_SYSTEM: &str = "\
당신은 CRM 메시지 편집자입니다.
주어진 본문의 4줄 구조를 그대로 유지하면서, 길이를 맞추기 위한 문장 하나만 추가합니다.

[규칙]
- 정확히 한 문장만 추가하고 기존 문장은 고치지 않습니다.
- 본문에 없는 새로운 사실, 수치, 효능을 만들지 않습니다.
- 질문형 문장, 느낌표, 이모지, 링크를 쓰지 않습니다.
- 결과는 4줄 본문 전체만 출력합니다.";

/// The body system prompt with the banned list appended.
pub fn body_system(phrases: &PhraseBook) -> String {
    let mut out = BODY_SYSTEM.to_owned();
    out.push_str("\n\n[금지 표현 목록]\n");
    for phrase in phrases.banned_phrases() {
        let _ = writeln!(out, "- {phrase}");
    }
    out
}

/// The title system prompt.
pub fn title_system() -> &'static str {
    TITLE_SYSTEM
}

/// The length-insert system prompt.
pub fn insert_system() -> &'static str {
    INSERT_SYSTEM
}

/// User prompt for one body generation attempt.
///
/// `repair` carries the previous attempt's failures; each one maps to a
/// concrete correction (tags without one are skipped).
pub fn body_prompt(
    plan: &MessagePlan,
    rule: &BrandRule,
    lit: &Literals,
    hints: &PersonaHints,
    bands: &LengthBands,
    repair: Option<&[ErrorKind]>,
) -> String {
    let mut out = String::new();

    out.push_str("[페르소나 맥락]\n");
    for (key, value) in &plan.persona_fields {
        let _ = writeln!(out, "- {key}: {value}");
    }
    if let Some(env) = &hints.environment {
        let _ = writeln!(out, "- 환경 표현: {env}");
    }

    out.push_str("\n[필수 표기]\n");
    let _ = writeln!(out, "- 브랜드: {}", lit.brand);
    if let Some(product) = &lit.product {
        let _ = writeln!(out, "- 제품: {product}");
    }
    let _ = writeln!(out, "- 피부 고민: {}", lit.concern_or_default());

    out.push_str("\n[문단 구성]\n");
    for (i, tag) in plan.outline.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i.saturating_add(1), tag.label());
    }

    if !plan.tone_rules.is_empty() {
        let _ = write!(out, "\n[톤]\n{}\n", plan.tone_rules);
    }
    let notes = rule.tone_notes();
    if !notes.is_empty() {
        out.push_str("\n[브랜드 규칙]\n");
        for (label, note) in notes {
            let _ = writeln!(out, "- {label}: {note}");
        }
    }
    if !plan.brand_must_include.is_empty() {
        let _ = writeln!(
            out,
            "\n[반드시 담을 개념]\n- {}",
            plan.brand_must_include.join(", ")
        );
    }
    let mut never: Vec<&str> = rule.banned.iter().map(String::as_str).collect();
    never.extend(rule.avoid.iter().map(String::as_str));
    if !never.is_empty() {
        let _ = writeln!(out, "\n[쓰지 말 것]\n- {}", never.join(", "));
    }
    if !plan.expansion_hints.is_empty() {
        let _ = write!(out, "\n[상황 힌트]\n{}\n", plan.expansion_hints);
    }

    let _ = write!(
        out,
        "\n[길이]\n- 본문 전체 {}~{}자 (줄바꿈 포함)\n",
        bands.body_min, bands.body_max
    );

    if let Some(errors) = repair.filter(|e| !e.is_empty()) {
        out.push_str("\n[이전 결과 수정 사항]\n");
        let _ = writeln!(out, "- 이전 오류: {}", tags(errors).join(", "));
        for fix in errors.iter().filter_map(|e| repair_instruction(e, bands)) {
            let _ = writeln!(out, "- {fix}");
        }
    }

    out.push_str("\n본문 4문단만 출력하세요.");
    out
}

/// A correction instruction for one validation failure.
///
/// Returns `None` for failures the model cannot fix by rewriting.
pub fn repair_instruction(error: &ErrorKind, bands: &LengthBands) -> Option<String> {
    let text = match error {
        ErrorKind::TitleEmpty | ErrorKind::TitleTooShort { .. } | ErrorKind::TitleTooLong { .. } => {
            format!("제목은 {}~{}자로 맞춰 주세요.", bands.title_min, bands.title_max)
        }
        ErrorKind::TitleEmoji => "제목의 맨 앞과 맨 뒤에 이모지를 하나씩 넣어 주세요.".to_owned(),
        ErrorKind::BodyTooShort { min } => {
            format!("본문이 짧아요. 문단마다 구체적인 장면을 더해 {min}자 이상으로 늘려 주세요.")
        }
        ErrorKind::BodyTooLong { max } => {
            format!("본문이 길어요. 반복되는 설명을 줄여 {max}자 이하로 맞춰 주세요.")
        }
        ErrorKind::TooFewSlots | ErrorKind::TooManySlots => {
            "본문을 빈 줄로 구분된 정확히 4개 문단으로 작성해 주세요.".to_owned()
        }
        ErrorKind::Slot1Invalid => "1문단에 고객의 생활 습관이나 환경, 계절, 사용 시간대를 담아 주세요.".to_owned(),
        ErrorKind::Slot2Invalid => {
            "2문단에 제품명과 함께 피부 고민이나 선호하는 제형·마무리감·향을 적어 주세요.".to_owned()
        }
        ErrorKind::Slot3RoutineMissing => {
            "3문단에 아침·저녁 루틴이나 매일 이어지는 사용 흐름을 적어 주세요.".to_owned()
        }
        ErrorKind::Slot4Invalid => {
            "4문단 마무리에 구매 채널이나 재구매 시점, 가격 감각에 맞는 부드러운 제안을 담아 주세요.".to_owned()
        }
        ErrorKind::BrandMissing => "브랜드명을 본문에 그대로 한 번 이상 적어 주세요.".to_owned(),
        ErrorKind::BrandHybrid => "다른 브랜드명을 붙여 쓰지 말고 하나의 브랜드만 적어 주세요.".to_owned(),
        ErrorKind::ProductMissing => "제품명을 2문단에 그대로 적어 주세요.".to_owned(),
        ErrorKind::SkinConcernMissing => "피부 고민을 1문단에 직접 언급해 주세요.".to_owned(),
        ErrorKind::MetaPhrase(p) => format!("'{p}' 같은 표현은 빼 주세요."),
        ErrorKind::MarkdownLink => "링크나 마크다운 문법을 쓰지 말아 주세요.".to_owned(),
        ErrorKind::DuplicateSentence => "같은 내용을 반복하지 말고 문단마다 다른 이야기를 해 주세요.".to_owned(),
        ErrorKind::RuleBanned(w) => format!("'{w}'는 쓰면 안 되는 단어예요. 빼 주세요."),
        ErrorKind::RuleAvoid(w) => format!("'{w}' 표현은 피해 주세요."),
        ErrorKind::RuleMustInclude(w) => format!("'{w}'의 의미가 본문에 드러나게 해 주세요."),
        ErrorKind::PlanMissing | ErrorKind::GenerationFailed => return None,
    };
    Some(text)
}

/// User prompt for the title call.
pub fn title_prompt(body: &str, lit: &Literals, bands: &LengthBands) -> String {
    let product = lit.product.as_deref().unwrap_or_default();
    format!(
        "아래 본문에 어울리는 메시지 제목을 작성하세요.\n\
         - {}~{}자, 해요체\n\
         - 맨 앞과 맨 뒤에 이모지를 1~2개 사용\n\
         - 브랜드 '{}' 또는 제품 '{product}'을 자연스럽게 포함\n\
         - 물음표, 링크, 라벨 금지\n\n\
         [본문]\n{body}",
        bands.title_min, bands.title_max, lit.brand
    )
}

/// User prompt asking for one extra sentence of `needed` characters or so.
pub fn insert_prompt(body: &str, needed: usize) -> String {
    format!(
        "본문이 {needed}자 정도 부족합니다. 흐름이 자연스러운 위치에 문장 하나만 추가하세요.\n\n[본문]\n{body}"
    )
}
