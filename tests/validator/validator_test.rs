//! Message checklist behaviour.

use std::sync::Arc;

use crm_narrator::data::catalog::{Product, SelectedProduct};
use crm_narrator::data::rules::BrandRule;
use crm_narrator::phrases::PhraseBook;
use crm_narrator::validator::{tags, ErrorKind, SkinConcernMode, Validator, ValidatorSettings};

use crate::fixture::{body, body_without_brand, row, row_with_product, rule, PARAGRAPHS, TITLE};

fn validator() -> Validator {
    Validator::new(ValidatorSettings::default(), Arc::new(PhraseBook::standard()))
}

#[test]
fn fixture_message_is_valid() {
    let errors = validator().validate(&row_with_product(), TITLE, &body(), &rule());
    assert!(errors.is_empty(), "unexpected errors: {:?}", tags(&errors));
}

#[test]
fn brand_absent_from_title_and_body_is_missing() {
    let title = "✨ 바쁜 아침 건조함엔 워터뱅크 크림으로 촉촉하게 💧";
    let errors = validator().validate(&row_with_product(), title, &body_without_brand(), &rule());
    assert_eq!(errors, vec![ErrorKind::BrandMissing]);
}

#[test]
fn brand_in_title_alone_is_enough() {
    let errors = validator().validate(&row_with_product(), TITLE, &body_without_brand(), &rule());
    assert!(errors.is_empty(), "unexpected errors: {:?}", tags(&errors));
}

#[test]
fn short_three_line_body_fails_length_and_slots() {
    let short = PARAGRAPHS[..3].join("\n");
    let errors = validator().validate(&row_with_product(), TITLE, &short, &rule());
    assert!(errors.contains(&ErrorKind::BodyTooShort { min: 300 }));
    assert!(errors.contains(&ErrorKind::TooFewSlots));
}

#[test]
fn five_lines_are_too_many_slots() {
    let long = format!("{}\n좋은 하루 보내요.", body());
    let errors = validator().validate(&row_with_product(), TITLE, &long, &rule());
    assert!(errors.contains(&ErrorKind::TooManySlots));
}

#[test]
fn title_without_emoji_and_too_short() {
    let errors = validator().validate(&row_with_product(), "라네즈 크림", &body(), &rule());
    assert_eq!(
        tags(&errors),
        vec!["title_len<25".to_owned(), "title_emoji".to_owned()]
    );
}

#[test]
fn empty_title_reports_only_title_empty() {
    let errors = validator().validate(&row_with_product(), "  ", &body(), &rule());
    assert_eq!(errors, vec![ErrorKind::TitleEmpty]);
}

#[test]
fn other_product_is_missing() {
    let mut row = row_with_product();
    row.product = Some(SelectedProduct {
        product: Product::new("슬리핑 마스크", "라네즈"),
        score: 1.0,
        brand_fallback: false,
    });
    let errors = validator().validate(&row, TITLE, &body(), &rule());
    assert_eq!(errors, vec![ErrorKind::ProductMissing, ErrorKind::Slot2Invalid]);
}

#[test]
fn product_check_skipped_without_product() {
    let errors = validator().validate(&row(), TITLE, &body(), &rule());
    assert!(errors.is_empty(), "unexpected errors: {:?}", tags(&errors));
}

#[test]
fn unmentioned_concern_depends_on_mode() {
    let mut row = row_with_product();
    row.skin_concern = Some("모공".to_owned());

    let strict = validator().validate(&row, TITLE, &body(), &rule());
    assert_eq!(strict, vec![ErrorKind::SkinConcernMissing, ErrorKind::Slot2Invalid]);

    let lenient = Validator::new(
        ValidatorSettings {
            skin_concern: SkinConcernMode::Lenient,
            ..ValidatorSettings::default()
        },
        Arc::new(PhraseBook::standard()),
    );
    assert!(lenient.validate(&row, TITLE, &body(), &rule()).is_empty());
}

#[test]
fn opening_line_must_carry_lifestyle_context() {
    let mut row = row_with_product();
    row.lifestyle = Some("야근 많은 직장인".to_owned());
    row.seasonality = Some("겨울".to_owned());
    let errors = validator().validate(&row, TITLE, &body(), &rule());
    assert_eq!(errors, vec![ErrorKind::Slot1Invalid]);

    row.seasonality = Some("사무실".to_owned());
    assert!(validator().validate(&row, TITLE, &body(), &rule()).is_empty(), "any one field is enough");
}

#[test]
fn offer_line_needs_product_and_an_attribute() {
    // Product and concern only in the closing line.
    let moved = [
        PARAGRAPHS[0],
        "이럴 때 가볍게 스며드는 제형이 바쁜 아침에도 부담 없이 촉촉함을 오래 남겨 줘요. 끈적임 없이 산뜻하게 마무리되는 사용감이 좋아요.",
        PARAGRAPHS[2],
        "건조함이 느껴질 때 라네즈 워터뱅크 블루 히알루로닉 크림을 미리 챙겨 두면 촉촉한 아침 루틴이 이어져요. 내일 아침부터 시작해 보시겠어요? 💧",
    ]
    .join("\n");
    let errors = validator().validate(&row_with_product(), TITLE, &moved, &rule());
    assert_eq!(errors, vec![ErrorKind::Slot2Invalid]);
}

#[test]
fn texture_preference_satisfies_the_offer_line() {
    let mut row = row_with_product();
    row.skin_concern = None;
    row.texture_preference = Some("가벼운 제형".to_owned());
    assert!(validator().validate(&row, TITLE, &body(), &rule()).is_empty());

    row.texture_preference = Some("리치 밤".to_owned());
    let errors = validator().validate(&row, TITLE, &body(), &rule());
    assert_eq!(errors, vec![ErrorKind::Slot2Invalid]);
}

#[test]
fn usage_line_without_routine_words_is_flagged() {
    let text = body().replace(PARAGRAPHS[2], "세안 후 토너로 결을 정돈하고 크림을 얇게 펴 바르면 준비가 금방 끝나요. 끈적임 없이 마무리돼 메이크업 전 단계로도 잘 어울려요.");
    let errors = validator().validate(&row_with_product(), TITLE, &text, &rule());
    assert_eq!(errors, vec![ErrorKind::Slot3RoutineMissing]);
}

#[test]
fn closing_line_is_judged_only_when_preferences_exist() {
    let mut row = row_with_product();
    row.shopping_channel = Some("온라인몰".to_owned());
    row.cta_style = Some("부드러운 제안".to_owned());
    let errors = validator().validate(&row, TITLE, &body(), &rule());
    assert_eq!(errors, vec![ErrorKind::Slot4Invalid]);

    row.repurchase_tendency = Some("다 쓰기 전 미리 재구매".to_owned());
    assert!(validator().validate(&row, TITLE, &body(), &rule()).is_empty());
}

#[test]
fn slot_checks_wait_for_four_lines() {
    let short = PARAGRAPHS[..3].join("\n");
    let errors = validator().validate(&row_with_product(), TITLE, &short, &rule());
    assert!(!errors.contains(&ErrorKind::Slot3RoutineMissing));
    assert!(!errors.contains(&ErrorKind::Slot2Invalid));
}

#[test]
fn rule_banned_and_avoid_words_are_reported() {
    let text = body().replace("금방 끝나요.", "금방 끝나요. 저렴한 최저가 혜택도 있어요.");
    let errors = validator().validate(&row_with_product(), TITLE, &text, &rule());
    assert_eq!(
        errors,
        vec![
            ErrorKind::RuleBanned("저렴".to_owned()),
            ErrorKind::RuleAvoid("최저가".to_owned()),
        ]
    );
}

#[test]
fn must_include_accepts_equivalent_words_only() {
    // "사용감" is conveyed by "제형" and "촉촉" in the fixture body.
    assert!(validator().validate(&row_with_product(), TITLE, &body(), &rule()).is_empty());

    let strict_rule = BrandRule {
        must_include: vec!["비건 인증".to_owned()],
        ..rule()
    };
    let errors = validator().validate(&row_with_product(), TITLE, &body(), &strict_rule);
    assert_eq!(errors, vec![ErrorKind::RuleMustInclude("비건 인증".to_owned())]);
}

#[test]
fn meta_phrases_and_markdown_links_are_rejected() {
    let text = body().replace(
        "시작해 보시겠어요? 💧",
        "시작해 보시겠어요? [자세히 보기](https://example.com) 💧",
    );
    let errors = validator().validate(&row_with_product(), TITLE, &text, &rule());
    assert!(errors.contains(&ErrorKind::MetaPhrase("자세히 보기".to_owned())));
    assert!(errors.contains(&ErrorKind::MarkdownLink));
}

#[test]
fn neighbouring_brand_names_are_hybrid() {
    let text = body().replace("이럴 때 라네즈", "이럴 때 라네즈 프리메라");
    let errors = validator().validate(&row_with_product(), TITLE, &text, &rule());
    assert!(errors.contains(&ErrorKind::BrandHybrid));
}

#[test]
fn repeated_line_is_a_duplicate() {
    let text = [PARAGRAPHS[0], PARAGRAPHS[1], PARAGRAPHS[1], PARAGRAPHS[3]].join("\n");
    let errors = validator().validate(&row_with_product(), TITLE, &text, &rule());
    assert!(errors.contains(&ErrorKind::DuplicateSentence));
}

#[test]
fn validation_is_pure() {
    let v = validator();
    let first = v.validate(&row_with_product(), "제목", "본문", &rule());
    let second = v.validate(&row_with_product(), "제목", "본문", &rule());
    assert_eq!(first, second);
    assert!(!first.is_empty());
}
