//! Shared persona, rule and message fixtures.

#![allow(dead_code)]

use crm_narrator::data::catalog::{CatalogStore, Product, SelectedProduct};
use crm_narrator::data::persona::PersonaRow;
use crm_narrator::data::rules::{BrandRule, RuleStore};

pub const BRAND: &str = "라네즈";
pub const PRODUCT: &str = "워터뱅크 블루 히알루로닉 크림 50ml";

pub const TITLE: &str = "✨ 바쁜 아침 건조함엔 라네즈 워터뱅크 크림으로 촉촉하게 💧";

/// A four-paragraph body that satisfies every check for [`row`] and [`rule`].
pub const PARAGRAPHS: [&str; 4] = [
    "바쁜 아침마다 출근 준비에 쫓기다 보면 건조한 피부가 하루 종일 당기는 느낌이 들곤 하죠. 사무실 냉난방 바람까지 더해지면 오후엔 화장이 들뜨기 쉬워요.",
    "이럴 때 라네즈 워터뱅크 블루 히알루로닉 크림으로 건조함을 달래 보세요. 가볍게 스며드는 제형이라 바쁜 아침에도 부담 없이 촉촉함이 오래 머물러요.",
    "세안 후 토너로 결을 정돈하고 크림을 얇게 펴 바르면 아침 준비가 금방 끝나요. 끈적임 없이 마무리돼 메이크업 전 단계로도 잘 어울려요.",
    "다 써 갈 즈음 미리 하나 챙겨 두면 촉촉한 아침 루틴이 끊기지 않고 이어져요. 내일 아침부터 가볍게 시작해 보시겠어요? 💧",
];

/// The validated body: one slot per line.
pub fn body() -> String {
    PARAGRAPHS.join("\n")
}

/// What a well-behaved model returns: paragraphs separated by blank lines.
pub fn completion() -> String {
    PARAGRAPHS.join("\n\n")
}

/// [`body`] with every brand mention removed.
pub fn body_without_brand() -> String {
    body().replace("라네즈 ", "")
}

pub fn row() -> PersonaRow {
    let record = [
        ("persona_id", "persona_1"),
        ("brand", BRAND),
        ("score", "0.9"),
        ("part_id", "p-1"),
        ("skin_concern", "건조"),
        ("lifestyle", "바쁜 아침 출근"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();
    PersonaRow::from_record(record)
}

pub fn product() -> Product {
    Product::new(PRODUCT, BRAND).with_similarity(0.8, 0.5, 0.4)
}

/// [`row`] with the fixture product resolved.
pub fn row_with_product() -> PersonaRow {
    let mut row = row();
    row.product = Some(SelectedProduct {
        product: product(),
        score: 1.0,
        brand_fallback: false,
    });
    row
}

pub fn rule() -> BrandRule {
    BrandRule {
        brand: BRAND.to_owned(),
        opening: "상황 공감으로 시작".to_owned(),
        banned: vec!["저렴".to_owned()],
        must_include: vec!["사용감".to_owned()],
        avoid: vec!["최저가".to_owned()],
        ..BrandRule::default()
    }
}

pub fn rules() -> RuleStore {
    std::iter::once(rule()).collect()
}

pub fn catalog() -> CatalogStore {
    CatalogStore::from_products(vec![product()])
}
