//! Whole-run behaviour: product resolution, planning, records and report.

use std::sync::Arc;

use crm_narrator::data::catalog::CatalogStore;
use crm_narrator::data::rules::{BrandRule, RuleStore};
use crm_narrator::data::scoring::ProductSelector;
use crm_narrator::data::tone::ToneMap;
use crm_narrator::generator::{GeneratedMessage, Generator};
use crm_narrator::phrases::PhraseBook;
use crm_narrator::pipeline::{Outcome, Pipeline, RunReport};
use crm_narrator::planner::Planner;
use crm_narrator::validator::{ErrorKind, LengthBands, Validator, ValidatorSettings};

use crate::fixture::{body, body_without_brand, catalog, completion, row, rule, rules, PRODUCT, TITLE};
use crate::scripted::{client, CallKind, ScriptedProvider};

fn strict_rules() -> RuleStore {
    std::iter::once(BrandRule {
        must_include: vec!["비건 인증".to_owned()],
        ..rule()
    })
    .collect()
}

fn pipeline(provider: &Arc<ScriptedProvider>, catalog: CatalogStore) -> Pipeline {
    build(provider, catalog, rules())
}

fn pipeline_with_rules(provider: &Arc<ScriptedProvider>, rules: RuleStore) -> Pipeline {
    build(provider, catalog(), rules)
}

fn build(provider: &Arc<ScriptedProvider>, catalog: CatalogStore, rules: RuleStore) -> Pipeline {
    let client = client(Arc::clone(provider));
    let phrases = Arc::new(PhraseBook::standard());
    let generator = Generator::new(Arc::clone(&client), Arc::clone(&phrases), LengthBands::default());
    Pipeline::new(
        Arc::new(generator),
        Planner::new(client, ToneMap::default(), true),
        Validator::new(ValidatorSettings::default(), phrases),
        rules,
        catalog,
        ProductSelector::best(),
        2,
    )
}

#[tokio::test]
async fn valid_row_is_generated_in_one_attempt() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![Some(completion())])
            .with_title(TITLE)
            .with_hints("- 출근 준비로 바쁜 아침"),
    );
    let records = pipeline(&provider, catalog()).run(vec![row()]).await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.outcome, Outcome::Valid);
    assert_eq!(record.attempts, 1);
    assert!(record.errors.is_empty());
    assert_eq!(record.product.as_deref(), Some(PRODUCT));
    assert_eq!(record.part_id.as_deref(), Some("p-1"));
    let expected = GeneratedMessage {
        title: TITLE.to_owned(),
        body: body(),
    };
    assert_eq!(record.message, expected.to_wire());
    assert_eq!(
        record.plan.as_ref().map(|p| p.expansion_hints.as_str()),
        Some("- 출근 준비로 바쁜 아침")
    );
    assert_eq!(provider.count(CallKind::Hints), 1);
    assert_eq!(provider.count(CallKind::Body), 1);
}

#[tokio::test]
async fn rule_violation_is_repaired_on_the_next_attempt() {
    let cheap = completion().replace("금방 끝나요.", "금방 끝나요. 저렴한 가격도 좋아요.");
    let provider = Arc::new(
        ScriptedProvider::new(vec![Some(cheap), Some(completion())])
            .with_title(TITLE)
            .with_hints("힌트"),
    );
    let records = pipeline(&provider, catalog()).run(vec![row()]).await;
    let record = &records[0];

    assert_eq!(record.outcome, Outcome::Valid);
    assert_eq!(record.attempts, 2);
    assert!(record.errors.is_empty());
    assert!(!record.message.contains("저렴"));

    let body_prompts: Vec<String> = provider
        .calls()
        .into_iter()
        .filter(|(k, _)| *k == CallKind::Body)
        .map(|(_, prompt)| prompt)
        .collect();
    assert_eq!(body_prompts.len(), 2);
    assert!(!body_prompts[0].contains("수정 사항"));
    assert!(body_prompts[1].contains("'저렴'는 쓰면 안 되는 단어예요"));
    assert!(body_prompts[1].contains("이전 오류: rule_banned:저렴"));
}

#[tokio::test]
async fn missing_brand_is_injected_before_validation() {
    let brandless_title = "✨ 바쁜 아침 건조함엔 워터뱅크 크림으로 촉촉하게 💧";
    let provider = Arc::new(
        ScriptedProvider::new(vec![Some(body_without_brand().replace('\n', "\n\n"))])
            .with_title(brandless_title)
            .with_hints("힌트"),
    );
    let records = pipeline(&provider, catalog()).run(vec![row()]).await;
    let record = &records[0];

    assert_eq!(record.outcome, Outcome::Valid);
    assert_eq!(record.attempts, 1);
    let expected = GeneratedMessage {
        title: brandless_title.to_owned(),
        body: body(),
    };
    assert_eq!(record.message, expected.to_wire());
}

#[tokio::test]
async fn unsatisfiable_rule_exhausts_the_budget() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![Some(completion())])
            .with_title(TITLE)
            .with_hints("힌트"),
    );
    let mut pipeline = pipeline_with_rules(&provider, strict_rules());
    let records = pipeline.run(vec![row()]).await;
    let record = &records[0];

    assert_eq!(record.outcome, Outcome::Flagged);
    assert_eq!(record.attempts, 3);
    assert_eq!(record.errors, vec![ErrorKind::RuleMustInclude("비건 인증".to_owned())]);
    assert!(!record.message.is_empty());
    assert_eq!(provider.count(CallKind::Body), 3);
}

#[tokio::test]
async fn empty_catalog_skips_generation() {
    let provider = Arc::new(ScriptedProvider::new(vec![Some(completion())]).with_title(TITLE));
    let records = pipeline(&provider, CatalogStore::default()).run(vec![row()]).await;
    let record = &records[0];

    assert_eq!(record.outcome, Outcome::NoProduct);
    assert_eq!(record.errors, vec![ErrorKind::ProductMissing]);
    assert_eq!(record.attempts, 0);
    assert!(record.message.is_empty());
    assert!(record.plan.is_none());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn rows_keep_ranked_order() {
    let provider = Arc::new(ScriptedProvider::new(vec![Some(completion())]).with_title(TITLE).with_hints("힌트"));
    let mut second = row();
    second.part_id = Some("p-2".to_owned());
    let records = pipeline(&provider, catalog()).run(vec![row(), second]).await;

    let parts: Vec<_> = records.iter().filter_map(|r| r.part_id.as_deref()).collect();
    assert_eq!(parts, vec!["p-1", "p-2"]);
}

#[tokio::test]
async fn report_serializes_tags_and_outcomes() {
    let provider = Arc::new(ScriptedProvider::new(vec![Some(completion())]).with_title(TITLE).with_hints("힌트"));
    let mut records = pipeline(&provider, catalog()).run(vec![row()]).await;
    let skipped = pipeline(&provider, CatalogStore::default()).run(vec![row()]).await;
    records.extend(skipped);

    let report = RunReport::new("persona_1", "scripted", false, records);
    assert_eq!(report.valid_count(), 1);

    let json = serde_json::to_value(&report).expect("report should serialize");
    assert_eq!(json["persona_id"], "persona_1");
    assert_eq!(json["records"][0]["outcome"], "valid");
    assert_eq!(json["records"][1]["outcome"], "no_product");
    assert_eq!(json["records"][1]["errors"][0], "product_missing");
    assert!(json["run_id"].is_string());
}
