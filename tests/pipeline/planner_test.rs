//! Plan construction, tone lookup and hint expansion.

use std::sync::Arc;

use crm_narrator::data::tone::ToneMap;
use crm_narrator::planner::{Planner, SlotTag};
use crm_narrator::providers::client::{ClientSettings, CompletionClient};
use crm_narrator::providers::offline::OfflineProvider;

use crate::fixture::{row_with_product, rule};
use crate::scripted::{client, CallKind, ScriptedProvider};

fn tones() -> ToneMap {
    [("c1".to_owned(), "차분하고 다정한 말투".to_owned())]
        .into_iter()
        .collect()
}

#[tokio::test]
async fn plan_carries_outline_tone_fields_and_must_include() {
    let provider = Arc::new(ScriptedProvider::new(vec![]).with_hints("- 출근길 지하철에서 건조함이 올라와요"));
    let planner = Planner::new(client(Arc::clone(&provider)), tones(), true);
    let mut row = row_with_product();
    row.brand_tone_cluster = Some("c1".to_owned());

    let plan = planner.plan(&row, &rule()).await;
    assert_eq!(plan.outline, SlotTag::OUTLINE.to_vec());
    assert!(plan.check().is_ok());
    assert_eq!(plan.tone_rules, "차분하고 다정한 말투");
    assert_eq!(plan.brand_must_include, vec!["사용감"]);
    assert_eq!(plan.persona_fields.get("skin_concern").map(String::as_str), Some("건조"));
    assert_eq!(plan.expansion_hints, "- 출근길 지하철에서 건조함이 올라와요");
    assert_eq!(provider.count(CallKind::Hints), 1);
}

#[tokio::test]
async fn unknown_tone_cluster_leaves_tone_empty() {
    let provider = Arc::new(ScriptedProvider::new(vec![]).with_hints("힌트"));
    let planner = Planner::new(client(provider), tones(), false);
    let mut row = row_with_product();
    row.brand_tone_cluster = Some("c9".to_owned());

    let plan = planner.plan(&row, &rule()).await;
    assert!(plan.tone_rules.is_empty());
    assert!(plan.expansion_hints.is_empty(), "expansion disabled");
}

#[tokio::test]
async fn failed_hint_call_is_not_fatal() {
    // No hints scripted: the call fails.
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let planner = Planner::new(client(Arc::clone(&provider)), ToneMap::default(), true);

    let plan = planner.plan(&row_with_product(), &rule()).await;
    assert!(plan.expansion_hints.is_empty());
    assert!(plan.check().is_ok());
    assert_eq!(provider.count(CallKind::Hints), 1);
}

#[tokio::test]
async fn offline_planner_skips_hint_expansion() {
    let client = Arc::new(CompletionClient::new(
        Arc::new(OfflineProvider),
        ClientSettings::default(),
    ));
    let planner = Planner::new(client, ToneMap::default(), true);
    let plan = planner.plan(&row_with_product(), &rule()).await;
    assert!(plan.expansion_hints.is_empty());
}
