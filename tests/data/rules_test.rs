//! Brand rule table loading and lookup.

use std::fs;

use crm_narrator::data::rules::RuleStore;
use crm_narrator::data::DataError;

const RULES_CSV: &str = "\
brand,opening,product_link,routine,closing,banned,viewpoint,must_include,avoid,style_note
LANEIGE,상황 공감으로 시작,수분 포인트 연결,아침 루틴,가볍게 마무리,\"저렴, 최저가\",2인칭,\"사용감, 수분\",과장,산뜻한 문장
라네즈,중복 행,,,,,,,,
설화수,,,,,,,,,
";

fn load_rules() -> (tempfile::TempDir, RuleStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rules.csv");
    fs::write(&path, RULES_CSV).expect("fixture should be written");
    let rules = RuleStore::load(&path).expect("rules should load");
    (dir, rules)
}

#[test]
fn rules_are_keyed_by_normalized_brand_first_row_wins() {
    let (_dir, rules) = load_rules();
    assert_eq!(rules.len(), 2);

    let Some(rule) = rules.get("라네즈") else {
        panic!("라네즈 rule should exist");
    };
    assert_eq!(rule.opening, "상황 공감으로 시작");
    assert_eq!(rule.banned, vec!["저렴", "최저가"]);
    assert_eq!(rule.must_include, vec!["사용감", "수분"]);
    assert_eq!(rule.avoid, vec!["과장"]);
    assert!(rules.get("Laneige").is_some());
}

#[test]
fn empty_cells_give_empty_lists() {
    let (_dir, rules) = load_rules();
    let Some(rule) = rules.get("설화수") else {
        panic!("설화수 rule should exist");
    };
    assert!(rule.banned.is_empty());
    assert!(rule.tone_notes().is_empty());
}

#[test]
fn unknown_brand_resolves_to_empty_rule() {
    let (_dir, rules) = load_rules();
    let rule = rules.resolve("헤라");
    assert_eq!(rule.brand, "헤라");
    assert!(rule.must_include.is_empty());
    assert!(rule.banned.is_empty());
}

#[test]
fn table_missing_required_columns_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rules.csv");
    fs::write(&path, "brand,banned\n라네즈,저렴\n").expect("fixture should be written");

    match RuleStore::load(&path) {
        Err(DataError::MissingColumns { columns, .. }) => {
            assert!(columns.iter().any(|c| c == "must_include"));
            assert!(!columns.iter().any(|c| c == "brand"));
        }
        other => panic!("expected missing columns, got: {other:?}"),
    }
}
