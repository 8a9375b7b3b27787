//! CLI contract tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

use crate::fixture::{body, body_without_brand, PRODUCT, TITLE};

fn main_source() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/main.rs");
    let source_result = fs::read_to_string(&path);
    assert!(source_result.is_ok());
    match source_result {
        Ok(source) => source,
        Err(err) => panic!("main source should load from {}: {err}", path.display()),
    }
}

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("narrator.toml");
    let contents = format!("[data]\ndir = \"{}\"\n", dir.display());
    fs::write(&path, contents).expect("config should be written");
    path
}

fn narrator() -> Command {
    let mut cmd = Command::cargo_bin("crm-narrator").expect("binary should build");
    for var in ["OPENAI_API_KEY", "CRM_DATA_DIR", "CRM_RETRY_BUDGET", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

fn check_output(dir: &Path, message: &str) -> serde_json::Value {
    let config = write_config(dir);
    let message_path = dir.join("message.txt");
    fs::write(&message_path, message).expect("message should be written");

    let output = narrator()
        .arg("check")
        .arg("--brand")
        .arg("라네즈")
        .arg("--product")
        .arg(PRODUCT)
        .arg("--skin-concern")
        .arg("건조")
        .arg("--message")
        .arg(&message_path)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("check should run");
    assert!(output.status.success(), "check failed: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("check should print JSON")
}

#[test]
fn main_defines_primary_subcommands() {
    let source = main_source();
    assert!(source.contains("Run"));
    assert!(source.contains("Check"));
    assert!(source.contains("--offline") || source.contains("offline: bool"));
}

#[test]
fn check_accepts_a_valid_message() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let result = check_output(tmp.path(), &format!("TITLE: {TITLE}\nBODY: {}", body()));
    assert_eq!(result["valid"], true);
    assert_eq!(result["errors"], serde_json::json!([]));
}

#[test]
fn check_reports_error_tags() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let title = "✨ 바쁜 아침 건조함엔 워터뱅크 크림으로 촉촉하게 💧";
    let result = check_output(
        tmp.path(),
        &format!("TITLE: {title}\nBODY: {}", body_without_brand()),
    );
    assert_eq!(result["valid"], false);
    assert_eq!(result["errors"], serde_json::json!(["brand_missing"]));
}

#[test]
fn check_rejects_unframed_message() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let config = write_config(tmp.path());
    let message_path = tmp.path().join("message.txt");
    fs::write(&message_path, body()).expect("message should be written");

    narrator()
        .args(["check", "--brand", "라네즈", "--message"])
        .arg(&message_path)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure();
}

#[test]
fn offline_run_writes_a_report() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let dir = tmp.path();
    fs::write(
        dir.join("persona_brand_tone_part_final.csv"),
        "persona_id,brand,score,part_id,skin_concern,lifestyle\npersona_1,라네즈,0.9,p-1,건조,바쁜 아침 출근\n",
    )
    .expect("persona table should be written");
    fs::write(
        dir.join("amore_with_category.csv"),
        format!("상품명,브랜드,benefit_score\n{PRODUCT},라네즈,0.8\n"),
    )
    .expect("catalog should be written");
    fs::write(
        dir.join("amore_brand_tone_rules.csv"),
        "brand,opening,product_link,routine,closing,banned,viewpoint,must_include,avoid,style_note\n라네즈,,,,,저렴,,,,\n",
    )
    .expect("rules should be written");
    let config = write_config(dir);
    let report_path = dir.join("report.json");

    narrator()
        .args(["run", "--persona", "persona_1", "--offline", "--config"])
        .arg(&config)
        .arg("--output")
        .arg(&report_path)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("report should exist"))
            .expect("report should be JSON");
    assert_eq!(report["offline"], true);
    assert_eq!(report["persona_id"], "persona_1");
    let records = report["records"].as_array().expect("records array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["attempts"], 1);
    assert_eq!(records[0]["product"], PRODUCT);
    assert!(records[0]["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("TITLE: ") && m.contains("\nBODY: ")));
}

#[test]
fn run_fails_for_unknown_persona() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let dir = tmp.path();
    fs::write(
        dir.join("persona_brand_tone_part_final.csv"),
        "persona_id,brand,score\npersona_1,라네즈,0.9\n",
    )
    .expect("persona table should be written");
    let config = write_config(dir);

    narrator()
        .args(["run", "--persona", "persona_404", "--offline", "--config"])
        .arg(&config)
        .assert()
        .failure();
}
