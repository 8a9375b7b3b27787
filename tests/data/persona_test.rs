//! Persona table loading, joining and ranking.

use std::fs;

use crm_narrator::config::DataConfig;
use crm_narrator::data::persona::ContextLoader;
use crm_narrator::data::DataError;

fn data_config(dir: &tempfile::TempDir) -> DataConfig {
    DataConfig {
        dir: dir.path().display().to_string(),
        persona_file: "persona.csv".to_owned(),
        persona_meta_file: "meta.csv".to_owned(),
        tone_files: vec!["tone.csv".to_owned()],
        ..DataConfig::default()
    }
}

fn write(dir: &tempfile::TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).expect("fixture should be written");
}

const PERSONA_CSV: &str = "\
persona_id,brand,score,part_id,brand_tone_cluster,skin_concern
persona_1,라네즈,0.42,p-1,c1,건조
persona_1,LANEIGE,0.91,p-2,c1,
persona_1,설화수,0.42,p-3,c2,nan
persona_2,헤라,0.99,p-4,c3,모공
";

#[test]
fn rows_are_ranked_by_score_with_stable_ties() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(&dir, "persona.csv", PERSONA_CSV);
    let loader = ContextLoader::new(&data_config(&dir));

    let rows = loader.load("persona_1", 3).expect("rows should load");
    let parts: Vec<_> = rows.iter().filter_map(|r| r.part_id.as_deref()).collect();
    assert_eq!(parts, vec!["p-2", "p-1", "p-3"]);
    assert_eq!(rows[0].normalized_brand, "라네즈");
    assert_eq!(rows[2].skin_concern, None, "nan cells are absent");
}

#[test]
fn top_k_limits_rows() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(&dir, "persona.csv", PERSONA_CSV);
    let loader = ContextLoader::new(&data_config(&dir));

    let rows = loader.load("persona_1", 1).expect("rows should load");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].part_id.as_deref(), Some("p-2"));
}

#[test]
fn meta_table_fills_missing_columns_only() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(&dir, "persona.csv", PERSONA_CSV);
    write(
        &dir,
        "meta.csv",
        "persona_id,skin_concern,lifestyle,skin_type\npersona_1,민감,바쁜 아침 출근,복합성\n",
    );
    let loader = ContextLoader::new(&data_config(&dir));

    let rows = loader.load("persona_1", 3).expect("rows should load");
    let first_scored = rows.iter().find(|r| r.part_id.as_deref() == Some("p-1"));
    let Some(row) = first_scored else {
        panic!("row p-1 should be loaded");
    };
    assert_eq!(row.skin_concern.as_deref(), Some("건조"), "base table wins");
    assert_eq!(row.lifestyle.as_deref(), Some("바쁜 아침 출근"));
    assert_eq!(row.skin_type.as_deref(), Some("복합성"));
    assert_eq!(rows[0].skin_concern.as_deref(), Some("민감"), "blank base cell is filled");
}

#[test]
fn unknown_persona_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(&dir, "persona.csv", PERSONA_CSV);
    let loader = ContextLoader::new(&data_config(&dir));

    match loader.load("persona_9", 3) {
        Err(DataError::PersonaNotFound(id)) => assert_eq!(id, "persona_9"),
        other => panic!("expected persona not found, got: {other:?}"),
    }
}

#[test]
fn missing_persona_table_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let loader = ContextLoader::new(&data_config(&dir));
    assert!(matches!(loader.load("persona_1", 3), Err(DataError::MissingFile(_))));
}

#[test]
fn persona_table_without_brand_column_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(&dir, "persona.csv", "persona_id,score\npersona_1,0.5\n");
    let loader = ContextLoader::new(&data_config(&dir));

    match loader.load("persona_1", 3) {
        Err(DataError::MissingColumns { columns, .. }) => assert_eq!(columns, vec!["brand"]),
        other => panic!("expected missing columns, got: {other:?}"),
    }
}

#[test]
fn tone_map_loads_when_present_and_is_empty_otherwise() {
    let dir = tempfile::tempdir().expect("temp dir");
    let loader = ContextLoader::new(&data_config(&dir));
    assert!(loader.load_tone_map().is_empty());

    write(
        &dir,
        "tone.csv",
        "brand_tone_cluster,full_description\nc1,차분하고 다정한 톤\n",
    );
    let tones = loader.load_tone_map();
    assert_eq!(tones.len(), 1);
    assert_eq!(tones.get("c1"), Some("차분하고 다정한 톤"));
}
