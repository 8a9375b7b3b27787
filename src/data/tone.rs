//! Tone-cluster descriptions.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::{read_optional_table, Table};

const KEY_COLUMNS: &[&str] = &["brand_tone_cluster", "cluster", "tone_cluster", "tone_id", "id"];
const TEXT_COLUMNS: &[&str] = &[
    "full_description",
    "tone_full",
    "description",
    "desc",
    "profile",
    "tone_profile",
    "text",
];
const PREVIEW_COLUMNS: &[&str] = &["description_preview", "preview", "short", "summary"];

/// Tone-cluster key → tone description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToneMap {
    entries: BTreeMap<String, String>,
}

impl ToneMap {
    /// Description for a tone-cluster key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key.trim()).map(String::as_str)
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no cluster is known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for ToneMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Load the first tone table in `paths` that exists.
///
/// Key and description columns are detected by name, falling back to the
/// first and second columns. A preview column, when present and not already
/// part of the description, is prefixed to it. Unreadable tables are skipped
/// with a warning; no table at all yields an empty map.
pub fn load_tone_map(paths: &[PathBuf]) -> ToneMap {
    for path in paths {
        match read_optional_table(path) {
            Ok(Some(table)) => {
                let map = from_table(&table);
                debug!(path = %path.display(), clusters = map.len(), "tone map loaded");
                return map;
            }
            Ok(None) => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable tone table");
            }
        }
    }
    debug!("no tone table found, continuing without tone rules");
    ToneMap::default()
}

fn from_table(table: &Table) -> ToneMap {
    let key_col = table
        .pick_column(KEY_COLUMNS)
        .or_else(|| table.headers.first().cloned());
    let text_col = table
        .pick_column(TEXT_COLUMNS)
        .or_else(|| table.headers.get(1).cloned());
    let preview_col = table.pick_column(PREVIEW_COLUMNS);

    let (Some(key_col), Some(text_col)) = (key_col, text_col) else {
        return ToneMap::default();
    };

    let mut entries = BTreeMap::new();
    for row in &table.rows {
        let Some(key) = row.get(&key_col) else {
            continue;
        };
        let full = row.get(&text_col).cloned().unwrap_or_default();
        let preview = preview_col.as_ref().and_then(|c| row.get(c));
        let blob = match preview {
            Some(p) if !full.contains(p.as_str()) => format!("{p} {full}").trim().to_owned(),
            _ => full,
        };
        entries.entry(key.clone()).or_insert(blob);
    }
    ToneMap { entries }
}
