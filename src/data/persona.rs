//! Persona rows and the [`ContextLoader`] that produces them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::brand::{clean_brand, normalize_brand};
use super::catalog::SelectedProduct;
use super::tone::{load_tone_map, ToneMap};
use super::{read_optional_table, read_table, split_tags, DataError, Record};
use crate::config::DataConfig;

/// Lifestyle fragments that describe a routine or time of day rather than an
/// environment.
const ROUTINE_MARKERS: &[&str] = &[
    "루틴", "출근", "분", "아침", "저녁", "단계", "전", "후", "세안", "토너",
];

/// Fields whose values feed business-rule keyword matching.
const KEYWORD_FIELDS: &[&str] = &[
    "persona_name",
    "preference",
    "shopping_pattern",
    "lifestyle",
    "skin_type",
    "skin_concern",
    "allergy_sensitivity",
    "texture_preference",
    "finish_preference",
    "scent_preference",
    "time_of_use",
    "seasonality",
    "environment_context",
];

/// One CRM record to message.
///
/// Known columns are typed; anything else the tables carry is kept in
/// [`PersonaRow::extra`] for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonaRow {
    /// Persona identifier.
    pub persona_id: String,
    /// Brand as written in the source table.
    pub brand: String,
    /// Precomputed relevance score; rows are ranked by it.
    pub score: f64,
    /// Campaign part identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    /// Tone cluster key into the tone map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_tone_cluster: Option<String>,
    /// Persona display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_name: Option<String>,
    /// Skin type (건성, 지성, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_type: Option<String>,
    /// Comma-separated skin concern tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_concern: Option<String>,
    /// Free-text lifestyle description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifestyle: Option<String>,
    /// General preference notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference: Option<String>,
    /// Shopping pattern notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopping_pattern: Option<String>,
    /// Allergy or sensitivity notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergy_sensitivity: Option<String>,
    /// Ingredients to avoid, comma separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_avoid_list: Option<String>,
    /// Preferred texture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_preference: Option<String>,
    /// Preferred finish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_preference: Option<String>,
    /// Preferred scent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scent_preference: Option<String>,
    /// Number of routine steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routine_step_count: Option<String>,
    /// Time of use (아침, 저녁, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_use: Option<String>,
    /// Season the persona shops for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonality: Option<String>,
    /// Environment notes (사무실, 마스크, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_context: Option<String>,
    /// Preferred shopping channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopping_channel: Option<String>,
    /// Price sensitivity grade.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_sensitivity: Option<String>,
    /// Repurchase tendency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repurchase_tendency: Option<String>,
    /// Preferred call-to-action style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta_style: Option<String>,
    /// Preferred message tone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_tone_preference: Option<String>,
    /// Canonical brand key, filled on load.
    pub normalized_brand: String,
    /// Product resolved for this row, filled by the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<SelectedProduct>,
    /// Columns without a typed field.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Lifestyle split into environment and routine/time tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifestyleTags {
    /// Where and under what conditions the persona lives.
    pub environment: Vec<String>,
    /// When and how the persona runs a routine.
    pub routine: Vec<String>,
}

impl PersonaRow {
    /// Build a row from a merged table record.
    pub fn from_record(mut record: Record) -> Self {
        let mut take = |key: &str| record.remove(key);

        let persona_id = take("persona_id").unwrap_or_default();
        let brand = take("brand").map(|b| clean_brand(&b)).unwrap_or_default();
        let score = match take("score") {
            Some(raw) => raw.parse::<f64>().unwrap_or_else(|_| {
                debug!(value = %raw, "unparseable score, ranking row last");
                0.0
            }),
            None => 0.0,
        };

        let mut row = Self {
            normalized_brand: normalize_brand(&brand),
            persona_id,
            brand,
            score,
            part_id: take("part_id"),
            brand_tone_cluster: take("brand_tone_cluster"),
            persona_name: take("persona_name"),
            skin_type: take("skin_type"),
            skin_concern: take("skin_concern"),
            lifestyle: take("lifestyle"),
            preference: take("preference"),
            shopping_pattern: take("shopping_pattern"),
            allergy_sensitivity: take("allergy_sensitivity"),
            ingredient_avoid_list: take("ingredient_avoid_list"),
            texture_preference: take("texture_preference"),
            finish_preference: take("finish_preference"),
            scent_preference: take("scent_preference"),
            routine_step_count: take("routine_step_count"),
            time_of_use: take("time_of_use"),
            seasonality: take("seasonality"),
            environment_context: take("environment_context"),
            shopping_channel: take("shopping_channel"),
            price_sensitivity: take("price_sensitivity"),
            repurchase_tendency: take("repurchase_tendency"),
            cta_style: take("cta_style"),
            message_tone_preference: take("message_tone_preference"),
            product: None,
            extra: BTreeMap::new(),
        };
        row.extra = record;
        row
    }

    /// Every populated attribute by column name, excluding the resolved product.
    pub fn fields(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        out.insert("persona_id".to_owned(), self.persona_id.clone());
        out.insert("brand".to_owned(), self.brand.clone());
        for (key, value) in self.optional_fields() {
            if let Some(v) = value {
                out.insert(key.to_owned(), v.clone());
            }
        }
        for (k, v) in &self.extra {
            out.entry(k.clone()).or_insert_with(|| v.clone());
        }
        out
    }

    /// Value of a named attribute, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "persona_id" => Some(self.persona_id.as_str()),
            "brand" => Some(self.brand.as_str()),
            _ => self
                .optional_fields()
                .into_iter()
                .find(|(k, _)| *k == key)
                .and_then(|(_, v)| v.as_deref())
                .or_else(|| self.extra.get(key).map(String::as_str)),
        }
    }

    fn optional_fields(&self) -> [(&'static str, &Option<String>); 22] {
        [
            ("part_id", &self.part_id),
            ("brand_tone_cluster", &self.brand_tone_cluster),
            ("persona_name", &self.persona_name),
            ("skin_type", &self.skin_type),
            ("skin_concern", &self.skin_concern),
            ("lifestyle", &self.lifestyle),
            ("preference", &self.preference),
            ("shopping_pattern", &self.shopping_pattern),
            ("allergy_sensitivity", &self.allergy_sensitivity),
            ("ingredient_avoid_list", &self.ingredient_avoid_list),
            ("texture_preference", &self.texture_preference),
            ("finish_preference", &self.finish_preference),
            ("scent_preference", &self.scent_preference),
            ("routine_step_count", &self.routine_step_count),
            ("time_of_use", &self.time_of_use),
            ("seasonality", &self.seasonality),
            ("environment_context", &self.environment_context),
            ("shopping_channel", &self.shopping_channel),
            ("price_sensitivity", &self.price_sensitivity),
            ("repurchase_tendency", &self.repurchase_tendency),
            ("cta_style", &self.cta_style),
            ("message_tone_preference", &self.message_tone_preference),
        ]
    }

    /// Skin concern tags.
    pub fn skin_concerns(&self) -> Vec<String> {
        self.skin_concern.as_deref().map(split_tags).unwrap_or_default()
    }

    /// The first skin concern tag, used as the literal injected into copy.
    pub fn primary_concern(&self) -> Option<String> {
        self.skin_concerns().into_iter().next()
    }

    /// Ingredients the persona asked to avoid.
    pub fn avoided_ingredients(&self) -> Vec<String> {
        self.ingredient_avoid_list
            .as_deref()
            .map(split_tags)
            .unwrap_or_default()
    }

    /// Lifestyle fragments split into environment and routine/time tags.
    ///
    /// Pure numbers are dropped.
    pub fn lifestyle_tags(&self) -> LifestyleTags {
        let mut tags = LifestyleTags::default();
        let Some(lifestyle) = self.lifestyle.as_deref() else {
            return tags;
        };
        for fragment in split_tags(lifestyle) {
            let fragment = fragment.trim().to_owned();
            if fragment.chars().all(|c| c.is_ascii_digit() || c == '.' || c.is_whitespace()) {
                continue;
            }
            if ROUTINE_MARKERS.iter().any(|m| fragment.contains(m)) {
                tags.routine.push(fragment);
            } else {
                tags.environment.push(fragment);
            }
        }
        tags
    }

    /// Keywords used by business-rule scoring.
    pub fn keywords(&self) -> Vec<String> {
        KEYWORD_FIELDS
            .iter()
            .filter_map(|k| self.field(k))
            .flat_map(split_tags)
            .collect()
    }

    /// Name of the resolved product, if any.
    pub fn product_name(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.product.name.as_str())
    }
}

/// Loads persona rows and the tone map from the data directory.
#[derive(Debug, Clone)]
pub struct ContextLoader {
    persona_path: PathBuf,
    meta_path: PathBuf,
    tone_paths: Vec<PathBuf>,
}

impl ContextLoader {
    /// Loader for the files named in `data`.
    pub fn new(data: &DataConfig) -> Self {
        Self {
            persona_path: data.resolve(&data.persona_file),
            meta_path: data.resolve(&data.persona_meta_file),
            tone_paths: data.tone_files.iter().map(|f| data.resolve(f)).collect(),
        }
    }

    /// Rows for `persona_id`, most relevant first, at most `top_k`.
    ///
    /// The persona table is left-joined with the meta table on `persona_id`;
    /// base values win on overlapping columns. Ranking is by `score`
    /// descending and stable, so ties keep source order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingFile`] if the persona table is absent,
    /// [`DataError::MissingColumns`] if it lacks `persona_id` or `brand`, and
    /// [`DataError::PersonaNotFound`] if no row matches.
    pub fn load(&self, persona_id: &str, top_k: usize) -> Result<Vec<PersonaRow>, DataError> {
        let base = read_table(&self.persona_path)?;
        base.require_columns(&["persona_id", "brand"])?;

        let mut meta: BTreeMap<String, Record> = BTreeMap::new();
        match read_optional_table(&self.meta_path)? {
            Some(table) => {
                for record in table.rows {
                    if let Some(id) = record.get("persona_id").cloned() {
                        meta.entry(id).or_insert(record);
                    }
                }
            }
            None => warn!(path = %self.meta_path.display(), "persona meta table not found, continuing without it"),
        }

        let wanted = persona_id.trim();
        let mut rows: Vec<PersonaRow> = base
            .rows
            .into_iter()
            .filter(|r| r.get("persona_id").map(String::as_str) == Some(wanted))
            .map(|mut record| {
                if let Some(extra) = meta.get(wanted) {
                    for (k, v) in extra {
                        record.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
                PersonaRow::from_record(record)
            })
            .collect();

        if rows.is_empty() {
            return Err(DataError::PersonaNotFound(wanted.to_owned()));
        }

        rows.sort_by(|a, b| b.score.total_cmp(&a.score));
        rows.truncate(top_k.max(1));

        info!(persona_id = wanted, rows = rows.len(), "persona rows loaded");
        Ok(rows)
    }

    /// Tone-cluster key → tone description.
    ///
    /// Absent or unreadable tone tables yield an empty map.
    pub fn load_tone_map(&self) -> ToneMap {
        load_tone_map(&self.tone_paths)
    }
}
