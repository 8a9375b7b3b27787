//! Brand content rules and the [`RuleStore`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::brand::{clean_brand, normalize_brand};
use super::{read_table, split_list, DataError, Record};

/// Columns every brand rule table must carry.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "brand",
    "opening",
    "product_link",
    "routine",
    "closing",
    "banned",
    "viewpoint",
    "must_include",
    "avoid",
    "style_note",
];

/// One brand's content policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BrandRule {
    /// Brand as written in the rule table.
    pub brand: String,
    /// How the opening slot should read.
    pub opening: String,
    /// How the product should be introduced.
    pub product_link: String,
    /// How the usage flow should read.
    pub routine: String,
    /// How the close should read.
    pub closing: String,
    /// Narrative viewpoint.
    pub viewpoint: String,
    /// Free-form style note.
    pub style_note: String,
    /// Words that must never appear.
    pub banned: Vec<String>,
    /// Words or concepts that must be conveyed.
    pub must_include: Vec<String>,
    /// Discouraged phrases.
    pub avoid: Vec<String>,
}

impl BrandRule {
    /// Empty policy used when a brand has no rule row.
    pub fn fallback(brand: &str) -> Self {
        Self {
            brand: clean_brand(brand),
            ..Self::default()
        }
    }

    fn from_record(record: &Record) -> Self {
        let text = |key: &str| record.get(key).cloned().unwrap_or_default();
        let list = |key: &str| record.get(key).map(|v| split_list(v)).unwrap_or_default();
        Self {
            brand: clean_brand(&text("brand")),
            opening: text("opening"),
            product_link: text("product_link"),
            routine: text("routine"),
            closing: text("closing"),
            viewpoint: text("viewpoint"),
            style_note: text("style_note"),
            banned: list("banned"),
            must_include: list("must_include"),
            avoid: list("avoid"),
        }
    }

    /// Non-empty tone notes as `(label, note)` pairs, in slot order.
    pub fn tone_notes(&self) -> Vec<(&'static str, &str)> {
        [
            ("opening", self.opening.as_str()),
            ("product_link", self.product_link.as_str()),
            ("routine", self.routine.as_str()),
            ("closing", self.closing.as_str()),
            ("viewpoint", self.viewpoint.as_str()),
            ("style_note", self.style_note.as_str()),
        ]
        .into_iter()
        .filter(|(_, note)| !note.trim().is_empty())
        .collect()
    }
}

/// Brand rules keyed by normalized brand name.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: BTreeMap<String, BrandRule>,
}

impl RuleStore {
    /// Load the brand rule table.
    ///
    /// When a brand has several rows the first one wins.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingFile`] if the table is absent and
    /// [`DataError::MissingColumns`] if any required column is missing.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let table = read_table(path)?;
        table.require_columns(REQUIRED_COLUMNS)?;
        let store: Self = table
            .rows
            .iter()
            .filter(|r| r.contains_key("brand"))
            .map(BrandRule::from_record)
            .collect();
        info!(path = %path.display(), brands = store.len(), "brand rules loaded");
        Ok(store)
    }

    /// Rule for `brand`, matched on its normalized key.
    pub fn get(&self, brand: &str) -> Option<&BrandRule> {
        self.rules.get(&normalize_brand(brand))
    }

    /// Rule for `brand`, or an empty fallback rule when none is configured.
    pub fn resolve(&self, brand: &str) -> BrandRule {
        match self.get(brand) {
            Some(rule) => rule.clone(),
            None => {
                warn!(brand, "no brand rule found, using empty default rule");
                BrandRule::fallback(brand)
            }
        }
    }

    /// Number of brands with a rule.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the store holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<BrandRule> for RuleStore {
    fn from_iter<I: IntoIterator<Item = BrandRule>>(iter: I) -> Self {
        let mut rules = BTreeMap::new();
        for rule in iter {
            let key = normalize_brand(&rule.brand);
            if key.is_empty() {
                continue;
            }
            rules.entry(key).or_insert(rule);
        }
        Self { rules }
    }
}
