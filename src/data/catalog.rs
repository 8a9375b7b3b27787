//! Product catalog and candidate resolution.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::brand::{clean_brand, normalize_brand};
use super::persona::PersonaRow;
use super::{read_table, DataError, Record};
use crate::config::CatalogConfig;

const NAME_COLUMNS: &[&str] = &["상품명", "product_name", "제품명", "name"];
const BRAND_COLUMNS: &[&str] = &["브랜드", "brand", "brand_name"];
const URL_COLUMNS: &[&str] = &["url", "product_url", "상품url", "link"];
const CATEGORY_COLUMNS: &[&str] = &["category", "카테고리", "분류"];
const INGREDIENT_COLUMNS: &[&str] = &["ingredients", "성분", "주요성분", "key_ingredients"];

/// Bare packaging nouns that are not sellable product names.
const PACKAGING_NOUNS: &[&str] = &["세트", "리필", "본품", "증정", "샘플", "기획세트", "단품"];

static UNIT_ONLY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^\d+(\.\d+)?\s*(ml|g|mg|kg|l|oz|매|개|ea|입|종)?$").ok()
});

static UNIT_SUFFIX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[\(\[]?\s*\d+(\.\d+)?\s*(ml|g|mg|kg|l|oz|매|개|ea|입)\s*[\)\]]?\s*$").ok()
});

/// One catalog product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Product name as sold.
    pub name: String,
    /// Brand as written in the catalog.
    pub brand: String,
    /// Canonical brand key.
    pub brand_key: String,
    /// Precomputed benefit similarity (0.0–1.0).
    pub benefit_score: f64,
    /// Precomputed identity similarity (0.0–1.0).
    pub identity_score: f64,
    /// Precomputed emotion similarity (0.0–1.0).
    pub emotion_score: f64,
    /// Product page URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Catalog category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Ingredient text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<String>,
}

impl Product {
    /// A product with only a name and brand.
    pub fn new(name: impl Into<String>, brand: impl Into<String>) -> Self {
        let brand: String = brand.into();
        let name: String = name.into();
        let brand = clean_brand(&brand);
        Self {
            name: name.trim().to_owned(),
            brand_key: normalize_brand(&brand),
            brand,
            benefit_score: 0.0,
            identity_score: 0.0,
            emotion_score: 0.0,
            url: None,
            category: None,
            ingredients: None,
        }
    }

    /// Set the three similarity columns.
    pub fn with_similarity(mut self, benefit: f64, identity: f64, emotion: f64) -> Self {
        self.benefit_score = benefit;
        self.identity_score = identity;
        self.emotion_score = emotion;
        self
    }

    /// Whether the product's ingredient text mentions any of `avoided`.
    pub fn contains_any_ingredient(&self, avoided: &[String]) -> bool {
        match &self.ingredients {
            Some(text) => avoided.iter().any(|a| !a.is_empty() && text.contains(a.as_str())),
            None => false,
        }
    }
}

/// The product chosen for a persona row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedProduct {
    /// The chosen product.
    pub product: Product,
    /// Final strategy score.
    pub score: f64,
    /// Whether the brand filter matched nothing and the full catalog was used.
    pub brand_fallback: bool,
}

/// Candidates eligible for one persona row.
#[derive(Debug, Clone)]
pub struct CandidateSet<'a> {
    /// Eligible products in catalog order.
    pub products: Vec<&'a Product>,
    /// Whether the brand filter matched nothing and the full catalog was used.
    pub brand_fallback: bool,
}

/// Whether `name` is a real product name rather than a unit or packaging token.
pub fn is_real_product_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return false;
    }
    if PACKAGING_NOUNS.contains(&trimmed) {
        return false;
    }
    match UNIT_ONLY.as_ref() {
        Some(rx) => !rx.is_match(trimmed),
        None => true,
    }
}

/// `name` with a trailing volume or count suffix (`30ml`, `(50g)`) removed.
pub fn strip_unit_suffix(name: &str) -> String {
    let trimmed = name.trim();
    match UNIT_SUFFIX.as_ref() {
        Some(rx) => {
            let stripped = rx.replace(trimmed, "").trim().to_owned();
            if stripped.is_empty() {
                trimmed.to_owned()
            } else {
                stripped
            }
        }
        None => trimmed.to_owned(),
    }
}

/// The product catalog, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    products: Vec<Product>,
}

impl CatalogStore {
    /// Load the catalog table.
    ///
    /// Rows without a real product name are skipped; repeated names keep the
    /// first row.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingFile`] if the table is absent and
    /// [`DataError::MissingColumns`] if no name or brand column can be found.
    pub fn load(path: &Path, config: &CatalogConfig) -> Result<Self, DataError> {
        let table = read_table(path)?;

        let name_col = match &config.name_column {
            Some(c) => Some(c.clone()),
            None => table.pick_column(NAME_COLUMNS),
        };
        let brand_col = match &config.brand_column {
            Some(c) => Some(c.clone()),
            None => table.pick_column(BRAND_COLUMNS),
        };
        let (Some(name_col), Some(brand_col)) = (name_col, brand_col) else {
            return Err(DataError::MissingColumns {
                path: path.to_path_buf(),
                columns: vec!["product name".to_owned(), "brand".to_owned()],
            });
        };
        table.require_columns(&[name_col.as_str(), brand_col.as_str()])?;

        let url_col = table.pick_column(URL_COLUMNS);
        let category_col = table.pick_column(CATEGORY_COLUMNS);
        let ingredient_col = table.pick_column(INGREDIENT_COLUMNS);

        let mut seen = BTreeSet::new();
        let mut products = Vec::new();
        for row in &table.rows {
            let Some(name) = row.get(&name_col) else {
                continue;
            };
            if !is_real_product_name(name) || !seen.insert(name.clone()) {
                continue;
            }
            let brand = row.get(&brand_col).cloned().unwrap_or_default();
            let mut product = Product::new(name.clone(), brand).with_similarity(
                score_cell(row, "benefit_score"),
                score_cell(row, "identity_score"),
                score_cell(row, "emotion_score"),
            );
            product.url = url_col.as_ref().and_then(|c| row.get(c)).cloned();
            product.category = category_col.as_ref().and_then(|c| row.get(c)).cloned();
            product.ingredients = ingredient_col.as_ref().and_then(|c| row.get(c)).cloned();
            products.push(product);
        }

        info!(path = %path.display(), products = products.len(), "catalog loaded");
        Ok(Self { products })
    }

    /// Catalog built from in-memory products, keeping only real product names.
    pub fn from_products(products: Vec<Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .filter(|p| is_real_product_name(&p.name))
                .collect(),
        }
    }

    /// All products in catalog order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products eligible for `brand_hint` and `persona`.
    ///
    /// Filters to the normalized brand; if nothing matches, the whole catalog
    /// is used instead. Products containing an ingredient the persona avoids
    /// are dropped unless that would leave nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::EmptyCatalog`] if not even the unfiltered catalog
    /// has a product.
    pub fn candidates(
        &self,
        brand_hint: &str,
        persona: &PersonaRow,
    ) -> Result<CandidateSet<'_>, DataError> {
        let key = normalize_brand(brand_hint);
        let mut products: Vec<&Product> = if key.is_empty() {
            Vec::new()
        } else {
            self.products.iter().filter(|p| p.brand_key == key).collect()
        };

        let brand_fallback = products.is_empty();
        if brand_fallback {
            if !key.is_empty() {
                warn!(brand = brand_hint, "no catalog products for brand, using full catalog");
            }
            products = self.products.iter().collect();
        }
        if products.is_empty() {
            return Err(DataError::EmptyCatalog);
        }

        let avoided = persona.avoided_ingredients();
        if !avoided.is_empty() {
            let safe: Vec<&Product> = products
                .iter()
                .copied()
                .filter(|p| !p.contains_any_ingredient(&avoided))
                .collect();
            if safe.is_empty() {
                debug!("every candidate contains an avoided ingredient, keeping all");
            } else {
                products = safe;
            }
        }

        Ok(CandidateSet {
            products,
            brand_fallback,
        })
    }
}

fn score_cell(row: &Record, key: &str) -> f64 {
    row.get(key)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
