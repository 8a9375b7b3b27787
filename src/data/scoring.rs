//! Product scoring strategies and final product selection.
//!
//! A [`CompositeScorer`] multiplies a base similarity score by any number of
//! [`ScoreAdjustment`]s. Each adjustment owns one heuristic table so the
//! tables can be tested and swapped independently.

use std::collections::BTreeMap;

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::debug;

use super::catalog::{CatalogStore, Product, SelectedProduct};
use super::persona::PersonaRow;
use super::DataError;

/// Scores one candidate product for one persona.
pub trait ScoringStrategy: Send + Sync {
    /// Higher is better. Scores are only compared within one persona.
    fn score(&self, candidate: &Product, persona: &PersonaRow) -> f64;
}

/// A multiplicative correction applied on top of a base score.
pub trait ScoreAdjustment: Send + Sync {
    /// Factor to multiply the running score by; `1.0` leaves it unchanged.
    fn multiplier(&self, candidate: &Product, persona: &PersonaRow) -> f64;
}

// ---------------------------------------------------------------------------
// Base similarity
// ---------------------------------------------------------------------------

/// Weighted sum of the catalog's precomputed similarity columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSimilarity {
    /// Weight of `benefit_score`.
    pub benefit: f64,
    /// Weight of `identity_score`.
    pub identity: f64,
    /// Weight of `emotion_score`.
    pub emotion: f64,
}

impl Default for WeightedSimilarity {
    fn default() -> Self {
        Self {
            benefit: 0.6,
            identity: 0.3,
            emotion: 0.1,
        }
    }
}

impl ScoringStrategy for WeightedSimilarity {
    fn score(&self, candidate: &Product, _persona: &PersonaRow) -> f64 {
        self.benefit * candidate.benefit_score
            + self.identity * candidate.identity_score
            + self.emotion * candidate.emotion_score
    }
}

// ---------------------------------------------------------------------------
// Adjustments
// ---------------------------------------------------------------------------

/// Per-persona brand affinity weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonaBrandAffinity {
    weights: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PersonaBrandAffinity {
    /// The built-in affinity table.
    pub fn standard() -> Self {
        let table: &[(&str, &[(&str, f64)])] = &[
            ("persona_1", &[("프리메라", 1.1), ("라네즈", 1.1)]),
            (
                "persona_3",
                &[("설화수", 1.25), ("헤라", 1.2), ("아이오페", 1.15), ("프리메라", 0.7)],
            ),
            (
                "persona_6",
                &[("마몽드", 1.2), ("에뛰드", 1.15), ("이니스프리", 1.1), ("프리메라", 0.75)],
            ),
        ];
        let weights = table
            .iter()
            .map(|(persona, brands)| {
                (
                    (*persona).to_owned(),
                    brands.iter().map(|(b, w)| ((*b).to_owned(), *w)).collect(),
                )
            })
            .collect();
        Self { weights }
    }
}

impl ScoreAdjustment for PersonaBrandAffinity {
    fn multiplier(&self, candidate: &Product, persona: &PersonaRow) -> f64 {
        self.weights
            .get(&persona.persona_id)
            .and_then(|brands| brands.get(&candidate.brand_key))
            .copied()
            .unwrap_or(1.0)
    }
}

/// Boost for products of the persona row's own brand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBrandBoost(pub f64);

impl Default for TargetBrandBoost {
    fn default() -> Self {
        Self(2.0)
    }
}

impl ScoreAdjustment for TargetBrandBoost {
    fn multiplier(&self, candidate: &Product, persona: &PersonaRow) -> f64 {
        if !persona.normalized_brand.is_empty() && candidate.brand_key == persona.normalized_brand {
            self.0
        } else {
            1.0
        }
    }
}

const BUSY_KEYWORDS: &[&str] = &["바쁜", "아침", "출근", "5분", "빠른", "간편", "귀차니즘", "올인원"];
const HIGH_EFFORT_BRANDS: &[&str] = &["메이크온", "LG프라엘", "프라엘"];
const SENSITIVE_KEYWORDS: &[&str] = &["민감", "트러블", "여드름", "홍조", "장벽", "뒤집어", "따가움", "진정"];
const DERMA_BRANDS: &[&str] = &["에스트라", "일리윤", "순정", "프리메라"];
const ACTIVE_BRANDS: &[&str] = &["설화수", "헤라", "아이오페", "오딧세이"];
const ANTIAGING_KEYWORDS: &[&str] = &["주름", "탄력", "노화", "리프팅", "기미", "안티에이징"];
const BUDGET_KEYWORDS: &[&str] = &["가성비", "학생", "대학생", "저렴", "세일", "로드샵"];
const LUXURY_BRANDS: &[&str] = &["설화수", "헤라", "아모레퍼시픽", "아이오페", "바이탈뷰티"];
const MASS_BRANDS: &[&str] = &["에뛰드", "이니스프리", "해피바스"];
const ECO_KEYWORDS: &[&str] = &["비건", "환경", "클린", "동물", "윤리"];
const ECO_BRANDS: &[&str] = &["프리메라", "롱테이크", "이니스프리"];

/// Lifestyle and skin-profile business rules.
///
/// - busy lifestyle × high-effort device brand: ×0.1
/// - sensitive skin: derma ×1.3, active ×0.5
/// - anti-aging need: luxury ×1.2, mass ×0.9
/// - budget focus: mass ×1.2, luxury ×0.2
/// - eco focus: eco brands ×1.2, everything else ×0.9
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusinessRules;

impl ScoreAdjustment for BusinessRules {
    fn multiplier(&self, candidate: &Product, persona: &PersonaRow) -> f64 {
        let keywords = persona.keywords().join(" ");
        let mentions = |list: &[&str]| list.iter().any(|k| keywords.contains(k));
        let brand = candidate.brand_key.as_str();
        let is = |list: &[&str]| list.contains(&brand);

        let mut m = 1.0;
        if mentions(BUSY_KEYWORDS) && is(HIGH_EFFORT_BRANDS) {
            m *= 0.1;
        }
        if mentions(SENSITIVE_KEYWORDS) {
            if is(DERMA_BRANDS) {
                m *= 1.3;
            } else if is(ACTIVE_BRANDS) {
                m *= 0.5;
            }
        }
        if mentions(ANTIAGING_KEYWORDS) {
            if is(LUXURY_BRANDS) {
                m *= 1.2;
            } else if is(MASS_BRANDS) {
                m *= 0.9;
            }
        }
        if mentions(BUDGET_KEYWORDS) {
            if is(MASS_BRANDS) {
                m *= 1.2;
            } else if is(LUXURY_BRANDS) {
                m *= 0.2;
            }
        }
        if mentions(ECO_KEYWORDS) {
            m *= if is(ECO_BRANDS) { 1.2 } else { 0.9 };
        }
        m
    }
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

/// Base strategy times every adjustment.
pub struct CompositeScorer {
    base: Box<dyn ScoringStrategy>,
    adjustments: Vec<Box<dyn ScoreAdjustment>>,
}

impl std::fmt::Debug for CompositeScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeScorer")
            .field("adjustments", &self.adjustments.len())
            .finish()
    }
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self::standard()
    }
}

impl CompositeScorer {
    /// A scorer over `base` with no adjustments.
    pub fn new(base: Box<dyn ScoringStrategy>) -> Self {
        Self {
            base,
            adjustments: Vec::new(),
        }
    }

    /// Add an adjustment.
    pub fn with(mut self, adjustment: Box<dyn ScoreAdjustment>) -> Self {
        self.adjustments.push(adjustment);
        self
    }

    /// Weighted similarity with affinity, own-brand boost and business rules.
    pub fn standard() -> Self {
        Self::new(Box::new(WeightedSimilarity::default()))
            .with(Box::new(PersonaBrandAffinity::standard()))
            .with(Box::new(TargetBrandBoost::default()))
            .with(Box::new(BusinessRules))
    }
}

impl ScoringStrategy for CompositeScorer {
    fn score(&self, candidate: &Product, persona: &PersonaRow) -> f64 {
        self.adjustments
            .iter()
            .fold(self.base.score(candidate, persona), |acc, adj| {
                acc * adj.multiplier(candidate, persona)
            })
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// How the final product is picked among scored candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Highest score; ties keep catalog order.
    #[default]
    Best,
    /// Score-proportional draw among the top candidates.
    Sampled,
}

/// Scores catalog candidates and picks one product per persona row.
pub struct ProductSelector {
    scorer: Box<dyn ScoringStrategy>,
    mode: SelectionMode,
    top_k: usize,
    rng: StdRng,
}

impl std::fmt::Debug for ProductSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductSelector")
            .field("mode", &self.mode)
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl ProductSelector {
    /// Selector using `scorer`.
    ///
    /// `seed` fixes the sampling RNG; otherwise it is seeded from entropy.
    pub fn new(
        scorer: Box<dyn ScoringStrategy>,
        mode: SelectionMode,
        top_k: usize,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            scorer,
            mode,
            top_k: top_k.max(1),
            rng,
        }
    }

    /// Deterministic best-score selector with the standard scorer.
    pub fn best() -> Self {
        Self::new(Box::new(CompositeScorer::standard()), SelectionMode::Best, 1, Some(0))
    }

    /// Resolve the product for `persona`, filtered to `brand_hint`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::EmptyCatalog`] if the catalog has no candidate.
    pub fn select_product(
        &mut self,
        catalog: &CatalogStore,
        brand_hint: &str,
        persona: &PersonaRow,
    ) -> Result<SelectedProduct, DataError> {
        let set = catalog.candidates(brand_hint, persona)?;

        let mut scored: Vec<(&Product, f64)> = set
            .products
            .iter()
            .map(|p| (*p, self.scorer.score(p, persona)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let index = match self.mode {
            SelectionMode::Best => 0,
            SelectionMode::Sampled => self.sample_index(&scored),
        };
        let (product, score) = scored
            .get(index)
            .or_else(|| scored.first())
            .copied()
            .ok_or(DataError::EmptyCatalog)?;

        debug!(
            product = %product.name,
            brand = %product.brand,
            score,
            candidates = scored.len(),
            brand_fallback = set.brand_fallback,
            "product selected"
        );
        Ok(SelectedProduct {
            product: product.clone(),
            score,
            brand_fallback: set.brand_fallback,
        })
    }

    fn sample_index(&mut self, scored: &[(&Product, f64)]) -> usize {
        let pool = scored.len().min(self.top_k);
        let weights: Vec<f64> = scored
            .iter()
            .take(pool)
            .map(|(_, s)| if s.is_finite() { s.max(0.0) } else { 0.0 })
            .collect();
        match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => 0,
        }
    }
}
