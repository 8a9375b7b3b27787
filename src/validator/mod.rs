//! The message checklist.
//!
//! [`Validator::validate`] is a pure function over a persona row, a brand rule
//! and a `(title, body)` pair. Every check runs on every call so the repair
//! loop sees the complete failure set.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::data::brand::{clean_brand, hybrid_partners};
use crate::data::catalog::strip_unit_suffix;
use crate::data::persona::PersonaRow;
use crate::data::rules::BrandRule;
use crate::phrases::PhraseBook;
use crate::text::{
    char_len, contains_ignoring_space, ends_with_emoji, jaccard, normalize_for_dedupe,
    starts_with_emoji, tokens,
};

mod kind;

pub use kind::{tags, ErrorKind};

/// Number of slot lines every body carries.
pub const SLOT_COUNT: usize = 4;

/// Words that mark the usage line as a routine.
const ROUTINE_KEYWORDS: &[&str] = &[
    "아침", "저녁", "루틴", "매일", "일상", "반복", "지속", "계속", "이어", "관리", "습관",
];

static MARKDOWN_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[.*?\]\(https?://").ok());

/// Inclusive character-length bands for title and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBands {
    /// Minimum title length.
    pub title_min: usize,
    /// Maximum title length.
    pub title_max: usize,
    /// Minimum body length, newlines included.
    pub body_min: usize,
    /// Maximum body length, newlines included.
    pub body_max: usize,
}

impl Default for LengthBands {
    fn default() -> Self {
        Self {
            title_min: 25,
            title_max: 40,
            body_min: 300,
            body_max: 350,
        }
    }
}

/// Whether a missing skin-concern literal fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinConcernMode {
    /// Missing concern is `skin_concern_missing`.
    #[default]
    Strict,
    /// Missing concern is only logged.
    Lenient,
}

/// Validator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatorSettings {
    /// Title and body bands.
    pub bands: LengthBands,
    /// Skin-concern strictness.
    pub skin_concern: SkinConcernMode,
    /// Token-Jaccard similarity at which two lines are duplicates.
    pub duplicate_threshold: f64,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            bands: LengthBands::default(),
            skin_concern: SkinConcernMode::Strict,
            duplicate_threshold: 0.85,
        }
    }
}

/// Stateless message checklist.
#[derive(Debug, Clone)]
pub struct Validator {
    settings: ValidatorSettings,
    phrases: Arc<PhraseBook>,
}

impl Validator {
    /// A validator sharing `phrases` with the generator.
    pub fn new(settings: ValidatorSettings, phrases: Arc<PhraseBook>) -> Self {
        Self { settings, phrases }
    }

    /// The configured settings.
    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }

    /// Every failure of `(title, body)` for `row` under `rule`, in checklist
    /// order. An empty list means the message is deliverable.
    pub fn validate(&self, row: &PersonaRow, title: &str, body: &str, rule: &BrandRule) -> Vec<ErrorKind> {
        let title = title.trim();
        let body = body.trim();
        let mut errors = Vec::new();

        self.check_title(title, &mut errors);
        self.check_body_length(body, &mut errors);
        let lines = slot_lines(body);
        if lines.len() < SLOT_COUNT {
            errors.push(ErrorKind::TooFewSlots);
        } else if lines.len() > SLOT_COUNT {
            errors.push(ErrorKind::TooManySlots);
        }

        check_brand(row, title, body, &mut errors);
        if let Some(name) = row.product_name() {
            if !product_mentioned(body, name, &row.brand) {
                errors.push(ErrorKind::ProductMissing);
            }
        }
        self.check_skin_concern(row, title, body, &mut errors);
        if let [s1, s2, s3, s4, ..] = lines.as_slice() {
            self.check_slots(row, [*s1, *s2, *s3, *s4], &mut errors);
        }

        for phrase in self.phrases.find_banned(body) {
            errors.push(ErrorKind::MetaPhrase(phrase));
        }
        if MARKDOWN_LINK.as_ref().is_some_and(|rx| rx.is_match(body)) {
            errors.push(ErrorKind::MarkdownLink);
        }
        if has_duplicate_lines(&lines, self.settings.duplicate_threshold) {
            errors.push(ErrorKind::DuplicateSentence);
        }

        self.check_rule(body, rule, &mut errors);
        errors
    }

    fn check_title(&self, title: &str, errors: &mut Vec<ErrorKind>) {
        let bands = &self.settings.bands;
        if title.is_empty() {
            errors.push(ErrorKind::TitleEmpty);
            return;
        }
        let len = char_len(title);
        if len < bands.title_min {
            errors.push(ErrorKind::TitleTooShort { min: bands.title_min });
        }
        if len > bands.title_max {
            errors.push(ErrorKind::TitleTooLong { max: bands.title_max });
        }
        if !(starts_with_emoji(title) && ends_with_emoji(title)) {
            errors.push(ErrorKind::TitleEmoji);
        }
    }

    fn check_body_length(&self, body: &str, errors: &mut Vec<ErrorKind>) {
        let bands = &self.settings.bands;
        let len = char_len(body);
        if len < bands.body_min {
            errors.push(ErrorKind::BodyTooShort { min: bands.body_min });
        }
        if len > bands.body_max {
            errors.push(ErrorKind::BodyTooLong { max: bands.body_max });
        }
    }

    fn check_skin_concern(&self, row: &PersonaRow, title: &str, body: &str, errors: &mut Vec<ErrorKind>) {
        let concerns = row.skin_concerns();
        if concerns.is_empty() {
            return;
        }
        let text = format!("{title}\n{body}");
        let mentioned = concerns.iter().any(|c| loose_contains(&text, c))
            || self
                .phrases
                .concern_fallbacks()
                .iter()
                .any(|f| text.contains(f.as_str()));
        if mentioned {
            return;
        }
        match self.settings.skin_concern {
            SkinConcernMode::Strict => errors.push(ErrorKind::SkinConcernMissing),
            SkinConcernMode::Lenient => {
                debug!(persona_id = %row.persona_id, "skin concern not mentioned (lenient)");
            }
        }
    }

    /// Per-slot content. A slot whose persona context is entirely absent is
    /// not judged, since no rewrite could satisfy it.
    fn check_slots(&self, row: &PersonaRow, [s1, s2, s3, s4]: [&str; 4], errors: &mut Vec<ErrorKind>) {
        let any_in = |slot: &str, fields: &[Option<&str>]| -> Option<bool> {
            let present: Vec<&str> = fields.iter().flatten().copied().collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().any(|v| loose_contains(slot, v)))
            }
        };

        let context = [
            row.lifestyle.as_deref(),
            row.environment_context.as_deref(),
            row.seasonality.as_deref(),
            row.time_of_use.as_deref(),
        ];
        if any_in(s1, &context) == Some(false) {
            errors.push(ErrorKind::Slot1Invalid);
        }

        let product_ok = row
            .product_name()
            .is_none_or(|name| product_mentioned(s2, name, &row.brand));
        let concern = match self.settings.skin_concern {
            SkinConcernMode::Strict => row.skin_concern.as_deref(),
            SkinConcernMode::Lenient => None,
        };
        let attributes = [
            concern,
            row.texture_preference.as_deref(),
            row.finish_preference.as_deref(),
            row.scent_preference.as_deref(),
        ];
        let attribute_ok = any_in(s2, &attributes) != Some(false);
        if !product_ok || !attribute_ok {
            errors.push(ErrorKind::Slot2Invalid);
        }

        if !ROUTINE_KEYWORDS.iter().any(|k| s3.contains(k)) {
            errors.push(ErrorKind::Slot3RoutineMissing);
        }

        let closing = [
            row.shopping_channel.as_deref(),
            row.repurchase_tendency.as_deref(),
            row.price_sensitivity.as_deref(),
            row.cta_style.as_deref(),
        ];
        if any_in(s4, &closing) == Some(false) {
            errors.push(ErrorKind::Slot4Invalid);
        }
    }

    fn check_rule(&self, body: &str, rule: &BrandRule, errors: &mut Vec<ErrorKind>) {
        let folded = body.to_lowercase();
        for word in &rule.banned {
            if !word.is_empty() && folded.contains(&word.to_lowercase()) {
                errors.push(ErrorKind::RuleBanned(word.clone()));
            }
        }
        for phrase in &rule.avoid {
            if !phrase.is_empty() && folded.contains(&phrase.to_lowercase()) {
                errors.push(ErrorKind::RuleAvoid(phrase.clone()));
            }
        }
        for word in &rule.must_include {
            if !self.must_include_satisfied(&folded, word) {
                errors.push(ErrorKind::RuleMustInclude(word.clone()));
            }
        }
    }

    /// A required word is present literally (ignoring case and spacing), by
    /// any of its multi-character tokens, or by a known everyday stand-in.
    fn must_include_satisfied(&self, folded_body: &str, word: &str) -> bool {
        let word = word.trim();
        if word.is_empty() {
            return true;
        }
        let folded_word = word.to_lowercase();
        if contains_ignoring_space(folded_body, &folded_word) {
            return true;
        }
        if tokens(&folded_word).iter().any(|t| folded_body.contains(t.as_str())) {
            return true;
        }
        self.phrases
            .equivalents(word)
            .is_some_and(|alts| alts.iter().any(|a| folded_body.contains(&a.to_lowercase())))
    }
}

/// Non-empty trimmed lines of `body`.
pub fn slot_lines(body: &str) -> Vec<&str> {
    body.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

fn check_brand(row: &PersonaRow, title: &str, body: &str, errors: &mut Vec<ErrorKind>) {
    let brand = clean_brand(&row.brand);
    if brand.is_empty() {
        return;
    }
    let present = |text: &str| {
        let folded = text.to_lowercase();
        contains_ignoring_space(&folded, &brand.to_lowercase())
            || (!row.normalized_brand.is_empty() && folded.contains(&row.normalized_brand.to_lowercase()))
    };
    if !present(title) && !present(body) {
        errors.push(ErrorKind::BrandMissing);
    }
    let combined = format!("{title}\n{body}");
    let partner = if row.normalized_brand.is_empty() {
        brand.as_str()
    } else {
        row.normalized_brand.as_str()
    };
    if !hybrid_partners(&combined, partner).is_empty() {
        errors.push(ErrorKind::BrandHybrid);
    }
}

/// Whether `body` mentions the product `name`.
///
/// Accepts the full name, the name without its unit suffix, or any
/// multi-character token of it other than the brand itself.
pub fn product_mentioned(body: &str, name: &str, brand: &str) -> bool {
    let folded = body.to_lowercase();
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return true;
    }
    if contains_ignoring_space(&folded, &name) {
        return true;
    }
    let stripped = strip_unit_suffix(&name);
    if contains_ignoring_space(&folded, &stripped) {
        return true;
    }
    let brand_tokens: Vec<String> = tokens(&brand.to_lowercase());
    tokens(&stripped)
        .iter()
        .filter(|t| !brand_tokens.contains(t))
        .any(|t| folded.contains(t.as_str()))
}

/// At least one multi-character token of `needle` appears in `text`; a
/// needle without such tokens must appear whole.
fn loose_contains(text: &str, needle: &str) -> bool {
    let toks = tokens(needle);
    if toks.is_empty() {
        return text.contains(needle.trim());
    }
    toks.iter().any(|t| text.contains(t.as_str()))
}

fn has_duplicate_lines(lines: &[&str], threshold: f64) -> bool {
    let normalized: Vec<String> = lines
        .iter()
        .map(|l| normalize_for_dedupe(l))
        .filter(|l| !l.is_empty())
        .collect();
    for (i, a) in normalized.iter().enumerate() {
        if normalized.iter().skip(i.saturating_add(1)).any(|b| b == a) {
            return true;
        }
    }
    for (i, a) in lines.iter().enumerate() {
        if lines
            .iter()
            .skip(i.saturating_add(1))
            .any(|b| jaccard(a, b) >= threshold)
        {
            return true;
        }
    }
    false
}
