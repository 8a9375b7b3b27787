//! Validation error tags.

use std::fmt;

use serde::{Serialize, Serializer};

/// One validation failure.
///
/// Errors are data, never exceptions: the pipeline collects them, feeds them
/// back into the next generation attempt and attaches whatever remains to the
/// output record. Each variant renders to a stable tag string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `title_empty`
    TitleEmpty,
    /// `title_len<{min}`
    TitleTooShort {
        /// Configured minimum.
        min: usize,
    },
    /// `title_len>{max}`
    TitleTooLong {
        /// Configured maximum.
        max: usize,
    },
    /// `title_emoji`: the title does not start and end with an emoji.
    TitleEmoji,
    /// `body_len<{min}`
    BodyTooShort {
        /// Configured minimum.
        min: usize,
    },
    /// `body_len>{max}`
    BodyTooLong {
        /// Configured maximum.
        max: usize,
    },
    /// `slot_count<4`
    TooFewSlots,
    /// `slot_count>4`
    TooManySlots,
    /// `slot1_invalid`: the opening line carries none of the persona's
    /// lifestyle, environment, season or time-of-use context.
    Slot1Invalid,
    /// `slot2_invalid`: the offer line misses the product or every skin and
    /// texture attribute of the persona.
    Slot2Invalid,
    /// `slot3_routine_missing`: the usage line has no routine wording.
    Slot3RoutineMissing,
    /// `slot4_invalid`: the closing line ignores the persona's channel,
    /// repurchase, price and call-to-action preferences.
    Slot4Invalid,
    /// `brand_missing`
    BrandMissing,
    /// `brand_hybrid`: two brand names written as one.
    BrandHybrid,
    /// `product_missing`
    ProductMissing,
    /// `skin_concern_missing`
    SkinConcernMissing,
    /// `meta_phrase:{phrase}`
    MetaPhrase(String),
    /// `markdown_link_banned`
    MarkdownLink,
    /// `duplicate_sentence`
    DuplicateSentence,
    /// `rule_banned:{word}`
    RuleBanned(String),
    /// `rule_avoid:{phrase}`
    RuleAvoid(String),
    /// `rule_must_include:{word}`
    RuleMustInclude(String),
    /// `plan_missing`: the plan failed its outline precondition.
    PlanMissing,
    /// `generation_failed`: the language-model call failed for this attempt.
    GenerationFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TitleEmpty => f.write_str("title_empty"),
            Self::TitleTooShort { min } => write!(f, "title_len<{min}"),
            Self::TitleTooLong { max } => write!(f, "title_len>{max}"),
            Self::TitleEmoji => f.write_str("title_emoji"),
            Self::BodyTooShort { min } => write!(f, "body_len<{min}"),
            Self::BodyTooLong { max } => write!(f, "body_len>{max}"),
            Self::TooFewSlots => f.write_str("slot_count<4"),
            Self::TooManySlots => f.write_str("slot_count>4"),
            Self::Slot1Invalid => f.write_str("slot1_invalid"),
            Self::Slot2Invalid => f.write_str("slot2_invalid"),
            Self::Slot3RoutineMissing => f.write_str("slot3_routine_missing"),
            Self::Slot4Invalid => f.write_str("slot4_invalid"),
            Self::BrandMissing => f.write_str("brand_missing"),
            Self::BrandHybrid => f.write_str("brand_hybrid"),
            Self::ProductMissing => f.write_str("product_missing"),
            Self::SkinConcernMissing => f.write_str("skin_concern_missing"),
            Self::MetaPhrase(p) => write!(f, "meta_phrase:{p}"),
            Self::MarkdownLink => f.write_str("markdown_link_banned"),
            Self::DuplicateSentence => f.write_str("duplicate_sentence"),
            Self::RuleBanned(w) => write!(f, "rule_banned:{w}"),
            Self::RuleAvoid(w) => write!(f, "rule_avoid:{w}"),
            Self::RuleMustInclude(w) => write!(f, "rule_must_include:{w}"),
            Self::PlanMissing => f.write_str("plan_missing"),
            Self::GenerationFailed => f.write_str("generation_failed"),
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Tag strings for a list of errors, in order.
pub fn tags(errors: &[ErrorKind]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}
