//! Brand name normalization.
//!
//! Source tables spell brands inconsistently (`MakeON`, `메이크온`,
//! `프리메라(Primera)`, stray zero-width characters). Every brand key used for
//! lookup or comparison goes through [`normalize_brand`].

use unicode_normalization::UnicodeNormalization;

/// Canonical brand names with the latin aliases that map onto them.
const BRAND_ALIASES: &[(&str, &[&str])] = &[
    ("메이크온", &["MAKEON"]),
    ("프리메라", &["PRIMERA"]),
    ("라네즈", &["LANEIGE"]),
    ("설화수", &["SULWHASOO"]),
    ("이니스프리", &["INNISFREE"]),
    ("에뛰드", &["ETUDEHOUSE", "ETUDE"]),
    ("마몽드", &["MAMONDE"]),
    ("일리윤", &["ILLIYOON"]),
    ("에스트라", &["AESTURA"]),
    ("오딧세이", &["ODYSSEY"]),
    ("해피바스", &["HAPPYBATH"]),
    ("바이탈뷰티", &["VITALBEAUTIE"]),
    ("롱테이크", &["LONGTAKE"]),
    ("아이오페", &["IOPE"]),
    ("아모레퍼시픽", &["AMOREPACIFIC"]),
    ("헤라", &["HERA"]),
];

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

/// NFC-normalized `raw` with zero-width characters removed and whitespace
/// trimmed. Used for display values such as the brand literal in copy.
pub fn clean_brand(raw: &str) -> String {
    let nfc: String = raw.nfc().filter(|c| !is_zero_width(*c)).collect();
    nfc.trim().to_owned()
}

/// Canonical lookup key for a brand name.
///
/// Applies NFC normalization, strips zero-width characters, whitespace and
/// punctuation, then maps known latin or mixed spellings onto the canonical
/// Korean name. A known name must match the whole string or one whole
/// punctuation-separated token (`프리메라(Primera)`); a brand that merely
/// contains a known name (`헤라클레스`) is unknown. Unknown brands return the
/// cleaned string.
pub fn normalize_brand(raw: &str) -> String {
    let display = clean_brand(raw);
    let cleaned: String = display.chars().filter(|c| c.is_alphanumeric()).collect();
    if cleaned.is_empty() {
        return cleaned;
    }
    if let Some(canonical) = lookup_alias(&cleaned) {
        return canonical.to_owned();
    }
    display
        .split(|c: char| !c.is_alphanumeric() && !c.is_whitespace())
        .map(|t| t.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .find_map(|t| lookup_alias(&t))
        .map_or(cleaned, str::to_owned)
}

fn lookup_alias(token: &str) -> Option<&'static str> {
    if token.is_empty() {
        return None;
    }
    let upper = token.to_uppercase();
    BRAND_ALIASES
        .iter()
        .find(|(canonical, aliases)| upper == *canonical || aliases.iter().any(|a| upper == *a))
        .map(|(canonical, _)| *canonical)
}

/// Canonical names of every known brand.
pub fn known_brands() -> impl Iterator<Item = &'static str> {
    BRAND_ALIASES.iter().map(|(canonical, _)| *canonical)
}

/// Known brand names, other than `own_brand`, that appear directly next to
/// `own_brand` in `text`, such as `프리메라 메이크온`.
pub fn hybrid_partners(text: &str, own_brand: &str) -> Vec<&'static str> {
    let own = clean_brand(own_brand);
    if own.is_empty() {
        return Vec::new();
    }
    let own_key = normalize_brand(&own);
    known_brands()
        .filter(|other| *other != own_key && *other != own)
        .filter(|other| {
            [
                format!("{other} {own}"),
                format!("{other}{own}"),
                format!("{own} {other}"),
                format!("{own}{other}"),
            ]
            .iter()
            .any(|pair| text.contains(pair.as_str()))
        })
        .collect()
}
