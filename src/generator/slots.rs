//! Mechanical post-processing of the four body slots.
//!
//! Nothing here calls the model. Each step either deletes, normalizes or
//! injects a known literal; none of them invents new content.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::hints::Literals;
use crate::data::brand::hybrid_partners;
use crate::phrases::PhraseBook;
use crate::text::{
    collapse_whitespace, contains_ignoring_space, count_emoji, ends_with_emoji, is_emoji, is_terminal, normalize_for_dedupe,
    split_sentences, strip_emoji, tokens, with_particle, Particle,
};
use crate::validator::{product_mentioned, SLOT_COUNT};

/// The four body slots in outline order.
pub type Slots = [String; SLOT_COUNT];

/// Word n-gram size for cross-sentence repeat detection.
pub const DEDUPE_NGRAM: usize = 6;

static LABEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(body|slot\s*_?\d+(_text)?|슬롯\s*\d+|본문)\s*[:：]\s*").ok()
});
static TITLE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(title|제목)\s*[:：]").ok());
static MARKDOWN_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(https?://[^)]*\)").ok());
static BARE_URL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)https?://\S+").ok());
static GLUED_MARK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([?!.])([가-힣A-Za-z])").ok());
static SPACE_BEFORE_MARK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\s+([.!?,])").ok());
static REPEATED_MARKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([.!?])[.!?]+").ok());

fn replace_all(rx: &LazyLock<Option<Regex>>, text: &str, with: &str) -> String {
    match rx.as_ref() {
        Some(rx) => rx.replace_all(text, with).into_owned(),
        None => text.to_owned(),
    }
}

/// Clean a raw completion while keeping its line structure.
///
/// Drops title lines and slot labels, unwraps markdown links, removes bare
/// URLs and markdown emphasis, and scrubs banned phrases.
pub fn clean_completion(raw: &str, phrases: &PhraseBook) -> String {
    let normalized = raw.replace("\r\n", "\n");
    let mut lines = Vec::new();
    for line in normalized.split('\n') {
        if TITLE_LINE.as_ref().is_some_and(|rx| rx.is_match(line)) {
            continue;
        }
        let line = replace_all(&LABEL, line, "");
        let line = replace_all(&MARKDOWN_LINK, &line, "$1");
        let line = replace_all(&BARE_URL, &line, "");
        let line = line.replace("**", "");
        let line = line.trim_start_matches(['#', '-', '*', '>']).to_owned();
        let line = phrases.scrub_banned(&line);
        lines.push(collapse_whitespace(&line));
    }
    lines.join("\n").trim().to_owned()
}

/// Collapse two adjacent brand names (`프리메라 메이크온`) into `own_brand`.
pub fn collapse_hybrids(text: &str, own_brand: &str) -> String {
    let mut out = text.to_owned();
    for other in hybrid_partners(text, own_brand) {
        for pair in [
            format!("{other} {own_brand}"),
            format!("{other}{own_brand}"),
            format!("{own_brand} {other}"),
            format!("{own_brand}{other}"),
        ] {
            out = out.replace(&pair, own_brand);
        }
    }
    out
}

/// Split cleaned text into four slots.
///
/// Blank-line paragraphs are preferred, then single lines, then sentences
/// grouped evenly in order. Missing slots are left empty; extra trailing
/// parts are dropped.
pub fn split_slots(text: &str) -> Slots {
    let paragraphs: Vec<String> = text
        .split("\n\n")
        .map(|p| collapse_whitespace(&p.replace('\n', " ")))
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.len() >= SLOT_COUNT {
        return take_four(paragraphs);
    }

    let lines: Vec<String> = text
        .lines()
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() >= SLOT_COUNT {
        return take_four(lines);
    }

    let sentences = split_sentences(&collapse_whitespace(&text.replace('\n', " ")));
    let total = sentences.len();
    let mut slots = Slots::default();
    if total < SLOT_COUNT {
        for (slot, sentence) in slots.iter_mut().zip(sentences) {
            *slot = sentence;
        }
        return slots;
    }

    let base = total.checked_div(SLOT_COUNT).unwrap_or(0);
    let extra = total.checked_rem(SLOT_COUNT).unwrap_or(0);
    let mut iter = sentences.into_iter();
    for (i, slot) in slots.iter_mut().enumerate() {
        let size = if i < extra { base.saturating_add(1) } else { base };
        *slot = iter.by_ref().take(size).collect::<Vec<_>>().join(" ");
    }
    slots
}

fn take_four(parts: Vec<String>) -> Slots {
    let mut slots = Slots::default();
    for (slot, part) in slots.iter_mut().zip(parts) {
        *slot = part;
    }
    slots
}

/// Join slots into the four-line body.
pub fn join_slots(slots: &Slots) -> String {
    slots.iter().map(|s| s.trim()).collect::<Vec<_>>().join("\n")
}

/// Prefix the offer slot with a connective unless it already opens with one.
pub fn ensure_connective(slot: &str, phrases: &PhraseBook) -> String {
    let trimmed = slot.trim_start();
    if phrases.connectives().iter().any(|c| trimmed.starts_with(c.as_str())) {
        return slot.trim().to_owned();
    }
    match phrases.connectives().first() {
        Some(c) => format!("{c} {}", trimmed.trim_end()),
        None => slot.trim().to_owned(),
    }
}

/// Apply the punctuation and emoji rules for slot `index` (0-based).
///
/// - slot 1: no `!`, at most one `?`, no emoji
/// - slots 2 and 3: no `?`, at most two `!`, no emoji
/// - slot 4: at most one `!`, at most one emoji, `?` only on an inviting close
///
/// Every slot ends with terminal punctuation; slot 4 may end with its emoji.
pub fn enforce_punctuation(slot: &str, index: usize, phrases: &PhraseBook) -> String {
    let mut t = collapse_whitespace(slot);
    t = replace_all(&GLUED_MARK, &t, "$1 $2");
    t = replace_all(&SPACE_BEFORE_MARK, &t, "$1");

    match index {
        0 => {
            t = collapse_whitespace(&strip_emoji(&t));
            t = t.replace('!', ".");
            t = keep_first(&t, '?', 1, '.');
        }
        1 | 2 => {
            t = collapse_whitespace(&strip_emoji(&t));
            t = t.replace('?', ".");
            t = keep_first(&t, '!', 2, '.');
        }
        _ => {
            t = close_questions(&t, phrases);
            t = keep_first(&t, '!', 1, '.');
            t = keep_first_emoji(&t);
        }
    }

    t = replace_all(&REPEATED_MARKS, &t, "$1");
    let t = t.trim().to_owned();
    terminate(&t)
}

/// Replace every occurrence of `mark` after the first `keep` with `with`.
fn keep_first(text: &str, mark: char, keep: usize, with: char) -> String {
    let mut seen = 0usize;
    text.chars()
        .map(|c| {
            if c != mark {
                return c;
            }
            seen = seen.saturating_add(1);
            if seen > keep {
                with
            } else {
                c
            }
        })
        .collect()
}

fn keep_first_emoji(text: &str) -> String {
    if count_emoji(text) <= 1 {
        return text.to_owned();
    }
    let mut kept = false;
    let out: String = text
        .chars()
        .filter(|c| {
            if !is_emoji(*c) {
                return true;
            }
            if kept {
                return false;
            }
            kept = true;
            true
        })
        .collect();
    collapse_whitespace(&out)
}

/// In the closing slot a question survives only when it invites an action.
fn close_questions(text: &str, phrases: &PhraseBook) -> String {
    split_sentences(text)
        .into_iter()
        .map(|sentence| {
            if !sentence.contains('?') {
                return sentence;
            }
            let bare = strip_emoji(&sentence);
            let bare = bare.trim();
            if phrases.is_problem_question(bare) || !phrases.is_inviting_question(bare) {
                sentence.replace('?', ".")
            } else {
                sentence
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn terminate(text: &str) -> String {
    if text.is_empty() || ends_with_emoji(text) {
        return text.to_owned();
    }
    match text.chars().last() {
        Some(c) if is_terminal(c) => text.to_owned(),
        _ => format!("{text}."),
    }
}

/// Whether `text` mentions the brand.
pub fn mentions_brand(text: &str, brand: &str) -> bool {
    !brand.is_empty() && contains_ignoring_space(&text.to_lowercase(), &brand.to_lowercase())
}

/// Whether `text` mentions any concern tag or an accepted stand-in.
pub fn mentions_concern(text: &str, lit: &Literals, phrases: &PhraseBook) -> bool {
    lit.concerns.iter().any(|c| {
        let toks = tokens(c);
        if toks.is_empty() {
            text.contains(c.as_str())
        } else {
            toks.iter().any(|t| text.contains(t.as_str()))
        }
    }) || phrases
        .concern_fallbacks()
        .iter()
        .any(|f| text.contains(f.as_str()))
}

/// Inject missing literals: the concern into slot 1, the product and brand
/// into slot 2. Returns whether anything was injected.
pub fn inject_literals(slots: &mut Slots, lit: &Literals, phrases: &PhraseBook) -> bool {
    let mut changed = false;
    let body = join_slots(slots);

    if let Some(concern) = &lit.concern {
        if !mentions_concern(&body, lit, phrases) {
            let lead = format!("{} 신경 쓰이는 날이 많죠.", with_particle(concern, Particle::Subject));
            slots[0] = format!("{lead} {}", slots[0].trim()).trim().to_owned();
            changed = true;
        }
    }

    let mut brand_placed = mentions_brand(&body, &lit.brand);
    if let Some(product) = &lit.product {
        if !product_mentioned(&body, product, &lit.brand) {
            let named = if brand_placed || lit.brand.is_empty() {
                product.clone()
            } else {
                format!("{} {product}", lit.brand)
            };
            let sentence = format!("{} 더해 보세요.", with_particle(&named, Particle::Object));
            slots[1] = prepend_after_connective(&slots[1], &sentence, phrases);
            brand_placed = true;
            changed = true;
        } else if !brand_placed && !lit.brand.is_empty() && slots[1].contains(product.as_str()) {
            slots[1] = slots[1].replacen(product.as_str(), &format!("{} {product}", lit.brand), 1);
            brand_placed = true;
            changed = true;
        }
    }

    if !brand_placed && !lit.brand.is_empty() {
        let sentence = format!(
            "{} 곁에서 루틴을 가볍게 채워 줘요.",
            with_particle(&lit.brand, Particle::Subject)
        );
        slots[1] = format!("{} {sentence}", slots[1].trim()).trim().to_owned();
        changed = true;
    }
    changed
}

/// Insert `sentence` right after the slot's opening connective.
fn prepend_after_connective(slot: &str, sentence: &str, phrases: &PhraseBook) -> String {
    let trimmed = slot.trim();
    for c in phrases.connectives() {
        if let Some(rest) = trimmed.strip_prefix(c.as_str()) {
            let rest = rest.trim_start_matches([',', ' ']);
            return format!("{c} {sentence} {rest}").trim().to_owned();
        }
    }
    format!("{sentence} {trimmed}").trim().to_owned()
}

/// Delete repeated sentences across the whole body.
///
/// A sentence is dropped when its normalized form was already seen, or when
/// it has at least `n` words and shares any word `n`-gram with an earlier
/// sentence. A slot is never emptied: if every sentence of a slot would be
/// dropped, its first sentence stays.
pub fn dedupe_sentences(slots: &mut Slots, n: usize) -> bool {
    let mut seen_exact: BTreeSet<String> = BTreeSet::new();
    let mut seen_grams: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut changed = false;

    for slot in slots.iter_mut() {
        let sentences = split_sentences(slot);
        let mut kept: Vec<String> = Vec::new();
        let mut dropped_first: Option<String> = None;
        for sentence in sentences {
            let norm = normalize_for_dedupe(&sentence);
            let words: Vec<String> = sentence.split_whitespace().map(str::to_owned).collect();
            let grams: Vec<Vec<String>> = if n > 0 && words.len() >= n {
                words.windows(n).map(<[String]>::to_vec).collect()
            } else {
                Vec::new()
            };
            let duplicate = (!norm.is_empty() && seen_exact.contains(&norm))
                || grams.iter().any(|g| seen_grams.contains(g));
            if duplicate {
                changed = true;
                if kept.is_empty() && dropped_first.is_none() {
                    dropped_first = Some(sentence);
                }
                continue;
            }
            if !norm.is_empty() {
                seen_exact.insert(norm);
            }
            seen_grams.extend(grams);
            kept.push(sentence);
        }
        if kept.is_empty() {
            if let Some(first) = dropped_first {
                kept.push(first);
            }
        }
        if changed {
            *slot = kept.join(" ");
        }
    }
    changed
}
