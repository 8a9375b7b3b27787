//! Deterministic body-length fitting.
//!
//! Short bodies are padded from the phrase pool and the persona-hint
//! expansions; long bodies lose whole sentences, least important first.

use super::hints::{offer_expansion, usage_expansion, Literals, PersonaHints};
use super::slots::{join_slots, mentions_brand, mentions_concern, Slots};
use crate::phrases::PhraseBook;
use crate::text::{char_len, is_terminal, split_sentences, truncate_chars};
use crate::validator::{product_mentioned, LengthBands};

/// Character length of the joined body.
pub fn body_len(slots: &Slots) -> usize {
    char_len(&join_slots(slots))
}

/// Pad a short body.
///
/// First inserts one pool phrase into the closing slot, before its final
/// sentence, then appends the offer expansion to slot 2 and the usage
/// expansion to slot 3. Nothing is inserted that is already present or that
/// would push the body past `body_max`. Returns whether anything changed.
pub fn pad_short(
    slots: &mut Slots,
    bands: &LengthBands,
    phrases: &PhraseBook,
    hints: &PersonaHints,
) -> bool {
    if body_len(slots) >= bands.body_min {
        return false;
    }
    let mut changed = phrases
        .pad_pool()
        .iter()
        .any(|pad| try_insert(slots, 3, pad, bands, InsertAt::BeforeLast));

    for (index, sentence) in [(1, offer_expansion(hints)), (2, usage_expansion(hints))] {
        if body_len(slots) >= bands.body_min {
            break;
        }
        if try_insert(slots, index, &sentence, bands, InsertAt::End) {
            changed = true;
        }
    }
    changed
}

#[derive(Clone, Copy)]
enum InsertAt {
    BeforeLast,
    End,
}

fn try_insert(slots: &mut Slots, index: usize, sentence: &str, bands: &LengthBands, at: InsertAt) -> bool {
    if join_slots(slots).contains(sentence) {
        return false;
    }
    let Some(slot) = slots.get_mut(index) else {
        return false;
    };
    let mut parts = split_sentences(slot);
    match at {
        InsertAt::BeforeLast if !parts.is_empty() => {
            let last = parts.len().saturating_sub(1);
            parts.insert(last, sentence.to_owned());
        }
        _ => parts.push(sentence.to_owned()),
    }
    let candidate = parts.join(" ");
    let previous = std::mem::replace(slot, candidate);
    if body_len(slots) > bands.body_max {
        if let Some(slot) = slots.get_mut(index) {
            *slot = previous;
        }
        return false;
    }
    true
}

/// Trim a long body down to `body_max`.
///
/// Sentences are removed scanning backward from the penultimate sentence of
/// the body. A slot never loses its only sentence. Sentences carrying the
/// brand, product or concern literal go last, and a removal that keeps the
/// body at or above `body_min` is preferred. If no sentence can go, the
/// longest slot is cut hard and closed with a period. Returns whether
/// anything changed.
pub fn trim_overflow(slots: &mut Slots, bands: &LengthBands, lit: &Literals, phrases: &PhraseBook) -> bool {
    let mut changed = false;
    while body_len(slots) > bands.body_max {
        match pick_removal(slots, bands, lit, phrases) {
            Some((slot_idx, sentence_idx)) => {
                if let Some(slot) = slots.get_mut(slot_idx) {
                    let mut parts = split_sentences(slot);
                    if sentence_idx < parts.len() {
                        parts.remove(sentence_idx);
                    }
                    *slot = parts.join(" ");
                }
                changed = true;
            }
            None => {
                hard_truncate(slots, bands);
                return true;
            }
        }
    }
    changed
}

fn pick_removal(
    slots: &Slots,
    bands: &LengthBands,
    lit: &Literals,
    phrases: &PhraseBook,
) -> Option<(usize, usize)> {
    let total = body_len(slots);
    let mut flat: Vec<(usize, usize, String, usize)> = Vec::new();
    for (slot_idx, slot) in slots.iter().enumerate() {
        let parts = split_sentences(slot);
        let count = parts.len();
        for (sentence_idx, sentence) in parts.into_iter().enumerate() {
            flat.push((slot_idx, sentence_idx, sentence, count));
        }
    }
    // The closing sentence of the body is never a candidate.
    flat.pop();

    let mut tiers: [Option<(usize, usize)>; 4] = [None; 4];
    for (slot_idx, sentence_idx, sentence, count) in flat.iter().rev() {
        if *count < 2 {
            continue;
        }
        let protected = is_protected(sentence, lit, phrases);
        // Removing a sentence also removes the space that joined it.
        let after = total.saturating_sub(char_len(sentence).saturating_add(1));
        let keeps_min = after >= bands.body_min;
        let tier = match (protected, keeps_min) {
            (false, true) => 0,
            (false, false) => 1,
            (true, true) => 2,
            (true, false) => 3,
        };
        if let Some(entry) = tiers.get_mut(tier) {
            if entry.is_none() {
                *entry = Some((*slot_idx, *sentence_idx));
            }
        }
    }
    tiers.into_iter().flatten().next()
}

fn is_protected(sentence: &str, lit: &Literals, phrases: &PhraseBook) -> bool {
    if mentions_brand(sentence, &lit.brand) {
        return true;
    }
    if let Some(product) = &lit.product {
        if product_mentioned(sentence, product, &lit.brand) {
            return true;
        }
    }
    lit.concern.is_some() && mentions_concern(sentence, lit, phrases)
}

/// Shortest a slot is cut to before the next slot is touched.
const MIN_CUT_CHARS: usize = 8;

/// Cut single-sentence slots until the body fits.
///
/// The longest of slots 1–3 is cut first; the closing slot is cut only
/// when the others are already at [`MIN_CUT_CHARS`].
fn hard_truncate(slots: &mut Slots, bands: &LengthBands) {
    loop {
        let overflow = body_len(slots).saturating_sub(bands.body_max);
        if overflow == 0 {
            return;
        }
        let cuttable = |i: &usize| slots.get(*i).is_some_and(|s| char_len(s) >= MIN_CUT_CHARS.saturating_add(2));
        let last = slots.len().saturating_sub(1);
        let pick = (0..last)
            .filter(cuttable)
            .max_by_key(|i| (slots.get(*i).map_or(0, |s| char_len(s)), std::cmp::Reverse(*i)))
            .or_else(|| Some(last).filter(cuttable));
        let Some(slot) = pick.and_then(|i| slots.get_mut(i)) else {
            return;
        };
        let keep = char_len(slot)
            .saturating_sub(overflow.saturating_add(1))
            .max(MIN_CUT_CHARS);
        let cut = truncate_chars(slot, keep);
        let cut = cut.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || is_terminal(c));
        *slot = format!("{cut}.");
    }
}
