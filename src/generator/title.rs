//! Title cleanup and band fitting.

use super::hints::Literals;
use super::slots::collapse_hybrids;
use crate::phrases::PhraseBook;
use crate::providers::offline::OFFLINE_PLACEHOLDER;
use crate::text::{
    char_len, collapse_whitespace, ends_with_emoji, is_emoji, is_emoji_modifier, starts_with_emoji,
    truncate_chars, with_particle, Particle,
};
use crate::validator::LengthBands;

const DEFAULT_EMOJI: &str = "✨";
const DEFAULT_CONTEXT: &str = "오늘 루틴";
const MIN_CORE: usize = 10;
const PADS: &[&str] = &[" 촉촉하게 마무리해요", " 오늘 루틴이에요"];
const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’', '「', '」'];

/// Fit a raw title into the title band with emoji at both ends.
///
/// A title that already satisfies the band and emoji rule is returned
/// unchanged. Otherwise existing edge emoji are kept (or `✨` added), the
/// core is truncated to fit, and short titles are padded. A core under ten
/// characters is replaced by a template built from `lit` and `context`.
pub fn fit_title(raw: &str, lit: &Literals, context: Option<&str>, bands: &LengthBands, phrases: &PhraseBook) -> String {
    let title = clean_title(raw, lit, phrases);
    let len = char_len(&title);
    if (bands.title_min..=bands.title_max).contains(&len) && starts_with_emoji(&title) && ends_with_emoji(&title) {
        return title;
    }

    let (lead, core, trail) = split_emoji_edges(&title);
    let lead = if lead.is_empty() { DEFAULT_EMOJI.to_owned() } else { lead };
    let trail = if trail.is_empty() { DEFAULT_EMOJI.to_owned() } else { trail };
    let mut core = if char_len(&core) < MIN_CORE {
        fallback_core(lit, context)
    } else {
        core
    };

    let budget = bands
        .title_max
        .saturating_sub(char_len(&lead))
        .saturating_sub(char_len(&trail))
        .saturating_sub(2);
    if char_len(&core) > budget {
        core = truncate_chars(&core, budget)
            .trim_end_matches(|c: char| c.is_whitespace() || c == ',')
            .to_owned();
    }
    for pad in PADS {
        if assembled_len(&lead, &core, &trail) >= bands.title_min {
            break;
        }
        if char_len(&core).saturating_add(char_len(pad)) <= budget {
            core.push_str(pad);
        }
    }
    format!("{lead} {core} {trail}")
}

fn assembled_len(lead: &str, core: &str, trail: &str) -> usize {
    char_len(lead)
        .saturating_add(char_len(core))
        .saturating_add(char_len(trail))
        .saturating_add(2)
}

fn clean_title(raw: &str, lit: &Literals, phrases: &PhraseBook) -> String {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    if line.contains(OFFLINE_PLACEHOLDER) || line.starts_with("[OFFLINE]") {
        return String::new();
    }
    let mut t = line;
    for prefix in ["TITLE:", "Title:", "title:", "제목:"] {
        if let Some(rest) = t.strip_prefix(prefix) {
            t = rest;
        }
    }
    let t = t.trim().trim_matches(QUOTES).trim();
    let t = phrases.scrub_banned(t);
    let t = collapse_hybrids(&t, &lit.brand);
    collapse_whitespace(&t)
}

/// Leading emoji cluster, core text, trailing emoji cluster.
fn split_emoji_edges(title: &str) -> (String, String, String) {
    let is_edge = |c: char| is_emoji(c) || is_emoji_modifier(c);
    let chars: Vec<char> = title.chars().collect();
    let lead_end = chars
        .iter()
        .position(|c| !is_edge(*c) && !c.is_whitespace())
        .unwrap_or(chars.len());
    let trail_start = chars
        .iter()
        .rposition(|c| !is_edge(*c) && !c.is_whitespace())
        .map_or(lead_end, |i| i.saturating_add(1))
        .max(lead_end);

    let collect = |slice: &[char]| -> String { slice.iter().filter(|c| !c.is_whitespace()).collect() };
    let lead = chars.get(..lead_end).map(collect).unwrap_or_default();
    let trail = chars.get(trail_start..).map(collect).unwrap_or_default();
    let core: String = chars
        .get(lead_end..trail_start)
        .map(|s| s.iter().collect::<String>())
        .unwrap_or_default();
    (lead, collapse_whitespace(&core), trail)
}

fn fallback_core(lit: &Literals, context: Option<&str>) -> String {
    let context = context.unwrap_or(DEFAULT_CONTEXT);
    let concern = lit.concern_or_default();
    match &lit.product {
        Some(product) => format!(
            "{context} {concern}, {} {} 정리해요",
            lit.brand,
            with_particle(product, Particle::Toward)
        ),
        None => format!("{context} {concern}, {} 정리해요", with_particle(&lit.brand, Particle::With)),
    }
}
