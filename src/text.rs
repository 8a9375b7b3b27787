//! Character-level text helpers shared by the generator and validator.
//!
//! All lengths are counted in Unicode scalar values, which is the unit the
//! title and body bands are defined in.

use std::collections::BTreeSet;

/// Characters that end a sentence.
const TERMINALS: &[char] = &['.', '!', '?', '…', '~', '。'];

/// Closing marks that may trail terminal punctuation within one sentence.
const CLOSERS: &[char] = &['"', '\'', ')', ']', '”', '’', '」'];

/// Number of Unicode scalar values in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `s` contains `needle` once all whitespace is ignored.
pub fn contains_ignoring_space(s: &str, needle: &str) -> bool {
    let needle: String = needle.chars().filter(|c| !c.is_whitespace()).collect();
    if needle.is_empty() {
        return true;
    }
    let haystack: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    haystack.contains(&needle)
}

// ---------------------------------------------------------------------------
// Emoji
// ---------------------------------------------------------------------------

/// Whether `c` is a pictographic emoji glyph.
pub fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F000..=0x1F2FF | 0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x2B50..=0x2B55
    )
}

/// Variation selectors and joiners that only ever decorate an emoji.
pub fn is_emoji_modifier(c: char) -> bool {
    matches!(c, '\u{FE0F}' | '\u{200D}')
}

/// Remove every emoji glyph (and its modifiers) from `s`.
pub fn strip_emoji(s: &str) -> String {
    s.chars()
        .filter(|c| !is_emoji(*c) && !is_emoji_modifier(*c))
        .collect()
}

/// Number of emoji glyphs in `s`.
pub fn count_emoji(s: &str) -> usize {
    s.chars().filter(|c| is_emoji(*c)).count()
}

/// Whether the first visible character of `s` is an emoji.
pub fn starts_with_emoji(s: &str) -> bool {
    s.trim_start().chars().next().is_some_and(is_emoji)
}

/// Whether the last visible character of `s` (ignoring modifiers) is an emoji.
pub fn ends_with_emoji(s: &str) -> bool {
    s.trim_end()
        .chars()
        .rev()
        .find(|c| !is_emoji_modifier(*c))
        .is_some_and(is_emoji)
}

// ---------------------------------------------------------------------------
// Sentences and tokens
// ---------------------------------------------------------------------------

/// Whether `c` terminates a sentence.
pub fn is_terminal(c: char) -> bool {
    TERMINALS.contains(&c)
}

/// Split `s` into sentences.
///
/// A sentence ends at a run of terminal punctuation (plus any trailing
/// emoji or closing quotes) that is followed by whitespace or the end of
/// input. Decimal points such as `1.5` do not split. An emoji-only fragment
/// (`보시겠어요? ✨`) stays with the sentence before it.
pub fn split_sentences(s: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if !is_terminal(c) {
            continue;
        }
        while let Some(&next) = chars.peek() {
            if is_terminal(next) || is_emoji(next) || is_emoji_modifier(next) || CLOSERS.contains(&next) {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }
        let boundary = match chars.peek() {
            None => true,
            Some(next) => next.is_whitespace(),
        };
        if boundary {
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);
    attach_emoji_tails(sentences)
}

fn is_emoji_only(s: &str) -> bool {
    s.chars().any(is_emoji) && s.chars().all(|c| is_emoji(c) || is_emoji_modifier(c) || c.is_whitespace())
}

fn attach_emoji_tails(sentences: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        match out.last_mut() {
            Some(prev) if is_emoji_only(&sentence) => {
                prev.push(' ');
                prev.push_str(&sentence);
            }
            _ => out.push(sentence),
        }
    }
    out
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_owned());
    }
}

/// Word tokens of at least two characters, split on anything that is not
/// alphanumeric or `_`.
pub fn tokens(s: &str) -> Vec<String> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_owned)
        .collect()
}

/// Lowercased, punctuation-free form used for exact duplicate detection.
pub fn normalize_for_dedupe(s: &str) -> String {
    let kept: String = s
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    collapse_whitespace(&kept)
}

/// Token-set Jaccard similarity of two strings.
///
/// Two token-free strings are identical (1.0); one token-free string
/// shares nothing (0.0).
pub fn jaccard(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<String> = tokens(a).into_iter().collect();
    let tb: BTreeSet<String> = tokens(b).into_iter().collect();
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    ratio(inter, union)
}

/// `n / d` as a float, `0.0` when `d` is zero.
pub fn ratio(n: usize, d: usize) -> f64 {
    let n = u32::try_from(n).unwrap_or(u32::MAX);
    let d = u32::try_from(d).unwrap_or(u32::MAX);
    if d == 0 {
        return 0.0;
    }
    f64::from(n) / f64::from(d)
}

// ---------------------------------------------------------------------------
// Korean particles
// ---------------------------------------------------------------------------

/// Korean postpositional particle families whose form depends on whether
/// the preceding syllable ends in a final consonant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Particle {
    /// 을 / 를
    Object,
    /// 이 / 가
    Subject,
    /// 은 / 는
    Topic,
    /// 과 / 와
    With,
    /// 으로 / 로 (ㄹ-final takes 로)
    Toward,
}

const HANGUL_FIRST: u32 = 0xAC00;
const HANGUL_LAST: u32 = 0xD7A3;
const FINAL_RIEUL: u32 = 8;

/// Final-consonant index (0 = none) of the last Hangul syllable in `word`.
///
/// Returns `None` if `word` does not end in a Hangul syllable.
fn final_consonant(word: &str) -> Option<u32> {
    let last = u32::from(word.trim_end().chars().last()?);
    if !(HANGUL_FIRST..=HANGUL_LAST).contains(&last) {
        return None;
    }
    last.checked_sub(HANGUL_FIRST)?.checked_rem(28)
}

/// `word` followed by the particle form that agrees with its last syllable.
///
/// Words that do not end in Hangul take the vowel-final form.
pub fn with_particle(word: &str, particle: Particle) -> String {
    let fin = final_consonant(word).unwrap_or(0);
    let has_final = fin != 0;
    let suffix = match particle {
        Particle::Object => {
            if has_final {
                "을"
            } else {
                "를"
            }
        }
        Particle::Subject => {
            if has_final {
                "이"
            } else {
                "가"
            }
        }
        Particle::Topic => {
            if has_final {
                "은"
            } else {
                "는"
            }
        }
        Particle::With => {
            if has_final {
                "과"
            } else {
                "와"
            }
        }
        Particle::Toward => {
            if has_final && fin != FINAL_RIEUL {
                "으로"
            } else {
                "로"
            }
        }
    };
    format!("{word}{suffix}")
}
