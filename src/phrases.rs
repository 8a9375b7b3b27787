//! Shared phrase tables.
//!
//! The [`PhraseBook`] is built once per run and shared read-only by the
//! generator (which avoids and scrubs these phrases) and the validator (which
//! rejects them). Keeping both sides on the same instance keeps the two lists
//! identical.

use std::collections::BTreeMap;

use regex::Regex;

/// Meta, strategy and UI call-to-action phrases that must never reach copy.
const BANNED_PHRASES: &[&str] = &[
    "브랜드 톤을 유지하며",
    "브랜드 톤을 살려",
    "브랜드 톤을 살리",
    "설계된 제품",
    "기획된",
    "전략적으로",
    "톤을 반영하여",
    "브랜드 아이덴티티",
    "클릭",
    "구매하기",
    "더 알아보려면",
    "더 알아보기",
    "자세히 보기",
    "지속 가능성 측면에서도 부담 없이 이어갈 수",
    "어렵지 않죠?",
    "힘들진 않나요?",
    "괜찮지 않나요?",
    "자신을 더 사랑",
    "사랑하게",
];

/// Spacing and inflection variants of the banned phrases.
const BANNED_PATTERNS: &[&str] = &[
    r"브랜드\s*톤(을|이)?\s*(유지|살리|살려|반영)",
    r"브랜드\s*아이덴티티",
    r"(클릭|구매\s*하기|더\s*알아\s*보(려면|기)|자세히\s*보(기|려면))",
    r"(전략적|기획된|설계된)",
    r"지속\s*가능성\s*측면",
];

/// Closing questions that invite an action; allowed in the last slot.
const INVITING_QUESTIONS: &[&str] = &[
    r"해보고\s*싶다면\?*$",
    r"해보는\s*건\s*어떨까요\?*$",
    r"해보고\s*싶지\s*않나요\?*$",
    r"보시겠어요\?*$",
    r"어떨까요\?*$",
];

/// Closing questions that pose a problem; never allowed in the last slot.
const PROBLEM_QUESTIONS: &[&str] = &[
    r"힘들\s*진\s*않나요\?*$",
    r"어렵\s*지\s*않나요\?*$",
    r"괜찮\s*지\s*않나요\?*$",
    r"어렵지\s*않죠\?*$",
];

/// Soft closing pads; at most one is ever appended, and only to the last slot.
const PAD_POOL: &[&str] = &[
    "오늘부터 루틴에 가볍게 더해보셔도 좋아요.",
    "지금 컨디션에 맞춰 한 단계만 더해도 충분해요.",
    "바쁠수록 짧게 정리되는 루틴이 더 편해요.",
    "끈적임이 덜해 다음 단계까지 깔끔하게 이어져요.",
];

/// Neutral phrases accepted in place of a literal skin-concern term.
const CONCERN_FALLBACKS: &[&str] = &["피부 고민", "피부 컨디션", "피부 상태"];

/// Connectives that may open the product-offer slot.
const CONNECTIVES: &[&str] = &["이럴 때", "그래서", "그럴 땐", "이런 날엔", "그럴수록"];

/// Abstract brand concepts and the everyday words that may stand in for them.
const EQUIVALENCES: &[(&str, &[&str])] = &[
    ("지속 가능성", &["꾸준", "부담", "계속", "이어", "관리"]),
    ("사용감", &["제형", "발림", "스며", "산뜻", "촉촉", "가볍"]),
    ("루틴 내 위치", &["단계", "다음", "먼저", "마무리", "루틴"]),
    ("균형", &["밸런스", "균형", "편안"]),
    ("리듬", &["흐름", "리듬", "매일", "하루"]),
    ("기본", &["기본", "기초", "매일"]),
];

/// Read-only phrase tables used by both generation and validation.
#[derive(Debug, Clone)]
pub struct PhraseBook {
    banned: Vec<String>,
    banned_patterns: Vec<Regex>,
    inviting_questions: Vec<Regex>,
    problem_questions: Vec<Regex>,
    pad_pool: Vec<String>,
    concern_fallbacks: Vec<String>,
    connectives: Vec<String>,
    equivalences: BTreeMap<String, Vec<String>>,
}

impl Default for PhraseBook {
    fn default() -> Self {
        Self::standard()
    }
}

impl PhraseBook {
    /// The built-in tables.
    pub fn standard() -> Self {
        Self {
            banned: owned(BANNED_PHRASES),
            banned_patterns: compile(BANNED_PATTERNS),
            inviting_questions: compile(INVITING_QUESTIONS),
            problem_questions: compile(PROBLEM_QUESTIONS),
            pad_pool: owned(PAD_POOL),
            concern_fallbacks: owned(CONCERN_FALLBACKS),
            connectives: owned(CONNECTIVES),
            equivalences: EQUIVALENCES
                .iter()
                .map(|(concept, words)| ((*concept).to_owned(), owned(words)))
                .collect(),
        }
    }

    /// Extend the built-in tables with configured entries.
    ///
    /// Extra equivalence words for an existing concept are appended.
    pub fn with_extensions(
        mut self,
        extra_banned: &[String],
        extra_equivalences: &BTreeMap<String, Vec<String>>,
    ) -> Self {
        for phrase in extra_banned {
            let phrase = phrase.trim();
            if !phrase.is_empty() && !self.banned.iter().any(|p| p == phrase) {
                self.banned.push(phrase.to_owned());
            }
        }
        for (concept, words) in extra_equivalences {
            let entry = self.equivalences.entry(concept.clone()).or_default();
            for word in words {
                if !entry.contains(word) {
                    entry.push(word.clone());
                }
            }
        }
        self
    }

    /// The literal banned phrases, in table order.
    pub fn banned_phrases(&self) -> &[String] {
        &self.banned
    }

    /// Banned phrases found in `text`.
    ///
    /// Literal hits are reported first by their table entry. Pattern hits
    /// are reported by the matched text, unless that text is already covered
    /// by a reported literal.
    pub fn find_banned(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = self
            .banned
            .iter()
            .filter(|p| !p.is_empty() && text.contains(p.as_str()))
            .cloned()
            .collect();

        for pattern in &self.banned_patterns {
            for m in pattern.find_iter(text) {
                let hit = m.as_str().trim();
                if hit.is_empty() {
                    continue;
                }
                let covered = found.iter().any(|f| f.contains(hit) || hit.contains(f.as_str()));
                if !covered {
                    found.push(hit.to_owned());
                }
            }
        }
        found
    }

    /// Remove banned-phrase matches from `text` without touching anything else.
    pub fn scrub_banned(&self, text: &str) -> String {
        let mut out = text.to_owned();
        for phrase in &self.banned {
            if !phrase.is_empty() {
                out = out.replace(phrase.as_str(), "");
            }
        }
        for pattern in &self.banned_patterns {
            out = pattern.replace_all(&out, "").into_owned();
        }
        out
    }

    /// Whether `sentence` ends in a question that invites an action.
    pub fn is_inviting_question(&self, sentence: &str) -> bool {
        let s = sentence.trim();
        self.inviting_questions.iter().any(|rx| rx.is_match(s))
    }

    /// Whether `sentence` ends in a question that poses a problem.
    pub fn is_problem_question(&self, sentence: &str) -> bool {
        let s = sentence.trim();
        self.problem_questions.iter().any(|rx| rx.is_match(s))
    }

    /// Closing pad phrases.
    pub fn pad_pool(&self) -> &[String] {
        &self.pad_pool
    }

    /// Neutral skin-concern stand-ins.
    pub fn concern_fallbacks(&self) -> &[String] {
        &self.concern_fallbacks
    }

    /// Connectives that may open the offer slot.
    pub fn connectives(&self) -> &[String] {
        &self.connectives
    }

    /// Everyday stand-ins for an abstract brand concept, if one is known.
    pub fn equivalents(&self, concept: &str) -> Option<&[String]> {
        self.equivalences.get(concept.trim()).map(Vec::as_slice)
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}
