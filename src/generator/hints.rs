//! Naturalized persona hints and deterministic slot drafts.
//!
//! Raw preference cells (`워터리 로션,젤크림`, `무향/저향`) never reach copy
//! verbatim; they are mapped onto a small set of natural phrases first.

use crate::data::catalog::strip_unit_suffix;
use crate::data::brand::clean_brand;
use crate::data::persona::PersonaRow;
use crate::text::{with_particle, Particle};

const DEFAULT_TEXTURE: &str = "가볍게 발리는 제형";
const DEFAULT_FINISH: &str = "깔끔한 마무리";
const DEFAULT_TIME: &str = "하루";
const DEFAULT_ROUTINE: &str = "짧은 루틴";
const DEFAULT_CONCERN: &str = "피부 컨디션";

/// Literal values the copy must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Literals {
    /// Brand as displayed.
    pub brand: String,
    /// Product name without unit suffix.
    pub product: Option<String>,
    /// First skin-concern tag.
    pub concern: Option<String>,
    /// Every skin-concern tag.
    pub concerns: Vec<String>,
}

impl Literals {
    /// Literals for `row`.
    pub fn from_row(row: &PersonaRow) -> Self {
        let brand = clean_brand(&row.brand);
        Self {
            brand: if brand.is_empty() {
                row.normalized_brand.clone()
            } else {
                brand
            },
            product: row.product_name().map(strip_unit_suffix).filter(|p| !p.is_empty()),
            concern: row.primary_concern(),
            concerns: row.skin_concerns(),
        }
    }

    /// The concern literal, or a neutral stand-in.
    pub fn concern_or_default(&self) -> &str {
        self.concern.as_deref().unwrap_or(DEFAULT_CONCERN)
    }
}

/// Natural phrases derived from persona preference fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaHints {
    /// Texture phrase.
    pub texture: Option<&'static str>,
    /// Finish phrase.
    pub finish: Option<&'static str>,
    /// Scent phrase.
    pub scent: Option<&'static str>,
    /// Routine length phrase.
    pub routine: Option<String>,
    /// Time of day phrase.
    pub time: Option<&'static str>,
    /// Season phrase.
    pub season: Option<&'static str>,
    /// Environment phrase for the opening slot.
    pub environment: Option<String>,
}

impl PersonaHints {
    /// Hints for `row`; absent fields stay `None`.
    pub fn from_row(row: &PersonaRow) -> Self {
        Self {
            texture: row.texture_preference.as_deref().map(texture_hint),
            finish: row.finish_preference.as_deref().map(finish_hint),
            scent: row.scent_preference.as_deref().map(scent_hint),
            routine: row.routine_step_count.as_deref().map(routine_hint),
            time: row.time_of_use.as_deref().map(time_hint),
            season: row.seasonality.as_deref().map(|_| "계절 따라 컨디션이 흔들릴 때"),
            environment: environment_phrase(&row.lifestyle_tags().environment),
        }
    }

    fn texture_or_default(&self) -> &'static str {
        self.texture.unwrap_or(DEFAULT_TEXTURE)
    }

    fn finish_or_default(&self) -> &'static str {
        self.finish.unwrap_or(DEFAULT_FINISH)
    }

    fn time_or_default(&self) -> &'static str {
        self.time.unwrap_or(DEFAULT_TIME)
    }

    fn routine_or_default(&self) -> &str {
        self.routine.as_deref().unwrap_or(DEFAULT_ROUTINE)
    }
}

fn texture_hint(raw: &str) -> &'static str {
    if raw.contains("워터") {
        "물처럼 가볍게 스며드는 제형"
    } else if raw.contains('젤') {
        "산뜻한 젤 제형"
    } else if raw.contains("로션") {
        "가벼운 로션 제형"
    } else if raw.contains("크림") {
        "부담 없는 크림 제형"
    } else {
        DEFAULT_TEXTURE
    }
}

fn finish_hint(raw: &str) -> &'static str {
    if raw.contains("세미") && raw.contains("매트") {
        "번들거림 없이 산뜻한 마무리"
    } else if raw.contains("매트") {
        "보송하게 정리되는 마무리"
    } else if raw.contains("글로") || raw.contains('광') || raw.contains('윤') {
        "은은하게 맑아 보이는 마무리"
    } else {
        DEFAULT_FINISH
    }
}

fn scent_hint(raw: &str) -> &'static str {
    if raw.contains("무향") {
        "향이 거의 없는 쪽"
    } else if raw.contains("저향") || raw.contains('약') {
        "향이 강하지 않은 쪽"
    } else {
        "부담 없는 향"
    }
}

fn routine_hint(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        DEFAULT_ROUTINE.to_owned()
    } else {
        format!("{digits}단계 안팎의 짧은 루틴")
    }
}

fn time_hint(raw: &str) -> &'static str {
    let morning = raw.contains("아침");
    let evening = raw.contains("저녁") || raw.contains('밤');
    match (morning, evening) {
        (true, true) => "아침과 저녁",
        (true, false) => "아침",
        (false, true) => "저녁",
        (false, false) => DEFAULT_TIME,
    }
}

/// Environment tags rewritten as a short phrase, at most three tags.
pub fn environment_phrase(tags: &[String]) -> Option<String> {
    let natural: Vec<String> = tags
        .iter()
        .map(|t| {
            let mut t = t.replace("잦음", "잦은");
            if t.contains("마스크") && !t.contains("착용") {
                t = t.replace("마스크", "마스크 착용");
            }
            if t.contains("에어컨") && !t.contains("바람") {
                t = t.replace("에어컨", "에어컨 바람");
            }
            t.trim().to_owned()
        })
        .filter(|t| !t.is_empty())
        .take(3)
        .collect();
    if natural.is_empty() {
        None
    } else {
        Some(natural.join(", "))
    }
}

/// One offer-slot sentence built from texture, finish and scent.
pub fn offer_expansion(hints: &PersonaHints) -> String {
    let texture = with_particle(hints.texture_or_default(), Particle::Subject);
    let finish = with_particle(hints.finish_or_default(), Particle::Toward);
    match hints.scent {
        Some(scent) => format!("{texture} 피부에 편하게 밀착되고 {finish} 정리되는 데다 {scent}이라 부담이 적어요."),
        None => format!("{texture} 피부에 편하게 밀착되고 {finish} 정리돼 다음 단계까지 편안해요."),
    }
}

/// One usage-slot sentence built from time, routine and season.
pub fn usage_expansion(hints: &PersonaHints) -> String {
    let time = hints.time_or_default();
    let routine = hints.routine_or_default();
    match hints.season {
        Some(season) => format!("{season}에도 {time} {routine}에 부담 없이 이어져요."),
        None => format!("{time} {routine}에도 부담 없이 자연스럽게 이어져요."),
    }
}

/// Deterministic draft for slot `index` (0-based), used when the model
/// produced nothing usable for it.
pub fn draft_slot(index: usize, lit: &Literals, hints: &PersonaHints) -> String {
    let concern = with_particle(lit.concern_or_default(), Particle::Subject);
    match index {
        0 => {
            let scene = match &hints.environment {
                Some(env) => format!("{env} 속에서"),
                None => "바쁘게 흘러가는".to_owned(),
            };
            format!(
                "{scene} 하루를 보내다 보면 {concern} 유난히 신경 쓰이는 순간이 찾아오죠. \
                 피부가 편안하게 쉬어 갈 틈이 필요한 요즘이에요."
            )
        }
        1 => {
            let texture = with_particle(hints.texture_or_default(), Particle::Subject);
            let offer = match &lit.product {
                Some(product) => format!(
                    "이럴 때 {} {} 더해 보세요.",
                    lit.brand,
                    with_particle(product, Particle::Object)
                ),
                None => format!("이럴 때 {} 함께 루틴을 정돈해 보세요.", with_particle(&lit.brand, Particle::With)),
            };
            format!(
                "{offer} {texture} 가볍게 스며들어 {} 고민을 차분하게 정돈해 줘요.",
                lit.concern_or_default()
            )
        }
        2 => {
            let finish = with_particle(hints.finish_or_default(), Particle::Toward);
            format!(
                "{} {} 안에서 세안 후 바로 이어 바르기 좋아요. {finish} 정리돼 다음 단계도 가볍게 이어져요.",
                hints.time_or_default(),
                hints.routine_or_default()
            )
        }
        _ => {
            let close = if lit.brand.is_empty() {
                "오늘 루틴을 가볍게 이어가 보시겠어요?".to_owned()
            } else {
                format!(
                    "{} 함께 오늘 루틴을 가볍게 이어가 보시겠어요?",
                    with_particle(&lit.brand, Particle::With)
                )
            };
            format!("다 써 갈 때쯤 미리 챙겨 두면 루틴이 끊기지 않아요. {close}")
        }
    }
}
