//! Generator: prompt assembly and structural enforcement.
//!
//! One [`Generator::generate`] call produces a fresh `(title, body)` pair.
//! The model drafts the copy; everything after that is mechanical: the
//! completion is cleaned and split into four slots, per-slot punctuation is
//! enforced, missing literals are injected, repeats are deleted and the body
//! is fitted into the length band. The title comes from a second, smaller
//! call and is fitted deterministically.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::persona::PersonaRow;
use crate::data::rules::BrandRule;
use crate::phrases::PhraseBook;
use crate::planner::{MessagePlan, PlanError};
use crate::providers::client::CompletionClient;
use crate::providers::offline::OFFLINE_PLACEHOLDER;
use crate::providers::ProviderError;
use crate::text::char_len;
use crate::validator::{slot_lines, ErrorKind, LengthBands, SLOT_COUNT};

pub mod hints;
pub mod length;
pub mod prompt;
pub mod slots;
pub mod title;

use hints::{draft_slot, Literals, PersonaHints};
use slots::{
    clean_completion, collapse_hybrids, dedupe_sentences, enforce_punctuation, ensure_connective,
    inject_literals, join_slots, split_slots, Slots, DEDUPE_NGRAM,
};

/// Wire prefix of the title line.
pub const TITLE_PREFIX: &str = "TITLE: ";
/// Wire prefix of the body block.
pub const BODY_PREFIX: &str = "BODY: ";

/// A generated `(title, body)` pair. The body is four newline-separated
/// slot lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedMessage {
    /// Single-line title.
    pub title: String,
    /// Four-line body.
    pub body: String,
}

impl GeneratedMessage {
    /// `TITLE: <title>\nBODY: <body>`.
    pub fn to_wire(&self) -> String {
        format!("{TITLE_PREFIX}{}\n{BODY_PREFIX}{}", self.title, self.body)
    }

    /// Parse the wire format. Returns `None` when the `TITLE:` or `BODY:`
    /// marker is missing.
    pub fn parse_wire(text: &str) -> Option<Self> {
        let text = text.replace("\r\n", "\n");
        let rest = text.trim_start().strip_prefix("TITLE:")?;
        let (title, body) = rest.split_once("\nBODY:")?;
        Some(Self {
            title: title.trim().to_owned(),
            body: body.trim().to_owned(),
        })
    }
}

/// Why generation was refused or failed.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The plan outline is missing or malformed.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The body or title completion failed after retries.
    #[error("completion failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Builds messages from a persona row, its plan and its brand rule.
#[derive(Debug, Clone)]
pub struct Generator {
    client: Arc<CompletionClient>,
    phrases: Arc<PhraseBook>,
    bands: LengthBands,
}

impl Generator {
    /// A generator sharing `phrases` with the validator.
    pub fn new(client: Arc<CompletionClient>, phrases: Arc<PhraseBook>, bands: LengthBands) -> Self {
        Self { client, phrases, bands }
    }

    /// Whether the backing client is the offline placeholder.
    pub fn is_offline(&self) -> bool {
        self.client.is_offline()
    }

    /// Generate one message. `repair` carries the previous attempt's
    /// validation failures and steers the prompt.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Plan`] if the plan fails its outline check
    /// (no model call is made), or [`GenerationError::Provider`] if the body
    /// or title completion fails.
    pub async fn generate(
        &self,
        row: &PersonaRow,
        plan: &MessagePlan,
        rule: &BrandRule,
        repair: Option<&[ErrorKind]>,
    ) -> Result<GeneratedMessage, GenerationError> {
        plan.check()?;
        let lit = Literals::from_row(row);
        let hints = PersonaHints::from_row(row);

        let system = prompt::body_system(&self.phrases);
        let user = prompt::body_prompt(plan, rule, &lit, &hints, &self.bands, repair);
        let raw = self.client.chat(&system, &user).await?;

        let mut slots = self.draft_slots(&raw, &lit, &hints);
        self.normalize(&mut slots, &lit);

        if length::pad_short(&mut slots, &self.bands, &self.phrases, &hints) {
            self.punctuate(&mut slots);
            dedupe_sentences(&mut slots, DEDUPE_NGRAM);
        }
        if length::body_len(&slots) < self.bands.body_min && !self.client.is_offline() {
            self.insert_sentence(&mut slots, &lit).await;
        }
        if length::trim_overflow(&mut slots, &self.bands, &lit, &self.phrases) {
            debug!(persona_id = %row.persona_id, "body overflow trimmed");
        }
        let body = join_slots(&slots);

        let raw_title = if self.client.is_offline() {
            String::new()
        } else {
            let user = prompt::title_prompt(&body, &lit, &self.bands);
            self.client.chat(prompt::title_system(), &user).await?
        };
        let context = hints.time.map(|t| format!("{t} 루틴"));
        let title = title::fit_title(&raw_title, &lit, context.as_deref(), &self.bands, &self.phrases);

        info!(
            persona_id = %row.persona_id,
            brand = %lit.brand,
            title_len = char_len(&title),
            body_len = char_len(&body),
            repair = repair.map_or(0, <[ErrorKind]>::len),
            "message generated"
        );
        Ok(GeneratedMessage { title, body })
    }

    /// Clean and split the completion; slots the model left empty are
    /// drafted from persona hints. An empty or placeholder completion
    /// drafts every slot.
    fn draft_slots(&self, raw: &str, lit: &Literals, hints: &PersonaHints) -> Slots {
        let trimmed = raw.trim();
        let mut slots = if trimmed.is_empty() || trimmed.contains(OFFLINE_PLACEHOLDER) {
            Slots::default()
        } else {
            let cleaned = clean_completion(trimmed, &self.phrases);
            split_slots(&collapse_hybrids(&cleaned, &lit.brand))
        };
        for (i, slot) in slots.iter_mut().enumerate() {
            if slot.trim().is_empty() {
                *slot = draft_slot(i, lit, hints);
            }
        }
        slots
    }

    fn normalize(&self, slots: &mut Slots, lit: &Literals) {
        slots[1] = ensure_connective(&slots[1], &self.phrases);
        self.punctuate(slots);
        if inject_literals(slots, lit, &self.phrases) {
            self.punctuate(slots);
        }
        dedupe_sentences(slots, DEDUPE_NGRAM);
    }

    fn punctuate(&self, slots: &mut Slots) {
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = enforce_punctuation(slot, i, &self.phrases);
        }
    }

    /// Last-resort lengthening: ask the model for one connective sentence.
    /// The result is discarded unless it keeps four lines and is longer.
    async fn insert_sentence(&self, slots: &mut Slots, lit: &Literals) {
        let body = join_slots(slots);
        let needed = self.bands.body_min.saturating_sub(char_len(&body));
        let raw = match self.client.chat(prompt::insert_system(), &prompt::insert_prompt(&body, needed)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "length insert failed, keeping body");
                return;
            }
        };
        let cleaned = collapse_hybrids(&clean_completion(&raw, &self.phrases), &lit.brand);
        let lines = slot_lines(&cleaned);
        if lines.len() != SLOT_COUNT {
            debug!(lines = lines.len(), "length insert discarded: slot structure changed");
            return;
        }
        let mut candidate = Slots::default();
        for (i, (slot, line)) in candidate.iter_mut().zip(lines).enumerate() {
            *slot = enforce_punctuation(line, i, &self.phrases);
        }
        if inject_literals(&mut candidate, lit, &self.phrases) {
            self.punctuate(&mut candidate);
        }
        dedupe_sentences(&mut candidate, DEDUPE_NGRAM);
        if length::body_len(&candidate) <= char_len(&body) {
            debug!("length insert discarded: body did not grow");
            return;
        }
        *slots = candidate;
    }
}
