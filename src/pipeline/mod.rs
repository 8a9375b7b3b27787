//! The generate → validate → repair loop.
//!
//! Rows are processed strictly in ranked order. Each row runs a small state
//! machine: generate, validate, and either stop or feed the failures back
//! into the next generation attempt, at most `1 + retry_budget` times. Every
//! row yields a [`RowRecord`]; residual errors travel with the message
//! instead of stopping the run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::data::catalog::CatalogStore;
use crate::data::persona::PersonaRow;
use crate::data::rules::{BrandRule, RuleStore};
use crate::data::scoring::ProductSelector;
use crate::generator::{GeneratedMessage, GenerationError, Generator};
use crate::planner::{MessagePlan, Planner};
use crate::validator::{tags, ErrorKind, Validator};

/// Produces one candidate message per call.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Generate a message, steered by the previous attempt's failures.
    async fn generate(
        &self,
        row: &PersonaRow,
        plan: &MessagePlan,
        rule: &BrandRule,
        repair: Option<&[ErrorKind]>,
    ) -> Result<GeneratedMessage, GenerationError>;

    /// Whether the source is a deterministic stub; retrying it is pointless.
    fn is_offline(&self) -> bool;
}

#[async_trait]
impl MessageSource for Generator {
    async fn generate(
        &self,
        row: &PersonaRow,
        plan: &MessagePlan,
        rule: &BrandRule,
        repair: Option<&[ErrorKind]>,
    ) -> Result<GeneratedMessage, GenerationError> {
        Generator::generate(self, row, plan, rule, repair).await
    }

    fn is_offline(&self) -> bool {
        Generator::is_offline(self)
    }
}

/// Where one row's repair loop currently is.
#[derive(Debug)]
enum AttemptState {
    Generating {
        attempt: u32,
        repair: Option<Vec<ErrorKind>>,
    },
    Validating {
        attempt: u32,
        message: GeneratedMessage,
    },
    Repairing {
        attempt: u32,
        errors: Vec<ErrorKind>,
    },
    Done {
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
    },
}

/// How a row's loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Validation passed.
    Valid,
    /// Stopped with residual errors (offline source or budget spent).
    Flagged,
    /// No product could be resolved; nothing was generated.
    NoProduct,
    /// The plan failed its outline check; nothing was generated.
    NoPlan,
}

/// Output of one row's repair loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopResult {
    /// The last successfully generated message, if any attempt produced one.
    pub message: Option<GeneratedMessage>,
    /// Residual failures; empty when the message is valid.
    pub errors: Vec<ErrorKind>,
    /// Generation attempts made.
    pub attempts: u32,
}

/// One output record per persona row.
#[derive(Debug, Clone, Serialize)]
pub struct RowRecord {
    /// Persona identifier.
    pub persona_id: String,
    /// Brand of the row.
    pub brand: String,
    /// Campaign part identifier.
    pub part_id: Option<String>,
    /// Row relevance score.
    pub score: f64,
    /// Selected product name.
    pub product: Option<String>,
    /// `TITLE: …\nBODY: …`, empty when nothing was generated.
    pub message: String,
    /// Residual failure tags.
    pub errors: Vec<ErrorKind>,
    /// Generation attempts made.
    pub attempts: u32,
    /// How the loop ended.
    pub outcome: Outcome,
    /// The plan the message was generated from.
    pub plan: Option<MessagePlan>,
    /// The persona row, product attached.
    pub row: PersonaRow,
}

/// All records of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Requested persona.
    pub persona_id: String,
    /// Model identifier used for generation.
    pub model: String,
    /// Whether the run used the offline placeholder.
    pub offline: bool,
    /// Records in ranked row order.
    pub records: Vec<RowRecord>,
}

impl RunReport {
    /// Report stamped with a fresh run id and the current time.
    pub fn new(persona_id: &str, model: &str, offline: bool, records: Vec<RowRecord>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            persona_id: persona_id.to_owned(),
            model: model.to_owned(),
            offline,
            records,
        }
    }

    /// Number of records with no residual errors.
    pub fn valid_count(&self) -> usize {
        self.records.iter().filter(|r| r.outcome == Outcome::Valid).count()
    }
}

/// Wires the stages together for one run.
pub struct Pipeline {
    source: Arc<dyn MessageSource>,
    planner: Planner,
    validator: Validator,
    rules: RuleStore,
    catalog: CatalogStore,
    selector: ProductSelector,
    retry_budget: u32,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("offline", &self.source.is_offline())
            .field("rules", &self.rules.len())
            .field("catalog", &self.catalog.len())
            .field("retry_budget", &self.retry_budget)
            .finish()
    }
}

impl Pipeline {
    /// Pipeline over loaded tables.
    pub fn new(
        source: Arc<dyn MessageSource>,
        planner: Planner,
        validator: Validator,
        rules: RuleStore,
        catalog: CatalogStore,
        selector: ProductSelector,
        retry_budget: u32,
    ) -> Self {
        Self {
            source,
            planner,
            validator,
            rules,
            catalog,
            selector,
            retry_budget,
        }
    }

    /// Process `rows` in order, one record per row.
    pub async fn run(&mut self, rows: Vec<PersonaRow>) -> Vec<RowRecord> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(self.process_row(row).await);
        }
        let valid = records.iter().filter(|r| r.outcome == Outcome::Valid).count();
        info!(rows = records.len(), valid, "run complete");
        records
    }

    /// Resolve, plan and run the repair loop for a single row.
    pub async fn process_row(&mut self, mut row: PersonaRow) -> RowRecord {
        let brand_hint = row.brand.clone();
        match self.selector.select_product(&self.catalog, &brand_hint, &row) {
            Ok(selected) => row.product = Some(selected),
            Err(e) => {
                warn!(persona_id = %row.persona_id, brand = %row.brand, error = %e, "no product resolved, skipping row");
                return record(row, None, None, vec![ErrorKind::ProductMissing], 0, Outcome::NoProduct);
            }
        }

        let rule = self.rules.resolve(&row.brand);
        let plan = self.planner.plan(&row, &rule).await;
        if let Err(e) = plan.check() {
            warn!(persona_id = %row.persona_id, error = %e, "plan rejected, skipping row");
            return record(row, Some(plan), None, vec![ErrorKind::PlanMissing], 0, Outcome::NoPlan);
        }

        let result = repair_loop(self.source.as_ref(), &self.validator, &row, &plan, &rule, self.retry_budget).await;
        let outcome = if result.errors.is_empty() && result.message.is_some() {
            Outcome::Valid
        } else {
            Outcome::Flagged
        };
        info!(
            persona_id = %row.persona_id,
            brand = %row.brand,
            attempts = result.attempts,
            errors = ?tags(&result.errors),
            "row finished"
        );
        record(row, Some(plan), result.message, result.errors, result.attempts, outcome)
    }
}

fn record(
    row: PersonaRow,
    plan: Option<MessagePlan>,
    message: Option<GeneratedMessage>,
    errors: Vec<ErrorKind>,
    attempts: u32,
    outcome: Outcome,
) -> RowRecord {
    RowRecord {
        persona_id: row.persona_id.clone(),
        brand: row.brand.clone(),
        part_id: row.part_id.clone(),
        score: row.score,
        product: row.product_name().map(str::to_owned),
        message: message.map(|m| m.to_wire()).unwrap_or_default(),
        errors,
        attempts,
        outcome,
        plan,
        row,
    }
}

/// Run the bounded generate/validate/repair loop for one row.
///
/// The source is called at most `1 + retry_budget` times and never again
/// once validation passes. An offline source stops after its first attempt.
/// A failed generation records `generation_failed`, counts against the
/// budget and keeps the last message that was generated.
pub async fn repair_loop(
    source: &dyn MessageSource,
    validator: &Validator,
    row: &PersonaRow,
    plan: &MessagePlan,
    rule: &BrandRule,
    retry_budget: u32,
) -> LoopResult {
    let max_attempts = retry_budget.saturating_add(1);
    let mut last: Option<GeneratedMessage> = None;
    let mut last_errors: Vec<ErrorKind> = Vec::new();
    let mut errors: Vec<ErrorKind> = Vec::new();
    let mut state = AttemptState::Generating {
        attempt: 1,
        repair: None,
    };

    loop {
        state = match state {
            AttemptState::Generating { attempt, repair } => {
                debug!(persona_id = %row.persona_id, attempt, "generating");
                match source.generate(row, plan, rule, repair.as_deref()).await {
                    Ok(message) => AttemptState::Validating { attempt, message },
                    Err(GenerationError::Plan(e)) => {
                        warn!(persona_id = %row.persona_id, error = %e, "generation refused");
                        errors = vec![ErrorKind::PlanMissing];
                        AttemptState::Exhausted { attempts: attempt }
                    }
                    Err(GenerationError::Provider(e)) => {
                        warn!(persona_id = %row.persona_id, attempt, error = %e, "generation failed");
                        errors = last_errors.clone();
                        errors.push(ErrorKind::GenerationFailed);
                        if attempt >= max_attempts {
                            AttemptState::Exhausted { attempts: attempt }
                        } else {
                            AttemptState::Generating {
                                attempt: attempt.saturating_add(1),
                                repair: (!last_errors.is_empty()).then(|| last_errors.clone()),
                            }
                        }
                    }
                }
            }
            AttemptState::Validating { attempt, message } => {
                let found = validator.validate(row, &message.title, &message.body, rule);
                debug!(persona_id = %row.persona_id, attempt, errors = ?tags(&found), "validated");
                last = Some(message);
                last_errors = found.clone();
                errors = found;
                if errors.is_empty() {
                    AttemptState::Done { attempts: attempt }
                } else if source.is_offline() {
                    debug!(persona_id = %row.persona_id, "offline source, keeping first attempt");
                    AttemptState::Done { attempts: attempt }
                } else if attempt >= max_attempts {
                    AttemptState::Exhausted { attempts: attempt }
                } else {
                    AttemptState::Repairing {
                        attempt,
                        errors: errors.clone(),
                    }
                }
            }
            AttemptState::Repairing { attempt, errors } => {
                info!(persona_id = %row.persona_id, attempt, errors = ?tags(&errors), "repairing");
                AttemptState::Generating {
                    attempt: attempt.saturating_add(1),
                    repair: Some(errors),
                }
            }
            AttemptState::Done { attempts } => {
                return LoopResult {
                    message: last,
                    errors,
                    attempts,
                };
            }
            AttemptState::Exhausted { attempts } => {
                warn!(persona_id = %row.persona_id, attempts, errors = ?tags(&errors), "retry budget exhausted");
                return LoopResult {
                    message: last,
                    errors,
                    attempts,
                };
            }
        };
    }
}
