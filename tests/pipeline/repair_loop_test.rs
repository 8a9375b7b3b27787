//! The bounded generate/validate/repair loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crm_narrator::data::persona::PersonaRow;
use crm_narrator::data::rules::BrandRule;
use crm_narrator::generator::{GeneratedMessage, GenerationError};
use crm_narrator::phrases::PhraseBook;
use crm_narrator::pipeline::{repair_loop, MessageSource};
use crm_narrator::planner::{MessagePlan, PlanError};
use crm_narrator::providers::ProviderError;
use crm_narrator::validator::{ErrorKind, Validator, ValidatorSettings};

use crate::fixture::{body, body_without_brand, row_with_product, rule, TITLE};

#[derive(Clone)]
enum Step {
    Message(GeneratedMessage),
    ProviderDown,
    BadPlan,
}

/// Serves scripted steps in order; the last one repeats.
struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    offline: bool,
    repairs: Mutex<Vec<Option<Vec<ErrorKind>>>>,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            offline: false,
            repairs: Mutex::new(Vec::new()),
        }
    }

    fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    fn repairs(&self) -> Vec<Option<Vec<ErrorKind>>> {
        self.repairs.lock().expect("repairs lock").clone()
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn generate(
        &self,
        _row: &PersonaRow,
        _plan: &MessagePlan,
        _rule: &BrandRule,
        repair: Option<&[ErrorKind]>,
    ) -> Result<GeneratedMessage, GenerationError> {
        self.repairs
            .lock()
            .expect("repairs lock")
            .push(repair.map(<[ErrorKind]>::to_vec));
        let step = {
            let mut steps = self.steps.lock().expect("steps lock");
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };
        match step {
            Some(Step::Message(m)) => Ok(m),
            Some(Step::ProviderDown) | None => Err(GenerationError::Provider(
                ProviderError::Unavailable("scripted outage".to_owned()),
            )),
            Some(Step::BadPlan) => Err(GenerationError::Plan(PlanError::MissingOutline)),
        }
    }

    fn is_offline(&self) -> bool {
        self.offline
    }
}

fn valid() -> Step {
    Step::Message(GeneratedMessage {
        title: TITLE.to_owned(),
        body: body(),
    })
}

fn brandless() -> Step {
    Step::Message(GeneratedMessage {
        title: "✨ 바쁜 아침 건조함엔 워터뱅크 크림으로 촉촉하게 💧".to_owned(),
        body: body_without_brand(),
    })
}

fn validator() -> Validator {
    Validator::new(ValidatorSettings::default(), Arc::new(PhraseBook::standard()))
}

async fn run(source: &ScriptedSource, budget: u32) -> crm_narrator::pipeline::LoopResult {
    let row = row_with_product();
    let plan = MessagePlan::basic(&row, &rule());
    repair_loop(source, &validator(), &row, &plan, &rule(), budget).await
}

#[tokio::test]
async fn valid_first_attempt_stops_immediately() {
    let source = ScriptedSource::new(vec![valid()]);
    let result = run(&source, 2).await;
    assert_eq!(result.attempts, 1);
    assert!(result.errors.is_empty());
    assert_eq!(source.repairs(), vec![None]);
}

#[tokio::test]
async fn failures_are_fed_back_until_valid() {
    let source = ScriptedSource::new(vec![brandless(), valid()]);
    let result = run(&source, 2).await;

    assert_eq!(result.attempts, 2);
    assert!(result.errors.is_empty());
    assert_eq!(result.message.map(|m| m.body), Some(body()));
    assert_eq!(
        source.repairs(),
        vec![None, Some(vec![ErrorKind::BrandMissing])]
    );
}

#[tokio::test]
async fn budget_bounds_attempts_and_keeps_residual_errors() {
    let source = ScriptedSource::new(vec![brandless()]);
    let result = run(&source, 2).await;

    assert_eq!(result.attempts, 3);
    assert_eq!(result.errors, vec![ErrorKind::BrandMissing]);
    assert_eq!(result.message.map(|m| m.body), Some(body_without_brand()));
    assert_eq!(source.repairs().len(), 3);
}

#[tokio::test]
async fn zero_budget_means_one_attempt() {
    let source = ScriptedSource::new(vec![brandless()]);
    let result = run(&source, 0).await;
    assert_eq!(result.attempts, 1);
    assert_eq!(result.errors, vec![ErrorKind::BrandMissing]);
}

#[tokio::test]
async fn offline_source_is_not_retried() {
    let source = ScriptedSource::new(vec![brandless()]).offline();
    let result = run(&source, 2).await;
    assert_eq!(result.attempts, 1);
    assert_eq!(result.errors, vec![ErrorKind::BrandMissing]);
    assert!(result.message.is_some());
}

#[tokio::test]
async fn generation_failure_counts_against_budget() {
    let source = ScriptedSource::new(vec![Step::ProviderDown]);
    let result = run(&source, 2).await;
    assert_eq!(result.attempts, 3);
    assert_eq!(result.errors, vec![ErrorKind::GenerationFailed]);
    assert!(result.message.is_none());
}

#[tokio::test]
async fn generation_failure_then_success_recovers() {
    let source = ScriptedSource::new(vec![Step::ProviderDown, valid()]);
    let result = run(&source, 2).await;
    assert_eq!(result.attempts, 2);
    assert!(result.errors.is_empty());
    assert_eq!(source.repairs(), vec![None, None]);
}

#[tokio::test]
async fn failure_after_invalid_message_keeps_the_message() {
    let source = ScriptedSource::new(vec![brandless(), Step::ProviderDown]);
    let result = run(&source, 1).await;
    assert_eq!(result.attempts, 2);
    assert_eq!(
        result.errors,
        vec![ErrorKind::BrandMissing, ErrorKind::GenerationFailed]
    );
    assert_eq!(result.message.map(|m| m.body), Some(body_without_brand()));
}

#[tokio::test]
async fn refused_plan_ends_the_loop() {
    let source = ScriptedSource::new(vec![Step::BadPlan]);
    let result = run(&source, 2).await;
    assert_eq!(result.attempts, 1);
    assert_eq!(result.errors, vec![ErrorKind::PlanMissing]);
    assert!(result.message.is_none());
}
