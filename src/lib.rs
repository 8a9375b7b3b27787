//! CRM Narrator: personalized cosmetics CRM message generation.
//!
//! A persona row is matched to a product, planned into a fixed four-slot
//! outline, drafted by a language model, mechanically normalized to the
//! message wire format, and validated against structural and brand rules.
//! Failed validations are fed back into a bounded repair loop.
//!
//! Language-model access goes through the [`providers::LlmProvider`] trait so
//! the pipeline can run against OpenAI, an offline placeholder, or a scripted
//! test double.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod data;
pub mod generator;
pub mod logging;
pub mod phrases;
pub mod pipeline;
pub mod planner;
pub mod providers;
pub mod text;
pub mod validator;
