//! Configuration loading and management.
//!
//! Loads narrator configuration from `./narrator.toml` (or
//! `$CRM_NARRATOR_CONFIG`). Environment variables override file values; file
//! values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::scoring::SelectionMode;
use crate::providers::client::ClientSettings;
use crate::providers::openai::OPENAI_API_BASE;
use crate::validator::{LengthBands, SkinConcernMode, ValidatorSettings};

// ── Top-level config ────────────────────────────────────────────

/// Top-level narrator configuration loaded from TOML.
///
/// Path: `./narrator.toml` or `$CRM_NARRATOR_CONFIG`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Input table locations (`[data]`).
    pub data: DataConfig,
    /// Product catalog columns and selection policy (`[catalog]`).
    pub catalog: CatalogConfig,
    /// Language-model client settings (`[llm]`).
    pub llm: LlmConfig,
    /// Repair loop settings (`[pipeline]`).
    pub pipeline: PipelineConfig,
    /// Validator bands and modes (`[validator]`).
    pub validator: ValidatorConfig,
    /// Phrase table extensions (`[phrases]`).
    pub phrases: PhrasesConfig,
    /// Log level and optional file sink (`[logging]`).
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        Self::load_from(path)
    }

    /// Load configuration from an explicit path, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let mut config = Self::load_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file(path: &std::path::Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve config path using a custom env resolver.
    ///
    /// Checks `$CRM_NARRATOR_CONFIG` first, then `./narrator.toml`.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        match env("CRM_NARRATOR_CONFIG") {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => PathBuf::from("narrator.toml"),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CRM_DATA_DIR") {
            self.data.dir = v;
        }

        // LLM.
        if let Some(v) = env("OPENAI_API_KEY") {
            if !v.trim().is_empty() {
                self.llm.api_key = Some(v);
            }
        }
        if let Some(v) = env("CRM_OPENAI_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = env("CRM_OPENAI_BASE_URL") {
            self.llm.base_url = v;
        }
        for var in ["OPENAI_OFFLINE", "CRM_LLM_OFFLINE"] {
            if let Some(v) = env(var) {
                match parse_flag(&v) {
                    Some(flag) => self.llm.offline = self.llm.offline || flag,
                    None => tracing::warn!(var, value = %v, "ignoring invalid env override"),
                }
            }
        }

        // Pipeline.
        if let Some(v) = env("CRM_RETRY_BUDGET") {
            match v.trim().parse() {
                Ok(n) => self.pipeline.retry_budget = n,
                Err(_) => tracing::warn!(
                    var = "CRM_RETRY_BUDGET",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        // Logging.
        if let Some(v) = env("CRM_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a field has the wrong type.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

// ── Data config ─────────────────────────────────────────────────

/// Input table locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory every file name below is resolved against.
    pub dir: String,
    /// Ranked persona/brand rows.
    pub persona_file: String,
    /// Persona attribute table joined on `persona_id` (optional file).
    pub persona_meta_file: String,
    /// Brand rule table.
    pub brand_rules_file: String,
    /// Product catalog.
    pub catalog_file: String,
    /// Tone tables, tried in order; the first that exists wins.
    pub tone_files: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
            persona_file: "persona_brand_tone_part_final.csv".to_string(),
            persona_meta_file: "persona_meta_v2.csv".to_string(),
            brand_rules_file: "amore_brand_tone_rules.csv".to_string(),
            catalog_file: "amore_with_category.csv".to_string(),
            tone_files: vec![
                "tone_profile_map.csv".to_string(),
                "brand_tone_definitions.csv".to_string(),
                "tone_centroid_profile.csv".to_string(),
                "brand_tone_cluster.csv".to_string(),
            ],
        }
    }
}

impl DataConfig {
    /// Resolve `file` against the data directory.
    pub fn resolve(&self, file: &str) -> PathBuf {
        PathBuf::from(&self.dir).join(file)
    }
}

// ── Catalog config ──────────────────────────────────────────────

/// Product catalog columns and selection policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Product name column; detected from common headers when unset.
    pub name_column: Option<String>,
    /// Brand column; detected from common headers when unset.
    pub brand_column: Option<String>,
    /// How the final product is picked among scored candidates.
    pub selection: SelectionMode,
    /// Candidate pool size for sampled selection.
    pub sample_top_k: usize,
    /// Fixed RNG seed for sampled selection.
    pub seed: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            name_column: None,
            brand_column: None,
            selection: SelectionMode::Best,
            sample_top_k: 3,
            seed: None,
        }
    }
}

// ── LLM config ──────────────────────────────────────────────────

/// Language-model client settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Force offline mode even when a key is configured.
    pub offline: bool,
    /// API root URL.
    pub base_url: String,
    /// API key; offline mode is used when absent.
    pub api_key: Option<String>,
    /// Chat model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum completion tokens per call.
    pub max_tokens: u32,
    /// Attempts per call for transient failures.
    pub max_attempts: u32,
    /// First backoff delay in milliseconds.
    pub backoff_base_ms: u64,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("offline", &self.offline)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            offline: false,
            base_url: OPENAI_API_BASE.to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            max_attempts: 3,
            backoff_base_ms: 1500,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Whether the run must use the offline placeholder provider.
    pub fn is_offline(&self) -> bool {
        self.offline
            || self
                .api_key
                .as_deref()
                .is_none_or(|key| key.trim().is_empty())
    }

    /// Retry and sampling settings for the completion client.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            max_attempts: self.max_attempts.max(1),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            ..ClientSettings::default()
        }
    }

    /// HTTP timeout per request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ── Pipeline config ─────────────────────────────────────────────

/// Repair loop settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Additional generation attempts after the first.
    pub retry_budget: u32,
    /// Persona rows processed per run.
    pub top_k: usize,
    /// Ask the model for context expansion hints while planning.
    pub expand_hints: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_budget: 2,
            top_k: 3,
            expand_hints: true,
        }
    }
}

// ── Validator config ────────────────────────────────────────────

/// Validator bands and modes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Minimum title length in characters.
    pub title_min: usize,
    /// Maximum title length in characters.
    pub title_max: usize,
    /// Minimum body length in characters.
    pub body_min: usize,
    /// Maximum body length in characters.
    pub body_max: usize,
    /// Whether a missing skin-concern literal is an error.
    pub skin_concern: SkinConcernMode,
    /// Token-Jaccard similarity at which two lines count as duplicates.
    pub duplicate_threshold: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        let bands = LengthBands::default();
        Self {
            title_min: bands.title_min,
            title_max: bands.title_max,
            body_min: bands.body_min,
            body_max: bands.body_max,
            skin_concern: SkinConcernMode::Strict,
            duplicate_threshold: 0.85,
        }
    }
}

impl ValidatorConfig {
    /// Length bands shared by the generator and validator.
    pub fn bands(&self) -> LengthBands {
        LengthBands {
            title_min: self.title_min,
            title_max: self.title_max.max(self.title_min),
            body_min: self.body_min,
            body_max: self.body_max.max(self.body_min),
        }
    }

    /// Full validator settings.
    pub fn settings(&self) -> ValidatorSettings {
        ValidatorSettings {
            bands: self.bands(),
            skin_concern: self.skin_concern,
            duplicate_threshold: self.duplicate_threshold,
        }
    }
}

// ── Phrases config ──────────────────────────────────────────────

/// Phrase table extensions merged into the built-in tables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhrasesConfig {
    /// Additional banned phrases.
    pub banned: Vec<String>,
    /// Additional concept → stand-in words.
    pub equivalences: BTreeMap<String, Vec<String>>,
}

// ── Logging config ──────────────────────────────────────────────

/// Log level and optional file sink.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for JSON log files; console only when unset.
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
