#![allow(missing_docs)]

//! CRM Narrator CLI.
//!
//! `run` generates messages for one persona's ranked rows; `check` validates
//! a stored `TITLE:/BODY:` message against the brand rule table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crm_narrator::config::AppConfig;
use crm_narrator::data::catalog::{CatalogStore, Product, SelectedProduct};
use crm_narrator::data::persona::{ContextLoader, PersonaRow};
use crm_narrator::data::rules::RuleStore;
use crm_narrator::data::DataError;
use crm_narrator::data::scoring::{CompositeScorer, ProductSelector};
use crm_narrator::generator::{GeneratedMessage, Generator};
use crm_narrator::logging::{self, LoggingGuard};
use crm_narrator::phrases::PhraseBook;
use crm_narrator::pipeline::{Pipeline, RunReport};
use crm_narrator::planner::Planner;
use crm_narrator::providers::client::CompletionClient;
use crm_narrator::providers::offline::OfflineProvider;
use crm_narrator::providers::openai::OpenAiProvider;
use crm_narrator::providers::LlmProvider;
use crm_narrator::validator::{tags, Validator};

#[derive(Parser)]
#[command(name = "crm-narrator", version, about = "Personalized cosmetics CRM message generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate messages for a persona's top-ranked rows.
    Run {
        /// Persona identifier, e.g. persona_1.
        #[arg(long)]
        persona: String,
        /// Rows to process; defaults to `[pipeline].top_k`.
        #[arg(long)]
        topk: Option<usize>,
        /// Config file path; defaults to `$CRM_NARRATOR_CONFIG` or ./narrator.toml.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Use the offline placeholder instead of the language model.
        #[arg(long)]
        offline: bool,
    },
    /// Validate a stored message and print its error tags as JSON.
    Check {
        /// Brand of the message.
        #[arg(long)]
        brand: String,
        /// Product the message must mention.
        #[arg(long)]
        product: Option<String>,
        /// Skin concern the message must mention.
        #[arg(long)]
        skin_concern: Option<String>,
        /// File holding `TITLE: …\nBODY: …`.
        #[arg(long)]
        message: PathBuf,
        /// Config file path.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            persona,
            topk,
            config,
            output,
            offline,
        } => {
            let mut config = load_config(config)?;
            if offline {
                config.llm.offline = true;
            }
            let _guard = init_logging(&config)?;
            run(&config, &persona, topk, output).await
        }
        Command::Check {
            brand,
            product,
            skin_concern,
            message,
            config,
        } => {
            let config = load_config(config)?;
            let _guard = init_logging(&config)?;
            check(&config, brand, product, skin_concern, &message)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")
}

fn init_logging(config: &AppConfig) -> Result<Option<LoggingGuard>> {
    match &config.logging.dir {
        Some(dir) => {
            let guard = logging::init_file(&PathBuf::from(dir), &config.logging.level)
                .context("failed to initialize file logging")?;
            Ok(Some(guard))
        }
        None => {
            logging::init_cli(&config.logging.level);
            Ok(None)
        }
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>> {
    if config.llm.is_offline() {
        warn!("no API key configured or offline requested, using offline placeholder");
        return Ok(Arc::new(OfflineProvider));
    }
    let api_key = config.llm.api_key.clone().unwrap_or_default();
    let provider = OpenAiProvider::new(
        config.llm.model.clone(),
        api_key,
        &config.llm.base_url,
        config.llm.timeout(),
    )
    .context("failed to build OpenAI provider")?;
    info!(model = %config.llm.model, endpoint = %provider.endpoint(), "OpenAI provider ready");
    Ok(Arc::new(provider))
}

fn phrase_book(config: &AppConfig) -> Arc<PhraseBook> {
    Arc::new(PhraseBook::standard().with_extensions(&config.phrases.banned, &config.phrases.equivalences))
}

async fn run(config: &AppConfig, persona: &str, topk: Option<usize>, output: Option<PathBuf>) -> Result<()> {
    let loader = ContextLoader::new(&config.data);
    let rows = loader
        .load(persona, topk.unwrap_or(config.pipeline.top_k))
        .context("failed to load persona rows")?;
    let rules = RuleStore::load(&config.data.resolve(&config.data.brand_rules_file))
        .context("failed to load brand rules")?;
    let catalog = CatalogStore::load(&config.data.resolve(&config.data.catalog_file), &config.catalog)
        .context("failed to load product catalog")?;

    let client = Arc::new(CompletionClient::new(build_provider(config)?, config.llm.client_settings()));
    let phrases = phrase_book(config);
    let settings = config.validator.settings();

    let planner = Planner::new(Arc::clone(&client), loader.load_tone_map(), config.pipeline.expand_hints);
    let generator = Generator::new(Arc::clone(&client), Arc::clone(&phrases), settings.bands);
    let validator = Validator::new(settings, phrases);
    let selector = ProductSelector::new(
        Box::new(CompositeScorer::standard()),
        config.catalog.selection,
        config.catalog.sample_top_k,
        config.catalog.seed,
    );

    let mut pipeline = Pipeline::new(
        Arc::new(generator),
        planner,
        validator,
        rules,
        catalog,
        selector,
        config.pipeline.retry_budget,
    );
    let records = pipeline.run(rows).await;
    let report = RunReport::new(persona, client.model_id(), client.is_offline(), records);
    info!(
        run_id = %report.run_id,
        records = report.records.len(),
        valid = report.valid_count(),
        "writing report"
    );

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    match output {
        Some(path) => std::fs::write(&path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn check(
    config: &AppConfig,
    brand: String,
    product: Option<String>,
    skin_concern: Option<String>,
    message: &Path,
) -> Result<()> {
    let text = std::fs::read_to_string(message)
        .with_context(|| format!("failed to read message file {}", message.display()))?;
    let parsed = GeneratedMessage::parse_wire(&text)
        .with_context(|| format!("{} is not in TITLE:/BODY: format", message.display()))?;

    let rules = match RuleStore::load(&config.data.resolve(&config.data.brand_rules_file)) {
        Ok(rules) => rules,
        Err(DataError::MissingFile(path)) => {
            warn!(path = %path.display(), "brand rule table not found, checking without brand rules");
            RuleStore::default()
        }
        Err(e) => return Err(e).context("failed to load brand rules"),
    };
    let rule = rules.resolve(&brand);

    let mut row = PersonaRow::from_record(
        [("persona_id", "check"), ("brand", brand.as_str())]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect(),
    );
    row.skin_concern = skin_concern;
    row.product = product.map(|name| SelectedProduct {
        product: Product::new(name, brand.clone()),
        score: 0.0,
        brand_fallback: false,
    });

    let validator = Validator::new(config.validator.settings(), phrase_book(config));
    let errors = validator.validate(&row, &parsed.title, &parsed.body, &rule);
    let report = serde_json::json!({
        "brand": brand,
        "valid": errors.is_empty(),
        "errors": tags(&errors),
    });
    println!("{}", serde_json::to_string_pretty(&report).context("failed to serialize result")?);
    Ok(())
}
