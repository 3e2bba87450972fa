//! split-engine CLI
//!
//! Evaluate split plans from JSON scenario files.
//!
//! # Usage
//!
//! ```bash
//! # Split January for one property
//! split-engine evaluate --input scenario.json --property house --from 2026-01-01 --to 2026-01-31
//!
//! # Same, as JSON
//! split-engine evaluate --input scenario.json --property house --format json
//!
//! # Check every plan as if it were being activated
//! split-engine validate --input scenario.json
//!
//! # Generate a random scenario for testing
//! split-engine generate --stakeholders 5 --transactions 200 --layers 3 --output scenario.json
//! ```

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use split_engine::core::ids::PropertyId;
use split_engine::engine::runner::SplitPlanRunner;
use split_engine::engine::source::Period;
use split_engine::scenario::Scenario;
use split_engine::settings::{OutputFormat, Settings};
use split_engine::simulation::generator::{generate_random_scenario, ScenarioConfig};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "split-engine", version, about = "Layered split-plan allocation for shared property finances")]
struct Cli {
    /// Settings file (defaults to ./split-engine.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a property's active plan over a period
    Evaluate {
        /// Path to a JSON scenario file
        #[arg(long)]
        input: PathBuf,
        /// Property to evaluate
        #[arg(long)]
        property: String,
        /// First day of the period (inclusive)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day of the period (inclusive)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Output format: text or json
        #[arg(long)]
        format: Option<OutputFormat>,
    },
    /// Validate every plan of a scenario
    Validate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Generate a random, valid scenario
    Generate {
        #[arg(long, default_value_t = 1)]
        properties: usize,
        #[arg(long, default_value_t = 4)]
        stakeholders: usize,
        #[arg(long, default_value_t = 50)]
        transactions: usize,
        #[arg(long, default_value_t = 3)]
        layers: usize,
        #[arg(long)]
        seed: Option<u64>,
        /// Write to file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_filter))
        .init();

    match cli.command {
        Command::Evaluate {
            input,
            property,
            from,
            to,
            format,
        } => cmd_evaluate(
            &settings,
            &input,
            PropertyId::new(property),
            period(from, to)?,
            format.unwrap_or(settings.output_format),
        ),
        Command::Validate { input } => cmd_validate(&input),
        Command::Generate {
            properties,
            stakeholders,
            transactions,
            layers,
            seed,
            output,
        } => {
            let config = ScenarioConfig {
                property_count: properties,
                stakeholder_count: stakeholders,
                transaction_count: transactions,
                layer_count: layers,
                seed,
                ..Default::default()
            };
            cmd_generate(&config, output.as_deref())
        }
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Scenario::from_json(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Open-ended on either side when a bound is missing.
fn period(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Period> {
    let start = from
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = to
        .and_then(|d| d.succ_opt())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    Ok(Period::new(start, end)?)
}

fn cmd_evaluate(
    settings: &Settings,
    input: &Path,
    property_id: PropertyId,
    period: Period,
    format: OutputFormat,
) -> Result<()> {
    let scenario = load_scenario(input)?;
    let base_table = settings.currency_table().context("invalid currency settings")?;
    let currencies = scenario
        .currency_table(&base_table)
        .context("invalid scenario currencies")?;
    let store = scenario.into_store().context("loading scenario")?;

    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner
        .evaluate(&property_id, &period)
        .with_context(|| format!("evaluating property {}", property_id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            print!("{}", result);
            if let Some(currency) = result
                .settlement_currency()
                .and_then(|code| currencies.get(code).ok())
            {
                println!("\nAllocated:  {}", currency.format(result.total_allocated()));
            }
        }
    }
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<()> {
    let scenario = load_scenario(input)?;
    let outcomes = scenario.validate_plans().context("loading scenario")?;

    let mut failed = 0;
    for (plan_id, outcome) in &outcomes {
        match outcome {
            Ok(()) => println!("ok      {}", plan_id),
            Err(e) => {
                failed += 1;
                println!("invalid {}: {}", plan_id, e);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} plans failed validation", failed, outcomes.len());
    }
    Ok(())
}

fn cmd_generate(config: &ScenarioConfig, output: Option<&Path>) -> Result<()> {
    let scenario = generate_random_scenario(config)?;
    let json = scenario.to_json()?;

    match output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "Generated {} transactions across {} properties -> {}",
                scenario.transactions.len(),
                scenario.properties.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
