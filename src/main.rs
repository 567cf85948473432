use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::{Config, LogFormat, LoggingSettings, load_config, load_config_from};
use core_types::{BudgetItem, BudgetList, CategoryCode};
use engine::{DeadlineWatcher, EngineError, GrantLifecycle, Services, StageReport};
use events::LedgerEvent;
use executor::Ledger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// The main entry point for the SmartGrant ledger.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional: a .env file may carry RUST_LOG and SMARTGRANT__* overrides.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => load_config().context("loading config.toml")?,
    };
    let _log_guard = init_tracing(&config.logging, cli.log_format)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Simulate(args) => handle_simulate(args, &config).await,
        Commands::Demo => handle_demo(&config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Category-scoped grant budget ledger with receipt reconciliation and sanctions.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults to ./config.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Console log format, overriding `logging.format`.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted sequence of lifecycle stages against a fresh ledger.
    Simulate(SimulateArgs),
    /// Run the built-in purchase, violation, repayment and amendment walkthrough.
    Demo,
}

#[derive(Parser)]
struct SimulateArgs {
    /// JSON file holding the initial budget (`{"items": [...], "totalCost": ...}`).
    #[arg(long)]
    budget: PathBuf,

    /// JSON file holding the list of stages to run.
    #[arg(long)]
    script: PathBuf,
}

/// One scripted lifecycle stage.
#[derive(Debug, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
enum Step {
    Initiate {
        payment_qr: String,
    },
    Finalize {
        /// A receipt token, or an inline purchase list.
        #[serde(alias = "receipt_qr")]
        receipt: serde_json::Value,
    },
    Timeout,
    Repay {
        amount: Decimal,
    },
    UpdateBudget {
        #[serde(alias = "new_items")]
        items: Vec<BudgetItem>,
    },
}

impl Step {
    fn initiate(payment_qr: &str) -> Self {
        Step::Initiate {
            payment_qr: payment_qr.to_string(),
        }
    }

    fn finalize(receipt: &str) -> Self {
        Step::Finalize {
            receipt: receipt.into(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Step::Initiate { .. } => "initiate",
            Step::Finalize { .. } => "finalize",
            Step::Timeout => "timeout",
            Step::Repay { .. } => "repay",
            Step::UpdateBudget { .. } => "updateBudget",
        }
    }
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the global subscriber. The returned guard must live until exit so the
/// file writer can flush.
fn init_tracing(
    settings: &LoggingSettings,
    format_override: Option<LogFormat>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("invalid logging.level")?;

    let console = fmt::layer().with_writer(std::io::stderr);
    let console = match format_override.unwrap_or(settings.format) {
        LogFormat::Full => console.boxed(),
        LogFormat::Compact => console.compact().boxed(),
    };

    let (file_layer, guard) = match &settings.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "smartgrant.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(guard)
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_simulate(args: SimulateArgs, config: &Config) -> anyhow::Result<()> {
    let budget: BudgetList = read_json(&args.budget)?;
    let steps: Vec<Step> = read_json(&args.script)?;
    tracing::info!(items = budget.items().len(), steps = steps.len(), "Starting simulation.");

    let services = Services::simulated(&config.services);
    run_steps(budget, steps, services, config).await
}

async fn handle_demo(config: &Config) -> anyhow::Result<()> {
    let mut service_settings = config.services.clone();
    let demo_directory = [
        ("7700000000", "47.11"),
        ("1234567890", "99.99"),
        ("7800000000", "47.61"),
    ];
    for (tax_id, category) in demo_directory {
        service_settings
            .category_directory
            .entry(tax_id.to_string())
            .or_insert_with(|| CategoryCode::new(category));
    }

    let budget = BudgetList::from_items(vec![
        BudgetItem::new("Food", 20, dec!(500), ["47.11"]),
        BudgetItem::new("Textbooks", 4, dec!(200), ["47.61"]),
    ])?;
    let steps = vec![
        Step::initiate("tin:7700000000|amount:100"),
        Step::finalize("fns://valid_food"),
        Step::initiate("tin:7700000000|amount:100"),
        Step::finalize("fns://invalid_alcohol"),
        Step::initiate("tin:7800000000|amount:50"),
        Step::Repay { amount: dec!(100) },
        Step::initiate("tin:7800000000|amount:50"),
        Step::Timeout,
        Step::Repay { amount: dec!(80) },
        Step::UpdateBudget {
            items: vec![
                BudgetItem::new("Food", 20, dec!(350), ["47.11"]),
                BudgetItem::new("Textbooks", 4, dec!(150), ["47.61"]),
                BudgetItem::new("Stationery", 10, dec!(50), ["47.62"]),
            ],
        },
    ];

    run_steps(budget, steps, Services::simulated(&service_settings), config).await
}

/// Drives `steps` through a fresh lifecycle and prints a report table, the audit
/// trail and the final ledger state.
async fn run_steps(
    budget: BudgetList,
    steps: Vec<Step>,
    services: Services,
    config: &Config,
) -> anyhow::Result<()> {
    let ledger = Ledger::new(budget)?;
    let lifecycle = Arc::new(GrantLifecycle::new(ledger, services, config.ledger.clone()));
    let mut audit = lifecycle.subscribe();
    let watcher = DeadlineWatcher::new(lifecycle.clone()).spawn();

    let mut table = Table::new();
    table.set_header(vec!["#", "Stage", "Status", "Message"]);

    for (index, step) in steps.into_iter().enumerate() {
        let label = step.label();
        let (status, message) = match run_step(&lifecycle, step).await {
            Ok(report) if report.is_warning() => ("WARNING", report.to_string()),
            Ok(report) => ("OK", report.to_string()),
            Err(e) => ("ERROR", e.to_string()),
        };
        table.add_row(vec![
            (index + 1).to_string(),
            label.to_string(),
            status.to_string(),
            message,
        ]);
    }
    watcher.abort();

    println!("{table}");

    println!("\nAudit trail:");
    let (events, dropped) = drain_audit(&mut audit);
    if dropped > 0 {
        println!("  ... {dropped} earlier events dropped");
    }
    for event in events {
        println!("  {}", event.to_json()?);
    }

    let state = lifecycle.state().await;
    println!("\nFinal ledger state:\n{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// Collects every buffered event. A lagging receiver skips to the oldest retained
/// event and keeps going; the number of skipped events is returned alongside.
fn drain_audit(audit: &mut broadcast::Receiver<LedgerEvent>) -> (Vec<LedgerEvent>, u64) {
    let mut events = Vec::new();
    let mut dropped = 0;
    loop {
        match audit.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Audit trail overflowed; oldest events were dropped.");
                dropped += skipped;
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    (events, dropped)
}

async fn run_step(lifecycle: &GrantLifecycle, step: Step) -> Result<StageReport, EngineError> {
    match step {
        Step::Initiate { payment_qr } => lifecycle.initiate(&payment_qr).await,
        Step::Finalize { receipt } => {
            let token = match receipt {
                serde_json::Value::String(token) => token,
                inline => inline.to_string(),
            };
            lifecycle.finalize(&token).await
        }
        Step::Timeout => lifecycle.timeout().await,
        Step::Repay { amount } => lifecycle.repay(amount).await,
        Step::UpdateBudget { items } => lifecycle.update_budget(items).await,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::EventKind;

    #[test]
    fn test_drain_audit_recovers_from_lag() {
        let (sender, mut audit) = broadcast::channel(2);
        for balance in [dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)] {
            sender
                .send(LedgerEvent::new(EventKind::BudgetRepriced { balance }))
                .unwrap();
        }

        let (events, dropped) = drain_audit(&mut audit);

        assert_eq!(dropped, 3);
        let balances: Vec<Decimal> = events
            .into_iter()
            .map(|event| match event.kind {
                EventKind::BudgetRepriced { balance } => balance,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(balances, vec![dec!(4), dec!(5)]);
    }

    #[test]
    fn test_script_steps_parse() {
        let steps: Vec<Step> = serde_json::from_str(
            r#"[{"stage":"initiate","payment_qr":"tin:1|amount:5"},{"stage":"timeout"},
                {"stage":"repay","amount":"5"},{"stage":"finalize","receipt_qr":"valid_food"}]"#,
        )
        .unwrap();
        let labels: Vec<&str> = steps.iter().map(Step::label).collect();
        assert_eq!(labels, ["initiate", "timeout", "repay", "finalize"]);
    }
}
