//! `qcert`: run the conformance battery against the in-memory reference adapter

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};
use qcert_harness::checks::battery;
use qcert_harness::logging::{self, LoggingConfig};
use qcert_harness::{
    CheckStatus, HarnessConfig, HarnessError, RecordingReporter, Reporters,
    TracingReporter, certify_adapter_with, destructive_operations,
};
use qcert_memory::{MemoryAdapter, MemoryEngine, MemoryProvisioner};
use std::path::PathBuf;
use std::process::ExitCode;

/// Conformance harness for query adapters.
#[derive(Debug, Parser)]
#[command(name = "qcert", version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "QCERT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "QCERT_LOG", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the battery (the default)
    Run(RunArgs),
    /// List the checks in execution order
    Checks,
    /// List the create and drop operations a run performs
    Operations,
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Default, clap::Args)]
struct RunArgs {
    /// Allow the run to create and drop its scratch database and tables
    #[arg(long)]
    acknowledge_risks: bool,

    /// Echo record payloads in the log
    #[arg(short, long)]
    verbose: bool,

    /// Seed for fixture generation
    #[arg(long)]
    seed: Option<u64>,

    /// Size of the randomized insert batch
    #[arg(long)]
    fixture_count: Option<usize>,

    /// Scratch database name
    #[arg(long)]
    database: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(LoggingConfig::with_level(&cli.log_level)) {
        eprintln!("warning: {:#}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let base = load_config(cli.config.as_ref())?;
    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => {
            let config = apply_args(base, &args)?;
            certify(&config, args.format).await
        }
        Command::Checks => {
            for (i, check) in battery().iter().enumerate() {
                println!("{:>3}  {:<10} {}", i + 1, check.category, check.description);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Operations => {
            for operation in destructive_operations(&base) {
                println!("{}", operation);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            print!("{}", base.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Defaults, then the config file, then `QCERT_*` variables
fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig> {
    let mut config = match path {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    config.apply_env().context("applying QCERT_* environment overrides")?;
    Ok(config)
}

fn apply_args(mut config: HarnessConfig, args: &RunArgs) -> Result<HarnessConfig> {
    config.risks_acknowledged |= args.acknowledge_risks;
    config.verbose |= args.verbose;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(count) = args.fixture_count {
        config.fixture_count = count;
    }
    if let Some(database) = &args.database {
        config.database = database.clone();
    }
    config.validate().context("invalid command-line options")?;
    Ok(config)
}

async fn certify(config: &HarnessConfig, format: OutputFormat) -> Result<ExitCode> {
    let provisioner = MemoryProvisioner::new(MemoryEngine::new());
    let adapter = MemoryAdapter::new();
    let mut recorder = RecordingReporter::default();
    let mut tracer = TracingReporter;
    let result = {
        let mut reporters = Reporters::new().with(&mut tracer).with(&mut recorder);
        certify_adapter_with(&adapter, &provisioner, config, &mut reporters).await
    };

    let report = match result {
        Ok(report) => report,
        Err(HarnessError::RisksNotAcknowledged { operations }) => {
            eprintln!("refusing to run; this would:");
            for operation in operations {
                eprintln!("  {}", operation);
            }
            eprintln!("pass --acknowledge-risks or set QCERT_RISKS_ACKNOWLEDGED=1");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e).context("certification run aborted"),
    };

    match format {
        OutputFormat::Table => println!("{}", summary_table(&recorder)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// One row per check; checks with no recorded outcome were skipped
fn summary_table(recorder: &RecordingReporter) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Category", "Check", "Status", "Detail"]);

    for (i, check) in battery().iter().enumerate() {
        let sequence = i as u32 + 1;
        let outcome = recorder.outcomes().find(|o| o.sequence == sequence);
        let (status, color) = match outcome.map(|o| o.status) {
            Some(CheckStatus::Passed) => ("passed", Color::Green),
            Some(CheckStatus::Failed) => ("failed", Color::Red),
            Some(CheckStatus::Errored) => ("errored", Color::Magenta),
            None => ("skipped", Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(sequence),
            Cell::new(check.category),
            Cell::new(check.description),
            Cell::new(status).fg(color),
            Cell::new(outcome.and_then(|o| o.message.as_deref()).unwrap_or("")),
        ]);
    }
    table
}
