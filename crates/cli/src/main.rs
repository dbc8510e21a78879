// LedgerLink CLI - plan spreadsheet imports and reconcile processor payouts

mod config;
mod exit_codes;
mod matching;
mod payouts;
mod split;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

use ledgerlink_recon::{EntityKind, ReconConfig, ReconError};

use exit_codes::{recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "ledgerlink")]
#[command(about = "Import matching and payout reconciliation for small-business ledgers")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan an import: classify each row as create, update or skip
    #[command(after_help = "\
Examples:
  ledgerlink match --kind contact --rows contacts.csv --existing contacts-db.csv
  ledgerlink match --kind bank-account --rows accounts.csv --existing accounts-db.csv --json
  ledgerlink match --kind category --rows cats.csv --existing cats-db.csv --config ledgerlink.toml
  ledgerlink match --kind employee --rows staff.csv --existing staff-db.csv --only-create --output plan.json")]
    Match {
        /// Entity kind: contact, category, bank-account, employee
        #[arg(long, value_parser = parse_kind)]
        kind: EntityKind,

        /// CSV with the rows to import
        #[arg(long)]
        rows: PathBuf,

        /// CSV snapshot of stored records (needs an `id` column)
        #[arg(long)]
        existing: PathBuf,

        /// Path to a ledgerlink.toml config file
        #[arg(long, env = "LEDGERLINK_CONFIG")]
        config: Option<PathBuf>,

        /// Never update: matched rows are skipped as "already exists"
        #[arg(long)]
        only_create: bool,

        /// Output JSON to stdout instead of the plan table
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Group processor charges into payouts and match them to bank deposits
    #[command(after_help = "\
Examples:
  ledgerlink payouts --charges charges.csv
  ledgerlink payouts --charges charges.csv --deposit 145.05
  ledgerlink payouts --charges charges.csv --deposits bank.csv --tolerance 1 --json
  ledgerlink payouts --charges charges.csv --deposits bank.csv --settled po_abc")]
    Payouts {
        /// Processor charge export (CSV)
        #[arg(long)]
        charges: PathBuf,

        /// A single deposit amount to match, e.g. 145.05
        #[arg(long, allow_negative_numbers = true)]
        deposit: Option<String>,

        /// CSV of bank deposits with id, date, amount columns
        #[arg(long)]
        deposits: Option<PathBuf>,

        /// Allowed difference in cents between payout net and deposit
        #[arg(long)]
        tolerance: Option<i64>,

        /// Transfer already confirmed against a deposit. Repeatable.
        #[arg(long, value_name = "TRANSFER")]
        settled: Vec<String>,

        /// Path to a ledgerlink.toml config file
        #[arg(long, env = "LEDGERLINK_CONFIG")]
        config: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,
    },

    /// Check that split lines add up to the parent transaction amount
    #[command(after_help = "\
Examples:
  ledgerlink split --parent 100.00 --line 60.00 --line 40.00
  ledgerlink split --parent -25.00 --line -30.00 --line 5.00 --json")]
    Split {
        /// Parent transaction amount
        #[arg(long, allow_negative_numbers = true)]
        parent: String,

        /// One split line amount. Repeatable.
        #[arg(long = "line", allow_negative_numbers = true, required = true)]
        lines: Vec<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Config file operations
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    s.parse()
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Match {
            kind,
            rows,
            existing,
            config,
            only_create,
            json,
            output,
        } => matching::cmd_match(kind, rows, existing, config, only_create, json, output),
        Commands::Payouts {
            charges,
            deposit,
            deposits,
            tolerance,
            settled,
            config,
            json,
        } => payouts::cmd_payouts(charges, deposit, deposits, tolerance, settled, config, json),
        Commands::Split { parent, lines, json } => split::cmd_split(parent, lines, json),
        Commands::Config(cmd) => config::cmd_config(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Error from the engine with its contract exit code and a fix-it hint.
    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::ExclusiveFlagConflict { flag, .. } => {
                Some(format!("set '{flag}' on one row only and leave it blank on the others"))
            }
            ReconError::MissingTransfer { .. } => Some(
                "export charges again once the payout exists, or remove charges that are not paid out yet"
                    .to_string(),
            ),
            ReconError::MissingColumn { source, column }
                if column != "id" && source != "charges" && source != "deposits" =>
            {
                Some(format!(
                    "rename the header or map it under [columns.{source}] {column} = [\"Your Header\"]"
                ))
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        Self::recon(err)
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

pub(crate) fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))
}

/// Config from `--config`, or defaults when no file is given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    match path {
        Some(p) => {
            let text = read_input(p)?;
            ReconConfig::from_toml(&text)
                .map_err(|e| CliError::recon(e).with_hint(format!("check {}", p.display())))
        }
        None => Ok(ReconConfig::default()),
    }
}

pub(crate) fn write_json(
    value: &impl serde::Serialize,
    json_output: bool,
    output_file: Option<&Path>,
) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value).map_err(|e| CliError {
        code: exit_codes::EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;

    if let Some(path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }
    Ok(())
}
