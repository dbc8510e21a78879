//! `ledgerlink config`: config file checks.

use std::path::PathBuf;

use clap::Subcommand;

use ledgerlink_recon::kind::ALL_KINDS;

use crate::{load_config, CliError};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a ledgerlink.toml without running anything
    #[command(after_help = "\
Examples:
  ledgerlink config validate ledgerlink.toml")]
    Validate {
        /// Path to the ledgerlink.toml config file
        config: PathBuf,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Validate { config } => cmd_config_validate(config),
    }
}

fn cmd_config_validate(path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&path))?;

    eprintln!("ok: {}", path.display());
    eprintln!(
        "  tolerance {} cent(s), batches of {}, paid statuses: {}",
        config.tolerance.amount_cents,
        config.batch.max_writes,
        config.payouts.paid_statuses.join(", "),
    );
    for kind in ALL_KINDS {
        let options = config.match_options(*kind);
        let compare = match options.compare {
            Some(fields) => fields.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", "),
            None => "built-in".to_string(),
        };
        eprintln!(
            "  {kind}: compare {compare}{}",
            if options.only_create { ", only create" } else { "" }
        );
    }
    Ok(())
}
