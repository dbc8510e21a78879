//! `ledgerlink match`: plan an import against a snapshot of stored records.

use std::path::PathBuf;

use ledgerlink_recon::batch::write_batches;
use ledgerlink_recon::load::{load_existing, load_rows};
use ledgerlink_recon::model::MatchDecision;
use ledgerlink_recon::{match_rows, Action, EntityKind, MatchOutcome};

use crate::{load_config, read_input, write_json, CliError};

pub fn cmd_match(
    kind: EntityKind,
    rows_path: PathBuf,
    existing_path: PathBuf,
    config_path: Option<PathBuf>,
    only_create: bool,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let aliases = config.aliases(kind);

    let rows = load_rows(kind, &read_input(&rows_path)?, &aliases)?;
    let existing = load_existing(kind, &read_input(&existing_path)?, &aliases)?;
    tracing::debug!(
        rows = rows.rows.len(),
        existing = existing.len(),
        "loaded {kind} import"
    );

    let mut options = config.match_options(kind);
    options.only_create |= only_create;

    let outcome = match_rows(&kind.config(), &rows, &existing, &options)?;

    write_json(&outcome, json_output, output_file.as_deref())?;
    if !json_output {
        print_plan(&outcome);
    }

    // Human summary to stderr
    let s = &outcome.summary;
    let writes = outcome.writes();
    let batches = write_batches(&writes, config.batch.max_writes)?.count();
    eprintln!(
        "{kind}: {} to create, {} to update, {} to skip ({} write(s) in {} batch(es))",
        s.to_create,
        s.to_update,
        s.to_skip,
        writes.len(),
        batches,
    );
    for w in &outcome.warnings {
        eprintln!("warning: {w}");
    }

    Ok(())
}

fn print_plan(outcome: &MatchOutcome) {
    for d in &outcome.decisions {
        println!("{}", plan_line(d));
    }
}

fn plan_line(d: &MatchDecision) -> String {
    let target = d.existing_id.as_deref().unwrap_or("-");
    let detail = match d.action {
        Action::Update => d
            .changed_fields()
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        Action::Create => match d.promoted {
            Some(flag) => format!("receives {flag}"),
            None => String::new(),
        },
        Action::Skip => d.reason.as_ref().map(|r| r.to_string()).unwrap_or_default(),
    };
    format!("row {:<5} {:<7} {:<12} {}", d.row_index, d.action.to_string(), target, detail)
        .trim_end()
        .to_string()
}
