//! `ledgerlink split`: check proposed split lines against the parent amount.

use serde::Serialize;

use ledgerlink_recon::money::{format_cents, parse_cents};
use ledgerlink_recon::split::balance;

use crate::{write_json, CliError};

#[derive(Debug, Serialize)]
struct SplitOutput {
    parent_cents: i64,
    lines_cents: Vec<i64>,
    delta_cents: i64,
    balanced: bool,
}

fn amount(flag: &str, raw: &str) -> Result<i64, CliError> {
    parse_cents(raw).ok_or_else(|| CliError::args(format!("{flag}: cannot parse amount '{raw}'")))
}

pub fn cmd_split(parent: String, lines: Vec<String>, json_output: bool) -> Result<(), CliError> {
    let parent_cents = amount("--parent", &parent)?;
    let lines_cents = lines
        .iter()
        .map(|l| amount("--line", l))
        .collect::<Result<Vec<_>, _>>()?;

    let verdict = balance(parent_cents, &lines_cents);

    if json_output {
        write_json(
            &SplitOutput {
                parent_cents,
                lines_cents,
                delta_cents: verdict.delta_cents,
                balanced: verdict.balanced,
            },
            true,
            None,
        )?;
    } else if verdict.balanced {
        println!("balanced: {} lines = {}", lines.len(), format_cents(parent_cents));
    } else {
        println!(
            "unbalanced: parent {}, lines {}, remaining {}",
            format_cents(parent_cents),
            format_cents(parent_cents.saturating_sub(verdict.delta_cents)),
            format_cents(verdict.delta_cents),
        );
    }

    verdict.ensure_balanced()?;
    Ok(())
}
