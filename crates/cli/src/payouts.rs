//! `ledgerlink payouts`: processor charges grouped by transfer, optionally
//! matched against bank deposits.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use ledgerlink_recon::deposit::{match_deposits, DepositResult, DepositStatus};
use ledgerlink_recon::load::{load_charges, load_deposits};
use ledgerlink_recon::model::{BankDeposit, PayoutGroup, Warning};
use ledgerlink_recon::money::{format_cents, parse_cents};
use ledgerlink_recon::group_payouts;

use crate::exit_codes::EXIT_AMBIGUOUS;
use crate::{load_config, read_input, write_json, CliError};

#[derive(Debug, Serialize)]
struct PayoutsOutput {
    tolerance_cents: i64,
    groups: Vec<PayoutGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deposits: Vec<DepositResult>,
    warnings: Vec<Warning>,
}

pub fn cmd_payouts(
    charges_path: PathBuf,
    deposit: Option<String>,
    deposits_path: Option<PathBuf>,
    tolerance: Option<i64>,
    settled: Vec<String>,
    config_path: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;

    let tolerance_cents = tolerance.unwrap_or(config.tolerance.amount_cents);
    if !(0..=100).contains(&tolerance_cents) {
        return Err(CliError::args(format!(
            "--tolerance must be between 0 and 100 cents, got {tolerance_cents}"
        )));
    }

    let charges = load_charges(&read_input(&charges_path)?)?;
    let report = group_payouts(&charges, &config.payout_options())?;

    let mut deposits: Vec<BankDeposit> = Vec::new();
    if let Some(raw) = deposit {
        let amount_cents = parse_cents(&raw).ok_or_else(|| {
            CliError::args(format!("--deposit: cannot parse amount '{raw}'"))
                .with_hint("use a plain decimal like 145.05")
        })?;
        deposits.push(BankDeposit { id: "deposit".into(), date: None, amount_cents });
    }
    if let Some(ref path) = deposits_path {
        deposits.extend(load_deposits(&read_input(path)?)?);
    }

    let settled: BTreeSet<String> = settled.into_iter().collect();
    let results = match_deposits(&report.groups, &deposits, tolerance_cents, &settled);
    tracing::debug!(
        groups = report.groups.len(),
        deposits = deposits.len(),
        settled = settled.len(),
        "payouts matched"
    );

    let ambiguous = results
        .iter()
        .filter(|r| r.status == DepositStatus::Ambiguous)
        .count();

    let output = PayoutsOutput {
        tolerance_cents,
        groups: report.groups,
        deposits: results,
        warnings: report.warnings,
    };

    write_json(&output, json_output, None)?;
    if !json_output {
        print_groups(&output.groups);
        print_deposits(&output.deposits);
    }

    // Human summary to stderr
    eprintln!(
        "{} payout(s) from {} charge(s), {} deposit(s) checked",
        output.groups.len(),
        charges.len(),
        output.deposits.len(),
    );
    for w in &output.warnings {
        eprintln!("warning: {w}");
    }

    if ambiguous > 0 {
        return Err(CliError {
            code: EXIT_AMBIGUOUS,
            message: format!("{ambiguous} deposit(s) match more than one payout"),
            hint: Some("confirm the right payout and pass the others with --settled".into()),
        });
    }

    Ok(())
}

fn print_groups(groups: &[PayoutGroup]) {
    for g in groups {
        println!(
            "{:<24} {:>3} charge(s)  gross {:>12}  fees {:>10}  net {:>12}  {}..{}",
            g.transfer,
            g.charge_count,
            format_cents(g.gross_cents),
            format_cents(g.fee_cents),
            format_cents(g.net_cents),
            g.first_date,
            g.last_date,
        );
    }
}

fn print_deposits(results: &[DepositResult]) {
    for r in results {
        let candidates: Vec<String> = r
            .candidates
            .iter()
            .map(|c| format!("{} ({:+})", c.transfer, c.delta_cents))
            .collect();
        println!(
            "deposit {} {}: {}{}",
            r.deposit.id,
            format_cents(r.deposit.amount_cents),
            r.status,
            if candidates.is_empty() {
                String::new()
            } else {
                format!(" -> {}", candidates.join(", "))
            }
        );
    }
}
