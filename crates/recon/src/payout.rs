//! Payout grouping: charges rolled up by processor transfer id.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ReconError;
use crate::model::{PayoutGroup, PayoutReport, StripeChargeRow, Warning};

#[derive(Debug, Clone)]
pub struct PayoutOptions {
    /// Statuses (case-insensitive) that count as paid out.
    pub paid_statuses: Vec<String>,
}

impl Default for PayoutOptions {
    fn default() -> Self {
        Self {
            paid_statuses: vec!["paid".into()],
        }
    }
}

impl PayoutOptions {
    fn is_paid(&self, status: &str) -> bool {
        let status = status.trim();
        self.paid_statuses.iter().any(|s| s.eq_ignore_ascii_case(status))
    }
}

/// Group charges by transfer id and compute gross / fees / net in cents.
///
/// Refunded (fully or partially) and unpaid charges are excluded and
/// reported as warnings. A remaining charge without a transfer id aborts.
pub fn group_payouts(
    rows: &[StripeChargeRow],
    options: &PayoutOptions,
) -> Result<PayoutReport, ReconError> {
    let mut warnings = Vec::new();

    let (refunded, rest): (Vec<&StripeChargeRow>, Vec<&StripeChargeRow>) =
        rows.iter().partition(|r| r.amount_refunded_cents != 0);
    if !refunded.is_empty() {
        warnings.push(Warning::RefundedChargesExcluded {
            count: refunded.len(),
            amount_cents: total(refunded.iter().map(|r| r.amount_cents), "refunded charges")?,
            refunded_cents: total(
                refunded.iter().map(|r| r.amount_refunded_cents),
                "refunded charges",
            )?,
        });
    }

    let (paid, unpaid): (Vec<&StripeChargeRow>, Vec<&StripeChargeRow>) =
        rest.into_iter().partition(|r| options.is_paid(&r.status));
    if !unpaid.is_empty() {
        let statuses: BTreeSet<String> =
            unpaid.iter().map(|r| r.status.trim().to_lowercase()).collect();
        warnings.push(Warning::UnpaidChargesExcluded {
            count: unpaid.len(),
            amount_cents: total(unpaid.iter().map(|r| r.amount_cents), "unpaid charges")?,
            statuses: statuses.into_iter().collect(),
        });
    }

    let missing: Vec<String> = paid
        .iter()
        .filter(|r| r.transfer.trim().is_empty())
        .map(|r| r.id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(ReconError::MissingTransfer { charge_ids: missing });
    }

    let mut groups: BTreeMap<&str, PayoutGroup> = BTreeMap::new();
    for row in paid {
        let transfer = row.transfer.trim();
        let group = groups.entry(transfer).or_insert_with(|| PayoutGroup {
            transfer: transfer.to_string(),
            gross_cents: 0,
            fee_cents: 0,
            net_cents: 0,
            charge_count: 0,
            charge_ids: Vec::new(),
            first_date: row.created_date,
            last_date: row.created_date,
        });
        group.gross_cents = total([group.gross_cents, row.amount_cents], transfer)?;
        group.fee_cents = total([group.fee_cents, row.fee_cents], transfer)?;
        group.charge_count += 1;
        group.charge_ids.push(row.id.clone());
        group.first_date = group.first_date.min(row.created_date);
        group.last_date = group.last_date.max(row.created_date);
    }

    let groups: Vec<PayoutGroup> = groups
        .into_values()
        .map(|mut g| -> Result<PayoutGroup, ReconError> {
            g.net_cents = g
                .gross_cents
                .checked_sub(g.fee_cents)
                .ok_or_else(|| overflow(&g.transfer))?;
            Ok(g)
        })
        .collect::<Result<_, ReconError>>()?;

    log::info!(
        "{} charge(s) grouped into {} payout(s), {} warning(s)",
        rows.len(),
        groups.len(),
        warnings.len()
    );
    for w in &warnings {
        log::warn!("payouts: {w}");
    }

    Ok(PayoutReport { groups, warnings })
}

fn total(amounts: impl IntoIterator<Item = i64>, context: &str) -> Result<i64, ReconError> {
    amounts
        .into_iter()
        .try_fold(0i64, |acc, c| acc.checked_add(c))
        .ok_or_else(|| overflow(context))
}

fn overflow(context: &str) -> ReconError {
    ReconError::AmountOverflow { context: context.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn charge(id: &str, amount: i64, fee: i64, transfer: &str, date: &str) -> StripeChargeRow {
        StripeChargeRow {
            id: id.into(),
            created_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount_cents: amount,
            fee_cents: fee,
            customer_email: format!("{id}@example.org"),
            status: "Paid".into(),
            transfer: transfer.into(),
            amount_refunded_cents: 0,
        }
    }

    #[test]
    fn single_group_sums() {
        let rows = vec![
            charge("ch_1", 10000, 320, "po_abc", "2026-01-15"),
            charge("ch_2", 5000, 175, "po_abc", "2026-01-16"),
        ];
        let report = group_payouts(&rows, &PayoutOptions::default()).unwrap();
        assert_eq!(report.groups.len(), 1);
        let g = &report.groups[0];
        assert_eq!(g.gross_cents, 15000);
        assert_eq!(g.fee_cents, 495);
        assert_eq!(g.net_cents, 14505);
        assert_eq!(g.charge_count, 2);
        assert_eq!(g.first_date, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(g.last_date, NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn groups_ordered_by_transfer() {
        let rows = vec![
            charge("ch_1", 100, 1, "po_b", "2026-01-15"),
            charge("ch_2", 200, 2, "po_a", "2026-01-15"),
            charge("ch_3", 300, 3, "po_b", "2026-01-15"),
        ];
        let report = group_payouts(&rows, &PayoutOptions::default()).unwrap();
        let transfers: Vec<&str> = report.groups.iter().map(|g| g.transfer.as_str()).collect();
        assert_eq!(transfers, vec!["po_a", "po_b"]);
        assert_eq!(report.groups[1].charge_ids, vec!["ch_1", "ch_3"]);
    }

    #[test]
    fn refunded_excluded_and_reported_once() {
        let mut refunded = charge("ch_2", 5000, 175, "po_abc", "2026-01-15");
        refunded.amount_refunded_cents = 2000;
        let mut full = charge("ch_3", 3000, 100, "", "2026-01-15");
        full.amount_refunded_cents = 3000;
        let rows = vec![charge("ch_1", 10000, 320, "po_abc", "2026-01-15"), refunded, full];

        let report = group_payouts(&rows, &PayoutOptions::default()).unwrap();
        assert_eq!(report.groups[0].gross_cents, 10000);
        assert_eq!(report.groups[0].net_cents, 9680);
        assert_eq!(
            report.warnings,
            vec![Warning::RefundedChargesExcluded {
                count: 2,
                amount_cents: 8000,
                refunded_cents: 5000,
            }]
        );
    }

    #[test]
    fn missing_transfer_aborts() {
        let rows = vec![
            charge("ch_1", 10000, 320, "po_abc", "2026-01-15"),
            charge("ch_2", 5000, 175, "  ", "2026-01-15"),
        ];
        let err = group_payouts(&rows, &PayoutOptions::default()).unwrap_err();
        assert_eq!(err, ReconError::MissingTransfer { charge_ids: vec!["ch_2".into()] });
    }

    #[test]
    fn failed_charges_excluded_before_transfer_check() {
        let mut failed = charge("ch_2", 5000, 0, "", "2026-01-15");
        failed.status = "Failed".into();
        let rows = vec![charge("ch_1", 10000, 320, "po_abc", "2026-01-15"), failed];
        let report = group_payouts(&rows, &PayoutOptions::default()).unwrap();
        assert_eq!(report.groups.len(), 1);
        assert_eq!(
            report.warnings,
            vec![Warning::UnpaidChargesExcluded {
                count: 1,
                amount_cents: 5000,
                statuses: vec!["failed".into()],
            }]
        );
    }

    #[test]
    fn overflowing_total_is_an_error() {
        let big = i64::MAX / 2 + 10;
        let rows = vec![
            charge("ch_1", big, 0, "po_1", "2026-01-15"),
            charge("ch_2", big, 0, "po_1", "2026-01-16"),
        ];
        let err = group_payouts(&rows, &PayoutOptions::default()).unwrap_err();
        assert_eq!(err, ReconError::AmountOverflow { context: "po_1".into() });
        assert!(err.is_blocking());
    }

    #[test]
    fn overflowing_refund_total_is_an_error() {
        let mut a = charge("ch_1", i64::MAX, 0, "po_1", "2026-01-15");
        a.amount_refunded_cents = 1;
        let mut b = charge("ch_2", 1, 0, "po_1", "2026-01-15");
        b.amount_refunded_cents = 1;
        let err = group_payouts(&[a, b], &PayoutOptions::default()).unwrap_err();
        assert!(matches!(err, ReconError::AmountOverflow { .. }));
    }

    #[test]
    fn empty_input() {
        let report = group_payouts(&[], &PayoutOptions::default()).unwrap();
        assert!(report.groups.is_empty());
        assert!(report.warnings.is_empty());
    }
}
