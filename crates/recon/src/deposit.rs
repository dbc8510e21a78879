//! Payout-to-deposit matching within a fixed cent tolerance.
//!
//! Every qualifying payout is returned. When two payouts fit one deposit the
//! caller decides; nothing here ranks or picks a "best" candidate.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{BankDeposit, PayoutGroup};

/// Rounding drift allowed between a payout's net and the bank deposit.
pub const DEFAULT_TOLERANCE_CENTS: i64 = 2;

/// All groups whose net lies within `tolerance_cents` of the deposit, in
/// the order they were given.
pub fn match_deposit(
    groups: &[PayoutGroup],
    deposit_cents: i64,
    tolerance_cents: i64,
) -> Vec<&PayoutGroup> {
    let tolerance = tolerance_cents.max(0).unsigned_abs();
    groups
        .iter()
        .filter(|g| g.net_cents.abs_diff(deposit_cents) <= tolerance)
        .collect()
}

/// Candidate list classified for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositMatch<'a> {
    /// Expected while more payouts are still to arrive; not an error.
    NoMatch,
    Unique(&'a PayoutGroup),
    Ambiguous(Vec<&'a PayoutGroup>),
}

impl<'a> DepositMatch<'a> {
    pub fn from_candidates(mut candidates: Vec<&'a PayoutGroup>) -> Self {
        match candidates.len() {
            0 => Self::NoMatch,
            1 => Self::Unique(candidates.remove(0)),
            _ => Self::Ambiguous(candidates),
        }
    }

    pub fn status(&self) -> DepositStatus {
        match self {
            Self::NoMatch => DepositStatus::NoMatch,
            Self::Unique(_) => DepositStatus::Unique,
            Self::Ambiguous(_) => DepositStatus::Ambiguous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    NoMatch,
    Unique,
    Ambiguous,
}

impl std::fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMatch => write!(f, "no_match"),
            Self::Unique => write!(f, "unique"),
            Self::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositCandidate {
    pub transfer: String,
    pub net_cents: i64,
    /// net − deposit.
    pub delta_cents: i64,
    pub charge_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositResult {
    pub deposit: BankDeposit,
    pub status: DepositStatus,
    pub candidates: Vec<DepositCandidate>,
}

/// Run [`match_deposit`] once per deposit. Transfers in `settled` were
/// already confirmed against an earlier deposit and are not offered again.
/// Candidates are never consumed across deposits within one call.
pub fn match_deposits(
    groups: &[PayoutGroup],
    deposits: &[BankDeposit],
    tolerance_cents: i64,
    settled: &BTreeSet<String>,
) -> Vec<DepositResult> {
    let open: Vec<PayoutGroup> = groups
        .iter()
        .filter(|g| !settled.contains(&g.transfer))
        .cloned()
        .collect();

    deposits
        .iter()
        .map(|deposit| {
            let found = match_deposit(&open, deposit.amount_cents, tolerance_cents);
            let candidates = found
                .iter()
                .map(|g| DepositCandidate {
                    transfer: g.transfer.clone(),
                    net_cents: g.net_cents,
                    // Within tolerance, so the difference cannot overflow.
                    delta_cents: g.net_cents - deposit.amount_cents,
                    charge_count: g.charge_count,
                })
                .collect();
            let status = DepositMatch::from_candidates(found).status();
            log::debug!("deposit {}: {status}", deposit.id);
            DepositResult {
                deposit: deposit.clone(),
                status,
                candidates,
            }
        })
        .collect()
}
