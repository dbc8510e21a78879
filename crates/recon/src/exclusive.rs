//! Exclusive-flag rule: at most one entity of a kind may hold the flag.
//!
//! Checked once per run, before any row is matched.

use crate::error::ReconError;
use crate::model::{ExistingEntity, Field, Fields, ParsedRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusiveFlagRule {
    pub flag: Field,
}

/// What the incoming rows say about the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagClaim {
    /// No row sets the flag.
    Unclaimed,
    /// Exactly one row sets it.
    ClaimedBy { row_index: usize },
}

impl ExclusiveFlagRule {
    pub fn new(flag: Field) -> Self {
        Self { flag }
    }

    /// Pre-pass over all incoming rows. More than one claim aborts the run.
    pub fn check(&self, rows: &[ParsedRow]) -> Result<FlagClaim, ReconError> {
        let claims: Vec<usize> = rows
            .iter()
            .filter(|r| r.flag(self.flag))
            .map(|r| r.row_index)
            .collect();

        match claims.as_slice() {
            [] => Ok(FlagClaim::Unclaimed),
            [row_index] => Ok(FlagClaim::ClaimedBy { row_index: *row_index }),
            _ => Err(ReconError::ExclusiveFlagConflict {
                flag: self.flag.to_string(),
                rows: claims,
            }),
        }
    }

    /// Existing entities currently holding the flag. More than one means the
    /// store is already inconsistent; all of them are returned.
    pub fn holders<'a>(&self, existing: &'a [ExistingEntity]) -> Vec<&'a ExistingEntity> {
        existing.iter().filter(|e| e.flag(self.flag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: usize, default: Option<bool>) -> ParsedRow {
        let r = ParsedRow::new(idx).with(Field::Name, format!("acct {idx}"));
        match default {
            Some(d) => r.with(Field::IsDefault, d),
            None => r,
        }
    }

    #[test]
    fn no_claims() {
        let rule = ExclusiveFlagRule::new(Field::IsDefault);
        let rows = vec![row(2, None), row(3, Some(false))];
        assert_eq!(rule.check(&rows).unwrap(), FlagClaim::Unclaimed);
    }

    #[test]
    fn single_claim() {
        let rule = ExclusiveFlagRule::new(Field::IsDefault);
        let rows = vec![row(2, Some(false)), row(3, Some(true))];
        assert_eq!(rule.check(&rows).unwrap(), FlagClaim::ClaimedBy { row_index: 3 });
    }

    #[test]
    fn two_claims_abort() {
        let rule = ExclusiveFlagRule::new(Field::IsDefault);
        let rows = vec![row(2, Some(true)), row(3, None), row(4, Some(true))];
        let err = rule.check(&rows).unwrap_err();
        assert_eq!(
            err,
            ReconError::ExclusiveFlagConflict { flag: "is_default".into(), rows: vec![2, 4] }
        );
        assert!(err.is_blocking());
    }

    #[test]
    fn holders_found() {
        let rule = ExclusiveFlagRule::new(Field::IsDefault);
        let existing = vec![
            ExistingEntity::new("a").with(Field::IsDefault, false),
            ExistingEntity::new("b").with(Field::IsDefault, true),
            ExistingEntity::new("c"),
        ];
        let ids: Vec<&str> = rule.holders(&existing).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }
}
