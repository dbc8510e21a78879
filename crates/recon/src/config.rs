use std::collections::BTreeMap;

use serde::Deserialize;

use crate::batch::MAX_BATCH_WRITES;
use crate::deposit::DEFAULT_TOLERANCE_CENTS;
use crate::error::ReconError;
use crate::kind::EntityKind;
use crate::load::ColumnAliases;
use crate::matcher::MatchOptions;
use crate::model::Field;
use crate::payout::PayoutOptions;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub payouts: PayoutConfig,
    /// `[columns.<kind>] <field> = ["Header", ...]`
    #[serde(default)]
    pub columns: BTreeMap<String, BTreeMap<Field, Vec<String>>>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    #[serde(default = "default_tolerance")]
    pub amount_cents: i64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            amount_cents: DEFAULT_TOLERANCE_CENTS,
        }
    }
}

fn default_tolerance() -> i64 {
    DEFAULT_TOLERANCE_CENTS
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub only_create: bool,
    /// Whether the first created row implicitly takes an unclaimed exclusive flag.
    #[serde(default = "default_true")]
    pub promote_exclusive: bool,
    /// Per-kind replacement of the comparable field list.
    #[serde(default)]
    pub compare: BTreeMap<String, Vec<Field>>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            only_create: false,
            promote_exclusive: true,
            compare: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_writes")]
    pub max_writes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_writes: MAX_BATCH_WRITES,
        }
    }
}

fn default_max_writes() -> usize {
    MAX_BATCH_WRITES
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayoutConfig {
    #[serde(default = "default_paid_statuses")]
    pub paid_statuses: Vec<String>,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            paid_statuses: default_paid_statuses(),
        }
    }
}

fn default_paid_statuses() -> Vec<String> {
    vec!["paid".into()]
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !(0..=100).contains(&self.tolerance.amount_cents) {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance.amount_cents must be between 0 and 100, got {}",
                self.tolerance.amount_cents
            )));
        }

        if self.batch.max_writes == 0 || self.batch.max_writes > MAX_BATCH_WRITES {
            return Err(ReconError::ConfigValidation(format!(
                "batch.max_writes must be between 1 and {MAX_BATCH_WRITES}, got {}",
                self.batch.max_writes
            )));
        }

        if self.payouts.paid_statuses.iter().all(|s| s.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "payouts.paid_statuses must name at least one status".into(),
            ));
        }

        for kind in self.matching.compare.keys().chain(self.columns.keys()) {
            kind.parse::<EntityKind>().map_err(ReconError::ConfigValidation)?;
        }

        for (kind, fields) in &self.matching.compare {
            if fields.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "matching.compare.{kind} must list at least one field"
                )));
            }
        }

        Ok(())
    }

    fn kind_entry<'a, V>(map: &'a BTreeMap<String, V>, kind: EntityKind) -> Option<&'a V> {
        map.iter()
            .find(|(k, _)| k.parse::<EntityKind>().ok() == Some(kind))
            .map(|(_, v)| v)
    }

    pub fn match_options(&self, kind: EntityKind) -> MatchOptions {
        MatchOptions {
            only_create: self.matching.only_create,
            promote_exclusive: self.matching.promote_exclusive,
            compare: Self::kind_entry(&self.matching.compare, kind).cloned(),
        }
    }

    pub fn payout_options(&self) -> PayoutOptions {
        PayoutOptions {
            paid_statuses: self.payouts.paid_statuses.clone(),
        }
    }

    pub fn aliases(&self, kind: EntityKind) -> ColumnAliases {
        match Self::kind_entry(&self.columns, kind) {
            Some(extra) => ColumnAliases::new(extra.clone()),
            None => ColumnAliases::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[tolerance]
amount_cents = 3

[matching]
only_create = true
promote_exclusive = false

[matching.compare]
bank_account = ["name", "is_default"]

[batch]
max_writes = 250

[payouts]
paid_statuses = ["paid", "succeeded"]

[columns.bank_account]
iban = ["Kontonummer"]
name = ["Bezeichnung"]
"#;

    #[test]
    fn parse_full() {
        let config = ReconConfig::from_toml(FULL).unwrap();
        assert_eq!(config.tolerance.amount_cents, 3);
        assert_eq!(config.batch.max_writes, 250);

        let opts = config.match_options(EntityKind::BankAccount);
        assert!(opts.only_create);
        assert!(!opts.promote_exclusive);
        assert_eq!(opts.compare, Some(vec![Field::Name, Field::IsDefault]));
        assert_eq!(config.match_options(EntityKind::Contact).compare, None);

        assert_eq!(config.payout_options().paid_statuses, vec!["paid", "succeeded"]);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config.tolerance.amount_cents, DEFAULT_TOLERANCE_CENTS);
        assert_eq!(config.batch.max_writes, MAX_BATCH_WRITES);
        let opts = config.match_options(EntityKind::BankAccount);
        assert!(!opts.only_create);
        assert!(opts.promote_exclusive);
        assert_eq!(config.payout_options().paid_statuses, vec!["paid"]);
    }

    #[test]
    fn kind_keys_accept_dashes() {
        let config = ReconConfig::from_toml(
            r#"
[matching.compare]
bank-account = ["name"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.match_options(EntityKind::BankAccount).compare,
            Some(vec![Field::Name])
        );
    }

    #[test]
    fn reject_unknown_kind() {
        let err = ReconConfig::from_toml(
            r#"
[columns.vendor]
name = ["Vendor"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown entity kind 'vendor'"));
    }

    #[test]
    fn reject_unknown_field() {
        let err = ReconConfig::from_toml(
            r#"
[matching.compare]
contact = ["nickname"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_out_of_range() {
        assert!(ReconConfig::from_toml("[tolerance]\namount_cents = -1\n").is_err());
        assert!(ReconConfig::from_toml("[tolerance]\namount_cents = 500\n").is_err());
        assert!(ReconConfig::from_toml("[batch]\nmax_writes = 0\n").is_err());
        assert!(ReconConfig::from_toml("[batch]\nmax_writes = 501\n").is_err());
        assert!(ReconConfig::from_toml("[payouts]\npaid_statuses = []\n").is_err());
    }

    #[test]
    fn reject_unknown_section() {
        assert!(ReconConfig::from_toml("[settlement]\nsla_days = 3\n").is_err());
    }
}
