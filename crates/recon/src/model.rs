use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::kind::EntityKind;
use crate::money::format_cents;
use crate::normalize::{FieldKind, MatchKey};

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Every column the engine understands. Closed on purpose: raw spreadsheet
/// headers are mapped onto these before anything reaches the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Iban,
    Bic,
    BankName,
    Holder,
    TaxId,
    Email,
    Phone,
    Street,
    Zip,
    City,
    Country,
    ContactType,
    CategoryType,
    Description,
    Order,
    Salary,
    IsDefault,
    IsActive,
    Note,
}

/// Shape of the value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Flag,
    Int,
    Cents,
}

pub const ALL_FIELDS: &[Field] = &[
    Field::Name,
    Field::Iban,
    Field::Bic,
    Field::BankName,
    Field::Holder,
    Field::TaxId,
    Field::Email,
    Field::Phone,
    Field::Street,
    Field::Zip,
    Field::City,
    Field::Country,
    Field::ContactType,
    Field::CategoryType,
    Field::Description,
    Field::Order,
    Field::Salary,
    Field::IsDefault,
    Field::IsActive,
    Field::Note,
];

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Iban => "iban",
            Self::Bic => "bic",
            Self::BankName => "bank_name",
            Self::Holder => "holder",
            Self::TaxId => "tax_id",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Street => "street",
            Self::Zip => "zip",
            Self::City => "city",
            Self::Country => "country",
            Self::ContactType => "contact_type",
            Self::CategoryType => "category_type",
            Self::Description => "description",
            Self::Order => "order",
            Self::Salary => "salary",
            Self::IsDefault => "is_default",
            Self::IsActive => "is_active",
            Self::Note => "note",
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Order => ValueType::Int,
            Self::Salary => ValueType::Cents,
            Self::IsDefault | Self::IsActive => ValueType::Flag,
            _ => ValueType::Text,
        }
    }

    /// Identifier-like fields are diffed on their normalized form so a
    /// re-spaced IBAN is not reported as a change.
    pub fn normalizer(&self) -> Option<FieldKind> {
        match self {
            Self::Iban => Some(FieldKind::Iban),
            Self::TaxId => Some(FieldKind::TaxId),
            Self::Email => Some(FieldKind::Email),
            Self::Phone => Some(FieldKind::Phone),
            Self::Zip => Some(FieldKind::Zip),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_FIELDS
            .iter()
            .find(|f| f.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown field '{s}'"))
    }
}

impl<'de> serde::Deserialize<'de> for Field {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Int(i64),
    Cents(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Cents(c) => f.write_str(&format_cents(*c)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// Shared read access for anything carrying typed fields.
pub trait Fields {
    fn fields(&self) -> &BTreeMap<Field, FieldValue>;

    fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields().get(&field)
    }

    /// Text value, trimmed; `None` when absent or blank.
    fn text(&self, field: Field) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::Text(s)) => crate::normalize::trim_text(s),
            _ => None,
        }
    }

    fn flag(&self, field: Field) -> bool {
        matches!(self.get(field), Some(FieldValue::Flag(true)))
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One external record after column mapping and type coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRow {
    /// Spreadsheet row number, for diagnostics.
    pub row_index: usize,
    pub fields: BTreeMap<Field, FieldValue>,
}

impl ParsedRow {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }
}

impl Fields for ParsedRow {
    fn fields(&self) -> &BTreeMap<Field, FieldValue> {
        &self.fields
    }
}

/// Snapshot of a stored record. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingEntity {
    pub id: String,
    pub fields: BTreeMap<Field, FieldValue>,
}

impl ExistingEntity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }
}

impl Fields for ExistingEntity {
    fn fields(&self) -> &BTreeMap<Field, FieldValue> {
        &self.fields
    }
}

/// Rows of one entity kind plus the columns the source actually had.
#[derive(Debug, Clone)]
pub struct RowSet {
    pub kind: EntityKind,
    pub columns: BTreeSet<Field>,
    pub rows: Vec<ParsedRow>,
}

impl RowSet {
    /// Columns are inferred as the union of fields present on any row.
    pub fn new(kind: EntityKind, rows: Vec<ParsedRow>) -> Self {
        let columns = rows.iter().flat_map(|r| r.fields.keys().copied()).collect();
        Self { kind, columns, rows }
    }

    pub fn with_columns(kind: EntityKind, columns: BTreeSet<Field>, rows: Vec<ParsedRow>) -> Self {
        Self { kind, columns, rows }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Skip,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    MissingRequiredField { field: Field },
    DuplicateWithinFile { first_row: usize },
    NoChanges,
    AlreadyExists,
    AmbiguousExisting { candidates: Vec<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequiredField { .. } => write!(f, "missing required field"),
            Self::DuplicateWithinFile { .. } => write!(f, "duplicate within file"),
            Self::NoChanges => write!(f, "no changes"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::AmbiguousExisting { .. } => write!(f, "ambiguous existing match"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: Field,
    pub before: Option<FieldValue>,
    pub after: FieldValue,
}

/// The plan for one row. Recomputed on every run, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchDecision {
    pub row_index: usize,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_key: Option<MatchKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    /// Exclusive flag this row receives implicitly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<Field>,
}

impl MatchDecision {
    pub fn changed_fields(&self) -> Vec<Field> {
        self.changes.iter().map(|c| c.field).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub to_create: usize,
    pub to_update: usize,
    pub to_skip: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub kind: EntityKind,
    pub version: u32,
    pub summary: MatchSummary,
    pub decisions: Vec<MatchDecision>,
    pub warnings: Vec<Warning>,
}

impl MatchOutcome {
    /// Decisions that need a write, in input order.
    pub fn writes(&self) -> Vec<&MatchDecision> {
        self.decisions
            .iter()
            .filter(|d| d.action != Action::Skip)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-blocking findings. Always returned with the result, never only logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum Warning {
    /// Expected column absent; the field is written on create but never updated.
    MissingColumn { field: Field },
    /// No row claimed the exclusive flag and nobody holds it; the first
    /// create that does not set it to false gets it.
    ExclusiveFlagPromoted { flag: Field, row_index: usize },
    /// Nobody holds the exclusive flag and every created row sets it to false.
    ExclusiveFlagUnassigned { flag: Field },
    /// Identifier present but not recognised; the row is created without a key.
    UnparseableIdentifier { row_index: usize, field: Field },
    /// An incoming row takes the exclusive flag from an existing entity.
    ExclusiveFlagMoved { flag: Field, row_index: usize, previous_holder: String },
    /// Several stored entities share one key.
    DuplicateExistingKey { key: MatchKey, ids: Vec<String> },
    RefundedChargesExcluded { count: usize, amount_cents: i64, refunded_cents: i64 },
    UnpaidChargesExcluded { count: usize, amount_cents: i64, statuses: Vec<String> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumn { field } => write!(
                f,
                "column '{field}' not found; existing values for it will not be updated"
            ),
            Self::ExclusiveFlagPromoted { flag, row_index } => write!(
                f,
                "no row sets '{flag}' and no existing record holds it; row {row_index} will receive it"
            ),
            Self::ExclusiveFlagUnassigned { flag } => write!(
                f,
                "no record will hold '{flag}': nobody has it and every new row sets it to false"
            ),
            Self::UnparseableIdentifier { row_index, field } => write!(
                f,
                "row {row_index}: '{field}' is not a valid identifier; created without matching"
            ),
            Self::ExclusiveFlagMoved { flag, row_index, previous_holder } => write!(
                f,
                "row {row_index} sets '{flag}', which is currently held by '{previous_holder}'"
            ),
            Self::DuplicateExistingKey { key, ids } => write!(
                f,
                "existing records {} share the key '{key}'",
                ids.join(", ")
            ),
            Self::RefundedChargesExcluded { count, amount_cents, refunded_cents } => write!(
                f,
                "{count} refunded charge(s) excluded ({} charged, {} refunded)",
                format_cents(*amount_cents),
                format_cents(*refunded_cents)
            ),
            Self::UnpaidChargesExcluded { count, amount_cents, statuses } => write!(
                f,
                "{count} charge(s) with status {} excluded ({})",
                statuses.join("/"),
                format_cents(*amount_cents)
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Payouts
// ---------------------------------------------------------------------------

/// One payment-processor charge from an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StripeChargeRow {
    pub id: String,
    pub created_date: NaiveDate,
    pub amount_cents: i64,
    pub fee_cents: i64,
    pub customer_email: String,
    pub status: String,
    pub transfer: String,
    pub amount_refunded_cents: i64,
}

/// All charges paid out under one transfer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutGroup {
    pub transfer: String,
    pub gross_cents: i64,
    pub fee_cents: i64,
    pub net_cents: i64,
    pub charge_count: usize,
    pub charge_ids: Vec<String>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutReport {
    pub groups: Vec<PayoutGroup>,
    pub warnings: Vec<Warning>,
}

/// A single observed bank deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankDeposit {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub amount_cents: i64,
}

// ---------------------------------------------------------------------------
// Splits
// ---------------------------------------------------------------------------

/// One proposed allocation of a parent transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitLine {
    pub amount_cents: i64,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitVerdict {
    pub delta_cents: i64,
    pub balanced: bool,
}
