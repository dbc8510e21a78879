use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (tolerance out of range, bad batch size, etc.).
    ConfigValidation(String),
    /// More than one incoming row claims an exclusive flag.
    ExclusiveFlagConflict { flag: String, rows: Vec<usize> },
    /// A paid, non-refunded charge carries no transfer id.
    MissingTransfer { charge_ids: Vec<String> },
    /// Missing required column in input data.
    MissingColumn { source: String, column: String },
    /// Amount parse error.
    AmountParse { source: String, record: String, value: String },
    /// Date parse error.
    DateParse { source: String, record: String, value: String },
    /// Typed cell (flag, integer) could not be coerced.
    FieldParse { source: String, record: String, column: String, value: String },
    /// Write batch size is zero or above the store's ceiling.
    InvalidBatchSize { size: usize, max: usize },
    /// Split lines do not sum to the parent amount.
    Unbalanced { delta_cents: i64 },
    /// A cents total does not fit in `i64`.
    AmountOverflow { context: String },
    /// IO / CSV reader error.
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::ExclusiveFlagConflict { flag, rows } => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                write!(
                    f,
                    "'{flag}' may be set on at most one row, found {} (rows {})",
                    rows.len(),
                    rows.join(", ")
                )
            }
            Self::MissingTransfer { charge_ids } => {
                write!(
                    f,
                    "{} paid charge(s) without a transfer id: {}",
                    charge_ids.len(),
                    charge_ids.join(", ")
                )
            }
            Self::MissingColumn { source, column } => {
                write!(f, "{source}: missing column '{column}'")
            }
            Self::AmountParse { source, record, value } => {
                write!(f, "{source}, record '{record}': cannot parse amount '{value}'")
            }
            Self::DateParse { source, record, value } => {
                write!(f, "{source}, record '{record}': cannot parse date '{value}'")
            }
            Self::FieldParse { source, record, column, value } => {
                write!(f, "{source}, record '{record}': cannot parse {column} '{value}'")
            }
            Self::InvalidBatchSize { size, max } => {
                write!(f, "batch size must be between 1 and {max}, got {size}")
            }
            Self::Unbalanced { delta_cents } => {
                write!(
                    f,
                    "split lines do not add up to the transaction amount (off by {})",
                    crate::money::format_cents(*delta_cents)
                )
            }
            Self::AmountOverflow { context } => {
                write!(f, "{context}: amount total is too large to represent")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl ReconError {
    /// Abort-class errors stop a run before any decision is produced;
    /// everything else is an input or setup problem.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            Self::ExclusiveFlagConflict { .. }
                | Self::MissingTransfer { .. }
                | Self::MissingColumn { .. }
                | Self::Unbalanced { .. }
                | Self::AmountOverflow { .. }
        )
    }
}
