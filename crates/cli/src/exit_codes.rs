//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: import scripts branch on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad args, invalid config)                    |
//! | 3    | Blocked: the run aborted before producing any decision    |
//! | 4    | Ambiguous: a deposit fits more than one payout            |
//! | 5    | Parse error in an input file                              |
//! | 6    | Split lines do not add up to the parent amount            |
//! | 7    | IO error (cannot read input or write output)              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in [`recon_exit_code`] if it comes from the engine

use ledgerlink_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, out-of-range options, invalid config values.
pub const EXIT_USAGE: u8 = 2;

/// Abort-class engine error: exclusive flag claimed twice, paid charge
/// without transfer, key column missing, or a cents total out of range.
pub const EXIT_BLOCKED: u8 = 3;

/// At least one deposit has several payout candidates.
pub const EXIT_AMBIGUOUS: u8 = 4;

/// Input file could not be parsed (bad CSV, amount, date, flag, TOML).
pub const EXIT_PARSE: u8 = 5;

/// Split lines do not sum to the parent amount.
pub const EXIT_UNBALANCED: u8 = 6;

/// Cannot read an input file or write the output file.
pub const EXIT_IO: u8 = 7;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Unbalanced { .. } => EXIT_UNBALANCED,
        e if e.is_blocking() => EXIT_BLOCKED,
        ReconError::ConfigParse(_)
        | ReconError::AmountParse { .. }
        | ReconError::DateParse { .. }
        | ReconError::FieldParse { .. }
        // CSV reader failures on already-read text are malformed input.
        | ReconError::Io(_) => EXIT_PARSE,
        ReconError::ConfigValidation(_) | ReconError::InvalidBatchSize { .. } => EXIT_USAGE,
        _ => EXIT_ERROR,
    }
}
