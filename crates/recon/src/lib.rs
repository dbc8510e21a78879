//! `ledgerlink-recon`: Import matching and payout reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded rows and snapshots of stored
//! records, returns decisions, payout groups, deposit candidates and split
//! verdicts. Nothing here writes to a store; callers apply the plan.

pub mod batch;
pub mod config;
pub mod deposit;
pub mod error;
pub mod exclusive;
pub mod kind;
pub mod load;
pub mod matcher;
pub mod model;
pub mod money;
pub mod normalize;
pub mod payout;
pub mod split;

pub use config::ReconConfig;
pub use error::ReconError;
pub use kind::{EntityKind, EntityKindConfig};
pub use matcher::{match_rows, MatchOptions};
pub use model::{
    Action, ExistingEntity, Field, FieldValue, MatchDecision, MatchOutcome, ParsedRow, RowSet,
    Warning,
};
pub use payout::{group_payouts, PayoutOptions};
