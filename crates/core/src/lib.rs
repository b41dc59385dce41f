//! Deposit-evidence domain core -- requests, receipts, hard rules,
//! account matching, partitioning and money arithmetic.
//!
//! Everything here is pure and synchronous: no storage, no clock, no
//! I/O. Callers supply timestamps, randomness and directory lookups;
//! the engine crate wires those in.

pub mod matching;
pub mod money;
pub mod partition;
pub mod rules;
pub mod state;
pub mod summary;
pub mod types;

pub use matching::{account_match_method, matches, AccountMatchMethod, MatchOutcome, MatchPolicy};
pub use money::{disbursement_figures, round_cents};
pub use partition::{partition, PartitionPolicy};
pub use rules::{validate, ClientStatus};
pub use state::{RequestState, TransitionError};
pub use summary::{build_summary, ClientSummary, FieldIssue};
pub use types::{
    ActiveAccount, Channel, ChannelMetadata, CheckStatus, DisbursementFigures, DuplicateKind,
    ExtractedFields, FieldCheck, PartialFields, Receipt, ReportedFields, Request,
    StateHistoryEntry, ValidationReport,
};
