use remit_core::{MatchPolicy, PartitionPolicy};
use rust_decimal::Decimal;

/// Engine tunables. `Default` reflects the production deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Commission withheld from the gross total. 0.01 is 1%.
    pub commission_rate: Decimal,
    /// Prefix of generated folios, e.g. "NC" in "NC-000042".
    pub folio_prefix: String,
    /// Zero-padded width of the numeric part of a folio.
    pub folio_width: usize,
    /// Assign a folio at creation instead of waiting for the explicit
    /// assignment step.
    pub assign_folio_on_create: bool,
    /// Optimistic-write retries before giving up with `Conflict`.
    pub max_occ_retries: u32,
    pub match_policy: MatchPolicy,
    pub partition_policy: PartitionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            commission_rate: Decimal::new(1, 2),
            folio_prefix: "NC".to_string(),
            folio_width: 6,
            assign_folio_on_create: false,
            max_occ_retries: 3,
            match_policy: MatchPolicy::default(),
            partition_policy: PartitionPolicy::default(),
        }
    }
}
