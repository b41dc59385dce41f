//! Domain model for deposit requests and their receipts.
//!
//! A `Request` is the aggregate root: it owns its receipts, its
//! validation report, and its append-only state history. All money is
//! `rust_decimal::Decimal` -- never `f64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state::{RequestState, TransitionError};

/// Intake surface a request arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Chat,
    Email,
    Manual,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Chat => "chat",
            Channel::Email => "email",
            Channel::Manual => "manual",
        }
    }
}

/// Channel-specific correlation handles. All optional; only the fields
/// relevant to the originating channel are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    pub chat_id: Option<String>,
    pub email_thread_id: Option<String>,
    /// Operator who keyed in a manual-entry request.
    pub operator: Option<String>,
}

/// Fields the client reports about their deposit batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedFields {
    pub beneficiary: Option<String>,
    pub personal_id: Option<String>,
    pub unit_count: Option<i64>,
    pub deposited_amount: Option<Decimal>,
}

/// Partial update to reported fields. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialFields {
    pub beneficiary: Option<String>,
    pub personal_id: Option<String>,
    pub unit_count: Option<i64>,
    pub deposited_amount: Option<Decimal>,
}

impl ReportedFields {
    /// Apply the non-`None` parts of a partial update.
    pub fn apply(&mut self, partial: &PartialFields) {
        if let Some(b) = &partial.beneficiary {
            self.beneficiary = Some(b.clone());
        }
        if let Some(p) = &partial.personal_id {
            self.personal_id = Some(p.clone());
        }
        if let Some(u) = partial.unit_count {
            self.unit_count = Some(u);
        }
        if let Some(a) = partial.deposited_amount {
            self.deposited_amount = Some(a);
        }
    }
}

/// Structured banking fields pulled out of a receipt by the external
/// text-extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub amount: Option<Decimal>,
    /// Destination account identifier as it appears in the receipt;
    /// may be masked ("****7228") or only a short suffix.
    pub account_id: Option<String>,
    /// Free text around the destination beneficiary, possibly split
    /// across lines or truncated by the issuing app.
    pub beneficiary_text: Option<String>,
    pub reference: Option<String>,
}

/// Duplicate classification for a receipt, decided once at attach time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicateKind {
    /// First time this content has been seen.
    None,
    /// Same content already attached to this request.
    Local { receipt_index: usize },
    /// Same content held by another active request of the same client.
    Global { origin_request_id: String },
}

impl DuplicateKind {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, DuplicateKind::None)
    }
}

/// Evidence of a single deposit. Owned by exactly one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Content digest over the raw bytes, computed before any parsing.
    pub fingerprint: String,
    pub display_name: String,
    /// `None` when extraction failed outright.
    pub extracted: Option<ExtractedFields>,
    pub valid: bool,
    pub reason: String,
    /// Immutable after attach.
    pub duplicate: DuplicateKind,
    /// Set when the owning request is canceled; the receipt stays on
    /// the request for audit but no longer counts for anything.
    pub discard_reason: Option<String>,
}

impl Receipt {
    /// Whether this receipt counts toward amount aggregation and the
    /// receipt rule: valid, not a duplicate, not discarded.
    pub fn is_countable(&self) -> bool {
        self.valid && !self.duplicate.is_duplicate() && self.discard_reason.is_none()
    }

    /// Whether the manual-amount remediation applies to this receipt:
    /// not a duplicate, and carrying no extracted evidence that could
    /// contradict a directly reported amount. A receipt that failed
    /// the account match has evidence and is never correctable.
    pub fn accepts_reported_amount(&self) -> bool {
        if self.duplicate.is_duplicate() {
            return false;
        }
        match &self.extracted {
            None => true,
            Some(e) => {
                e.account_id.is_none() && e.beneficiary_text.is_none() && e.reference.is_none()
            }
        }
    }

    /// Amount correction for the manual-capture remediation path.
    /// Only the monetary amount may be corrected, nothing else.
    pub fn correct_amount(&mut self, amount: Decimal) {
        match &mut self.extracted {
            Some(fields) => fields.amount = Some(amount),
            None => {
                self.extracted = Some(ExtractedFields {
                    amount: Some(amount),
                    ..ExtractedFields::default()
                })
            }
        }
    }
}

/// Outcome discriminant for a single hard rule. `Missing` and
/// `Invalid` are distinct so downstream rendering never has to parse
/// reason strings to tell "never provided" from "provided but wrong".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Not evaluated yet.
    Pending,
    Pass,
    /// The input was never provided.
    Missing,
    /// The input was provided but failed the rule.
    Invalid,
}

/// Outcome of a single hard rule, with the recorded reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub status: CheckStatus,
    pub reason: String,
}

impl FieldCheck {
    pub fn pending() -> Self {
        FieldCheck {
            status: CheckStatus::Pending,
            reason: "not validated".to_string(),
        }
    }

    pub fn pass(reason: impl Into<String>) -> Self {
        FieldCheck {
            status: CheckStatus::Pass,
            reason: reason.into(),
        }
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        FieldCheck {
            status: CheckStatus::Missing,
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        FieldCheck {
            status: CheckStatus::Invalid,
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == CheckStatus::Pass
    }

    /// Pending counts as missing: nothing was provided yet either way.
    pub fn is_missing(&self) -> bool {
        matches!(self.status, CheckStatus::Pending | CheckStatus::Missing)
    }
}

/// The five-entry hard-rule report. Persisted verbatim before the
/// lifecycle acts on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub client: FieldCheck,
    pub beneficiary: FieldCheck,
    pub personal_id: FieldCheck,
    pub unit_count: FieldCheck,
    pub receipt: FieldCheck,
}

impl ValidationReport {
    pub fn pending() -> Self {
        ValidationReport {
            client: FieldCheck::pending(),
            beneficiary: FieldCheck::pending(),
            personal_id: FieldCheck::pending(),
            unit_count: FieldCheck::pending(),
            receipt: FieldCheck::pending(),
        }
    }

    /// Named entries in canonical order.
    pub fn entries(&self) -> [(&'static str, &FieldCheck); 5] {
        [
            ("client", &self.client),
            ("beneficiary", &self.beneficiary),
            ("personal_id", &self.personal_id),
            ("unit_count", &self.unit_count),
            ("receipt", &self.receipt),
        ]
    }

    /// All five named rules valid. This is the sole ready condition.
    pub fn all_valid(&self) -> bool {
        self.entries().iter().all(|(_, check)| check.is_valid())
    }

    /// Joined failure reasons, for the rejection audit note.
    pub fn failure_reasons(&self) -> String {
        self.entries()
            .iter()
            .filter(|(_, check)| !check.is_valid())
            .map(|(name, check)| format!("{}: {}", name, check.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        ValidationReport::pending()
    }
}

/// One entry of the append-only state history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    pub state: RequestState,
    /// RFC 3339 timestamp.
    pub at: String,
    pub actor: String,
    pub note: String,
}

/// Figures computed once a request validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementFigures {
    /// Sum of countable receipt amounts.
    pub gross_total: Decimal,
    pub commission_rate: Decimal,
    pub commission: Decimal,
    /// gross_total - commission.
    pub net_capital: Decimal,
}

/// The single destination account currently authorized for deposits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAccount {
    /// Full-length account number (18 digits).
    pub account_number: String,
    /// Registered beneficiary name of the account.
    pub beneficiary: String,
    pub bank: String,
}

/// A client's attempt to move a batch of deposited funds, tracked
/// end-to-end. Aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    /// Human-readable sequential identifier; unique process-wide once
    /// assigned, never reassigned or reused.
    pub folio: Option<String>,
    pub channel: Channel,
    pub client_id: String,
    pub client_name: String,
    pub fields: ReportedFields,
    pub receipts: Vec<Receipt>,
    pub report: ValidationReport,
    pub state: RequestState,
    /// Append-only; the last entry's state always equals `state`.
    pub history: Vec<StateHistoryEntry>,
    pub figures: Option<DisbursementFigures>,
    pub metadata: ChannelMetadata,
    /// Extraction failed on the first receipt; monetary fields are to
    /// be supplied directly by the submitter.
    pub manual_capture: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Request {
    /// Build a fresh request in `Draft` with its first history entry.
    pub fn new(
        id: String,
        channel: Channel,
        client_id: String,
        client_name: String,
        fields: ReportedFields,
        metadata: ChannelMetadata,
        now: String,
    ) -> Self {
        Request {
            id,
            folio: None,
            channel,
            client_id,
            client_name,
            fields,
            receipts: Vec::new(),
            report: ValidationReport::pending(),
            state: RequestState::Draft,
            history: vec![StateHistoryEntry {
                state: RequestState::Draft,
                at: now.clone(),
                actor: "system".to_string(),
                note: format!("created via {}", channel.as_str()),
            }],
            figures: None,
            metadata,
            manual_capture: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Advance the state machine, appending the matching history entry.
    /// The transition table is the only gate; the history invariant
    /// (last entry state == current state) holds by construction.
    pub fn transition_to(
        &mut self,
        to: RequestState,
        at: String,
        actor: &str,
        note: String,
    ) -> Result<(), TransitionError> {
        self.state.check_transition(to)?;
        self.state = to;
        self.updated_at = at.clone();
        self.history.push(StateHistoryEntry {
            state: to,
            at,
            actor: actor.to_string(),
            note,
        });
        Ok(())
    }

    /// Sum of valid, non-duplicate, non-discarded receipt amounts.
    pub fn countable_amount_total(&self) -> Decimal {
        self.receipts
            .iter()
            .filter(|r| r.is_countable())
            .filter_map(|r| r.extracted.as_ref().and_then(|e| e.amount))
            .sum()
    }

    /// At least one receipt satisfies the receipt rule.
    pub fn has_countable_receipt(&self) -> bool {
        self.receipts.iter().any(|r| r.is_countable())
    }

    /// Index of an already-held receipt with this fingerprint, if any.
    pub fn find_fingerprint(&self, fingerprint: &str) -> Option<usize> {
        self.receipts
            .iter()
            .position(|r| r.fingerprint == fingerprint)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::new(
            "req-1".to_string(),
            Channel::Chat,
            "client-1".to_string(),
            "Cliente Uno".to_string(),
            ReportedFields::default(),
            ChannelMetadata::default(),
            "2026-01-01T00:00:00Z".to_string(),
        )
    }

    fn receipt(fingerprint: &str, valid: bool, amount: i64) -> Receipt {
        Receipt {
            fingerprint: fingerprint.to_string(),
            display_name: "r.pdf".to_string(),
            extracted: Some(ExtractedFields {
                amount: Some(Decimal::new(amount, 2)),
                ..ExtractedFields::default()
            }),
            valid,
            reason: String::new(),
            duplicate: DuplicateKind::None,
            discard_reason: None,
        }
    }

    #[test]
    fn history_last_entry_tracks_state() {
        let mut req = request();
        req.transition_to(
            RequestState::CollectingEvidence,
            "2026-01-01T00:01:00Z".to_string(),
            "system",
            "first receipt".to_string(),
        )
        .unwrap();
        assert_eq!(req.history.last().unwrap().state, req.state);
        assert_eq!(req.history.len(), 2);
    }

    #[test]
    fn duplicates_and_discards_do_not_count() {
        let mut req = request();
        req.receipts.push(receipt("fp-a", true, 100_000_00));
        let mut dup = receipt("fp-a", true, 100_000_00);
        dup.duplicate = DuplicateKind::Local { receipt_index: 0 };
        req.receipts.push(dup);
        let mut discarded = receipt("fp-b", true, 50_000_00);
        discarded.discard_reason = Some("canceled".to_string());
        req.receipts.push(discarded);

        assert_eq!(req.countable_amount_total(), Decimal::new(100_000_00, 2));
        assert!(req.has_countable_receipt());
    }

    #[test]
    fn partial_update_leaves_unset_fields_alone() {
        let mut fields = ReportedFields {
            beneficiary: Some("Juan Pérez García".to_string()),
            personal_id: Some("1234567890".to_string()),
            unit_count: Some(3),
            deposited_amount: None,
        };
        fields.apply(&PartialFields {
            unit_count: Some(5),
            ..PartialFields::default()
        });
        assert_eq!(fields.unit_count, Some(5));
        assert_eq!(fields.beneficiary.as_deref(), Some("Juan Pérez García"));
    }

    #[test]
    fn duplicate_kind_serializes_with_its_tag() {
        let json = serde_json::to_value(DuplicateKind::Global {
            origin_request_id: "req-9".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "global");
        assert_eq!(json["origin_request_id"], "req-9");
    }

    #[test]
    fn report_failure_reasons_name_the_rules() {
        let mut report = ValidationReport::pending();
        report.client = FieldCheck::pass("client active");
        report.beneficiary = FieldCheck::invalid("needs 3 words");
        let joined = report.failure_reasons();
        assert!(joined.contains("beneficiary: needs 3 words"));
        assert!(!joined.contains("client:"));
        assert!(!report.all_valid());
    }

    #[test]
    fn check_classification_is_carried_by_the_status_not_the_reason() {
        // Reason wording is free-form; the discriminant decides.
        let check = FieldCheck::invalid("beneficiary not provided by the issuing bank");
        assert!(!check.is_missing());
        let check = FieldCheck::missing("beneficiary not provided");
        assert!(check.is_missing());
        assert!(FieldCheck::pending().is_missing());
        assert!(FieldCheck::pass("ok").is_valid());
    }

    #[test]
    fn only_evidence_free_receipts_accept_a_reported_amount() {
        // Extraction failed outright: correctable.
        let mut unreadable = receipt("fp-a", false, 0);
        unreadable.extracted = None;
        assert!(unreadable.accepts_reported_amount());

        // Extracted evidence present (e.g. a mismatched account):
        // never correctable, whatever the validity flag says.
        let mut mismatched = receipt("fp-b", false, 500_000_00);
        if let Some(e) = &mut mismatched.extracted {
            e.account_id = Some("****9999".to_string());
        }
        assert!(!mismatched.accepts_reported_amount());

        // Duplicates never accept an amount.
        let mut dup = receipt("fp-c", false, 0);
        dup.extracted = None;
        dup.duplicate = DuplicateKind::Local { receipt_index: 0 };
        assert!(!dup.accepts_reported_amount());

        // A previously corrected receipt (amount only) still does.
        unreadable.correct_amount(Decimal::new(350_000_00, 2));
        assert!(unreadable.accepts_reported_amount());
    }
}
