//! Client-facing summary of where a request stands.
//!
//! Three blocks: what was understood and accepted, what is still
//! missing or failed, and what happens next. Built purely from the
//! request snapshot so it can be rendered by any channel.

use serde::{Deserialize, Serialize};

use crate::state::RequestState;
use crate::types::{ActiveAccount, Request};

/// A field that failed validation, with the recorded reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

/// Channel-agnostic summary of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub request_id: String,
    pub folio: Option<String>,
    pub state: RequestState,
    /// Block one: fields the engine understood and accepted.
    pub accepted: Vec<FieldIssue>,
    /// Block two, first half: fields never provided.
    pub missing: Vec<String>,
    /// Block two, second half: fields provided but invalid.
    pub invalid: Vec<FieldIssue>,
    /// Block three: what the client should do or expect next.
    pub next_step: String,
    /// Destination account to show the client, when one is authorized.
    pub active_account: Option<ActiveAccount>,
}

/// Build the summary for a request snapshot.
pub fn build_summary(request: &Request, active_account: Option<ActiveAccount>) -> ClientSummary {
    let mut accepted = Vec::new();
    let mut missing = Vec::new();
    let mut invalid = Vec::new();

    for (name, check) in request.report.entries() {
        if check.is_valid() {
            accepted.push(FieldIssue {
                field: name.to_string(),
                reason: check.reason.clone(),
            });
        } else if check.is_missing() {
            missing.push(name.to_string());
        } else {
            invalid.push(FieldIssue {
                field: name.to_string(),
                reason: check.reason.clone(),
            });
        }
    }

    ClientSummary {
        request_id: request.id.clone(),
        folio: request.folio.clone(),
        state: request.state,
        accepted,
        missing,
        invalid,
        next_step: next_step(request),
        active_account,
    }
}

fn next_step(request: &Request) -> String {
    match request.state {
        RequestState::Draft | RequestState::CollectingEvidence => {
            if request.manual_capture {
                "automatic reading of the receipt failed; please report the deposited \
                 amount directly"
                    .to_string()
            } else {
                "send the remaining information and deposit receipts".to_string()
            }
        }
        RequestState::PendingValidation => "the request is being validated".to_string(),
        RequestState::Ready => match &request.folio {
            Some(folio) => format!("registered under folio {}; awaiting processing", folio),
            None => "validated and ready; a folio will be assigned shortly".to_string(),
        },
        RequestState::Rejected => {
            "the request was rejected; correct the observations above and submit again"
                .to_string()
        }
        RequestState::FolioAssigned | RequestState::ForwardedToProcessing => match &request.folio {
            Some(folio) => format!("folio {} is being processed", folio),
            None => "the request is being processed".to_string(),
        },
        RequestState::Completed => "the request was completed".to_string(),
        RequestState::CanceledByInactivity => {
            "the request was canceled for inactivity; start a new one to continue".to_string()
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Channel, ChannelMetadata, FieldCheck, ReportedFields};

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

    #[test]
    fn missing_and_invalid_fields_land_in_separate_blocks() {
        let mut req = request();
        req.report.client = FieldCheck::pass("client active");
        req.report.beneficiary = FieldCheck::missing("beneficiary not provided");
        req.report.personal_id =
            FieldCheck::invalid("personal identifier must be exactly 10 digits, got 9 digits");
        let summary = build_summary(&req, None);

        assert!(summary.accepted.iter().any(|f| f.field == "client"));
        assert!(summary.missing.contains(&"beneficiary".to_string()));
        assert!(summary.invalid.iter().any(|f| f.field == "personal_id"));
        assert!(!summary.missing.contains(&"personal_id".to_string()));
    }

    #[test]
    fn classification_follows_the_check_status_not_its_wording() {
        let mut req = request();
        // An invalid check whose reason happens to mention "not
        // provided" still lands in the invalid block.
        req.report.beneficiary =
            FieldCheck::invalid("beneficiary not provided by the issuing bank");
        let summary = build_summary(&req, None);
        assert!(summary.invalid.iter().any(|f| f.field == "beneficiary"));
        assert!(!summary.missing.contains(&"beneficiary".to_string()));
    }

    #[test]
    fn ready_request_with_folio_names_it_in_the_next_step() {
        let mut req = request();
        req.state = RequestState::Ready;
        req.folio = Some("NC-000042".to_string());
        let summary = build_summary(&req, None);
        assert!(summary.next_step.contains("NC-000042"));
    }

    #[test]
    fn manual_capture_changes_the_draft_next_step() {
        let mut req = request();
        req.manual_capture = true;
        let summary = build_summary(&req, None);
        assert!(summary.next_step.contains("amount"));
    }

    #[test]
    fn active_account_is_passed_through() {
        let account = ActiveAccount {
            account_number: "646180139409487228".to_string(),
            beneficiary: "Operadora Delta SA de CV".to_string(),
            bank: "STP".to_string(),
        };
        let summary = build_summary(&request(), Some(account.clone()));
        assert_eq!(summary.active_account, Some(account));
    }
}
