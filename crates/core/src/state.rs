//! Request lifecycle states and the closed transition table.
//!
//! States form a closed enum; every legal transition is listed in
//! `TRANSITIONS`. Anything not in the table is rejected with a typed
//! error -- there is no string-based state handling anywhere.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a deposit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Created, fields possibly incomplete.
    Draft,
    /// At least one receipt has been attached.
    CollectingEvidence,
    /// Submitted for rule validation.
    PendingValidation,
    /// All five hard rules passed; figures computed.
    Ready,
    /// One or more hard rules failed. Terminal.
    Rejected,
    /// A folio was assigned by an external approval step.
    FolioAssigned,
    /// Handed to downstream processing.
    ForwardedToProcessing,
    /// Downstream processing finished. Terminal.
    Completed,
    /// Timed out while active. Terminal.
    CanceledByInactivity,
}

/// Every legal (from, to) pair. Transitions to `CanceledByInactivity`
/// are listed explicitly so the inactivity path is gated by the same
/// table as everything else.
const TRANSITIONS: &[(RequestState, RequestState)] = &[
    (RequestState::Draft, RequestState::CollectingEvidence),
    (RequestState::Draft, RequestState::PendingValidation),
    (RequestState::CollectingEvidence, RequestState::PendingValidation),
    (RequestState::PendingValidation, RequestState::Ready),
    (RequestState::PendingValidation, RequestState::Rejected),
    (RequestState::Ready, RequestState::FolioAssigned),
    (RequestState::FolioAssigned, RequestState::ForwardedToProcessing),
    (RequestState::ForwardedToProcessing, RequestState::Completed),
    (RequestState::Draft, RequestState::CanceledByInactivity),
    (RequestState::CollectingEvidence, RequestState::CanceledByInactivity),
    (RequestState::PendingValidation, RequestState::CanceledByInactivity),
    (RequestState::Ready, RequestState::CanceledByInactivity),
    (RequestState::FolioAssigned, RequestState::CanceledByInactivity),
    (
        RequestState::ForwardedToProcessing,
        RequestState::CanceledByInactivity,
    ),
];

impl RequestState {
    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Draft => "draft",
            RequestState::CollectingEvidence => "collecting_evidence",
            RequestState::PendingValidation => "pending_validation",
            RequestState::Ready => "ready",
            RequestState::Rejected => "rejected",
            RequestState::FolioAssigned => "folio_assigned",
            RequestState::ForwardedToProcessing => "forwarded_to_processing",
            RequestState::Completed => "completed",
            RequestState::CanceledByInactivity => "canceled_by_inactivity",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Rejected
                | RequestState::Completed
                | RequestState::CanceledByInactivity
        )
    }

    /// Terminal states that end the request unsuccessfully.
    pub fn is_terminal_negative(&self) -> bool {
        matches!(
            self,
            RequestState::Rejected | RequestState::CanceledByInactivity
        )
    }

    /// Whether a request in this state blocks reuse of its receipt
    /// fingerprints by other requests. Terminal-negative requests do
    /// not block: a receipt on a rejected or canceled request may be
    /// legitimately resubmitted elsewhere.
    pub fn blocks_fingerprint_reuse(&self) -> bool {
        !self.is_terminal_negative()
    }

    /// Whether `self -> to` appears in the transition table.
    pub fn can_transition_to(&self, to: RequestState) -> bool {
        TRANSITIONS.iter().any(|(f, t)| *f == *self && *t == to)
    }

    /// Check a transition, producing a typed error when illegal.
    pub fn check_transition(&self, to: RequestState) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal { state: *self });
        }
        if !self.can_transition_to(to) {
            return Err(TransitionError::Illegal { from: *self, to });
        }
        Ok(())
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition was requested that the table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The source state is terminal; nothing may follow it.
    Terminal { state: RequestState },
    /// The (from, to) pair is not in the transition table.
    Illegal {
        from: RequestState,
        to: RequestState,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::Terminal { state } => {
                write!(f, "request is in terminal state '{}'", state)
            }
            TransitionError::Illegal { from, to } => {
                write!(f, "illegal transition '{}' -> '{}'", from, to)
            }
        }
    }
}

impl std::error::Error for TransitionError {}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
