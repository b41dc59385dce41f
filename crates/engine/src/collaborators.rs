//! External collaborators the engine is wired with.
//!
//! Each seam is a trait so deployments can plug in their own OCR
//! service, client registry, account configuration and messaging
//! layer, and so tests can substitute deterministic fakes.

use async_trait::async_trait;

use remit_core::{ActiveAccount, ClientStatus, ExtractedFields};
use rust_decimal::Decimal;

/// Extraction could not produce structured fields from the receipt.
/// This is remediable by the submitter, not an engine error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("extraction failed: {reason}")]
pub struct ExtractionFailure {
    pub reason: String,
}

/// Pulls structured banking fields out of raw receipt bytes.
#[async_trait]
pub trait TextExtractor: Send + Sync + 'static {
    async fn extract(
        &self,
        bytes: &[u8],
        display_name: &str,
    ) -> Result<ExtractedFields, ExtractionFailure>;
}

/// Registry of known clients and their standing.
#[async_trait]
pub trait ClientDirectory: Send + Sync + 'static {
    /// `None` when the client is unknown to the directory.
    async fn client_status(&self, client_id: &str) -> Option<ClientStatus>;
}

/// The account directory holds other than exactly one active account.
#[derive(Debug, Clone, thiserror::Error)]
#[error("expected exactly one active destination account, found {active_count}")]
pub struct AccountConfigError {
    pub active_count: usize,
}

/// Source of the single authorized destination account.
#[async_trait]
pub trait ActiveAccountDirectory: Send + Sync + 'static {
    async fn active_account(&self) -> Result<ActiveAccount, AccountConfigError>;
}

/// Lifecycle events pushed to interested channels after a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    RequestReady {
        request_id: String,
        folio: Option<String>,
        net_capital: Decimal,
    },
    RequestRejected {
        request_id: String,
        reasons: String,
    },
    FolioAssigned {
        request_id: String,
        folio: String,
    },
    RequestCanceled {
        request_id: String,
    },
}

/// Delivery failed. The engine logs these and moves on; notification
/// delivery never unwinds a committed state change.
#[derive(Debug, Clone, thiserror::Error)]
#[error("notification delivery failed: {reason}")]
pub struct NotifyError {
    pub reason: String,
}

/// Outbound notification channel.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn notify(&self, event: LifecycleEvent) -> Result<(), NotifyError>;
}
