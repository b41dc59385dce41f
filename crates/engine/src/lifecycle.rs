//! The lifecycle orchestrator.
//!
//! Every public operation is an optimistic read-mutate-write loop over
//! the store: read a versioned snapshot, mutate it through the domain
//! model, commit with the read version, and retry on conflict up to
//! the configured bound. Notifications go out only after a successful
//! commit and never unwind it.

use std::sync::Arc;

use rust_decimal::Decimal;

use remit_core::{
    build_summary, disbursement_figures, matches, partition, validate, Channel, ChannelMetadata,
    ClientSummary, DuplicateKind, PartialFields, Receipt, ReportedFields, Request, RequestState,
    TransitionError, ValidationReport,
};
use remit_storage::{DepositStore, RequestRecord, StorageError};

use crate::collaborators::{
    ActiveAccountDirectory, ClientDirectory, LifecycleEvent, NotificationSink, TextExtractor,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fingerprint::fingerprint;
use crate::sequence::{next_identifier, now_iso8601};

/// Input to [`Engine::create`].
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub channel: Channel,
    pub client_id: String,
    pub client_name: String,
    pub fields: ReportedFields,
    pub metadata: ChannelMetadata,
}

/// Result of attaching a receipt. All three arms are committed to the
/// request; the distinction tells the channel what to say next.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachOutcome {
    /// Receipt recorded; `valid` reflects the account match.
    Attached {
        receipt_index: usize,
        valid: bool,
        reason: String,
    },
    /// Same content seen before; recorded but never countable.
    Duplicate { kind: DuplicateKind },
    /// Extraction produced nothing. When `manual_capture` is set the
    /// submitter reports the amount directly.
    ExtractionFailed { manual_capture: bool },
}

/// Decision reached by [`Engine::validate_and_advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateOutcome {
    Ready,
    Rejected,
}

/// Deposit-request lifecycle engine over a [`DepositStore`] backend.
pub struct Engine<S> {
    store: Arc<S>,
    extractor: Arc<dyn TextExtractor>,
    clients: Arc<dyn ClientDirectory>,
    accounts: Arc<dyn ActiveAccountDirectory>,
    notifier: Arc<dyn NotificationSink>,
    config: EngineConfig,
}

impl<S: DepositStore> Engine<S> {
    pub fn new(
        store: Arc<S>,
        extractor: Arc<dyn TextExtractor>,
        clients: Arc<dyn ClientDirectory>,
        accounts: Arc<dyn ActiveAccountDirectory>,
        notifier: Arc<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Self {
        Engine {
            store,
            extractor,
            clients,
            accounts,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Operations ────────────────────────────────────────────────

    /// Open a new request in `Draft`.
    pub async fn create(&self, new: NewRequest) -> Result<RequestRecord, EngineError> {
        let n = self.store.next_sequence_value("req").await?;
        let id = format!("req-{:06}", n);
        let mut request = Request::new(
            id,
            new.channel,
            new.client_id,
            new.client_name,
            new.fields,
            new.metadata,
            now_iso8601(),
        );
        if self.config.assign_folio_on_create {
            request.folio = Some(
                next_identifier(
                    &*self.store,
                    &self.config.folio_prefix,
                    self.config.folio_width,
                )
                .await,
            );
        }
        self.store.insert_request(request.clone()).await?;
        tracing::info!(
            request_id = %request.id,
            client_id = %request.client_id,
            channel = request.channel.as_str(),
            "request created"
        );
        Ok(RequestRecord {
            request,
            version: 0,
        })
    }

    /// Merge a partial field update into the reported fields.
    pub async fn update_fields(
        &self,
        request_id: &str,
        partial: &PartialFields,
    ) -> Result<RequestRecord, EngineError> {
        let mut attempts = 0;
        loop {
            let rec = self.store.get_request(request_id).await?;
            let mut request = rec.request;
            if request.state.is_terminal() {
                return Err(TransitionError::Terminal {
                    state: request.state,
                }
                .into());
            }
            request.fields.apply(partial);
            request.updated_at = now_iso8601();
            match self.store.update_request(request.clone(), rec.version).await {
                Ok(version) => return Ok(RequestRecord { request, version }),
                Err(err) => self.classify_conflict(request_id, &mut attempts, err)?,
            }
        }
    }

    /// Attach a receipt: fingerprint, classify duplicates, extract and
    /// match against the active account, then commit atomically.
    pub async fn attach_receipt(
        &self,
        request_id: &str,
        bytes: &[u8],
        display_name: &str,
    ) -> Result<AttachOutcome, EngineError> {
        let fp = fingerprint(bytes);
        let mut attempts = 0;
        loop {
            let rec = self.store.get_request(request_id).await?;
            let mut request = rec.request;
            if request.state != RequestState::CollectingEvidence {
                request
                    .state
                    .check_transition(RequestState::CollectingEvidence)?;
            }

            let receipt = self
                .build_receipt(&request, &fp, bytes, display_name)
                .await?;
            let extraction_failed = receipt.extracted.is_none() && !receipt.duplicate.is_duplicate();
            if extraction_failed && request.receipts.is_empty() {
                // No structured amount will ever arrive for the first
                // receipt; switch the request to manual capture.
                request.manual_capture = true;
            }
            let valid = receipt.valid;
            let reason = receipt.reason.clone();
            request.receipts.push(receipt);
            let receipt_index = request.receipts.len() - 1;

            if request.state == RequestState::Draft {
                request.transition_to(
                    RequestState::CollectingEvidence,
                    now_iso8601(),
                    "system",
                    "first receipt attached".to_string(),
                )?;
            } else {
                request.updated_at = now_iso8601();
            }
            let manual_capture = request.manual_capture;

            match self
                .store
                .commit_attach(request, rec.version, receipt_index)
                .await
            {
                Ok((kind, _)) => {
                    return Ok(if kind.is_duplicate() {
                        AttachOutcome::Duplicate { kind }
                    } else if extraction_failed {
                        AttachOutcome::ExtractionFailed { manual_capture }
                    } else {
                        AttachOutcome::Attached {
                            receipt_index,
                            valid,
                            reason,
                        }
                    });
                }
                Err(err) => self.classify_conflict(request_id, &mut attempts, err)?,
            }
        }
    }

    /// Run the five hard rules and advance to `Ready` or `Rejected`.
    /// Idempotent on requests that already reached either state.
    pub async fn validate_and_advance(
        &self,
        request_id: &str,
    ) -> Result<(ValidateOutcome, ValidationReport), EngineError> {
        let mut attempts = 0;
        loop {
            let rec = self.store.get_request(request_id).await?;
            let mut request = rec.request;
            match request.state {
                RequestState::Ready => return Ok((ValidateOutcome::Ready, request.report)),
                RequestState::Rejected => return Ok((ValidateOutcome::Rejected, request.report)),
                _ => {}
            }
            if request.state != RequestState::PendingValidation {
                request.transition_to(
                    RequestState::PendingValidation,
                    now_iso8601(),
                    "system",
                    "submitted for validation".to_string(),
                )?;
            }

            let status = self.clients.client_status(&request.client_id).await;
            let report = validate(status.as_ref(), &request.fields, &request.receipts);
            request.report = report.clone();

            let (outcome, event) = if report.all_valid() {
                let figures = disbursement_figures(
                    request.countable_amount_total(),
                    self.config.commission_rate,
                );
                let event = LifecycleEvent::RequestReady {
                    request_id: request.id.clone(),
                    folio: request.folio.clone(),
                    net_capital: figures.net_capital,
                };
                request.figures = Some(figures);
                request.transition_to(
                    RequestState::Ready,
                    now_iso8601(),
                    "system",
                    "all hard rules passed".to_string(),
                )?;
                (ValidateOutcome::Ready, event)
            } else {
                let reasons = report.failure_reasons();
                let event = LifecycleEvent::RequestRejected {
                    request_id: request.id.clone(),
                    reasons: reasons.clone(),
                };
                request.transition_to(RequestState::Rejected, now_iso8601(), "system", reasons)?;
                (ValidateOutcome::Rejected, event)
            };

            match self.store.update_request(request, rec.version).await {
                Ok(_) => {
                    self.emit(event).await;
                    return Ok((outcome, report));
                }
                Err(err) => self.classify_conflict(request_id, &mut attempts, err)?,
            }
        }
    }

    /// Assign a folio to a `Ready` request and advance it. A
    /// caller-supplied folio is taken as-is and its collision surfaces
    /// as `FolioInUse`; an allocated one retries on collision.
    pub async fn assign_folio_and_advance(
        &self,
        request_id: &str,
        folio: Option<&str>,
        actor: &str,
    ) -> Result<RequestRecord, EngineError> {
        let mut attempts = 0;
        loop {
            let rec = self.store.get_request(request_id).await?;
            let mut request = rec.request;
            request.state.check_transition(RequestState::FolioAssigned)?;

            let assigned = match (folio, &request.folio) {
                (Some(explicit), _) => explicit.to_string(),
                (None, Some(existing)) => existing.clone(),
                (None, None) => {
                    next_identifier(
                        &*self.store,
                        &self.config.folio_prefix,
                        self.config.folio_width,
                    )
                    .await
                }
            };
            request.folio = Some(assigned.clone());
            request.transition_to(
                RequestState::FolioAssigned,
                now_iso8601(),
                actor,
                format!("folio {} assigned", assigned),
            )?;

            match self.store.update_request(request.clone(), rec.version).await {
                Ok(version) => {
                    self.emit(LifecycleEvent::FolioAssigned {
                        request_id: request.id.clone(),
                        folio: assigned,
                    })
                    .await;
                    return Ok(RequestRecord { request, version });
                }
                Err(StorageError::FolioInUse { folio: taken })
                    if folio.is_none() && attempts < self.config.max_occ_retries =>
                {
                    tracing::warn!(request_id, folio = %taken, "folio taken at commit, retrying");
                    attempts += 1;
                }
                Err(err) => self.classify_conflict(request_id, &mut attempts, err)?,
            }
        }
    }

    /// Cancel an idle request. Receipts stay attached for audit but
    /// are discarded, so their fingerprints stop blocking reuse.
    /// Idempotent when already canceled.
    pub async fn cancel_for_inactivity(
        &self,
        request_id: &str,
        note: &str,
    ) -> Result<RequestRecord, EngineError> {
        let mut attempts = 0;
        loop {
            let rec = self.store.get_request(request_id).await?;
            let mut request = rec.request;
            if request.state == RequestState::CanceledByInactivity {
                return Ok(RequestRecord {
                    request,
                    version: rec.version,
                });
            }
            request
                .state
                .check_transition(RequestState::CanceledByInactivity)?;
            for receipt in &mut request.receipts {
                if receipt.discard_reason.is_none() {
                    receipt.discard_reason = Some("request canceled for inactivity".to_string());
                }
            }
            request.transition_to(
                RequestState::CanceledByInactivity,
                now_iso8601(),
                "system",
                note.to_string(),
            )?;

            match self.store.update_request(request.clone(), rec.version).await {
                Ok(version) => {
                    self.emit(LifecycleEvent::RequestCanceled {
                        request_id: request.id.clone(),
                    })
                    .await;
                    return Ok(RequestRecord { request, version });
                }
                Err(err) => self.classify_conflict(request_id, &mut attempts, err)?,
            }
        }
    }

    /// Report the amount for a receipt whose extraction failed
    /// (manual-capture remediation). Only open to requests flagged for
    /// manual capture, and only for receipts with no extracted
    /// evidence; a receipt that failed the account match keeps its
    /// verdict. Only the amount is writable.
    pub async fn report_receipt_amount(
        &self,
        request_id: &str,
        receipt_index: usize,
        amount: Decimal,
    ) -> Result<RequestRecord, EngineError> {
        let mut attempts = 0;
        loop {
            let rec = self.store.get_request(request_id).await?;
            let mut request = rec.request;
            if request.state.is_terminal() {
                return Err(TransitionError::Terminal {
                    state: request.state,
                }
                .into());
            }
            if !request.manual_capture {
                return Err(EngineError::ManualCaptureRequired {
                    request_id: request_id.to_string(),
                });
            }
            let receipt = request.receipts.get_mut(receipt_index).ok_or(
                EngineError::ReceiptNotFound {
                    request_id: request_id.to_string(),
                    receipt_index,
                },
            )?;
            if !receipt.accepts_reported_amount() {
                return Err(EngineError::ReceiptNotCorrectable {
                    request_id: request_id.to_string(),
                    receipt_index,
                });
            }
            receipt.correct_amount(amount);
            receipt.valid = true;
            receipt.reason = "amount reported manually".to_string();
            request.updated_at = now_iso8601();
            match self.store.update_request(request.clone(), rec.version).await {
                Ok(version) => return Ok(RequestRecord { request, version }),
                Err(err) => self.classify_conflict(request_id, &mut attempts, err)?,
            }
        }
    }

    // ── Read-side ─────────────────────────────────────────────────

    pub async fn get_request(&self, request_id: &str) -> Result<RequestRecord, EngineError> {
        Ok(self.store.get_request(request_id).await?)
    }

    pub async fn list_requests_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<RequestRecord>, EngineError> {
        Ok(self.store.list_requests_for_client(client_id).await?)
    }

    /// Three-block summary for the client channel.
    pub async fn client_summary(&self, request_id: &str) -> Result<ClientSummary, EngineError> {
        let rec = self.store.get_request(request_id).await?;
        let account = self.accounts.active_account().await.ok();
        Ok(build_summary(&rec.request, account))
    }

    /// Irregular tranche plan over the validated net capital.
    pub async fn disbursement_plan(&self, request_id: &str) -> Result<Vec<Decimal>, EngineError> {
        let rec = self.store.get_request(request_id).await?;
        let figures = rec
            .request
            .figures
            .ok_or_else(|| EngineError::NotValidated {
                request_id: request_id.to_string(),
            })?;
        let mut rng = rand::thread_rng();
        Ok(partition(
            figures.net_capital,
            &self.config.partition_policy,
            &mut rng,
        ))
    }

    // ── Internals ─────────────────────────────────────────────────

    /// Classify one receipt against the request and the population.
    /// The advisory global lookup here keeps the common case cheap;
    /// `commit_attach` re-checks under the commit lock.
    async fn build_receipt(
        &self,
        request: &Request,
        fp: &str,
        bytes: &[u8],
        display_name: &str,
    ) -> Result<Receipt, EngineError> {
        if let Some(existing) = request.find_fingerprint(fp) {
            return Ok(Receipt {
                fingerprint: fp.to_string(),
                display_name: display_name.to_string(),
                extracted: None,
                valid: false,
                reason: format!("same content as receipt {} of this request", existing + 1),
                duplicate: DuplicateKind::Local {
                    receipt_index: existing,
                },
                discard_reason: None,
            });
        }

        let extracted = match self.extractor.extract(bytes, display_name).await {
            Ok(extracted) => extracted,
            Err(failure) => {
                tracing::warn!(
                    request_id = %request.id,
                    display_name,
                    reason = %failure.reason,
                    "receipt extraction failed"
                );
                return Ok(Receipt {
                    fingerprint: fp.to_string(),
                    display_name: display_name.to_string(),
                    extracted: None,
                    valid: false,
                    reason: failure.reason,
                    duplicate: DuplicateKind::None,
                    discard_reason: None,
                });
            }
        };

        if let Some(hit) = self
            .store
            .find_fingerprint(&request.client_id, fp, &request.id)
            .await?
        {
            return Ok(Receipt {
                fingerprint: fp.to_string(),
                display_name: display_name.to_string(),
                extracted: Some(extracted),
                valid: false,
                reason: format!("content already attached to request {}", hit.request_id),
                duplicate: DuplicateKind::Global {
                    origin_request_id: hit.request_id,
                },
                discard_reason: None,
            });
        }

        let account = self
            .accounts
            .active_account()
            .await
            .map_err(|e| EngineError::Configuration {
                active_count: e.active_count,
            })?;
        let outcome = matches(&extracted, &account, &self.config.match_policy);
        Ok(Receipt {
            fingerprint: fp.to_string(),
            display_name: display_name.to_string(),
            extracted: Some(extracted),
            valid: outcome.matched,
            reason: outcome.reason,
            duplicate: DuplicateKind::None,
            discard_reason: None,
        })
    }

    /// Absorb a conflict into the retry budget or surface it.
    fn classify_conflict(
        &self,
        request_id: &str,
        attempts: &mut u32,
        err: StorageError,
    ) -> Result<(), EngineError> {
        match err {
            StorageError::ConcurrentConflict { .. } if *attempts < self.config.max_occ_retries => {
                *attempts += 1;
                Ok(())
            }
            StorageError::ConcurrentConflict { .. } => Err(EngineError::Conflict {
                request_id: request_id.to_string(),
                attempts: *attempts + 1,
            }),
            other => Err(other.into()),
        }
    }

    async fn emit(&self, event: LifecycleEvent) {
        if let Err(err) = self.notifier.notify(event).await {
            tracing::warn!(error = %err, "notification delivery failed");
        }
    }
}
