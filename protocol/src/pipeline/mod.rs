//! # Offer Submission Pipeline
//!
//! Drives one buyer's offer from plaintext record to on-chain escrow entry.
//!
//! ## State Machine
//!
//! ```text
//!            submit()
//!   Idle ───────────────► Uploading ──ok──► Approving ──ok──► Submitting ──ok──► Succeeded
//!    ▲                        │                 │                  │
//!    │                        └──────err────────┴───────err───────┴──────► Failed(step, reason)
//!    │                                                                            │
//!    └──────────────────── submit() again (explicit retry) ◄───────────────────────┘
//! ```
//!
//! Steps run strictly in order and a failure halts the attempt. Nothing is
//! rolled back: an uploaded document stays pinned and a granted allowance
//! stays granted. A submission failure reports the outstanding allowance
//! so callers can show it.
//!
//! ## Sessions
//!
//! One [`OfferPipeline`] serves one buyer session. At most one attempt runs
//! at a time; a `submit` that arrives while another is running is turned
//! away without touching the state.

pub mod error;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::chain::{
    ChainError, OfferCall, OfferSubmissionStep, PendingTransaction, TokenApprovalStep,
    TransactionHandle, TransactionSender,
};
use crate::config::PipelineConfig;
use crate::crypto::{encrypt_json, EncryptionError, KeyMaterial, SellerPublicKey};
use crate::offer::{format_token_amount, OfferRequest, TokenInfo};
use crate::storage::{ContentId, ContentUploader};

pub use error::{ApprovalError, OfferError};

/// The three working steps of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStep {
    Uploading,
    Approving,
    Submitting,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploading => write!(f, "upload"),
            Self::Approving => write!(f, "approval"),
            Self::Submitting => write!(f, "submission"),
        }
    }
}

/// Where an attempt stopped and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFailure {
    pub step: PipelineStep,
    /// Human-readable reason, suitable for display.
    pub reason: String,
    /// Allowance granted by this attempt that is still unconsumed on chain.
    pub allowance_outstanding: Option<U256>,
}

/// What a successful attempt produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferReceipt {
    /// Escrow order the offer was recorded on.
    pub order: Address,
    pub content_id: ContentId,
    pub content_uri: String,
    pub approval_tx: TransactionHandle,
    pub offer_tx: TransactionHandle,
    pub transfer_amount: U256,
}

/// Current position of the pipeline. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Uploading,
    Approving { amount: U256, token: TokenInfo },
    Submitting,
    Succeeded(OfferReceipt),
    Failed(PipelineFailure),
}

impl PipelineState {
    /// Label for a progress indicator while a step is running.
    pub fn progress_message(&self) -> Option<String> {
        match self {
            Self::Uploading => Some("Uploading".to_string()),
            Self::Approving { amount, token } => Some(format!(
                "Requesting {} {}",
                format_token_amount(*amount, token.decimals),
                token.symbol
            )),
            Self::Submitting => Some("Submitting offer".to_string()),
            Self::Idle | Self::Succeeded(_) | Self::Failed(_) => None,
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(
            self,
            Self::Uploading | Self::Approving { .. } | Self::Submitting
        )
    }

    /// Whether a UI should offer a submit control. Failed attempts are
    /// always recoverable by submitting again.
    pub fn accepts_submit(&self) -> bool {
        !self.is_working()
    }
}

/// Result of one call to [`OfferPipeline::submit`].
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Turned away before any state change or side effect.
    Rejected(OfferError),
    Succeeded(OfferReceipt),
    Failed(PipelineFailure),
}

/// Holds the session's single-flight slot for one attempt.
///
/// If the attempt's future is dropped mid-step, the state would otherwise
/// stay in a working variant forever. Dropping the guard settles it as
/// `Failed` and clears the pending transaction before freeing the slot.
struct AttemptGuard<'a> {
    pipeline: &'a OfferPipeline,
    /// Set once the approval transaction is confirmed.
    approved_amount: Option<U256>,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let pipeline = self.pipeline;
        let current = pipeline.state();

        if current.is_working() {
            let in_flight_tx = pipeline.pending.current();
            let (step, allowance_outstanding) = match current {
                // A broadcast approval may still be mined.
                PipelineState::Approving { amount, .. } => {
                    (PipelineStep::Approving, in_flight_tx.map(|_| amount))
                }
                PipelineState::Submitting => (PipelineStep::Submitting, self.approved_amount),
                _ => (PipelineStep::Uploading, None),
            };
            warn!(
                %step,
                tx_hash = ?in_flight_tx.map(|h| h.hash),
                allowance = ?allowance_outstanding,
                "offer attempt abandoned"
            );

            pipeline.pending.clear();
            pipeline.transition(PipelineState::Failed(PipelineFailure {
                step,
                reason: "attempt abandoned before completion".to_string(),
                allowance_outstanding,
            }));
        }

        pipeline.in_flight.store(false, Ordering::Release);
    }
}

/// Orchestrates encryption, upload, approval and submission for one buyer
/// session.
pub struct OfferPipeline {
    keys: Arc<KeyMaterial>,
    uploader: Arc<dyn ContentUploader>,
    approval: TokenApprovalStep,
    submission: OfferSubmissionStep,
    config: PipelineConfig,
    state: watch::Sender<PipelineState>,
    pending: PendingTransaction,
    in_flight: AtomicBool,
}

impl OfferPipeline {
    pub fn new(
        keys: Arc<KeyMaterial>,
        uploader: Arc<dyn ContentUploader>,
        sender: Arc<dyn TransactionSender>,
        config: PipelineConfig,
    ) -> Self {
        let approval = TokenApprovalStep::new(
            Arc::clone(&sender),
            config.approve_gas_limit,
            config.confirmation_timeout,
        );
        let submission =
            OfferSubmissionStep::new(sender, config.submit_gas_limit, config.confirmation_timeout);
        let (state, _) = watch::channel(PipelineState::Idle);

        Self {
            keys,
            uploader,
            approval,
            submission,
            config,
            state,
            pending: PendingTransaction::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Transaction currently awaiting confirmation, for explorer links.
    pub fn pending_transaction(&self) -> &PendingTransaction {
        &self.pending
    }

    /// Run one attempt.
    ///
    /// `is_valid` is the caller's pre-flight check. If it refuses, or the
    /// request carries no offer record, or another attempt is running, the
    /// call returns [`SubmitOutcome::Rejected`] and the state is untouched.
    /// Otherwise the state resets to `Idle` and the steps run in order.
    pub async fn submit<V>(&self, request: &OfferRequest, is_valid: V) -> SubmitOutcome
    where
        V: FnOnce(&OfferRequest) -> bool,
    {
        let Some(mut attempt) = self.try_begin() else {
            debug!(order = %request.order.address, "submit ignored, attempt in flight");
            return SubmitOutcome::Rejected(OfferError::AttemptInFlight);
        };

        if !is_valid(request) || request.offer_data.is_empty() {
            debug!(order = %request.order.address, "submit ignored, request rejected");
            return SubmitOutcome::Rejected(OfferError::ValidationRejected);
        }

        self.transition(PipelineState::Idle);

        match self.run_attempt(request, &mut attempt).await {
            Ok(receipt) => {
                info!(
                    order = %receipt.order,
                    offer_tx = %receipt.offer_tx,
                    uri = %receipt.content_uri,
                    "offer submitted"
                );
                self.transition(PipelineState::Succeeded(receipt.clone()));
                SubmitOutcome::Succeeded(receipt)
            }
            Err(err) => {
                let failure = PipelineFailure {
                    // Pre-flight errors return above; everything here has a step.
                    step: err.step().unwrap_or(PipelineStep::Uploading),
                    reason: err.to_string(),
                    allowance_outstanding: err.allowance_outstanding(),
                };
                warn!(
                    order = %request.order.address,
                    step = %failure.step,
                    reason = %failure.reason,
                    "offer attempt failed"
                );
                if let Some(amount) = failure.allowance_outstanding {
                    warn!(
                        spender = %request.order.address,
                        %amount,
                        "token allowance may remain granted"
                    );
                }
                self.transition(PipelineState::Failed(failure.clone()));
                SubmitOutcome::Failed(failure)
            }
        }
    }

    async fn run_attempt(
        &self,
        request: &OfferRequest,
        attempt: &mut AttemptGuard<'_>,
    ) -> Result<OfferReceipt, OfferError> {
        let order = &request.order;
        let terms = &order.terms;

        self.transition(PipelineState::Uploading);

        // All key handling happens before the uploader sees anything.
        let keypair = self
            .keys
            .current()
            .ok_or(EncryptionError::KeypairUnavailable)?;
        let seller = SellerPublicKey::from_hex(&order.encryption_public_key)?;
        let payload = encrypt_json(&request.offer_data, &seller, &keypair)?;

        let content_id = self.uploader.upload(&payload).await?;
        let content_uri = content_id.to_uri(&self.config.content_uri_scheme);
        info!(order = %order.address, cid = %content_id, "offer uploaded");

        let transfer_amount = terms.transfer_amount().map_err(ApprovalError::from)?;
        self.transition(PipelineState::Approving {
            amount: transfer_amount,
            token: order.token.clone(),
        });

        let approval_tx = self
            .approval
            .approve(terms.token_address, order.address, transfer_amount, &self.pending)
            .await
            .map_err(|err| match err {
                ChainError::Timeout { hash, waited } => ApprovalError::Unconfirmed {
                    hash,
                    waited,
                    amount: transfer_amount,
                },
                other => ApprovalError::Chain(other),
            })?;
        attempt.approved_amount = Some(transfer_amount);

        self.transition(PipelineState::Submitting);

        let call = OfferCall::from_terms(terms, content_uri.clone());
        let offer_tx = self
            .submission
            .submit_offer(order.address, &call, &self.pending)
            .await
            .map_err(|source| OfferError::Submission {
                source,
                allowance_outstanding: transfer_amount,
            })?;

        Ok(OfferReceipt {
            order: order.address,
            content_id,
            content_uri,
            approval_tx,
            offer_tx,
            transfer_amount,
        })
    }

    fn try_begin(&self) -> Option<AttemptGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| AttemptGuard {
                pipeline: self,
                approved_amount: None,
            })
    }

    fn transition(&self, next: PipelineState) {
        debug!(state = ?next, "pipeline transition");
        self.state.send_replace(next);
    }
}

impl fmt::Debug for OfferPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfferPipeline")
            .field("state", &*self.state.borrow())
            .field("pending", &self.pending.current())
            .field("in_flight", &self.in_flight.load(Ordering::Acquire))
            .finish()
    }
}
