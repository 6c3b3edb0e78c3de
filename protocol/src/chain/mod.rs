//! # Chain Interaction
//!
//! The pipeline never talks to a wallet directly. It is handed a
//! [`TransactionSender`]: something that can put a contract call on chain
//! and, separately, wait for it to be mined. Splitting "send" from "await
//! confirmation" is what lets the pipeline publish the pending transaction
//! hash (for a block-explorer link) while it waits.
//!
//! ```text
//!   step ──send(call)──────────► sender ──► wallet / node
//!     │   ◄──TransactionHandle──┘
//!     ├─ PendingTransaction::set(handle)          (UI shows link)
//!     ├─ await_confirmation(handle) ≤ timeout
//!     └─ PendingTransaction::clear()
//! ```
//!
//! Two steps are built on this: [`token::TokenApprovalStep`] and
//! [`escrow::OfferSubmissionStep`]. [`rpc::JsonRpcWallet`] is the
//! production sender.

pub mod abi;
pub mod escrow;
pub mod rpc;
pub mod token;

use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

pub use escrow::{OfferCall, OfferSubmissionStep};
pub use rpc::JsonRpcWallet;
pub use token::TokenApprovalStep;

/// Errors surfaced by a [`TransactionSender`] or by waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// The user declined to sign, or the wallet refused the request.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The transaction was mined but execution reverted.
    #[error("transaction {hash} reverted")]
    Reverted {
        /// Hash of the reverted transaction.
        hash: TxHash,
    },

    /// No receipt within the configured confirmation window.
    #[error("transaction {hash} not confirmed after {}s", .waited.as_secs())]
    Timeout {
        /// Hash of the transaction still pending.
        hash: TxHash,
        /// How long the step waited.
        waited: Duration,
    },

    /// Transport or node-side failure.
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// A sent but not necessarily mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHandle {
    pub hash: TxHash,
}

impl TransactionHandle {
    pub fn new(hash: TxHash) -> Self {
        Self { hash }
    }
}

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// A mined, successful transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub hash: TxHash,
    pub block_number: Option<u64>,
}

/// One contract invocation: target, ABI-encoded calldata, optional gas bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub gas_limit: Option<u64>,
}

/// Signing and submission capability injected into the chain steps.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    /// Sign and broadcast `call`. Returns as soon as the network has the
    /// transaction; does not wait for it to be mined.
    async fn send(&self, call: ContractCall) -> Result<TransactionHandle, ChainError>;

    /// Wait until `handle` is mined. A reverted receipt is an error.
    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Confirmation, ChainError>;
}

/// The transaction a step is currently waiting on, observable by the UI.
///
/// Holds `Some(handle)` between send and confirmation, `None` otherwise.
#[derive(Debug)]
pub struct PendingTransaction {
    tx: watch::Sender<Option<TransactionHandle>>,
}

impl Default for PendingTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTransaction {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TransactionHandle>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<TransactionHandle> {
        *self.tx.borrow()
    }

    pub(crate) fn set(&self, handle: TransactionHandle) {
        self.tx.send_replace(Some(handle));
    }

    pub(crate) fn clear(&self) {
        self.tx.send_replace(None);
    }
}

/// Send `call`, expose the handle while it is pending, and wait up to
/// `timeout` for it to be mined. The pending slot is cleared on every
/// outcome; a timed-out hash is still reported inside the error.
pub(crate) async fn send_and_confirm(
    sender: &dyn TransactionSender,
    call: ContractCall,
    pending: &PendingTransaction,
    timeout: Duration,
) -> Result<Confirmation, ChainError> {
    let handle = sender.send(call).await?;
    pending.set(handle);
    tracing::info!(tx_hash = %handle, "transaction sent, awaiting confirmation");

    let outcome = match tokio::time::timeout(timeout, sender.await_confirmation(&handle)).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout {
            hash: handle.hash,
            waited: timeout,
        }),
    };

    pending.clear();
    outcome
}
