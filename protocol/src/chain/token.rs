//! Token approval step.
//!
//! Grants the escrow contract an ERC-20 allowance and waits for it to be
//! mined. The allowance is a persistent on-chain effect: it stays granted
//! even when a later step fails, and nothing here revokes it.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{
    abi, send_and_confirm, ChainError, ContractCall, PendingTransaction, TransactionHandle,
    TransactionSender,
};

pub struct TokenApprovalStep {
    sender: Arc<dyn TransactionSender>,
    gas_limit: Option<u64>,
    confirmation_timeout: Duration,
}

impl TokenApprovalStep {
    pub fn new(
        sender: Arc<dyn TransactionSender>,
        gas_limit: Option<u64>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            sender,
            gas_limit,
            confirmation_timeout,
        }
    }

    /// Call `token.approve(spender, amount)` and block until it is confirmed.
    ///
    /// The handle appears in `pending` as soon as the wallet broadcasts and
    /// is cleared once the wait ends.
    pub async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        pending: &PendingTransaction,
    ) -> Result<TransactionHandle, ChainError> {
        info!(%token, %spender, %amount, "requesting token approval");

        let call = ContractCall {
            to: token,
            data: abi::encode_approve(spender, amount),
            gas_limit: self.gas_limit,
        };

        let confirmation =
            send_and_confirm(self.sender.as_ref(), call, pending, self.confirmation_timeout)
                .await?;

        info!(
            tx_hash = %confirmation.hash,
            block = ?confirmation.block_number,
            "approval confirmed"
        );
        Ok(TransactionHandle::new(confirmation.hash))
    }
}
