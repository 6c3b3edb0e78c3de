//! Offer submission step.
//!
//! Records the offer on the escrow order contract. The contract pulls the
//! buyer's deposit using the allowance granted by the approval step and
//! stores the content URI so the seller can fetch the encrypted details.
//!
//! If this step fails, that allowance stays outstanding. The step does not
//! try to undo it; callers see the amount in the failure and decide.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{
    abi, send_and_confirm, ChainError, ContractCall, PendingTransaction, TransactionHandle,
    TransactionSender,
};
use crate::offer::OrderTerms;

/// Arguments of `submitOffer`, in contract order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferCall {
    pub quantity: U256,
    pub token_address: Address,
    pub price: U256,
    pub buyers_cost: U256,
    pub sellers_stake: U256,
    pub timeout_seconds: U256,
    pub uri: String,
}

impl OfferCall {
    pub fn from_terms(terms: &OrderTerms, uri: String) -> Self {
        Self {
            quantity: terms.quantity,
            token_address: terms.token_address,
            price: terms.price,
            buyers_cost: terms.buyers_cost,
            sellers_stake: terms.sellers_stake,
            timeout_seconds: terms.timeout_seconds,
            uri,
        }
    }

    fn encode(&self) -> alloy_primitives::Bytes {
        abi::encode_submit_offer(
            self.quantity,
            self.token_address,
            self.price,
            self.buyers_cost,
            self.sellers_stake,
            self.timeout_seconds,
            self.uri.clone(),
        )
    }
}

pub struct OfferSubmissionStep {
    sender: Arc<dyn TransactionSender>,
    gas_limit: u64,
    confirmation_timeout: Duration,
}

impl OfferSubmissionStep {
    pub fn new(
        sender: Arc<dyn TransactionSender>,
        gas_limit: u64,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            sender,
            gas_limit,
            confirmation_timeout,
        }
    }

    /// Call `order.submitOffer(...)` with a fixed gas bound and block until
    /// it is confirmed.
    pub async fn submit_offer(
        &self,
        order: Address,
        offer: &OfferCall,
        pending: &PendingTransaction,
    ) -> Result<TransactionHandle, ChainError> {
        info!(%order, uri = %offer.uri, gas_limit = self.gas_limit, "submitting offer");

        let call = ContractCall {
            to: order,
            data: offer.encode(),
            gas_limit: Some(self.gas_limit),
        };

        let confirmation =
            send_and_confirm(self.sender.as_ref(), call, pending, self.confirmation_timeout)
                .await?;

        info!(tx_hash = %confirmation.hash, block = ?confirmation.block_number, "offer recorded");
        Ok(TransactionHandle::new(confirmation.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_carries_terms_in_contract_order() {
        let terms = OrderTerms::new(Address::repeat_byte(0x33))
            .price(U256::from(10))
            .buyers_cost(U256::from(15))
            .sellers_stake(U256::from(4));
        let call = OfferCall::from_terms(&terms, "ipfs://Qm".into());

        assert_eq!(call.quantity, U256::from(1));
        assert_eq!(call.token_address, Address::repeat_byte(0x33));
        assert_eq!(call.sellers_stake, U256::from(4));
        assert_eq!(call.uri, "ipfs://Qm");
        assert_eq!(call.encode().len() % 32, 4);
    }
}
