//! ABI bindings for the two contract entry points the pipeline calls.
//!
//! Only the functions used are declared. The escrow contract's full
//! interface lives with the contract; this side treats it as opaque.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    /// ERC-20 allowance entry point.
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Escrow order entry point for buyers.
    interface IOrder {
        function submitOffer(
            uint256 quantity,
            address tokenAddress,
            uint256 price,
            uint256 buyersCost,
            uint256 sellersStake,
            uint256 timeoutSeconds,
            string uri
        ) external returns (uint128);
    }
}

/// Calldata for `approve(spender, amount)`.
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

/// Calldata for `submitOffer(...)`.
#[allow(clippy::too_many_arguments)]
pub fn encode_submit_offer(
    quantity: U256,
    token_address: Address,
    price: U256,
    buyers_cost: U256,
    sellers_stake: U256,
    timeout_seconds: U256,
    uri: String,
) -> Bytes {
    IOrder::submitOfferCall {
        quantity,
        tokenAddress: token_address,
        price,
        buyersCost: buyers_cost,
        sellersStake: sellers_stake,
        timeoutSeconds: timeout_seconds,
        uri,
    }
    .abi_encode()
    .into()
}
