//! Token allowance the escrow contract needs to pull the buyer's deposit.
//!
//! When the order asks the buyer to put up more than the price (a cost
//! above price acts as a refundable deposit), the contract transfers the
//! price plus that excess; otherwise it transfers the price. Either way
//! the per-unit figure is `max(price, buyers_cost)`, scaled by quantity.

use alloy_primitives::U256;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllowanceError {
    #[error("transfer amount overflows uint256")]
    Overflow,
}

/// Exact amount the buyer must approve for one offer.
///
/// Pure. Fails only when `max(price, buyers_cost) * quantity` does not fit
/// in 256 bits, which no sane order produces.
pub fn compute_transfer_amount(
    price: U256,
    buyers_cost: U256,
    quantity: U256,
) -> Result<U256, AllowanceError> {
    let per_unit = if buyers_cost > price {
        price
            .checked_add(buyers_cost - price)
            .ok_or(AllowanceError::Overflow)?
    } else {
        price
    };

    per_unit
        .checked_mul(quantity)
        .ok_or(AllowanceError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn amount(price: u64, cost: u64, qty: u64) -> U256 {
        compute_transfer_amount(U256::from(price), U256::from(cost), U256::from(qty)).unwrap()
    }

    #[test]
    fn cost_above_price_covers_cost() {
        assert_eq!(amount(10, 15, 1), U256::from(15));
    }

    #[test]
    fn cost_below_price_covers_price() {
        assert_eq!(amount(10, 5, 1), U256::from(10));
    }

    #[test]
    fn equal_price_and_cost() {
        assert_eq!(amount(7, 7, 3), U256::from(21));
    }

    #[test]
    fn zero_cost_and_zero_quantity() {
        assert_eq!(amount(10, 0, 2), U256::from(20));
        assert_eq!(amount(10, 15, 0), U256::ZERO);
    }

    #[test]
    fn overflow_is_reported() {
        let result = compute_transfer_amount(U256::MAX, U256::ZERO, U256::from(2));
        assert_eq!(result, Err(AllowanceError::Overflow));
    }

    proptest! {
        #[test]
        fn equals_max_of_price_and_cost_times_quantity(
            price in any::<u128>(),
            cost in any::<u128>(),
            qty in any::<u64>(),
        ) {
            let expected = U256::from(price.max(cost)) * U256::from(qty);
            let got = compute_transfer_amount(U256::from(price), U256::from(cost), U256::from(qty));
            prop_assert_eq!(got, Ok(expected));
        }

        #[test]
        fn price_equal_cost_is_price_times_quantity(price in any::<u128>(), qty in any::<u64>()) {
            let got =
                compute_transfer_amount(U256::from(price), U256::from(price), U256::from(qty));
            prop_assert_eq!(got, Ok(U256::from(price) * U256::from(qty)));
        }

        #[test]
        fn zero_cost_is_price_times_quantity(price in any::<u128>(), qty in any::<u64>()) {
            let got = compute_transfer_amount(U256::from(price), U256::ZERO, U256::from(qty));
            prop_assert_eq!(got, Ok(U256::from(price) * U256::from(qty)));
        }
    }
}
