//! # Orders and Offers
//!
//! The read-only order a buyer responds to, the private record the buyer
//! attaches, and the arithmetic that ties them to a token allowance.
//!
//! Order listings only *suggest* terms; any suggestion the listing leaves
//! out falls back to the defaults in [`crate::config`] (zero amounts, a one
//! week timeout, quantity one).

pub mod allowance;
pub mod amount;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_OFFER_TIMEOUT_SECS, DEFAULT_QUANTITY};

pub use allowance::{compute_transfer_amount, AllowanceError};
pub use amount::format_token_amount;

/// Economic terms of an offer, taken from the order the buyer responds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTerms {
    /// ERC-20 token the order is priced in.
    pub token_address: Address,
    #[serde(default, with = "uint_string")]
    pub price: U256,
    /// What the buyer must put at risk; above `price` the excess is a deposit.
    #[serde(default, with = "uint_string")]
    pub buyers_cost: U256,
    /// Seller's good-faith stake.
    #[serde(default, with = "uint_string")]
    pub sellers_stake: U256,
    #[serde(default = "default_timeout", with = "uint_string")]
    pub timeout_seconds: U256,
    #[serde(default = "default_quantity", with = "uint_string")]
    pub quantity: U256,
}

fn default_timeout() -> U256 {
    U256::from(DEFAULT_OFFER_TIMEOUT_SECS)
}

fn default_quantity() -> U256 {
    U256::from(DEFAULT_QUANTITY)
}

impl OrderTerms {
    /// Terms with every suggestion at its default.
    pub fn new(token_address: Address) -> Self {
        Self {
            token_address,
            price: U256::ZERO,
            buyers_cost: U256::ZERO,
            sellers_stake: U256::ZERO,
            timeout_seconds: default_timeout(),
            quantity: default_quantity(),
        }
    }

    pub fn price(mut self, price: U256) -> Self {
        self.price = price;
        self
    }

    pub fn buyers_cost(mut self, cost: U256) -> Self {
        self.buyers_cost = cost;
        self
    }

    pub fn sellers_stake(mut self, stake: U256) -> Self {
        self.sellers_stake = stake;
        self
    }

    pub fn timeout_seconds(mut self, secs: U256) -> Self {
        self.timeout_seconds = secs;
        self
    }

    pub fn quantity(mut self, quantity: U256) -> Self {
        self.quantity = quantity;
        self
    }

    /// Allowance the escrow contract needs for these terms.
    pub fn transfer_amount(&self) -> Result<U256, AllowanceError> {
        compute_transfer_amount(self.price, self.buyers_cost, self.quantity)
    }
}

/// Amounts arrive as decimal strings from indexers and as `0x` hex from
/// RPC tooling; both are accepted, as are plain JSON integers. Written back
/// as decimal.
mod uint_string {
    use alloy_primitives::U256;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(UintVisitor)
    }

    struct UintVisitor;

    impl<'de> Visitor<'de> for UintVisitor {
        type Value = U256;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal / 0x-hex string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
            let v = v.trim();
            let parsed = match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
                Some(digits) => U256::from_str_radix(digits, 16),
                None => U256::from_str_radix(v, 10),
            };
            parsed.map_err(|e| E::custom(format!("invalid uint256 {v:?}: {e}")))
        }
    }
}

/// Display metadata for the order's token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

/// An escrow order as the buyer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Address of the escrow order contract; also the allowance spender.
    pub address: Address,
    /// Seller's X25519 public key, hex.
    pub encryption_public_key: String,
    pub token: TokenInfo,
    pub terms: OrderTerms,
}

/// The buyer's private record (shipping address, contact details, ...).
///
/// Arbitrary JSON. Lives in memory only until it is encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferData(pub serde_json::Value);

impl OfferData {
    /// `null` means the buyer supplied nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }
}

impl From<serde_json::Value> for OfferData {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Everything one submission attempt needs.
#[derive(Debug, Clone)]
pub struct OfferRequest {
    pub order: Order,
    pub offer_data: OfferData,
}

impl OfferRequest {
    pub fn new(order: Order, offer_data: impl Into<OfferData>) -> Self {
        Self {
            order,
            offer_data: offer_data.into(),
        }
    }
}
