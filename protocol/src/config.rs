//! # Pipeline Configuration & Constants
//!
//! Every magic number in the offer pipeline lives here. The byte lengths
//! are fixed by the NaCl `box` construction the sellers decrypt with, so
//! they are not configurable. Everything that depends on the deployment
//! (gas bounds, confirmation timeout, URI scheme) is carried by
//! [`PipelineConfig`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// X25519 public and secret key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// XSalsa20-Poly1305 nonce length in bytes. 24, not 12: this is NaCl, not GCM.
pub const NONCE_LENGTH: usize = 24;

/// Poly1305 authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Order Defaults
// ---------------------------------------------------------------------------

/// Offer timeout used when the order does not suggest one: one week.
pub const DEFAULT_OFFER_TIMEOUT_SECS: u64 = 60 * 60 * 24 * 7;

/// Units purchased per offer when the caller does not say otherwise.
pub const DEFAULT_QUANTITY: u64 = 1;

// ---------------------------------------------------------------------------
// Chain Parameters
// ---------------------------------------------------------------------------

/// Upper bound on gas for `submitOffer`. The escrow contract stores the
/// offer and pulls the buyer's deposit; estimation on some wallets
/// under-shoots that, so the bound is always supplied explicitly.
pub const DEFAULT_SUBMIT_GAS_LIMIT: u64 = 1_000_000;

/// How long a step waits for its transaction to be mined.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Interval between `eth_getTransactionReceipt` polls.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// JSON-RPC error code a wallet returns when the user declines to sign (EIP-1193).
pub const USER_REJECTED_REQUEST_CODE: i64 = 4001;

// ---------------------------------------------------------------------------
// Storage Parameters
// ---------------------------------------------------------------------------

/// Scheme prefixed to content identifiers before they go on chain.
pub const DEFAULT_CONTENT_URI_SCHEME: &str = "ipfs";

/// Timeout for a single upload request to the pinning endpoint.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Deployment-specific knobs for the offer pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Gas bound attached to the `submitOffer` transaction.
    pub submit_gas_limit: u64,
    /// Optional gas bound for `approve`. `None` lets the wallet estimate.
    pub approve_gas_limit: Option<u64>,
    /// Maximum wait for each transaction confirmation.
    #[serde(with = "duration_secs")]
    pub confirmation_timeout: Duration,
    /// URI scheme for the uploaded content identifier.
    pub content_uri_scheme: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            submit_gas_limit: DEFAULT_SUBMIT_GAS_LIMIT,
            approve_gas_limit: None,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            content_uri_scheme: DEFAULT_CONTENT_URI_SCHEME.to_string(),
        }
    }
}

/// Durations are written as whole seconds in config files.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
