//! # CLI Interface
//!
//! Argument structure for `rwtp-offer`, via `clap` derive. Every setting a
//! deployment would change has an `RWTP_*` environment fallback.

use alloy_primitives::{Address, U256};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Submit encrypted offers to RWTP escrow orders.
#[derive(Parser, Debug)]
#[command(name = "rwtp-offer", version, propagate_version = true)]
pub struct RwtpOfferCli {
    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "RWTP_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an encryption keypair and write it to the key file.
    Keygen(KeygenArgs),
    /// Print the public key of an existing key file.
    Pubkey(KeyFileArgs),
    /// Print the token allowance an offer needs.
    Quote(QuoteArgs),
    /// Encrypt, upload, approve and submit an offer.
    Submit(SubmitArgs),
    /// Decrypt an uploaded payload with the seller's key file (`--key-file`).
    Open(OpenArgs),
}

#[derive(Args, Debug)]
pub struct KeyFileArgs {
    /// File holding the hex-encoded X25519 secret key.
    #[arg(long, short = 'k', env = "RWTP_KEY_FILE", default_value = "rwtp-offer.key")]
    pub key_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    #[command(flatten)]
    pub key: KeyFileArgs,

    /// Replace an existing key file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Unit price, in token base units.
    #[arg(long, value_parser = parse_u256, default_value = "0")]
    pub price: U256,

    /// Buyer's required cost, in token base units.
    #[arg(long, value_parser = parse_u256, default_value = "0")]
    pub buyers_cost: U256,

    #[arg(long, value_parser = parse_u256, default_value = "1")]
    pub quantity: U256,

    /// Token decimals, for the human-readable figure.
    #[arg(long, default_value_t = 18)]
    pub decimals: u8,

    #[arg(long, default_value = "")]
    pub symbol: String,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub key: KeyFileArgs,

    /// JSON file describing the order (address, seller key, token, terms).
    #[arg(long)]
    pub order: PathBuf,

    /// JSON file with the private offer record (shipping address, email).
    #[arg(long)]
    pub offer: PathBuf,

    /// JSON-RPC endpoint of a node or wallet that manages `--from`.
    #[arg(long, env = "RWTP_RPC_URL", default_value = "http://127.0.0.1:8545")]
    pub rpc_url: String,

    /// Buyer account that signs the approval and the offer.
    #[arg(long, env = "RWTP_FROM", value_parser = parse_address)]
    pub from: Address,

    /// Pinning endpoint that accepts the encrypted payload.
    #[arg(long, env = "RWTP_UPLOAD_URL")]
    pub upload_url: String,

    /// Bearer token for the pinning endpoint.
    #[arg(long, env = "RWTP_UPLOAD_TOKEN", hide_env_values = true)]
    pub upload_token: Option<String>,

    /// JSON file with pipeline settings (gas limits, timeouts, URI scheme).
    #[arg(long, env = "RWTP_PIPELINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the gas bound for `submitOffer`.
    #[arg(long)]
    pub gas_limit: Option<u64>,

    /// Overrides the per-transaction confirmation timeout, in seconds.
    #[arg(long)]
    pub confirmation_timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    #[command(flatten)]
    pub key: KeyFileArgs,

    /// JSON file holding `{ publicKey, nonce, message }`.
    #[arg(long)]
    pub payload: PathBuf,
}

fn parse_u256(s: &str) -> Result<U256, String> {
    s.parse::<U256>().map_err(|e| format!("invalid amount {s:?}: {e}"))
}

fn parse_address(s: &str) -> Result<Address, String> {
    s.parse::<Address>().map_err(|e| format!("invalid address {s:?}: {e}"))
}
