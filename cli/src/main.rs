// Copyright (c) 2026 RWTP Contributors. MIT License.
// See LICENSE for details.

//! # rwtp-offer
//!
//! Headless front end for the offer pipeline. Subcommands:
//!
//! - `keygen`: create the buyer's encryption key file
//! - `pubkey`: print the public half of a key file
//! - `quote`: print the allowance an offer will request
//! - `submit`: run the full encrypt / upload / approve / submit pipeline
//! - `open`: decrypt an uploaded payload as the seller

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rwtp_offer::chain::JsonRpcWallet;
use rwtp_offer::config::{PipelineConfig, DEFAULT_UPLOAD_TIMEOUT};
use rwtp_offer::crypto::{open, EncryptedPayload, EncryptionKeypair, KeyMaterial};
use rwtp_offer::offer::{compute_transfer_amount, format_token_amount, OfferRequest, Order};
use rwtp_offer::storage::HttpUploader;
use rwtp_offer::{OfferPipeline, SubmitOutcome};

use cli::{Commands, RwtpOfferCli};

const DEFAULT_LOG_FILTER: &str = "rwtp_offer=info,rwtp_offer_cli=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RwtpOfferCli::parse();
    logging::init_logging(DEFAULT_LOG_FILTER, cli.log_format);

    match cli.command {
        Commands::Keygen(args) => keygen(args),
        Commands::Pubkey(args) => pubkey(args),
        Commands::Quote(args) => quote(args),
        Commands::Submit(args) => submit(args).await,
        Commands::Open(args) => open_payload(args),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {what} in {}", path.display()))
}

fn load_keypair(path: &Path) -> Result<EncryptionKeypair> {
    EncryptionKeypair::load(path)
        .with_context(|| format!("failed to load key file {}", path.display()))
}

fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let path = &args.key.key_file;
    if path.exists() && !args.force {
        bail!(
            "key file {} already exists (use --force to replace it)",
            path.display()
        );
    }

    let keypair = EncryptionKeypair::generate();
    keypair
        .save(path)
        .with_context(|| format!("failed to write key file {}", path.display()))?;

    tracing::info!(key_file = %path.display(), "encryption keypair generated");
    println!("{}", keypair.public_key_hex());
    Ok(())
}

fn pubkey(args: cli::KeyFileArgs) -> Result<()> {
    let keypair = load_keypair(&args.key_file)?;
    println!("{}", keypair.public_key_hex());
    Ok(())
}

fn quote(args: cli::QuoteArgs) -> Result<()> {
    let amount = compute_transfer_amount(args.price, args.buyers_cost, args.quantity)?;
    let human = format_token_amount(amount, args.decimals);

    println!("Transfer amount");
    println!("  Base units : {amount}");
    println!("  Formatted  : {} {}", human, args.symbol);
    Ok(())
}

async fn submit(args: cli::SubmitArgs) -> Result<()> {
    let keys = Arc::new(KeyMaterial::with_keypair(load_keypair(&args.key.key_file)?));
    let order: Order = read_json(&args.order, "order")?;
    let offer_data: serde_json::Value = read_json(&args.offer, "offer record")?;

    let mut config = match &args.config {
        Some(path) => read_json::<PipelineConfig>(path, "pipeline config")?,
        None => PipelineConfig::default(),
    };
    if let Some(gas) = args.gas_limit {
        config.submit_gas_limit = gas;
    }
    if let Some(secs) = args.confirmation_timeout {
        config.confirmation_timeout = Duration::from_secs(secs);
    }

    let uploader = HttpUploader::with_options(
        args.upload_url.as_str(),
        args.upload_token.as_deref(),
        DEFAULT_UPLOAD_TIMEOUT,
    )
    .context("failed to configure upload client")?;
    let wallet = JsonRpcWallet::new(args.rpc_url.as_str(), args.from);

    tracing::info!(
        order = %order.address,
        from = %wallet.from_address(),
        rpc = %args.rpc_url,
        upload = %args.upload_url,
        "submitting offer"
    );

    let pipeline = OfferPipeline::new(keys, Arc::new(uploader), Arc::new(wallet), config);
    let progress = spawn_progress_reporter(&pipeline);

    let request = OfferRequest::new(order, offer_data);
    let outcome = pipeline
        .submit(&request, |req| {
            req.offer_data
                .0
                .as_object()
                .is_some_and(|fields| !fields.is_empty())
        })
        .await;
    progress.abort();

    match outcome {
        SubmitOutcome::Succeeded(receipt) => {
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        SubmitOutcome::Failed(failure) => {
            if let Some(amount) = failure.allowance_outstanding {
                eprintln!(
                    "warning: {} allowance of {amount} base units is still granted to {}",
                    request.order.token.symbol, request.order.address
                );
            }
            bail!("{} step failed: {}", failure.step, failure.reason)
        }
        SubmitOutcome::Rejected(err) => {
            bail!("offer not submitted: {err} (the offer record must be a non-empty JSON object)")
        }
    }
}

/// Log progress labels and pending transaction hashes as they change.
fn spawn_progress_reporter(pipeline: &OfferPipeline) -> tokio::task::JoinHandle<()> {
    let mut state = pipeline.subscribe();
    let mut pending = pipeline.pending_transaction().subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if let Some(message) = state.borrow_and_update().progress_message() {
                        tracing::info!("{message}");
                    }
                }
                changed = pending.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if let Some(handle) = *pending.borrow_and_update() {
                        tracing::info!(tx_hash = %handle, "waiting for confirmation");
                    }
                }
            }
        }
    })
}

fn open_payload(args: cli::OpenArgs) -> Result<()> {
    let seller = load_keypair(&args.key.key_file)?;
    let payload: EncryptedPayload = read_json(&args.payload, "encrypted payload")?;

    let plaintext = open(&payload, &seller).context("failed to open payload")?;
    let text = String::from_utf8(plaintext).context("payload is not UTF-8")?;
    println!("{text}");
    Ok(())
}
