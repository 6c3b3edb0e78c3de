// Copyright (c) 2026 RWTP Contributors. MIT License.
// See LICENSE for details.

//! # RWTP Offer Core
//!
//! Buyer-side submission of offers against on-chain escrow orders, with the
//! buyer's personal details (shipping address, contact) kept off chain and
//! readable only by the seller.
//!
//! An offer goes through four steps, in order:
//!
//! 1. The offer record is sealed to the seller's X25519 key (NaCl box).
//! 2. The sealed payload is pinned to content-addressed storage.
//! 3. The escrow contract is approved to pull exactly the deposit it needs.
//! 4. The escrow contract records the offer, pointing at the pinned payload.
//!
//! ## Modules
//!
//! - **config**: Constants and pipeline settings.
//! - **crypto**: Session key material and payload encryption.
//! - **storage**: Content-addressed upload of encrypted payloads.
//! - **offer**: Orders, offer records, and allowance arithmetic.
//! - **chain**: Transaction sending, approval and submission steps.
//! - **pipeline**: The state machine tying the steps together.
//!
//! Wallets and storage services are injected behind traits
//! ([`chain::TransactionSender`], [`storage::ContentUploader`]) so the whole
//! pipeline runs in tests without a chain or a network.

pub mod chain;
pub mod config;
pub mod crypto;
pub mod offer;
pub mod pipeline;
pub mod storage;

pub use pipeline::{
    OfferError, OfferPipeline, OfferReceipt, PipelineFailure, PipelineState, PipelineStep,
    SubmitOutcome,
};
