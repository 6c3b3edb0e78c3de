//! # Cryptographic Primitives
//!
//! The buyer's X25519 keypair and the NaCl `box` encryption that turns an
//! offer record into something only the seller can read.
//!
//! Nothing here is novel: `x25519-dalek` holds the keys, `crypto_box`
//! performs the XSalsa20-Poly1305 box. The job of this module is to pin
//! the byte formats the sellers' tooling expects and to make the failure
//! cases explicit.

pub mod encryption;
pub mod keys;

pub use encryption::{
    encrypt, encrypt_json, open, EncryptedPayload, EncryptionError, SellerPublicKey,
};
pub use keys::{EncryptionKeypair, KeyError, KeyMaterial};
