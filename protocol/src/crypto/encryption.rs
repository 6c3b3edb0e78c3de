//! # Offer Encryption (NaCl box)
//!
//! Authenticated public-key encryption of buyer offer data to the seller.
//!
//! Sellers decrypt offers with a stock NaCl `box.open`, so the construction
//! here is exactly `crypto_box`: X25519 key agreement between the buyer's
//! secret key and the seller's public key, then XSalsa20-Poly1305 under a
//! 24-byte nonce. The ciphertext is bound to both parties; a seller who
//! opens it successfully also knows it was produced by the holder of the
//! public key carried in the payload.
//!
//! ## Nonce management
//!
//! Every call draws a fresh random 24-byte nonce from `OsRng`. The keypair
//! is long-lived (one per buyer session), so reusing a nonce for two
//! different plaintexts under the same key pair leaks their XOR and allows
//! forgeries. A 192-bit random nonce makes collisions a non-issue.
//!
//! ## Wire format
//!
//! ```json
//! { "publicKey": "<64 hex>", "nonce": "<48 hex>", "message": "<hex>" }
//! ```
//!
//! `publicKey` is the buyer's (sender's) public key; `message` is the
//! ciphertext including the 16-byte Poly1305 tag.

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::Aead;
use crypto_box::{PublicKey as BoxPublicKey, SalsaBox, SecretKey as BoxSecretKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{KEY_LENGTH, NONCE_LENGTH};
use crate::crypto::keys::{decode_key_hex, EncryptionKeypair};

/// Errors that can occur while encrypting or opening offer payloads.
///
/// Opening failures are not broken down further: "wrong key" and
/// "tampered ciphertext" look the same from the outside.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("buyer encryption keypair is not available")]
    KeypairUnavailable,

    #[error("malformed seller public key: expected {KEY_LENGTH} hex-encoded bytes")]
    MalformedSellerKey,

    #[error("malformed encrypted payload: {0}")]
    MalformedPayload(&'static str),

    #[error("offer data could not be serialized: {0}")]
    Serialization(String),

    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,
}

/// A counterparty's X25519 public key, validated to be exactly 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellerPublicKey([u8; KEY_LENGTH]);

impl SellerPublicKey {
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse the hex form published on the order listing.
    pub fn from_hex(hex_str: &str) -> Result<Self, EncryptionError> {
        decode_key_hex(hex_str)
            .map(Self)
            .ok_or(EncryptionError::MalformedSellerKey)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

/// Ciphertext plus everything the seller needs to open it, hex-encoded for
/// transport. Produced once per submission attempt and uploaded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// Sender (buyer) public key.
    pub public_key: String,
    /// 24-byte nonce.
    pub nonce: String,
    /// Ciphertext with Poly1305 tag appended.
    pub message: String,
}

impl EncryptedPayload {
    pub fn sender_public_key(&self) -> Result<[u8; KEY_LENGTH], EncryptionError> {
        decode_key_hex(&self.public_key)
            .ok_or(EncryptionError::MalformedPayload("sender public key"))
    }

    pub fn nonce_bytes(&self) -> Result<[u8; NONCE_LENGTH], EncryptionError> {
        let bytes =
            hex::decode(&self.nonce).map_err(|_| EncryptionError::MalformedPayload("nonce"))?;
        bytes
            .try_into()
            .map_err(|_| EncryptionError::MalformedPayload("nonce"))
    }

    pub fn message_bytes(&self) -> Result<Vec<u8>, EncryptionError> {
        hex::decode(&self.message).map_err(|_| EncryptionError::MalformedPayload("message"))
    }
}

/// Encrypt `plaintext` from `sender` to `recipient` under a fresh nonce.
///
/// # Example
///
/// ```
/// use rwtp_offer::crypto::encryption::{encrypt, open, SellerPublicKey};
/// use rwtp_offer::crypto::keys::EncryptionKeypair;
///
/// let buyer = EncryptionKeypair::generate();
/// let seller = EncryptionKeypair::generate();
/// let seller_pub = SellerPublicKey::from_bytes(seller.public_key_bytes());
///
/// let payload = encrypt(b"221B Baker Street", &seller_pub, &buyer).unwrap();
/// assert_eq!(open(&payload, &seller).unwrap(), b"221B Baker Street");
/// ```
pub fn encrypt(
    plaintext: &[u8],
    recipient: &SellerPublicKey,
    sender: &EncryptionKeypair,
) -> Result<EncryptedPayload, EncryptionError> {
    let salsa_box = SalsaBox::new(
        &BoxPublicKey::from(*recipient.as_bytes()),
        &BoxSecretKey::from(sender.secret_key_bytes()),
    );

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = GenericArray::from_slice(&nonce_bytes);

    let ciphertext = salsa_box
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::EncryptFailed)?;

    Ok(EncryptedPayload {
        public_key: sender.public_key_hex(),
        nonce: hex::encode(nonce_bytes),
        message: hex::encode(ciphertext),
    })
}

/// Serialize `value` as JSON and encrypt it. This is how offer records
/// (shipping address, contact email, ...) become payloads.
pub fn encrypt_json<T: Serialize + ?Sized>(
    value: &T,
    recipient: &SellerPublicKey,
    sender: &EncryptionKeypair,
) -> Result<EncryptedPayload, EncryptionError> {
    let plaintext =
        serde_json::to_vec(value).map_err(|e| EncryptionError::Serialization(e.to_string()))?;
    encrypt(&plaintext, recipient, sender)
}

/// Open a payload as its recipient. The sender key comes from the payload.
pub fn open(
    payload: &EncryptedPayload,
    recipient: &EncryptionKeypair,
) -> Result<Vec<u8>, EncryptionError> {
    let sender_public = payload.sender_public_key()?;
    let nonce_bytes = payload.nonce_bytes()?;
    let ciphertext = payload.message_bytes()?;

    let salsa_box = SalsaBox::new(
        &BoxPublicKey::from(sender_public),
        &BoxSecretKey::from(recipient.secret_key_bytes()),
    );

    salsa_box
        .decrypt(GenericArray::from_slice(&nonce_bytes), ciphertext.as_slice())
        .map_err(|_| EncryptionError::DecryptFailed)
}
