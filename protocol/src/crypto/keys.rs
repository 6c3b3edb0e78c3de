//! # Buyer Encryption Keys
//!
//! X25519 keypair generation, loading, and session custody for the buyer.
//!
//! The buyer's encryption keypair is separate from the wallet key that
//! signs transactions. It exists so the seller can authenticate where an
//! encrypted offer came from (the sender's public key travels inside the
//! payload) and so the buyer can later read the seller's replies.
//!
//! ## Lifecycle
//!
//! A keypair is created or loaded once per session and placed in a
//! [`KeyMaterial`] holder. The holder is what the pipeline reads from; it
//! can be emptied at session end, after which every encryption attempt
//! fails with an unavailable-key error rather than silently generating a
//! throwaway identity.
//!
//! Key bytes are never logged. The `Debug` impl prints the public half only.

use parking_lot::RwLock;
use rand::rngs::OsRng;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::config::KEY_LENGTH;

/// Errors that can occur while decoding or persisting key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key: expected {KEY_LENGTH} hex-encoded bytes")]
    InvalidSecretKey,

    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),
}

/// An X25519 keypair used for NaCl `box` encryption.
///
/// Deliberately not `Serialize`. Exporting the secret is an explicit call
/// to [`secret_key_hex`](Self::secret_key_hex) or [`save`](Self::save).
#[derive(Clone)]
pub struct EncryptionKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EncryptionKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a keypair from its 32 secret bytes. The public key is
    /// re-derived, so a stored public key can never drift from its secret.
    pub fn from_secret_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a keypair from a hex-encoded secret key.
    pub fn from_secret_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = decode_key_hex(hex_str).ok_or(KeyError::InvalidSecretKey)?;
        Ok(Self::from_secret_bytes(bytes))
    }

    /// Load a keypair from a file containing the hex secret key.
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_secret_hex(contents.trim())
    }

    /// Write the hex secret key to `path`, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<(), KeyError> {
        std::fs::write(path, self.secret_key_hex())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> [u8; KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// Public key as lowercase hex, the format order listings publish.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.as_bytes())
    }

    /// Raw secret key bytes. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; KEY_LENGTH] {
        self.secret.to_bytes()
    }

    /// Secret key as lowercase hex.
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret.to_bytes())
    }
}

impl fmt::Debug for EncryptionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKeypair(pub={})", self.public_key_hex())
    }
}

impl PartialEq for EncryptionKeypair {
    fn eq(&self, other: &Self) -> bool {
        self.public.as_bytes() == other.public.as_bytes()
    }
}

impl Eq for EncryptionKeypair {}

/// Decode exactly [`KEY_LENGTH`] bytes of hex, tolerating a `0x` prefix.
pub(crate) fn decode_key_hex(hex_str: &str) -> Option<[u8; KEY_LENGTH]> {
    let trimmed = hex_str.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).ok()?;
    bytes.try_into().ok()
}

// ---------------------------------------------------------------------------
// Session custody
// ---------------------------------------------------------------------------

/// Holds the buyer's keypair for the duration of a session.
///
/// Readers get a clone of the keypair; the holder itself is the only place
/// the session keeps it. An empty holder means no key has been loaded (or
/// the session ended).
#[derive(Default)]
pub struct KeyMaterial {
    keypair: RwLock<Option<EncryptionKeypair>>,
}

impl KeyMaterial {
    /// A holder with no key loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A holder pre-loaded with `keypair`.
    pub fn with_keypair(keypair: EncryptionKeypair) -> Self {
        Self {
            keypair: RwLock::new(Some(keypair)),
        }
    }

    /// Load the keypair stored at `path`, or generate and store a new one if
    /// the file does not exist yet.
    pub fn load_or_generate(path: &Path) -> Result<Self, KeyError> {
        let keypair = if path.exists() {
            EncryptionKeypair::load(path)?
        } else {
            let kp = EncryptionKeypair::generate();
            kp.save(path)?;
            tracing::info!(
                path = %path.display(),
                public_key = %kp.public_key_hex(),
                "generated encryption keypair"
            );
            kp
        };
        Ok(Self::with_keypair(keypair))
    }

    /// Replace whatever keypair the session holds.
    pub fn install(&self, keypair: EncryptionKeypair) {
        *self.keypair.write() = Some(keypair);
    }

    /// Drop the session's keypair.
    pub fn clear(&self) {
        self.keypair.write().take();
    }

    /// The session's keypair, if one is loaded.
    pub fn current(&self) -> Option<EncryptionKeypair> {
        self.keypair.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.keypair.read().is_some()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keypair.read().as_ref() {
            Some(kp) => write!(f, "KeyMaterial({kp:?})"),
            None => write!(f, "KeyMaterial(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_distinct() {
        let a = EncryptionKeypair::generate();
        let b = EncryptionKeypair::generate();
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
    }

    #[test]
    fn secret_hex_roundtrip_rederives_public_key() {
        let kp = EncryptionKeypair::generate();
        let restored = EncryptionKeypair::from_secret_hex(&kp.secret_key_hex()).unwrap();
        assert_eq!(restored, kp);
        assert_eq!(restored.public_key_hex(), kp.public_key_hex());
    }

    #[test]
    fn accepts_0x_prefix() {
        let kp = EncryptionKeypair::generate();
        let prefixed = format!("0x{}", kp.secret_key_hex());
        assert_eq!(EncryptionKeypair::from_secret_hex(&prefixed).unwrap(), kp);
    }

    #[test]
    fn rejects_short_and_non_hex_secrets() {
        assert!(EncryptionKeypair::from_secret_hex("abcd").is_err());
        assert!(EncryptionKeypair::from_secret_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = EncryptionKeypair::generate();
        let rendered = format!("{kp:?}");
        assert!(!rendered.contains(&kp.secret_key_hex()));
        assert!(rendered.contains(&kp.public_key_hex()));
    }

    #[test]
    fn save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buyer.key");
        let kp = EncryptionKeypair::generate();
        kp.save(&path).unwrap();

        let loaded = EncryptionKeypair::load(&path).unwrap();
        assert_eq!(loaded, kp);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn load_or_generate_is_stable_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buyer.key");

        let first = KeyMaterial::load_or_generate(&path).unwrap();
        let second = KeyMaterial::load_or_generate(&path).unwrap();
        assert_eq!(first.current(), second.current());
    }

    #[test]
    fn cleared_material_is_unavailable() {
        let material = KeyMaterial::with_keypair(EncryptionKeypair::generate());
        assert!(material.is_loaded());
        material.clear();
        assert!(material.current().is_none());
        assert_eq!(format!("{material:?}"), "KeyMaterial(empty)");
    }
}
