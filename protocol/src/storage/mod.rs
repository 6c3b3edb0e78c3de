//! # Content-Addressed Storage
//!
//! Publishing encrypted offers where the escrow contract can point at them.
//!
//! The pipeline only needs one capability from storage: take an
//! [`EncryptedPayload`], publish it, hand back the identifier. That
//! capability is the [`ContentUploader`] trait; [`http::HttpUploader`] is
//! the implementation that talks to a pinning endpoint.
//!
//! Uploads are not idempotent from the caller's point of view. The nonce
//! inside every payload is fresh, so the same offer data uploaded twice is
//! two different documents with two different identifiers.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::EncryptedPayload;

pub use http::HttpUploader;

/// Errors that can occur while publishing a payload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("upload request failed: {0}")]
    Network(String),

    /// The storage service answered with a non-2xx status.
    #[error("storage service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The response did not contain a usable content identifier.
    #[error("malformed storage response: {0}")]
    MalformedResponse(String),
}

/// Identifier returned by content-addressed storage (an IPFS CID, for instance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an identifier. Empty or whitespace-only identifiers are rejected.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `scheme://<id>`, the form the escrow contract stores.
    pub fn to_uri(&self, scheme: &str) -> String {
        format!("{}://{}", scheme, self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Publishes an opaque payload and returns its content identifier.
#[async_trait]
pub trait ContentUploader: Send + Sync {
    async fn upload(&self, payload: &EncryptedPayload) -> Result<ContentId, UploadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_uses_scheme_prefix() {
        let cid = ContentId::new("bafybeigdyrzt5").unwrap();
        assert_eq!(cid.to_uri("ipfs"), "ipfs://bafybeigdyrzt5");
    }

    #[test]
    fn blank_ids_are_rejected() {
        assert!(ContentId::new("").is_none());
        assert!(ContentId::new("   ").is_none());
    }

    #[test]
    fn ids_are_trimmed() {
        assert_eq!(ContentId::new(" Qm123 \n").unwrap().as_str(), "Qm123");
    }
}
