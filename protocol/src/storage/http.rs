//! HTTP pinning endpoint client.
//!
//! `POST <endpoint>` with the payload as a JSON body. Two response shapes
//! are understood: `{ "cid": "..." }` from the web app's own upload route,
//! and `{ "IpfsHash": "..." }` from hosted pinning services.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ContentId, ContentUploader, UploadError};
use crate::config::DEFAULT_UPLOAD_TIMEOUT;
use crate::crypto::EncryptedPayload;

/// Longest slice of an error body worth carrying around.
const MAX_ERROR_BODY_CHARS: usize = 256;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(alias = "IpfsHash", alias = "Hash")]
    cid: String,
}

/// [`ContentUploader`] backed by an HTTP pinning endpoint.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    endpoint: String,
}

impl HttpUploader {
    /// Client for `endpoint` with the default request timeout and no auth.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, UploadError> {
        Self::with_options(endpoint, None, DEFAULT_UPLOAD_TIMEOUT)
    }

    /// Client for `endpoint`, optionally sending `Authorization: Bearer <token>`.
    pub fn with_options(
        endpoint: impl Into<String>,
        bearer_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| UploadError::Network("invalid bearer token".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ContentUploader for HttpUploader {
    async fn upload(&self, payload: &EncryptedPayload) -> Result<ContentId, UploadError> {
        debug!(
            endpoint = %self.endpoint,
            bytes = payload.message.len() / 2,
            "uploading encrypted offer"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;

        ContentId::new(parsed.cid)
            .ok_or_else(|| UploadError::MalformedResponse("empty content identifier".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_accepts_both_shapes() {
        let app: UploadResponse = serde_json::from_str(r#"{ "cid": "Qm1" }"#).unwrap();
        let pinata: UploadResponse =
            serde_json::from_str(r#"{ "IpfsHash": "Qm2", "PinSize": 10 }"#).unwrap();
        assert_eq!(app.cid, "Qm1");
        assert_eq!(pinata.cid, "Qm2");
    }

    #[test]
    fn response_without_identifier_is_rejected() {
        assert!(serde_json::from_str::<UploadResponse>(r#"{ "ok": true }"#).is_err());
    }
}
