// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client side of the tunnel.
//!
//! Seals a [`ProxyRequest`] the way the gateway expects it, posts it to
//! `/api/proxy`, checks the reply signature and opens the reply.
//!
//! ```rust,ignore
//! let client = TunnelClient::new("http://localhost:3001/api/proxy", &keys.encryption, &keys.signing)?;
//! let people = client.get("/internal/api/people").await?;
//! let echoed = client.post("/internal/api/echo", json!({ "hello": "world" })).await?;
//! ```

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use super::{
    contract::{EncryptedEnvelope, HttpMethod, ProxyRequest},
    gateway::SIGNATURE_HEADER,
};
use crate::{
    config::SecretKey,
    crypto::{Authenticator, CodecError, EnvelopeCodec, SignatureError},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid gateway endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("envelope codec: {0}")]
    Codec(#[from] CodecError),

    #[error("reply signature: {0}")]
    Signature(#[from] SignatureError),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("gateway answered {status} without a sealed envelope")]
    UnsealedReply { status: StatusCode },

    #[error("transport: {0}")]
    Http(#[from] reqwest::Error),
}

/// A request ready for the wire.
#[derive(Debug, Clone)]
pub struct SealedRequest {
    pub envelope: EncryptedEnvelope,
    pub signature: String,
}

/// Opened gateway reply.
#[derive(Debug, Clone, PartialEq)]
pub struct TunnelResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub struct TunnelClient {
    endpoint: Url,
    codec: EnvelopeCodec,
    authenticator: Authenticator,
    signatures: bool,
    http: Client,
}

impl TunnelClient {
    pub fn new(
        endpoint: &str,
        encryption_key: &SecretKey,
        signing_key: &SecretKey,
    ) -> Result<Self, ClientError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| ClientError::InvalidEndpoint(e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ClientError::InvalidEndpoint(format!(
                "unsupported scheme {}",
                endpoint.scheme()
            )));
        }
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            endpoint,
            codec: EnvelopeCodec::new(encryption_key)?,
            authenticator: Authenticator::new(signing_key)?,
            signatures: true,
            http,
        })
    }

    /// Talk to a gateway running without signatures.
    pub fn without_signatures(mut self) -> Self {
        self.signatures = false;
        self
    }

    pub fn seal_text(&self, plaintext: &str) -> Result<String, CodecError> {
        self.codec.encrypt(plaintext)
    }

    pub fn open_text(&self, ciphertext: &str) -> Result<String, CodecError> {
        self.codec.decrypt(ciphertext)
    }

    pub fn sign(&self, ciphertext: &str) -> String {
        self.authenticator.sign(ciphertext)
    }

    pub fn seal(&self, request: &ProxyRequest) -> Result<SealedRequest, ClientError> {
        let text = serde_json::to_string(request)?;
        let encrypted = self.seal_text(&text)?;
        let signature = self.sign(&encrypted);
        Ok(SealedRequest {
            envelope: EncryptedEnvelope { encrypted },
            signature,
        })
    }

    /// Verifies (when signatures are on) and opens a gateway reply.
    pub fn open(
        &self,
        envelope: &EncryptedEnvelope,
        signature: Option<&str>,
    ) -> Result<Value, ClientError> {
        if self.signatures {
            self.authenticator.check(&envelope.encrypted, signature)?;
        }
        let text = self.open_text(&envelope.encrypted)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn send(&self, request: &ProxyRequest) -> Result<TunnelResponse, ClientError> {
        let sealed = self.seal(request)?;

        let mut outbound = self.http.post(self.endpoint.clone()).json(&sealed.envelope);
        if self.signatures {
            outbound = outbound.header(SIGNATURE_HEADER.as_str(), sealed.signature.as_str());
        }
        let response = outbound.send().await?;

        let status = response.status();
        let signature = response
            .headers()
            .get(SIGNATURE_HEADER.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let envelope: EncryptedEnvelope = response
            .json()
            .await
            .map_err(|_| ClientError::UnsealedReply { status })?;

        let body = self.open(&envelope, signature.as_deref())?;
        Ok(TunnelResponse { status, body })
    }

    pub async fn get(&self, url: &str) -> Result<TunnelResponse, ClientError> {
        self.send(&ProxyRequest::new(HttpMethod::Get, url, None)).await
    }

    pub async fn post(&self, url: &str, body: Value) -> Result<TunnelResponse, ClientError> {
        self.send(&ProxyRequest::new(HttpMethod::Post, url, Some(body)))
            .await
    }

    pub async fn put(&self, url: &str, body: Value) -> Result<TunnelResponse, ClientError> {
        self.send(&ProxyRequest::new(HttpMethod::Put, url, Some(body)))
            .await
    }

    pub async fn delete(&self, url: &str) -> Result<TunnelResponse, ClientError> {
        self.send(&ProxyRequest::new(HttpMethod::Delete, url, None))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{test_client, test_keys};

    #[test]
    fn sealed_request_opens_to_the_contract_shape() {
        let client = test_client();
        let request = ProxyRequest::new(HttpMethod::Post, "/internal/api/echo", Some(json!([1])));
        let sealed = client.seal(&request).unwrap();

        assert!(client
            .authenticator
            .verify(&sealed.envelope.encrypted, Some(&sealed.signature)));
        let opened: Value = serde_json::from_str(
            &client.open_text(&sealed.envelope.encrypted).unwrap(),
        )
        .unwrap();
        assert_eq!(
            opened,
            json!({"url": "/internal/api/echo", "method": "POST", "body": [1]})
        );
    }

    #[test]
    fn open_requires_a_matching_signature() {
        let client = test_client();
        let encrypted = client.seal_text(r#"{"ok":true}"#).unwrap();
        let envelope = EncryptedEnvelope {
            encrypted: encrypted.clone(),
        };

        assert!(matches!(
            client.open(&envelope, None),
            Err(ClientError::Signature(SignatureError::Missing))
        ));
        assert!(matches!(
            client.open(&envelope, Some(&client.sign("something else"))),
            Err(ClientError::Signature(SignatureError::Mismatch))
        ));
        assert_eq!(
            client.open(&envelope, Some(&client.sign(&encrypted))).unwrap(),
            json!({"ok": true})
        );
    }

    #[test]
    fn unsigned_client_skips_verification() {
        let client = test_client().without_signatures();
        let envelope = EncryptedEnvelope {
            encrypted: client.seal_text("[]").unwrap(),
        };
        assert_eq!(client.open(&envelope, None).unwrap(), json!([]));
    }

    #[test]
    fn endpoint_must_be_http() {
        let keys = test_keys();
        for endpoint in ["not a url", "ftp://gateway/api/proxy"] {
            assert!(matches!(
                TunnelClient::new(endpoint, &keys.encryption, &keys.signing),
                Err(ClientError::InvalidEndpoint(_))
            ));
        }
    }
}
