// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tunnel gateway: the verify → decrypt → validate → dispatch → seal
//! pipeline behind `POST /api/proxy`.
//!
//! Every outcome, success or failure, leaves as the same wire shape: a
//! sealed `{ "encrypted": ... }` body, signed in the signature-enabled
//! variant. Failures seal `{ "error": <short message> }`, so only the
//! status code and the plaintext differ between classes.

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    contract::{EncryptedEnvelope, ProxyRequest},
    dispatch::{InternalDispatcher, Routed},
    error::TunnelError,
};
use crate::{
    config::GatewayConfig,
    crypto::{Authenticator, CodecError, EnvelopeCodec, SignatureError},
    error::ErrorBody,
};

/// Header carrying the envelope signature, inbound and outbound.
pub const SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-signature");

const SELF_TEST_CANARY: &str = r#"{"canary":true}"#;

/// Progress of one exchange. Failures are reported with the last state
/// reached before the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TunnelState {
    Received,
    SignatureChecked,
    Decrypted,
    ContractValidated,
    Dispatched,
    ResponseEncrypted,
    Done,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayBuildError {
    #[error("envelope codec: {0}")]
    Codec(#[from] CodecError),

    #[error("signature authenticator: {0}")]
    Signature(#[from] SignatureError),

    #[error("internal key is not a valid header value")]
    InvalidInternalKey,
}

#[derive(Debug)]
pub enum ReplyBody {
    Sealed(EncryptedEnvelope),
    /// Only used when the reply itself could not be sealed.
    Plain(ErrorBody),
}

/// Outcome of one exchange, ready to be written to the wire.
#[derive(Debug)]
pub struct TunnelReply {
    pub status: StatusCode,
    pub body: ReplyBody,
    pub signature: Option<String>,
    /// `Done` on success, otherwise the state reached before failing.
    pub reached: TunnelState,
    pub error: Option<TunnelError>,
}

impl TunnelReply {
    pub fn envelope(&self) -> Option<&EncryptedEnvelope> {
        match &self.body {
            ReplyBody::Sealed(envelope) => Some(envelope),
            ReplyBody::Plain(_) => None,
        }
    }
}

impl IntoResponse for TunnelReply {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            ReplyBody::Sealed(envelope) => (self.status, Json(envelope)).into_response(),
            ReplyBody::Plain(body) => (self.status, Json(body)).into_response(),
        };
        if let Some(value) = self
            .signature
            .and_then(|signature| HeaderValue::from_str(&signature).ok())
        {
            response.headers_mut().insert(SIGNATURE_HEADER, value);
        }
        response
    }
}

struct Failure {
    stage: TunnelState,
    error: TunnelError,
}

impl Failure {
    fn at(stage: TunnelState, error: impl Into<TunnelError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

pub struct Gateway {
    codec: EnvelopeCodec,
    authenticator: Authenticator,
    dispatcher: InternalDispatcher,
    require_signature: bool,
}

impl Gateway {
    /// Builds the gateway in front of `internal`, the router that serves the
    /// internal namespace.
    pub fn new(config: &GatewayConfig, internal: Router) -> Result<Self, GatewayBuildError> {
        let keys = &config.keys;
        Ok(Self {
            codec: EnvelopeCodec::new(&keys.encryption)?,
            authenticator: Authenticator::new(&keys.signing)?,
            dispatcher: InternalDispatcher::new(internal, &keys.internal, config.dispatch_timeout)
                .map_err(|_| GatewayBuildError::InvalidInternalKey)?,
            require_signature: config.require_signature,
        })
    }

    pub fn requires_signature(&self) -> bool {
        self.require_signature
    }

    /// Runs one exchange for an inbound body and its headers.
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> TunnelReply {
        let exchange_id = Uuid::new_v4();
        async move {
            match self.process(headers, body).await {
                Ok(routed) => {
                    tracing::info!(status = routed.status.as_u16(), "Tunnel exchange completed");
                    self.finish(routed.status, &routed.payload, TunnelState::Dispatched, None)
                }
                Err(failure) => self.fail(failure),
            }
        }
        .instrument(tracing::info_span!("tunnel", %exchange_id))
        .await
    }

    /// Seals an error raised before the body could be read at all.
    pub fn reject(&self, error: TunnelError) -> TunnelReply {
        self.fail(Failure::at(TunnelState::Received, error))
    }

    /// Seals and opens a canary through both primitives.
    pub fn self_test(&self) -> bool {
        let Ok(sealed) = self.codec.encrypt(SELF_TEST_CANARY) else {
            return false;
        };
        let signature = self.authenticator.sign(&sealed);
        self.authenticator.verify(&sealed, Some(&signature))
            && self.codec.decrypt(&sealed).is_ok_and(|text| text == SELF_TEST_CANARY)
    }

    async fn process(&self, headers: &HeaderMap, body: &[u8]) -> Result<Routed, Failure> {
        let mut state = TunnelState::Received;

        let envelope: EncryptedEnvelope = serde_json::from_slice(body)
            .map_err(|e| Failure::at(state, TunnelError::MalformedEnvelope(e.to_string())))?;

        // Nothing attacker-controlled reaches the decryptor unless it is signed.
        if self.require_signature {
            let signature = match headers.get(&SIGNATURE_HEADER) {
                Some(value) => Some(
                    value
                        .to_str()
                        .map_err(|_| Failure::at(state, SignatureError::Malformed))?,
                ),
                None => None,
            };
            self.authenticator
                .check(&envelope.encrypted, signature)
                .map_err(|e| Failure::at(state, e))?;
        }
        state = TunnelState::SignatureChecked;

        let plaintext = self
            .codec
            .decrypt(&envelope.encrypted)
            .map_err(|e| Failure::at(state, TunnelError::DecryptFailed(e.to_string())))?;
        if plaintext.is_empty() {
            return Err(Failure::at(
                state,
                TunnelError::DecryptFailed("envelope opened to an empty payload".to_string()),
            ));
        }
        state = TunnelState::Decrypted;

        let request = ProxyRequest::from_json(&plaintext).map_err(|e| Failure::at(state, e))?;
        state = TunnelState::ContractValidated;

        tracing::debug!(
            method = %request.method,
            path = %request.url,
            "Dispatching tunnel request"
        );
        self.dispatcher
            .dispatch(&request)
            .await
            .map_err(|e| Failure::at(state, e))
    }

    fn fail(&self, failure: Failure) -> TunnelReply {
        let Failure { stage, error } = failure;
        if error.status_code().is_server_error() {
            tracing::error!(
                stage = ?stage,
                error_code = error.error_code(),
                cause = %error,
                "Tunnel exchange failed"
            );
        } else {
            tracing::warn!(
                stage = ?stage,
                error_code = error.error_code(),
                cause = %error,
                "Tunnel exchange rejected"
            );
        }
        let payload = error_payload(&error);
        self.finish(error.status_code(), &payload, stage, Some(error))
    }

    fn finish(
        &self,
        status: StatusCode,
        payload: &Value,
        reached: TunnelState,
        error: Option<TunnelError>,
    ) -> TunnelReply {
        match self.seal(payload) {
            Ok((envelope, signature)) => {
                let reached = if error.is_none() {
                    tracing::debug!(stage = ?TunnelState::ResponseEncrypted, "Reply sealed");
                    TunnelState::Done
                } else {
                    reached
                };
                TunnelReply {
                    status,
                    body: ReplyBody::Sealed(envelope),
                    signature,
                    reached,
                    error,
                }
            }
            Err(cause) => {
                tracing::error!(stage = ?reached, cause = %cause, "Failed to seal tunnel reply");
                let unexpected = TunnelError::UnexpectedFailure(cause.to_string());
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                match self.seal(&error_payload(&unexpected)) {
                    Ok((envelope, signature)) => TunnelReply {
                        status,
                        body: ReplyBody::Sealed(envelope),
                        signature,
                        reached,
                        error: Some(unexpected),
                    },
                    Err(_) => TunnelReply {
                        status,
                        body: ReplyBody::Plain(ErrorBody {
                            error: unexpected.public_message().to_string(),
                        }),
                        signature: None,
                        reached,
                        error: Some(unexpected),
                    },
                }
            }
        }
    }

    /// Serialises, encrypts and (in the signed variant) signs a payload.
    fn seal(&self, payload: &Value) -> Result<(EncryptedEnvelope, Option<String>), CodecError> {
        let text = payload.to_string();
        let encrypted = self.codec.encrypt(&text)?;
        let signature = self
            .require_signature
            .then(|| self.authenticator.sign(&encrypted));
        Ok((EncryptedEnvelope { encrypted }, signature))
    }
}

fn error_payload(error: &TunnelError) -> Value {
    json!({ "error": error.public_message() })
}
