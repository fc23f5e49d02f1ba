// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tunnel error taxonomy.
//!
//! `Display` carries the diagnostic detail that goes to the server log.
//! Callers only ever see [`TunnelError::public_message`] inside a sealed
//! envelope together with [`TunnelError::status_code`].

use axum::http::StatusCode;

use super::contract::ContractViolation;
use crate::crypto::SignatureError;

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    /// Body is not `{ "encrypted": string }`.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("signature rejected: {0}")]
    SignatureInvalid(#[from] SignatureError),

    /// Covers both an unreadable ciphertext and an empty plaintext.
    #[error("decryption failed: {0}")]
    DecryptFailed(String),

    #[error("contract violation: {0}")]
    ContractInvalid(#[from] ContractViolation),

    #[error("internal router has no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The internal gate refused the dispatcher's credential.
    #[error("internal gate rejected the dispatch credential")]
    InternalUnauthorized,

    #[error("unexpected failure: {0}")]
    UnexpectedFailure(String),
}

impl TunnelError {
    pub fn error_code(&self) -> &'static str {
        match self {
            TunnelError::MalformedEnvelope(_) => "malformed_envelope",
            TunnelError::SignatureInvalid(_) => "signature_invalid",
            TunnelError::DecryptFailed(_) => "decrypt_failed",
            TunnelError::ContractInvalid(_) => "contract_invalid",
            TunnelError::RouteNotFound { .. } => "route_not_found",
            TunnelError::InternalUnauthorized => "internal_unauthorized",
            TunnelError::UnexpectedFailure(_) => "unexpected_failure",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TunnelError::MalformedEnvelope(_)
            | TunnelError::DecryptFailed(_)
            | TunnelError::ContractInvalid(_) => StatusCode::BAD_REQUEST,
            TunnelError::SignatureInvalid(_) | TunnelError::InternalUnauthorized => {
                StatusCode::UNAUTHORIZED
            }
            TunnelError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            TunnelError::UnexpectedFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message placed in the sealed `{ "error": ... }` body.
    pub fn public_message(&self) -> &'static str {
        match self {
            TunnelError::MalformedEnvelope(_) => "invalid payload",
            TunnelError::SignatureInvalid(_) | TunnelError::InternalUnauthorized => "unauthorized",
            TunnelError::DecryptFailed(_) => "decrypt failed",
            TunnelError::ContractInvalid(violation) => violation.public_message(),
            TunnelError::RouteNotFound { .. } => "Internal route not found",
            TunnelError::UnexpectedFailure(_) => "Unexpected failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_failure_class() {
        let cases = [
            (TunnelError::MalformedEnvelope("x".into()), StatusCode::BAD_REQUEST),
            (TunnelError::SignatureInvalid(SignatureError::Missing), StatusCode::UNAUTHORIZED),
            (TunnelError::DecryptFailed("x".into()), StatusCode::BAD_REQUEST),
            (
                TunnelError::ContractInvalid(ContractViolation::MissingUrlOrMethod),
                StatusCode::BAD_REQUEST,
            ),
            (
                TunnelError::RouteNotFound {
                    method: "GET".into(),
                    path: "/nope".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (TunnelError::InternalUnauthorized, StatusCode::UNAUTHORIZED),
            (
                TunnelError::UnexpectedFailure("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{}", error.error_code());
        }
    }

    #[test]
    fn public_messages_do_not_leak_detail() {
        let error = TunnelError::DecryptFailed("ciphertext failed authentication".into());
        assert_eq!(error.public_message(), "decrypt failed");
        assert!(error.to_string().contains("ciphertext failed authentication"));

        let error = TunnelError::ContractInvalid(ContractViolation::NonRelativeUrl(
            "http://evil.example/x".into(),
        ));
        assert_eq!(error.public_message(), "only relative urls allowed");
        assert!(!error.public_message().contains("evil"));
    }
}
