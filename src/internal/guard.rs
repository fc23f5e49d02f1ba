// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Internal route guard middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use super::INTERNAL_KEY_HEADER;
use crate::{config::SecretKey, error::ApiError};

/// Admission check for the internal namespace.
///
/// Stores a digest of the shared key. Presented credentials are digested
/// the same way and compared whole, so the comparison time does not depend
/// on how much of the raw key a caller guessed.
#[derive(Clone)]
pub struct InternalGate {
    expected: [u8; 32],
}

impl InternalGate {
    pub fn new(internal_key: &SecretKey) -> Self {
        Self {
            expected: Sha256::digest(internal_key.expose().as_bytes()).into(),
        }
    }

    pub fn admits(&self, presented: Option<&[u8]>) -> bool {
        match presented {
            Some(credential) => {
                let digest: [u8; 32] = Sha256::digest(credential).into();
                digest == self.expected
            }
            None => false,
        }
    }
}

pub async fn require_internal_key(
    State(gate): State<InternalGate>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(INTERNAL_KEY_HEADER)
        .map(|value| value.as_bytes());

    if !gate.admits(presented) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            credential_present = presented.is_some(),
            "Internal gate rejected request"
        );
        return ApiError::unauthorized("Unauthorized").into_response();
    }

    next.run(request).await
}
