// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process dispatch of validated requests into the internal router.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{InvalidHeaderValue, CONTENT_TYPE},
        HeaderValue, Request, StatusCode,
    },
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use super::{contract::ProxyRequest, error::TunnelError};
use crate::{config::SecretKey, internal::INTERNAL_KEY_HEADER};

/// Largest internal response body the gateway will seal.
const MAX_INTERNAL_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

/// Result of one internal call.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub status: StatusCode,
    pub payload: Value,
}

pub struct InternalDispatcher {
    router: Router,
    credential: HeaderValue,
    timeout: Duration,
}

impl InternalDispatcher {
    pub fn new(
        router: Router,
        internal_key: &SecretKey,
        timeout: Duration,
    ) -> Result<Self, InvalidHeaderValue> {
        let mut credential = HeaderValue::from_str(internal_key.expose())?;
        credential.set_sensitive(true);
        Ok(Self {
            router,
            credential,
            timeout,
        })
    }

    /// Runs `request` through the internal router and waits for it, bounded
    /// by the configured timeout.
    pub async fn dispatch(&self, request: &ProxyRequest) -> Result<Routed, TunnelError> {
        let mut builder = Request::builder()
            .method(request.method.to_http())
            .uri(request.url.as_str())
            .header(INTERNAL_KEY_HEADER, self.credential.clone());

        let body = match request.payload() {
            Some(payload) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                let bytes = serde_json::to_vec(payload).map_err(|e| {
                    TunnelError::UnexpectedFailure(format!("request body serialization: {e}"))
                })?;
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let internal_request = builder.body(body).map_err(|e| {
            TunnelError::UnexpectedFailure(format!("building internal request: {e}"))
        })?;

        // A separate task keeps a panicking handler from unwinding into the
        // gateway; the join error is sealed like any other failure.
        let mut call = tokio::spawn(self.router.clone().oneshot(internal_request));
        let response = match tokio::time::timeout(self.timeout, &mut call).await {
            Ok(Ok(Ok(response))) => response,
            Ok(Ok(Err(infallible))) => match infallible {},
            Ok(Err(joined)) => {
                let cause = if joined.is_panic() {
                    "internal handler panicked"
                } else {
                    "internal handler was cancelled"
                };
                return Err(TunnelError::UnexpectedFailure(cause.to_string()));
            }
            Err(_) => {
                call.abort();
                return Err(TunnelError::UnexpectedFailure(format!(
                    "internal dispatch exceeded {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => {
                return Err(TunnelError::RouteNotFound {
                    method: request.method.to_string(),
                    path: request.url.clone(),
                })
            }
            StatusCode::UNAUTHORIZED => return Err(TunnelError::InternalUnauthorized),
            _ => {}
        }

        let bytes = to_bytes(response.into_body(), MAX_INTERNAL_RESPONSE_BYTES)
            .await
            .map_err(|e| {
                TunnelError::UnexpectedFailure(format!("reading internal response: {e}"))
            })?;

        Ok(Routed {
            status,
            payload: payload_from_bytes(&bytes),
        })
    }
}

/// JSON bodies pass through; anything else is carried as a string.
fn payload_from_bytes(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
