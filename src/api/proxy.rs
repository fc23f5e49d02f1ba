// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::HeaderMap,
};

use crate::{
    state::AppState,
    tunnel::{EncryptedEnvelope, TunnelError, TunnelReply},
};

/// Tunnel entry point.
///
/// Body extraction failures (for example an oversized body) are sealed like
/// every other tunnel error instead of surfacing axum's plain rejection.
#[utoipa::path(
    post,
    path = "/api/proxy",
    tag = "Tunnel",
    request_body = EncryptedEnvelope,
    params(
        ("X-Signature" = Option<String>, Header, description = "Base64 HMAC-SHA256 of `encrypted`")
    ),
    responses(
        (status = 200, description = "Sealed internal response", body = EncryptedEnvelope),
        (status = 400, description = "Sealed error: invalid payload, decrypt failure or contract violation", body = EncryptedEnvelope),
        (status = 401, description = "Sealed error: signature or credential failure", body = EncryptedEnvelope),
        (status = 404, description = "Sealed error: internal route not found", body = EncryptedEnvelope),
        (status = 500, description = "Sealed error: unexpected failure", body = EncryptedEnvelope)
    )
)]
pub async fn proxy(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> TunnelReply {
    match body {
        Ok(body) => state.gateway.handle(&headers, &body).await,
        Err(rejection) => state
            .gateway
            .reject(TunnelError::MalformedEnvelope(rejection.body_text())),
    }
}
