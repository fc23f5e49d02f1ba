// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderValue, Method, Request, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::health::{HealthChecks, HealthResponse, ReadyResponse},
    state::AppState,
    tunnel::{EncryptedEnvelope, SIGNATURE_HEADER},
};

pub mod health;
pub mod proxy;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Public router: the tunnel entry point, health probes, API docs and the
/// gated internal namespace.
pub fn router(state: AppState, allowed_origin: HeaderValue) -> Router {
    let internal = state.internal.clone();

    let public_routes = Router::new()
        .route("/api/proxy", post(proxy::proxy))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(internal)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(allowed_origin))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(make_request_span)
                        .on_response(log_response),
                )
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Browser callers from the configured origin may post envelopes and read
/// the reply signature.
fn cors_layer(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::exact(allowed_origin))
        .allow_methods([Method::POST])
        .allow_headers([CONTENT_TYPE, SIGNATURE_HEADER])
        .expose_headers([SIGNATURE_HEADER])
}

fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http",
        method = %request.method(),
        path = %request.uri().path(),
        request_id,
    )
}

/// Level follows the status class: 5xx error, 4xx warn, otherwise info.
fn log_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status().as_u16();
    let latency_ms = latency.as_millis() as u64;
    if response.status().is_server_error() {
        tracing::error!(status, latency_ms, "Request finished");
    } else if response.status().is_client_error() {
        tracing::warn!(status, latency_ms, "Request finished");
    } else {
        tracing::info!(status, latency_ms, "Request finished");
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        proxy::proxy,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            EncryptedEnvelope,
            HealthResponse,
            ReadyResponse,
            HealthChecks
        )
    ),
    tags(
        (name = "Tunnel", description = "Sealed request tunnel"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
