// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Internal Route Namespace
//!
//! Routes under `/internal` are only meant to be reached through the tunnel
//! gateway. Every request into this namespace must present
//! `X-Internal-Key`, checked by [`guard::require_internal_key`] before any
//! handler runs. The gate is independent of the tunnel signature: a request
//! that somehow skipped the gateway still cannot reach a handler without it.
//!
//! ## Routes
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET` | `/internal/api/people` | [`handlers::list_people`] |
//! | `POST` | `/internal/api/echo` | [`handlers::echo`] |
//! | any | anything else under `/internal` | [`handlers::not_found`] |

pub mod guard;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::config::SecretKey;

pub use guard::{require_internal_key, InternalGate};

/// Header carrying the internal-gate credential.
pub const INTERNAL_KEY_HEADER: &str = "x-internal-key";

/// Builds the guarded internal router.
///
/// The gate wraps the whole `/internal` namespace, fallback included, so an
/// unknown internal path answers 401 without the key and 404 with it.
pub fn router(internal_key: &SecretKey) -> Router {
    let namespace = Router::new()
        .route("/api/people", get(handlers::list_people))
        .route("/api/echo", post(handlers::echo))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            InternalGate::new(internal_key),
            require_internal_key,
        ));

    Router::new().nest("/internal", namespace)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn key() -> SecretKey {
        SecretKey::new("gate-secret")
    }

    #[tokio::test]
    async fn people_requires_the_internal_key() {
        let response = router(&key())
            .oneshot(
                Request::get("/internal/api/people")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router(&key())
            .oneshot(
                Request::get("/internal/api/people")
                    .header(INTERNAL_KEY_HEADER, "gate-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let people: Value = serde_json::from_slice(&body).unwrap();
        assert!(!people.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_internal_paths_are_gated_too() {
        for (method, path) in [
            ("GET", "/internal/secret-admin"),
            ("GET", "/internal/api/echo"),
            ("DELETE", "/internal/api/people"),
            ("POST", "/internal"),
        ] {
            let response = router(&key())
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(path)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "{method} {path} without the key"
            );
        }
    }

    #[tokio::test]
    async fn keyed_unknown_path_is_not_found() {
        let response = router(&key())
            .oneshot(
                Request::get("/internal/secret-admin")
                    .header(INTERNAL_KEY_HEADER, "gate-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn echo_returns_what_it_received() {
        let response = router(&key())
            .oneshot(
                Request::post("/internal/api/echo")
                    .header(INTERNAL_KEY_HEADER, "gate-secret")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"ping":true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let echoed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(echoed, json!({"received": {"ping": true}}));
    }
}
