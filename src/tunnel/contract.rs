// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire envelope and the logical request carried inside it.

use std::{fmt, str::FromStr};

use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use utoipa::ToSchema;

/// Fixed origin used only to normalise relative targets.
const INTERNAL_ORIGIN: &str = "http://internal.invalid/";

/// The only JSON shape that crosses the wire, in both directions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// Base64 `nonce || ciphertext || tag`.
    pub encrypted: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn to_http(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Whether a request body is forwarded for this method.
    pub fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ContractViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(ContractViolation::UnsupportedMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("decrypted payload is not a JSON object: {0}")]
    NotJson(String),

    #[error("missing url or method")]
    MissingUrlOrMethod,

    #[error("unsupported method {0:?}")]
    UnsupportedMethod(String),

    #[error("target {0:?} is not a relative url")]
    NonRelativeUrl(String),

    #[error("target {0:?} is not a valid path")]
    InvalidUrl(String),
}

impl ContractViolation {
    /// Message safe to return to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            ContractViolation::NotJson(_) => "invalid proxy request",
            ContractViolation::MissingUrlOrMethod => "missing url or method",
            ContractViolation::UnsupportedMethod(_) => "unsupported method",
            ContractViolation::NonRelativeUrl(_) => "only relative urls allowed",
            ContractViolation::InvalidUrl(_) => "invalid url",
        }
    }
}

/// A validated request for the internal namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyRequest {
    /// Normalised path (and query), always starting with a single `/`.
    pub url: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Shape as decrypted, before validation. Fields are loosely typed so that a
/// wrong type reads as "missing" rather than as a parse failure.
#[derive(Deserialize)]
struct RawProxyRequest {
    #[serde(default)]
    url: Option<Value>,
    #[serde(default)]
    method: Option<Value>,
    #[serde(default)]
    body: Option<Value>,
}

impl ProxyRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            url: url.into(),
            method,
            body,
        }
    }

    /// Parses and validates decrypted text.
    pub fn from_json(text: &str) -> Result<Self, ContractViolation> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ContractViolation::NotJson(e.to_string()))?;
        if !value.is_object() {
            return Err(ContractViolation::NotJson("expected an object".to_string()));
        }
        let raw: RawProxyRequest =
            serde_json::from_value(value).map_err(|e| ContractViolation::NotJson(e.to_string()))?;

        let non_empty = |value: Option<Value>| match value {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };
        let (Some(url), Some(method)) = (non_empty(raw.url), non_empty(raw.method)) else {
            return Err(ContractViolation::MissingUrlOrMethod);
        };

        let url = normalize_relative_url(&url)?;
        let method: HttpMethod = method.parse()?;
        let body = raw.body.filter(|_| method.carries_body());

        Ok(Self { url, method, body })
    }

    /// Body to forward, if the method carries one.
    pub fn payload(&self) -> Option<&Value> {
        self.body.as_ref().filter(|_| self.method.carries_body())
    }
}

/// Accepts only origin-relative targets and returns their normalised
/// `path[?query]`. Anything that would resolve to another host is refused.
pub fn normalize_relative_url(target: &str) -> Result<String, ContractViolation> {
    if !target.starts_with('/') {
        return Err(ContractViolation::NonRelativeUrl(target.to_string()));
    }

    let invalid = || ContractViolation::InvalidUrl(target.to_string());
    let base = Url::parse(INTERNAL_ORIGIN).map_err(|_| invalid())?;
    let resolved = base.join(target).map_err(|_| invalid())?;

    if resolved.origin() != base.origin() {
        return Err(ContractViolation::NonRelativeUrl(target.to_string()));
    }

    let mut normalized = resolved.path().to_string();
    if let Some(query) = resolved.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn valid_request_parses() {
        let request =
            ProxyRequest::from_json(r#"{"url":"/internal/api/people","method":"GET"}"#).unwrap();
        assert_eq!(request.url, "/internal/api/people");
        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.body.is_none());
    }

    #[test]
    fn body_is_kept_only_for_payload_methods() {
        let post = ProxyRequest::from_json(
            r#"{"url":"/internal/api/echo","method":"POST","body":{"hello":"world"}}"#,
        )
        .unwrap();
        assert_eq!(post.payload(), Some(&json!({"hello": "world"})));

        let get = ProxyRequest::from_json(
            r#"{"url":"/internal/api/people","method":"GET","body":{"ignored":true}}"#,
        )
        .unwrap();
        assert_eq!(get.payload(), None);
    }

    #[test]
    fn missing_or_blank_fields_are_rejected() {
        for text in [
            r#"{"method":"GET"}"#,
            r#"{"url":"/x"}"#,
            r#"{"url":"","method":"GET"}"#,
            r#"{"url":"/x","method":"  "}"#,
            r#"{"url":42,"method":"GET"}"#,
            r#"{}"#,
        ] {
            assert_eq!(
                ProxyRequest::from_json(text),
                Err(ContractViolation::MissingUrlOrMethod),
                "{text}"
            );
        }
    }

    #[test]
    fn absolute_and_host_switching_urls_are_rejected() {
        for target in [
            "http://evil.example/x",
            "evil.example/x",
            "//evil.example/x",
            "/\\evil.example/x",
        ] {
            let text = json!({"url": target, "method": "GET"}).to_string();
            assert!(
                matches!(
                    ProxyRequest::from_json(&text),
                    Err(ContractViolation::NonRelativeUrl(_))
                ),
                "{target} was accepted"
            );
        }
    }

    #[test]
    fn relative_urls_are_normalised() {
        assert_eq!(
            normalize_relative_url("/internal/api/../api/people?limit=2").unwrap(),
            "/internal/api/people?limit=2"
        );
        assert_eq!(normalize_relative_url("/nope").unwrap(), "/nope");
    }

    #[test]
    fn unknown_methods_and_non_objects_are_rejected() {
        assert_eq!(
            ProxyRequest::from_json(r#"{"url":"/x","method":"PATCH"}"#),
            Err(ContractViolation::UnsupportedMethod("PATCH".to_string()))
        );
        assert!(matches!(
            ProxyRequest::from_json("not json"),
            Err(ContractViolation::NotJson(_))
        ));
        assert!(matches!(
            ProxyRequest::from_json("[1,2,3]"),
            Err(ContractViolation::NotJson(_))
        ));
    }

    #[test]
    fn serializes_to_contract_shape() {
        let request = ProxyRequest::new(
            HttpMethod::Put,
            "/internal/api/echo",
            Some(json!({"n": 1})),
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"url": "/internal/api/echo", "method": "PUT", "body": {"n": 1}})
        );
    }
}
