// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and is
//! immutable for the lifetime of the process. Components receive the pieces
//! they need through their constructors; nothing reads the environment after
//! [`AppConfig::from_env`] returns.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENCRYPTION_KEY` | Secret for sealing envelopes | Required |
//! | `SIGNING_KEY` | Secret for request/response signatures | Required |
//! | `INTERNAL_KEY` | Shared secret for the internal route gate | Required |
//! | `REQUIRE_SIGNATURE` | Demand `X-Signature` on inbound envelopes | `true` |
//! | `DISPATCH_TIMEOUT_MS` | Upper bound on one internal dispatch | `10000` |
//! | `ALLOWED_ORIGIN` | Origin allowed for cross-origin calls | `http://localhost:3000` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3001` |
//! | `TLS_CERT_PATH` | PEM certificate chain (enables HTTPS with `TLS_KEY_PATH`) | Unset |
//! | `TLS_KEY_PATH` | PEM private key | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{fmt, net::SocketAddr, path::PathBuf, time::Duration};

use axum::http::{HeaderValue, Uri};

pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";
pub const SIGNING_KEY_ENV: &str = "SIGNING_KEY";
pub const INTERNAL_KEY_ENV: &str = "INTERNAL_KEY";
pub const REQUIRE_SIGNATURE_ENV: &str = "REQUIRE_SIGNATURE";
pub const DISPATCH_TIMEOUT_ENV: &str = "DISPATCH_TIMEOUT_MS";
pub const ALLOWED_ORIGIN_ENV: &str = "ALLOWED_ORIGIN";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default tracing filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set to a non-empty value")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

/// A process-wide secret. The value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// The three key slots of the tunnel.
///
/// Each slot has exactly one responsibility. Deployments may reuse a value
/// across slots, but no code path assumes that they do.
#[derive(Debug, Clone)]
pub struct TunnelKeys {
    /// Seals and opens envelope payloads.
    pub encryption: SecretKey,
    /// Signs and verifies envelope ciphertexts.
    pub signing: SecretKey,
    /// Admits requests into the internal route namespace.
    pub internal: SecretKey,
}

impl TunnelKeys {
    pub fn new(
        encryption: impl Into<String>,
        signing: impl Into<String>,
        internal: impl Into<String>,
    ) -> Self {
        Self {
            encryption: SecretKey::new(encryption),
            signing: SecretKey::new(signing),
            internal: SecretKey::new(internal),
        }
    }

    /// Pairs of slots that hold the same secret.
    pub fn collapsed_slots(&self) -> Vec<(&'static str, &'static str)> {
        let slots = [
            ("encryption", &self.encryption),
            ("signing", &self.signing),
            ("internal", &self.internal),
        ];
        let mut collapsed = Vec::new();
        for (i, (left_name, left)) in slots.iter().enumerate() {
            for (right_name, right) in &slots[i + 1..] {
                if left == right {
                    collapsed.push((*left_name, *right_name));
                }
            }
        }
        collapsed
    }
}

/// Settings consumed by the tunnel gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub keys: TunnelKeys,
    /// Signature-enabled variant: inbound envelopes must carry `X-Signature`
    /// and every reply is signed.
    pub require_signature: bool,
    pub dispatch_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(keys: TunnelKeys) -> Self {
        Self {
            keys,
            require_signature: true,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`, falling back to pretty output for unknown values.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub allowed_origin: HeaderValue,
    pub tls: Option<TlsPaths>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| non_empty(name).ok_or(ConfigError::Missing(name));

        let keys = TunnelKeys::new(
            required(ENCRYPTION_KEY_ENV)?,
            required(SIGNING_KEY_ENV)?,
            required(INTERNAL_KEY_ENV)?,
        );
        // The internal key travels as a header on every dispatch.
        HeaderValue::from_str(keys.internal.expose()).map_err(|_| ConfigError::Invalid {
            var: INTERNAL_KEY_ENV,
            reason: "must contain only visible ASCII characters".to_string(),
        })?;

        let require_signature = match non_empty(REQUIRE_SIGNATURE_ENV) {
            Some(value) => parse_bool(REQUIRE_SIGNATURE_ENV, &value)?,
            None => true,
        };

        let dispatch_timeout = match non_empty(DISPATCH_TIMEOUT_ENV) {
            Some(value) => {
                let millis: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: DISPATCH_TIMEOUT_ENV,
                    reason: format!("expected milliseconds, got {value:?}"),
                })?;
                if millis == 0 {
                    return Err(ConfigError::Invalid {
                        var: DISPATCH_TIMEOUT_ENV,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_millis(millis)
            }
            None => DEFAULT_DISPATCH_TIMEOUT,
        };

        let host = non_empty(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_empty(PORT_ENV) {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                reason: format!("expected a port number, got {value:?}"),
            })?,
            None => DEFAULT_PORT,
        };
        let bind: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| ConfigError::Invalid {
                var: HOST_ENV,
                reason: format!("{e}"),
            })?;

        let origin =
            non_empty(ALLOWED_ORIGIN_ENV).unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());
        let allowed_origin = parse_origin(&origin)?;

        let tls = match (non_empty(TLS_CERT_PATH_ENV), non_empty(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(Self {
            server: ServerConfig {
                bind,
                allowed_origin,
                tls,
            },
            gateway: GatewayConfig {
                keys,
                require_signature,
                dispatch_timeout,
            },
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

/// An origin is `scheme://host[:port]` with nothing after the authority.
fn parse_origin(origin: &str) -> Result<HeaderValue, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: ALLOWED_ORIGIN_ENV,
        reason: reason.to_string(),
    };
    let uri: Uri = origin.parse().map_err(|_| invalid("not a valid URI"))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(invalid("expected scheme://host[:port]"));
    }
    if uri.path_and_query().is_some_and(|pq| pq.as_str() != "/") || origin.ends_with('/') {
        return Err(invalid("origin must not carry a path"));
    }
    HeaderValue::from_str(origin).map_err(|_| invalid("not a valid header value"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const KEYS: [(&str, &str); 3] = [
        (ENCRYPTION_KEY_ENV, "enc-secret"),
        (SIGNING_KEY_ENV, "sig-secret"),
        (INTERNAL_KEY_ENV, "gate-secret"),
    ];

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let config = AppConfig::from_lookup(lookup_from(&KEYS)).unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:3001".parse().unwrap());
        assert_eq!(config.server.allowed_origin, "http://localhost:3000");
        assert!(config.server.tls.is_none());
        assert!(config.gateway.require_signature);
        assert_eq!(config.gateway.dispatch_timeout, DEFAULT_DISPATCH_TIMEOUT);
        assert_eq!(config.gateway.keys.signing.expose(), "sig-secret");
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let err = AppConfig::from_lookup(lookup_from(&KEYS[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(INTERNAL_KEY_ENV)));

        let mut blank = KEYS.to_vec();
        blank[0] = (ENCRYPTION_KEY_ENV, "   ");
        let err = AppConfig::from_lookup(lookup_from(&blank)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENCRYPTION_KEY_ENV)));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = KEYS.to_vec();
        vars.extend([
            (REQUIRE_SIGNATURE_ENV, "false"),
            (DISPATCH_TIMEOUT_ENV, "250"),
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "8443"),
            (ALLOWED_ORIGIN_ENV, "https://app.example.com"),
            (TLS_CERT_PATH_ENV, "/etc/tls/cert.pem"),
            (TLS_KEY_PATH_ENV, "/etc/tls/key.pem"),
        ]);
        let config = AppConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert!(!config.gateway.require_signature);
        assert_eq!(config.gateway.dispatch_timeout, Duration::from_millis(250));
        assert_eq!(config.server.bind, "127.0.0.1:8443".parse().unwrap());
        assert_eq!(config.server.allowed_origin, "https://app.example.com");
        assert_eq!(
            config.server.tls,
            Some(TlsPaths {
                cert: PathBuf::from("/etc/tls/cert.pem"),
                key: PathBuf::from("/etc/tls/key.pem"),
            })
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (var, value) in [
            (REQUIRE_SIGNATURE_ENV, "maybe"),
            (DISPATCH_TIMEOUT_ENV, "0"),
            (DISPATCH_TIMEOUT_ENV, "soon"),
            (PORT_ENV, "99999"),
            (ALLOWED_ORIGIN_ENV, "localhost"),
            (ALLOWED_ORIGIN_ENV, "https://app.example.com/path"),
            (INTERNAL_KEY_ENV, "line\nbreak"),
        ] {
            let mut vars = KEYS.to_vec();
            vars.retain(|(name, _)| *name != var);
            vars.push((var, value));
            let err = AppConfig::from_lookup(lookup_from(&vars)).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { var: v, .. } if v == var),
                "{var}={value:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        let mut vars = KEYS.to_vec();
        vars.push((TLS_CERT_PATH_ENV, "/etc/tls/cert.pem"));
        let err = AppConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteTls));
    }

    #[test]
    fn collapsed_slots_are_detected() {
        let distinct = TunnelKeys::new("a", "b", "c");
        assert!(distinct.collapsed_slots().is_empty());

        let reused = TunnelKeys::new("a", "b", "b");
        assert_eq!(reused.collapsed_slots(), vec![("signing", "internal")]);

        let single = TunnelKeys::new("x", "x", "x");
        assert_eq!(single.collapsed_slots().len(), 3);
    }

    #[test]
    fn secret_debug_is_redacted() {
        let keys = TunnelKeys::new("enc", "sig", "gate");
        let printed = format!("{keys:?}");
        assert!(!printed.contains("enc\""));
        assert!(printed.contains("SecretKey(***)"));
    }
}
