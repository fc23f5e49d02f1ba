// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests.

use crate::{
    config::{GatewayConfig, TunnelKeys},
    tunnel::TunnelClient,
};

pub fn test_keys() -> TunnelKeys {
    TunnelKeys::new("test-encryption-key", "test-signing-key", "test-internal-key")
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig::new(test_keys())
}

/// Client sharing the gateway's keys. The endpoint is only used by `send`.
pub fn test_client() -> TunnelClient {
    let keys = test_keys();
    TunnelClient::new("http://127.0.0.1:9/api/proxy", &keys.encryption, &keys.signing)
        .expect("test client")
}
