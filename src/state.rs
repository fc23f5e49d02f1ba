// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::Router;

use crate::{
    config::GatewayConfig,
    internal,
    tunnel::{Gateway, GatewayBuildError},
};

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    /// Internal namespace, served behind the gate on the public listener too.
    pub internal: Router,
}

impl AppState {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayBuildError> {
        let internal = internal::router(&config.keys.internal);
        let gateway = Gateway::new(config, internal.clone())?;
        Ok(Self {
            gateway: Arc::new(gateway),
            internal,
        })
    }
}
