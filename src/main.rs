// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{process::ExitCode, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use encrypted_proxy_server::{
    api::router,
    config::{AppConfig, ConfigError, LogFormat, TlsPaths},
    logging::init_tracing,
    state::AppState,
    tunnel::GatewayBuildError,
};

/// How long in-flight exchanges may finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("gateway: {0}")]
    Gateway(#[from] GatewayBuildError),

    #[error("rustls crypto provider could not be installed")]
    CryptoProvider,

    #[error("TLS credentials: {0}")]
    Tls(std::io::Error),

    #[error("server: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing(LogFormat::from_env());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Encrypted proxy server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    for (left, right) in config.gateway.keys.collapsed_slots() {
        tracing::warn!(
            left,
            right,
            "Key slots share a secret; configure distinct keys for each slot"
        );
    }
    if !config.gateway.require_signature {
        tracing::warn!("Signature checks are disabled (REQUIRE_SIGNATURE=false)");
    }

    let state = AppState::new(&config.gateway)?;
    let app = router(state, config.server.allowed_origin.clone());

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let addr = config.server.bind;
    match &config.server.tls {
        Some(paths) => {
            let tls = load_tls(paths).await?;
            tracing::info!(%addr, "Encrypted proxy listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)?;
        }
        None => {
            tracing::info!(%addr, "Encrypted proxy listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)?;
        }
    }

    tracing::info!("Encrypted proxy server stopped");
    Ok(())
}

async fn load_tls(paths: &TlsPaths) -> Result<RustlsConfig, StartupError> {
    // Must be installed before any rustls config is built.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| StartupError::CryptoProvider)?;

    RustlsConfig::from_pem_file(&paths.cert, &paths.key)
        .await
        .map_err(StartupError::Tls)
}

async fn graceful_shutdown(handle: Handle<std::net::SocketAddr>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
