// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted Proxy Server - Sealed Request Tunnel
//!
//! A public edge that accepts signed, encrypted request envelopes, dispatches
//! them into an internal-only route namespace and answers with a sealed,
//! signed response.
//!
//! ## Modules
//!
//! - `api` - Public HTTP surface (Axum): `/api/proxy`, health, docs
//! - `crypto` - Envelope codec (AES-256-GCM) and HMAC-SHA256 signatures
//! - `tunnel` - Request contract, gateway state machine, dispatcher, client
//! - `internal` - Internal route namespace and its key gate
//! - `config` - Environment configuration and key slots

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod internal;
pub mod logging;
pub mod models;
pub mod state;
pub mod tunnel;

#[cfg(test)]
pub(crate) mod testing;
