// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Tunnel
//!
//! ## Exchange Flow
//!
//! 1. Client seals `{ url, method, body? }` under the encryption key and
//!    signs the sealed string under the signing key
//! 2. Client posts `{ "encrypted": ... }` to `/api/proxy` with `X-Signature`
//! 3. Gateway:
//!    - verifies the signature (before anything is decrypted)
//!    - opens the envelope and validates the request contract
//!    - dispatches into the internal router with `X-Internal-Key`
//!    - seals and signs whatever the internal router answered
//!
//! ## Status Codes
//!
//! | Status | Meaning |
//! |--------|---------|
//! | 200 (or handler status) | Dispatched |
//! | 400 | Malformed envelope, decrypt failure, contract violation |
//! | 401 | Signature or internal credential failure |
//! | 404 | No internal route for the target |
//! | 500 | Anything unexpected, including dispatch timeouts |

pub mod client;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod gateway;

pub use client::{ClientError, TunnelClient, TunnelResponse};
pub use contract::{EncryptedEnvelope, HttpMethod, ProxyRequest};
pub use error::TunnelError;
pub use gateway::{Gateway, GatewayBuildError, TunnelReply, TunnelState, SIGNATURE_HEADER};
