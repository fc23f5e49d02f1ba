// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Tunnel Cryptography
//!
//! Two independent primitives, each bound to its own key slot:
//!
//! - [`EnvelopeCodec`] - AES-256-GCM sealing of UTF-8 payloads into an opaque
//!   base64 string (`nonce || ciphertext || tag`). A fresh random nonce is
//!   drawn for every call, so identical payloads never produce identical
//!   envelopes.
//! - [`Authenticator`] - HMAC-SHA256 over the sealed string. Deterministic,
//!   so the receiver recomputes the tag and compares it in full.
//!
//! Signatures are always checked before a ciphertext is opened.

pub mod envelope;
pub mod signature;

pub use envelope::{CodecError, EnvelopeCodec};
pub use signature::{Authenticator, SignatureError};
