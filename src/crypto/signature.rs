// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HMAC-SHA256 signatures over sealed envelopes.

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SecretKey;

type HmacSha256 = Hmac<Sha256>;

/// Why a signature was not accepted. Only used for server-side diagnostics;
/// callers see a single "unauthorized" outcome.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing key could not be initialised")]
    InvalidKey,

    #[error("signature header is missing")]
    Missing,

    #[error("signature is not valid base64")]
    Malformed,

    #[error("signature does not match the envelope")]
    Mismatch,
}

/// Signs and verifies envelope ciphertexts under the signing key slot.
#[derive(Clone)]
pub struct Authenticator {
    mac: HmacSha256,
}

impl Authenticator {
    pub fn new(secret: &SecretKey) -> Result<Self, SignatureError> {
        let mac = HmacSha256::new_from_slice(secret.expose().as_bytes())
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Deterministic: the same ciphertext always yields the same signature.
    pub fn sign(&self, ciphertext: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(ciphertext.as_bytes());
        Base64::encode_string(&mac.finalize().into_bytes())
    }

    pub fn verify(&self, ciphertext: &str, signature: Option<&str>) -> bool {
        self.check(ciphertext, signature).is_ok()
    }

    /// Recomputes the tag over `ciphertext` and requires the supplied
    /// signature to match it in full.
    pub fn check(&self, ciphertext: &str, signature: Option<&str>) -> Result<(), SignatureError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::Missing)?;
        let tag = Base64::decode_vec(signature).map_err(|_| SignatureError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(ciphertext.as_bytes());
        mac.verify_slice(&tag).map_err(|_| SignatureError::Mismatch)
    }
}
