// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Envelope codec: authenticated symmetric encryption of text payloads.

use base64ct::{Base64, Encoding};
use ring::{
    aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN},
    rand::{SecureRandom, SystemRandom},
};
use sha2::{Digest, Sha256};

use crate::config::SecretKey;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("encryption key could not be initialised")]
    InvalidKey,

    #[error("system randomness unavailable")]
    Randomness,

    #[error("payload could not be sealed")]
    SealFailed,

    #[error("ciphertext is not valid base64")]
    NotBase64,

    #[error("ciphertext is too short ({0} bytes)")]
    Truncated(usize),

    #[error("ciphertext failed authentication (wrong key or tampered)")]
    Rejected,

    #[error("plaintext is not valid UTF-8")]
    NotUtf8,
}

/// Seals and opens envelopes under the encryption key slot.
pub struct EnvelopeCodec {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl EnvelopeCodec {
    /// The AEAD key is the SHA-256 digest of the configured secret, so any
    /// secret length yields a full 256-bit key.
    pub fn new(secret: &SecretKey) -> Result<Self, CodecError> {
        let digest = Sha256::digest(secret.expose().as_bytes());
        let unbound = UnboundKey::new(&AES_256_GCM, &digest).map_err(|_| CodecError::InvalidKey)?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CodecError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CodecError::Randomness)?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| CodecError::SealFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(Base64::encode_string(&sealed))
    }

    /// Opens a sealed envelope.
    ///
    /// An empty plaintext is returned as `Ok("")`; callers decide whether an
    /// empty payload is acceptable.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CodecError> {
        let raw = Base64::decode_vec(ciphertext.trim()).map_err(|_| CodecError::NotBase64)?;
        if raw.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CodecError::Truncated(raw.len()));
        }

        let (nonce_bytes, sealed) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| CodecError::Truncated(raw.len()))?;

        let mut in_out = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CodecError::Rejected)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| CodecError::NotUtf8)
    }
}
