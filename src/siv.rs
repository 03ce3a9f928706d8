//! # Deterministic Codec
//!
//! The legacy strongbox format: AES-SIV over gzip-compressed plaintext,
//! base-64 armored behind a marker line.
//!
//! ## Encrypted Resource Format
//!
//! ```text
//! # STRONGBOX ENCRYPTED RESOURCE ; <comment up to end of line>
//! <base-64 of the SIV output, wrapped at 76 columns, newline-terminated>
//! ```
//!
//! The marker up to and including the `;` is fixed; the rest of the first
//! line is a free-form comment. Anything after the first newline is the
//! base-64 body (standard alphabet, padded; embedded newlines ignored on
//! decode).
//!
//! ## Determinism
//!
//! SIV mode takes no nonce, so encrypting the same plaintext with the same
//! key always produces the same bytes. Git relies on this: re-staging an
//! unchanged file must not create a spurious diff.

use aes_siv::{siv::Aes128Siv, KeyInit};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};

use crate::error::{Result, StrongboxError};

pub const KEY_SIZE: usize = 32; // 256 bits, split by SIV into MAC and CTR halves

/// Marker identifying an encrypted resource; everything up to the first
/// newline after it is a comment.
pub const PREFIX: &[u8] = b"# STRONGBOX ENCRYPTED RESOURCE ;";

/// Header line written on encryption.
const DEFAULT_HEADER: &[u8] =
    b"# STRONGBOX ENCRYPTED RESOURCE ; See https://github.com/uw-labs/strongbox\n";

const WRAP_WIDTH: usize = 76;

const NO_ASSOCIATED_DATA: [&[u8]; 0] = [];

/// Check whether data carries the encrypted-resource marker.
pub fn is_encrypted(data: &[u8]) -> bool {
    data.starts_with(PREFIX)
}

/// A 32-byte symmetric key for the deterministic scheme.
#[derive(Clone, Debug)]
pub struct SivKey {
    key: [u8; KEY_SIZE],
}

impl SivKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create a key from existing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StrongboxError::InvalidKeyFormat);
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Create a key from its base-64 encoding.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| StrongboxError::InvalidKeyFormat)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// The key's identifier: SHA-256 of the key material.
    pub fn key_id(&self) -> KeyId {
        let digest = Sha256::digest(self.key);
        let mut id = [0u8; KEY_SIZE];
        id.copy_from_slice(&digest);
        KeyId { id }
    }

    /// Encrypt plaintext into an armored encrypted resource.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let compressed = compress(plaintext)?;

        let mut cipher = Aes128Siv::new((&self.key).into());
        let sealed = cipher
            .encrypt(NO_ASSOCIATED_DATA, &compressed)
            .map_err(|_| StrongboxError::Crypto("siv encryption failed".into()))?;

        let body = BASE64.encode(&sealed);
        let mut blob = Vec::with_capacity(DEFAULT_HEADER.len() + body.len() + body.len() / WRAP_WIDTH + 1);
        blob.extend_from_slice(DEFAULT_HEADER);
        for line in body.as_bytes().chunks(WRAP_WIDTH) {
            blob.extend_from_slice(line);
            blob.push(b'\n');
        }
        Ok(blob)
    }

    /// Decrypt an armored encrypted resource back to plaintext.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        // strip the marker line and any comment up to end of line
        let newline = blob
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| StrongboxError::MalformedBlob("couldn't split on end of line".into()))?;

        let body: Vec<u8> = blob[newline + 1..]
            .iter()
            .copied()
            .filter(|&b| b != b'\n' && b != b'\r')
            .collect();
        let sealed = BASE64
            .decode(&body)
            .map_err(|err| StrongboxError::MalformedBlob(err.to_string()))?;

        let mut cipher = Aes128Siv::new((&self.key).into());
        let compressed = cipher
            .decrypt(NO_ASSOCIATED_DATA, &sealed)
            .map_err(|_| StrongboxError::AuthenticationFailed)?;

        decompress(&compressed)
    }
}

/// A key identifier: SHA-256 of the key it names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyId {
    id: [u8; KEY_SIZE],
}

impl KeyId {
    /// Parse a key id from its base-64 encoding; the decoded form must be
    /// exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|err| StrongboxError::MalformedKeyId(err.to_string()))?;
        if bytes.len() != KEY_SIZE {
            return Err(StrongboxError::MalformedKeyId(format!(
                "unexpected key length {}",
                bytes.len()
            )));
        }
        let mut id = [0u8; KEY_SIZE];
        id.copy_from_slice(&bytes);
        Ok(Self { id })
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.id)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.id
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut plaintext = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut plaintext)
        .map_err(|err| StrongboxError::DecompressFailed(err.to_string()))?;
    Ok(plaintext)
}
