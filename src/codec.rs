// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Fixed-Width Credential Codec
//!
//! The FHE coprocessor can only encrypt fixed-width scalar types, so a
//! credential is packed into an address-shaped 20-byte value before it is
//! encrypted as an `eaddress`.
//!
//! ## Layout
//!
//! ```text
//! byte:  0                len              19
//!        [ credential bytes | 0x00 padding ... ]
//! ```
//!
//! Trailing zero bytes are padding. A credential whose last byte is `0x00`
//! cannot be told apart from a shorter one, so [`validate`] rejects it.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Width of the packed value in bytes (the size of an EVM address).
pub const FIXED_WIDTH: usize = 20;

/// Maximum credential length in UTF-8 bytes.
pub const MAX_CREDENTIAL_BYTES: usize = FIXED_WIDTH;

/// A credential packed into an address-shaped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedWidthValue(Address);

impl FixedWidthValue {
    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; FIXED_WIDTH]) -> Self {
        Self(Address::new(bytes))
    }

    /// Raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; FIXED_WIDTH] {
        &self.0 .0 .0
    }

    /// The value as an address, the form the FHE client encrypts.
    pub fn as_address(&self) -> Address {
        self.0
    }
}

impl From<Address> for FixedWidthValue {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<FixedWidthValue> for Address {
    fn from(value: FixedWidthValue) -> Self {
        value.0
    }
}

impl TryFrom<&[u8]> for FixedWidthValue {
    type Error = CodecError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; FIXED_WIDTH] = bytes.try_into().map_err(|_| {
            CodecError::InvalidFormat(format!(
                "expected {FIXED_WIDTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(bytes))
    }
}

impl FromStr for FixedWidthValue {
    type Err = CodecError;

    /// Parse a `0x`-prefixed, 40 hex digit address string. Checksum casing is
    /// not enforced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| CodecError::InvalidFormat(s.to_string()))?;
        if hex.len() != FIXED_WIDTH * 2 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CodecError::InvalidFormat(s.to_string()));
        }
        Address::from_str(s)
            .map(Self)
            .map_err(|e| CodecError::InvalidFormat(e.to_string()))
    }
}

impl fmt::Display for FixedWidthValue {
    /// EIP-55 checksummed form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_checksum(None))
    }
}

/// Check credential constraints before encoding.
pub fn validate(text: &str) -> Result<(), CodecError> {
    let bytes = text.as_bytes();
    match bytes.last() {
        None => Err(CodecError::EmptyCredential),
        Some(_) if bytes.len() > MAX_CREDENTIAL_BYTES => {
            Err(CodecError::TooLong { len: bytes.len() })
        }
        Some(0) => Err(CodecError::TrailingZeroByte),
        Some(_) => Ok(()),
    }
}

/// Pack a credential into a zero-padded 20-byte value.
pub fn encode(text: &str) -> Result<FixedWidthValue, CodecError> {
    validate(text)?;

    let bytes = text.as_bytes();
    let mut padded = [0u8; FIXED_WIDTH];
    padded[..bytes.len()].copy_from_slice(bytes);
    Ok(FixedWidthValue::from_bytes(padded))
}

/// Unpack a credential, dropping the zero padding.
///
/// A value whose only non-zero byte is the first one decodes to that single
/// byte. An all-zero value carries no credential and is rejected.
pub fn decode(value: &FixedWidthValue) -> Result<String, CodecError> {
    let bytes = value.as_bytes();
    let length = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);

    if length == 0 {
        return Err(CodecError::EmptyCredential);
    }

    String::from_utf8(bytes[..length].to_vec())
        .map_err(|e| CodecError::InvalidFormat(format!("credential is not valid UTF-8: {e}")))
}

/// Parse an address string and unpack it.
pub fn decode_str(address: &str) -> Result<String, CodecError> {
    decode(&address.parse()?)
}

/// Outcome of a diagnostic encode/decode pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTrip {
    pub original: String,
    pub encoded: FixedWidthValue,
    pub decoded: String,
    pub is_lossless: bool,
}

/// Validate, encode and decode `text`, reporting whether it survives.
pub fn round_trip(text: &str) -> Result<RoundTrip, CodecError> {
    let encoded = encode(text)?;
    let decoded = decode(&encoded)?;
    Ok(RoundTrip {
        original: text.to_string(),
        encoded,
        is_lossless: decoded == text,
        decoded,
    })
}
