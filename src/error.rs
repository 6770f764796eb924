// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error types shared across the codec, session, ledger and vault layers.
//!
//! Codec errors are resolved by correcting the input and never reach the
//! network. Session and ledger errors carry the underlying message verbatim.

use crate::codec::MAX_CREDENTIAL_BYTES;

/// Errors raised while packing or unpacking a credential.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Password cannot be empty")]
    EmptyCredential,

    #[error("Password cannot be longer than {max} bytes (got {len})", max = MAX_CREDENTIAL_BYTES)]
    TooLong { len: usize },

    /// Zero padding cannot represent a credential whose last byte is `0x00`.
    #[error("Password cannot end with a NUL byte")]
    TrailingZeroByte,

    #[error("Invalid address format: {0}")]
    InvalidFormat(String),
}

/// Errors surfaced by [`crate::fhe::ConfidentialSession`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("FHE instance not initialized")]
    NotInitialized,

    #[error("FHE initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Reveal request failed: {0}")]
    RevealFailed(String),

    /// The caller is not authorized, the handle is unknown, or the grant was
    /// malformed. The three cases are deliberately indistinguishable.
    #[error("Decryption denied")]
    DecryptionDenied,

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Error reported by a confidential-computation client implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FheClientError(pub String);

impl FheClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error reported by a structured-data signer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SignerError(pub String);

/// Errors raised by the password keeper ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Password not found")]
    NotFound,

    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Contract error: {0}")]
    ContractError(String),
}

impl LedgerError {
    /// Map a contract call failure, recognising the contract's not-found revert.
    pub fn from_contract(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("Password not found") {
            LedgerError::NotFound
        } else {
            LedgerError::ContractError(message)
        }
    }
}

/// Errors raised by [`crate::vault::PasswordVault`].
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Platform name cannot be empty")]
    EmptyPlatform,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors raised while loading runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable `{0}`")]
    Missing(&'static str),

    #[error("Invalid value for `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}
