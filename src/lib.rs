// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password Keeper - Confidential Password Vault Client
//!
//! Stores short passwords on an EVM chain as FHE ciphertexts and reveals
//! them only to their owner through wallet-signed decryption grants.
//!
//! ## Modules
//!
//! - `codec` - Password <-> fixed-width address packing
//! - `fhe` - Confidential session (encryption, grant signing, user decryption)
//! - `blockchain` - PasswordKeeper contract, network config and wallet signing
//! - `vault` - High-level password operations
//! - `config` / `logging` - Environment configuration and tracing setup

pub mod blockchain;
pub mod codec;
pub mod config;
pub mod error;
pub mod fhe;
pub mod logging;
pub mod vault;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::FixedWidthValue;
pub use config::KeeperConfig;
pub use error::{CodecError, LedgerError, SessionError, VaultError};
pub use fhe::{ConfidentialSession, SessionStatus};
pub use vault::{PasswordEntry, PasswordVault};
