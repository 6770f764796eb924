// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration module for the PasswordKeeper contract.
//!
//! This module provides functionality for:
//! - Storing, listing and deleting ciphertext handles on-chain
//! - Network configuration of the FHE coprocessor
//! - Wallet signing of decryption grants

pub mod keeper;
pub mod signing;
pub mod types;

pub use keeper::{IPasswordKeeper, Ledger, PasswordKeeperContract};
pub use types::*;
