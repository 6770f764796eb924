// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::fmt;

use alloy::primitives::{address, Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// FHE-enabled network configuration.
///
/// Carries both the host chain (where the password keeper contract lives)
/// and the coprocessor contracts the relayer needs to verify inputs and
/// user decryptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FheNetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Host chain ID
    pub chain_id: u64,
    /// Gateway chain ID (EIP-712 domain of decryption grants)
    pub gateway_chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Relayer endpoint URL
    pub relayer_url: String,
    /// Access control list contract
    pub acl_contract: Address,
    /// KMS verifier contract
    pub kms_contract: Address,
    /// Input verifier contract
    pub input_verifier_contract: Address,
    /// Verifying contract for user decryption grants
    pub verifying_contract_decryption: Address,
    /// Verifying contract for input proofs
    pub verifying_contract_input_verification: Address,
}

/// Supported network identifier for this build.
pub const NETWORK_SEPOLIA: &str = "sepolia";

impl FheNetworkConfig {
    /// Ethereum Sepolia with the Zama testnet coprocessor.
    pub fn sepolia() -> Self {
        Self {
            name: "Ethereum Sepolia",
            chain_id: 11_155_111,
            gateway_chain_id: 55_815,
            rpc_url: "https://eth-sepolia.public.blastapi.io".to_string(),
            relayer_url: "https://relayer.testnet.zama.cloud".to_string(),
            acl_contract: address!("687820221192C5B662b25367F70076A37bc79b6c"),
            kms_contract: address!("1364cBBf2cDF5032C47d8226a6f6FBD2AFCDacAC"),
            input_verifier_contract: address!("bc91f3daD1A5F19F8390c400196e58073B6a0BC4"),
            verifying_contract_decryption: address!("b6E160B1ff80D67Bfe90A85eE06Ce0A2613607D1"),
            verifying_contract_input_verification: address!(
                "7048C39f048125eDa9d678AEbaDfB22F7900a29F"
            ),
        }
    }
}

/// Validate network input for Sepolia-only runtime.
pub fn ensure_sepolia_network(raw: Option<&str>) -> Result<(), String> {
    let value = raw.unwrap_or(NETWORK_SEPOLIA).trim().to_ascii_lowercase();
    if value == NETWORK_SEPOLIA {
        Ok(())
    } else {
        Err(format!(
            "Only `{NETWORK_SEPOLIA}` network is supported in this deployment."
        ))
    }
}

/// Opaque reference to an `eaddress` ciphertext held by the coprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CiphertextHandle(pub B256);

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for CiphertextHandle {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<CiphertextHandle> for B256 {
    fn from(value: CiphertextHandle) -> Self {
        value.0
    }
}

/// Proof that a ciphertext was built for a specific (contract, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputProof(pub Bytes);

impl InputProof {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for InputProof {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

/// A handle together with its input proof, ready for on-chain submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedCredential {
    pub handle: CiphertextHandle,
    pub proof: InputProof,
}

impl From<(CiphertextHandle, InputProof)> for EncryptedCredential {
    fn from((handle, proof): (CiphertextHandle, InputProof)) -> Self {
        Self { handle, proof }
    }
}
