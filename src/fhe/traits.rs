// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capability interfaces over the confidential-computation client and the
//! wallet signer.
//!
//! The session only depends on the operations it calls: building encrypted
//! inputs, issuing ephemeral keys, building and submitting user decryption
//! requests, and signing typed data.

use std::collections::HashMap;
use std::fmt;

use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, U256},
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::grant::AuthorizationRequest;
use crate::blockchain::{CiphertextHandle, FheNetworkConfig, InputProof};
use crate::codec::FixedWidthValue;
use crate::error::{FheClientError, SignerError};

/// Key pair used for a single user decryption.
///
/// Never cloned, serialized or logged. The private half is wiped on drop.
pub struct EphemeralKeyPair {
    public_key: String,
    private_key: Zeroizing<String>,
}

impl EphemeralKeyPair {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: Zeroizing::new(private_key.into()),
        }
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Short SHA-256 fingerprint of the public key, safe for logs.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.public_key.as_bytes());
        alloy::hex::encode(&digest[..8])
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("fingerprint", &self.fingerprint())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Encrypted input under construction, scoped to one (contract, user) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    contract: Address,
    user: Address,
    values: Vec<Address>,
}

impl EncryptedInput {
    pub fn new(contract: Address, user: Address) -> Self {
        Self {
            contract,
            user,
            values: Vec::new(),
        }
    }

    /// Append an address-typed cleartext (`eaddress`).
    pub fn add_address(&mut self, value: FixedWidthValue) -> &mut Self {
        self.values.push(value.as_address());
        self
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn user(&self) -> Address {
        self.user
    }

    pub fn values(&self) -> &[Address] {
        &self.values
    }
}

/// Result of encrypting an [`EncryptedInput`]: one handle per value and a
/// single proof covering all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInputs {
    pub handles: Vec<CiphertextHandle>,
    pub input_proof: InputProof,
}

/// Cleartext returned by a user decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearValue {
    Bool(bool),
    Uint(U256),
    Address(Address),
}

impl fmt::Display for ClearValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearValue::Bool(_) => f.write_str("bool"),
            ClearValue::Uint(_) => f.write_str("uint"),
            ClearValue::Address(_) => f.write_str("address"),
        }
    }
}

/// A ciphertext handle and the contract that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleContractPair {
    pub handle: CiphertextHandle,
    pub contract: Address,
}

/// Everything the decryption service needs to check a grant and re-encrypt
/// the requested handles under the ephemeral public key.
#[derive(Debug)]
pub struct RevealRequest<'a> {
    pub pairs: Vec<HandleContractPair>,
    pub private_key: &'a str,
    pub public_key: &'a str,
    /// Unprefixed hex signature over the grant payload.
    pub signature: &'a str,
    pub contract_addresses: &'a [Address],
    pub user: Address,
    pub start_timestamp: String,
    pub duration_days: String,
}

/// Turns cleartext inputs into ciphertext handles plus an input proof.
#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(&self, input: EncryptedInput) -> Result<EncryptedInputs, FheClientError>;
}

/// User decryption: ephemeral keys, grant payloads and the reveal call.
#[async_trait]
pub trait Revealer: Send + Sync {
    /// Fresh, independent key pair. Must not be derived from user data.
    fn generate_keypair(&self) -> Result<EphemeralKeyPair, FheClientError>;

    /// Canonical EIP-712 payload the wallet must sign for `request`.
    fn authorization_payload(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<TypedData, FheClientError>;

    /// Submit a signed decryption request. The result holds an entry for
    /// every handle the caller was authorized to see.
    async fn reveal(
        &self,
        request: RevealRequest<'_>,
    ) -> Result<HashMap<CiphertextHandle, ClearValue>, FheClientError>;
}

/// A fully capable confidential-computation client instance.
pub trait FheClient: Encryptor + Revealer {}

impl<T: Encryptor + Revealer> FheClient for T {}

/// Loads the confidential-computation runtime and creates client instances.
#[async_trait]
pub trait FheRuntime: Send + Sync {
    type Client: FheClient + 'static;

    /// One-time runtime setup (key material download, WASM init, ...).
    async fn initialize_runtime(&self) -> Result<(), FheClientError>;

    async fn create_instance(
        &self,
        network: &FheNetworkConfig,
    ) -> Result<Self::Client, FheClientError>;
}

/// Wallet capable of signing EIP-712 structured data.
///
/// Signing may wait on a human approval with no time limit.
#[async_trait]
pub trait StructuredSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Returns the signature in the wallet's presentation form, usually
    /// `0x`-prefixed hex.
    async fn sign_typed_data(&self, payload: &TypedData) -> Result<String, SignerError>;
}
