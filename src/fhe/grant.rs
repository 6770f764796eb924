// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # User Decryption Grants
//!
//! A grant is a wallet signature over an EIP-712 `UserDecryptRequestVerification`
//! message. It binds an ephemeral public key to a list of contracts for a
//! bounded number of days starting at a given unix timestamp:
//!
//! ```text
//! domain  { name: "Decryption", version: "1", chainId: <gateway>, verifyingContract }
//! message { publicKey, contractAddresses, startTimestamp, durationDays, extraData }
//! ```
//!
//! The signature is only valid for the exact payload it was produced over.

use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, Signature},
};
use serde_json::json;

use crate::blockchain::FheNetworkConfig;
use crate::error::{FheClientError, SessionError};

/// Validity window of every grant, in days.
pub const GRANT_VALIDITY_DAYS: u32 = 10;

/// EIP-712 primary type of user decryption grants.
pub const USER_DECRYPT_PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

const SECONDS_PER_DAY: u64 = 86_400;

/// Fields of a grant before it is signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub public_key: String,
    pub contract_addresses: Vec<Address>,
    /// Unix seconds.
    pub start_timestamp: u64,
    pub duration_days: u32,
}

impl AuthorizationRequest {
    /// Request for a single contract with the fixed validity window.
    pub fn new(public_key: impl Into<String>, contract: Address, start_timestamp: u64) -> Self {
        Self {
            public_key: public_key.into(),
            contract_addresses: vec![contract],
            start_timestamp,
            duration_days: GRANT_VALIDITY_DAYS,
        }
    }

    /// Start timestamp as sent on the wire (decimal string).
    pub fn start_timestamp_string(&self) -> String {
        self.start_timestamp.to_string()
    }

    /// Validity window as sent on the wire (decimal string).
    pub fn duration_days_string(&self) -> String {
        self.duration_days.to_string()
    }

    /// First unix second at which the grant is no longer valid.
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(u64::from(self.duration_days) * SECONDS_PER_DAY)
    }

    pub fn is_active_at(&self, unix_seconds: u64) -> bool {
        unix_seconds >= self.start_timestamp && unix_seconds < self.expires_at()
    }
}

/// Build the canonical EIP-712 payload for a user decryption request.
pub fn user_decrypt_typed_data(
    network: &FheNetworkConfig,
    request: &AuthorizationRequest,
) -> Result<TypedData, FheClientError> {
    let public_key = if request.public_key.starts_with("0x") {
        request.public_key.clone()
    } else {
        format!("0x{}", request.public_key)
    };

    let contracts: Vec<String> = request
        .contract_addresses
        .iter()
        .map(|address| address.to_checksum(None))
        .collect();

    let payload = json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" }
            ],
            "UserDecryptRequestVerification": [
                { "name": "publicKey", "type": "bytes" },
                { "name": "contractAddresses", "type": "address[]" },
                { "name": "startTimestamp", "type": "uint256" },
                { "name": "durationDays", "type": "uint256" },
                { "name": "extraData", "type": "bytes" }
            ]
        },
        "primaryType": USER_DECRYPT_PRIMARY_TYPE,
        "domain": {
            "name": "Decryption",
            "version": "1",
            "chainId": network.gateway_chain_id,
            "verifyingContract": network.verifying_contract_decryption.to_checksum(None)
        },
        "message": {
            "publicKey": public_key,
            "contractAddresses": contracts,
            "startTimestamp": request.start_timestamp_string(),
            "durationDays": request.duration_days_string(),
            "extraData": "0x00"
        }
    });

    serde_json::from_value(payload)
        .map_err(|e| FheClientError::new(format!("Invalid decryption payload: {e}")))
}

/// Strip the `0x` presentation prefix.
///
/// The body is passed through untouched: compact (EIP-2098) and contract
/// wallet (ERC-1271) signatures are judged by the verifier, not here.
pub fn canonical_signature(raw: &str) -> Result<String, SessionError> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if body.is_empty() {
        return Err(SessionError::SigningFailed(
            "wallet returned an empty signature".to_string(),
        ));
    }
    Ok(body.to_string())
}

/// A signed decryption grant. Built fresh per decryption and dropped after use.
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    request: AuthorizationRequest,
    payload: TypedData,
    signature: String,
}

impl AuthorizationGrant {
    /// Bind a wallet signature to the request and payload it was made over.
    pub fn new(
        request: AuthorizationRequest,
        payload: TypedData,
        raw_signature: &str,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            request,
            payload,
            signature: canonical_signature(raw_signature)?,
        })
    }

    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    pub fn payload(&self) -> &TypedData {
        &self.payload
    }

    /// Signature without its `0x` prefix.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Recover the address that signed the payload. Only 65-byte ECDSA
    /// signatures are recoverable.
    pub fn signer(&self) -> Result<Address, SessionError> {
        let hash = self
            .payload
            .eip712_signing_hash()
            .map_err(|e| SessionError::SigningFailed(e.to_string()))?;
        let bytes = alloy::hex::decode(&self.signature)
            .map_err(|e| SessionError::SigningFailed(e.to_string()))?;
        let signature =
            Signature::from_raw(&bytes).map_err(|e| SessionError::SigningFailed(e.to_string()))?;
        signature
            .recover_address_from_prehash(&hash)
            .map_err(|e| SessionError::SigningFailed(e.to_string()))
    }

    /// True when the payload was signed by `expected`.
    pub fn verify(&self, expected: Address) -> bool {
        matches!(self.signer(), Ok(address) if address == expected)
    }
}
