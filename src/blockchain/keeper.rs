// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PasswordKeeper contract interactions.
//!
//! The contract keeps one `eaddress` handle and one timestamp per
//! (owner, platform) pair. Writes and the `has`/`count`/`timestamp` views are
//! scoped to the caller; `get` and `list` take an explicit owner.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, TxHash, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};
use async_trait::async_trait;

use super::types::{CiphertextHandle, EncryptedCredential};
use crate::error::LedgerError;

// `eaddress` and `externalEaddress` are ABI-encoded as bytes32 handles.
sol! {
    #[sol(rpc)]
    interface IPasswordKeeper {
        event PasswordStored(address indexed user, string platform, uint256 timestamp);
        event PasswordUpdated(address indexed user, string platform, uint256 timestamp);
        event PasswordDeleted(address indexed user, string platform);

        function storePassword(string platform, bytes32 encryptedPassword, bytes inputProof) external;
        function updatePassword(string platform, bytes32 encryptedPassword, bytes inputProof) external;
        function batchStorePasswords(string[] platforms, bytes32[] encryptedPasswords, bytes[] inputProofs) external;
        function getPassword(address user, string platform) external view returns (bytes32);
        function hasPassword(string platform) external view returns (bool);
        function deletePassword(string platform) external;
        function getUserPlatforms(address user) external view returns (string[]);
        function getPasswordCount() external view returns (uint256);
        function getPasswordTimestamp(string platform) external view returns (uint256);
    }
}

/// Key-value store of ciphertext handles keyed by (owner, platform).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Identity that writes are performed as.
    fn caller(&self) -> Address;

    async fn store(
        &self,
        platform: &str,
        credential: &EncryptedCredential,
    ) -> Result<TxHash, LedgerError>;

    async fn update(
        &self,
        platform: &str,
        credential: &EncryptedCredential,
    ) -> Result<TxHash, LedgerError>;

    async fn batch_store(
        &self,
        entries: &[(String, EncryptedCredential)],
    ) -> Result<TxHash, LedgerError>;

    async fn get(&self, owner: Address, platform: &str) -> Result<CiphertextHandle, LedgerError>;

    async fn has(&self, platform: &str) -> Result<bool, LedgerError>;

    async fn delete(&self, platform: &str) -> Result<TxHash, LedgerError>;

    async fn list_platforms(&self, owner: Address) -> Result<Vec<String>, LedgerError>;

    async fn count(&self) -> Result<u64, LedgerError>;

    /// Unix seconds of the last store/update for `platform`.
    async fn timestamp_of(&self, platform: &str) -> Result<u64, LedgerError>;
}

/// PasswordKeeper contract wrapper.
pub struct PasswordKeeperContract<P> {
    contract: IPasswordKeeper::IPasswordKeeperInstance<P>,
    caller: Address,
}

impl<P: Provider + Clone> PasswordKeeperContract<P> {
    /// Create a new contract instance acting as `caller`.
    pub fn new(provider: &P, contract_address: Address, caller: Address) -> Self {
        let contract = IPasswordKeeper::new(contract_address, provider.clone());
        Self { contract, caller }
    }

    /// Contract address.
    pub fn address(&self) -> Address {
        *self.contract.address()
    }
}

impl PasswordKeeperContract<DynProvider> {
    /// Connect over HTTP with a local signing wallet.
    pub fn connect(
        rpc_url: &str,
        contract_address: Address,
        signer: PrivateKeySigner,
    ) -> Result<Self, LedgerError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;

        let caller = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self::new(&provider, contract_address, caller))
    }
}

#[async_trait]
impl<P: Provider + Clone> Ledger for PasswordKeeperContract<P> {
    fn caller(&self) -> Address {
        self.caller
    }

    async fn store(
        &self,
        platform: &str,
        credential: &EncryptedCredential,
    ) -> Result<TxHash, LedgerError> {
        let pending = self
            .contract
            .storePassword(
                platform.to_string(),
                credential.handle.0,
                credential.proof.0.clone(),
            )
            .send()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(platform, tx_hash = %tx_hash, "Password store submitted");
        Ok(tx_hash)
    }

    async fn update(
        &self,
        platform: &str,
        credential: &EncryptedCredential,
    ) -> Result<TxHash, LedgerError> {
        let pending = self
            .contract
            .updatePassword(
                platform.to_string(),
                credential.handle.0,
                credential.proof.0.clone(),
            )
            .send()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(platform, tx_hash = %tx_hash, "Password update submitted");
        Ok(tx_hash)
    }

    async fn batch_store(
        &self,
        entries: &[(String, EncryptedCredential)],
    ) -> Result<TxHash, LedgerError> {
        let platforms: Vec<String> = entries.iter().map(|(p, _)| p.clone()).collect();
        let handles: Vec<B256> = entries.iter().map(|(_, c)| c.handle.0).collect();
        let proofs: Vec<Bytes> = entries.iter().map(|(_, c)| c.proof.0.clone()).collect();

        let pending = self
            .contract
            .batchStorePasswords(platforms, handles, proofs)
            .send()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(count = entries.len(), tx_hash = %tx_hash, "Batch store submitted");
        Ok(tx_hash)
    }

    async fn get(&self, owner: Address, platform: &str) -> Result<CiphertextHandle, LedgerError> {
        let handle: B256 = self
            .contract
            .getPassword(owner, platform.to_string())
            .call()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))?;
        Ok(CiphertextHandle(handle))
    }

    async fn has(&self, platform: &str) -> Result<bool, LedgerError> {
        self.contract
            .hasPassword(platform.to_string())
            .from(self.caller)
            .call()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))
    }

    async fn delete(&self, platform: &str) -> Result<TxHash, LedgerError> {
        let pending = self
            .contract
            .deletePassword(platform.to_string())
            .send()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(platform, tx_hash = %tx_hash, "Password delete submitted");
        Ok(tx_hash)
    }

    async fn list_platforms(&self, owner: Address) -> Result<Vec<String>, LedgerError> {
        self.contract
            .getUserPlatforms(owner)
            .call()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))
    }

    async fn count(&self) -> Result<u64, LedgerError> {
        let count: U256 = self
            .contract
            .getPasswordCount()
            .from(self.caller)
            .call()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))?;
        to_u64(count)
    }

    async fn timestamp_of(&self, platform: &str) -> Result<u64, LedgerError> {
        let timestamp: U256 = self
            .contract
            .getPasswordTimestamp(platform.to_string())
            .from(self.caller)
            .call()
            .await
            .map_err(|e| LedgerError::from_contract(e.to_string()))?;
        to_u64(timestamp)
    }
}

fn to_u64(value: U256) -> Result<u64, LedgerError> {
    u64::try_from(value)
        .map_err(|_| LedgerError::ContractError(format!("value {value} does not fit in u64")))
}
