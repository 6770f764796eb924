// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Password Vault
//!
//! Joins the codec, the confidential session and the ledger into the
//! credential operations a client actually performs:
//!
//! | Operation | Flow |
//! |-----------|------|
//! | store / update | validate → encode → encrypt for the caller → ledger write |
//! | batch store | validate all → encrypt each → single ledger write |
//! | retrieve | ledger read → signed grant → reveal → decode |
//! | delete / has / list / count / timestamp | ledger only |
//!
//! Input errors are reported before anything is encrypted or sent.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::blockchain::{CiphertextHandle, EncryptedCredential, Ledger};
use crate::codec;
use crate::error::{LedgerError, VaultError};
use crate::fhe::{ConfidentialSession, FheRuntime, StructuredSigner};

/// A stored credential as listed for its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordEntry {
    pub platform: String,
    pub handle: CiphertextHandle,
    /// Last store or update. The contract only reveals it to the owner, so
    /// this is `None` when listing someone else's entries.
    pub stored_at: Option<DateTime<Utc>>,
}

fn to_datetime(seconds: u64) -> Result<DateTime<Utc>, LedgerError> {
    i64::try_from(seconds)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| LedgerError::ContractError(format!("timestamp out of range: {seconds}")))
}

pub struct PasswordVault<R: FheRuntime, L: Ledger> {
    session: Arc<ConfidentialSession<R>>,
    ledger: L,
    contract: Address,
}

fn ensure_platform(platform: &str) -> Result<(), VaultError> {
    if platform.is_empty() {
        return Err(VaultError::EmptyPlatform);
    }
    Ok(())
}

impl<R: FheRuntime, L: Ledger> PasswordVault<R, L> {
    /// `contract` must be the address `ledger` writes to; ciphertexts are
    /// bound to it.
    pub fn new(session: Arc<ConfidentialSession<R>>, ledger: L, contract: Address) -> Self {
        Self {
            session,
            ledger,
            contract,
        }
    }

    pub fn session(&self) -> &ConfidentialSession<R> {
        &self.session
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    async fn seal(
        &self,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<EncryptedCredential, VaultError> {
        let value = codec::encode(password)?;
        Ok(self
            .session
            .encrypt(&value, self.contract, self.ledger.caller(), cancel)
            .await?)
    }

    /// Store `password` under `platform`, replacing any previous value.
    pub async fn store_password(
        &self,
        platform: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<TxHash, VaultError> {
        ensure_platform(platform)?;
        let credential = self.seal(password, cancel).await?;
        let tx_hash = self.ledger.store(platform, &credential).await?;

        info!(platform = %platform, tx_hash = %tx_hash, "Password stored");
        Ok(tx_hash)
    }

    /// Replace the password of an existing `platform`.
    pub async fn update_password(
        &self,
        platform: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<TxHash, VaultError> {
        ensure_platform(platform)?;
        let credential = self.seal(password, cancel).await?;
        let tx_hash = self.ledger.update(platform, &credential).await?;

        info!(platform = %platform, tx_hash = %tx_hash, "Password updated");
        Ok(tx_hash)
    }

    /// Store several passwords in one ledger write. Nothing is encrypted
    /// unless every entry is valid.
    pub async fn batch_store_passwords(
        &self,
        entries: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<TxHash, VaultError> {
        for (platform, password) in entries {
            ensure_platform(platform)?;
            codec::validate(password)?;
        }

        let mut sealed = Vec::with_capacity(entries.len());
        for (platform, password) in entries {
            let credential = self.seal(password, cancel).await?;
            sealed.push((platform.to_string(), credential));
        }

        let tx_hash = self.ledger.batch_store(&sealed).await?;
        info!(count = sealed.len(), tx_hash = %tx_hash, "Passwords stored");
        Ok(tx_hash)
    }

    /// Decrypt `owner`'s password for `platform`.
    ///
    /// `signer` must be `owner`'s wallet, otherwise the decryption service
    /// refuses with [`crate::error::SessionError::DecryptionDenied`].
    pub async fn retrieve_password<S>(
        &self,
        owner: Address,
        platform: &str,
        signer: &S,
        cancel: &CancellationToken,
    ) -> Result<String, VaultError>
    where
        S: StructuredSigner + ?Sized,
    {
        ensure_platform(platform)?;
        let handle = self.ledger.get(owner, platform).await?;
        let password = self
            .session
            .authorize_and_decrypt(handle, self.contract, owner, signer, cancel)
            .await?;

        info!(platform = %platform, owner = %owner, "Password retrieved");
        Ok(password)
    }

    pub async fn delete_password(&self, platform: &str) -> Result<TxHash, VaultError> {
        ensure_platform(platform)?;
        let tx_hash = self.ledger.delete(platform).await?;

        info!(platform = %platform, tx_hash = %tx_hash, "Password deleted");
        Ok(tx_hash)
    }

    pub async fn has_password(&self, platform: &str) -> Result<bool, VaultError> {
        Ok(self.ledger.has(platform).await?)
    }

    pub async fn list_platforms(&self, owner: Address) -> Result<Vec<String>, VaultError> {
        Ok(self.ledger.list_platforms(owner).await?)
    }

    pub async fn password_count(&self) -> Result<u64, VaultError> {
        Ok(self.ledger.count().await?)
    }

    /// Time of the last store or update of `platform` by the caller.
    pub async fn password_timestamp(&self, platform: &str) -> Result<DateTime<Utc>, VaultError> {
        ensure_platform(platform)?;
        let seconds = self.ledger.timestamp_of(platform).await?;
        Ok(to_datetime(seconds)?)
    }

    /// Every platform of `owner` with its current handle, in ledger order.
    pub async fn entries(&self, owner: Address) -> Result<Vec<PasswordEntry>, VaultError> {
        let own = owner == self.ledger.caller();
        let platforms = self.ledger.list_platforms(owner).await?;
        let mut entries = Vec::with_capacity(platforms.len());
        for platform in platforms {
            let handle = self.ledger.get(owner, &platform).await?;
            let stored_at = if own {
                Some(to_datetime(self.ledger.timestamp_of(&platform).await?)?)
            } else {
                None
            };
            entries.push(PasswordEntry {
                platform,
                handle,
                stored_at,
            });
        }
        Ok(entries)
    }
}
