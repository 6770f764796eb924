// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process doubles for the confidential-computation client, the ledger
//! and wallet signers.
//!
//! The mock decryption service enforces the same rules as the real one: the
//! grant must be signed by the requesting user over the exact payload, and the
//! handle must have been encrypted for that (contract, user) pair.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy::{
    dyn_abi::TypedData,
    primitives::{keccak256, Address, Bytes, TxHash, B256},
};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::blockchain::{CiphertextHandle, EncryptedCredential, FheNetworkConfig, InputProof, Ledger};
use crate::error::{FheClientError, LedgerError, SignerError};
use crate::fhe::grant::{user_decrypt_typed_data, AuthorizationGrant, AuthorizationRequest};
use crate::fhe::{
    ClearValue, EncryptedInput, EncryptedInputs, Encryptor, EphemeralKeyPair, FheRuntime,
    RevealRequest, Revealer, StructuredSigner,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy)]
struct SealedRecord {
    contract: Address,
    user: Address,
    value: Address,
}

/// Reveal call as observed by the mock decryption service.
#[derive(Debug, Clone)]
pub struct SeenReveal {
    pub public_key: String,
    pub signature: String,
    pub start_timestamp: String,
    pub duration_days: String,
    pub contract_addresses: Vec<Address>,
    pub user: Address,
}

#[derive(Default)]
struct MockBackend {
    init_calls: AtomicUsize,
    instances: AtomicUsize,
    failing_inits: AtomicUsize,
    init_delay: Mutex<Option<Duration>>,
    keypairs: AtomicUsize,
    nonce: AtomicU64,
    sealed: Mutex<HashMap<CiphertextHandle, SealedRecord>>,
    reveals: Mutex<Vec<SeenReveal>>,
    encryption_failure: Mutex<Option<String>>,
    overrides: Mutex<HashMap<CiphertextHandle, ClearValue>>,
}

/// Mock runtime. Clones share state, so a test keeps one handle for
/// inspection and gives another to the session.
#[derive(Clone, Default)]
pub struct MockRuntime {
    backend: Arc<MockBackend>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init_delay(self, delay: Duration) -> Self {
        *lock(&self.backend.init_delay) = Some(delay);
        self
    }

    /// Fail the next `count` runtime initializations.
    pub fn failing_inits(self, count: usize) -> Self {
        self.backend.failing_inits.store(count, Ordering::SeqCst);
        self
    }

    pub fn fail_encryption(&self, message: &str) {
        *lock(&self.backend.encryption_failure) = Some(message.to_string());
    }

    /// Return `value` for `handle` to any authorized reveal.
    pub fn override_cleartext(&self, handle: CiphertextHandle, value: ClearValue) {
        lock(&self.backend.overrides).insert(handle, value);
    }

    pub fn init_calls(&self) -> usize {
        self.backend.init_calls.load(Ordering::SeqCst)
    }

    pub fn instances_created(&self) -> usize {
        self.backend.instances.load(Ordering::SeqCst)
    }

    pub fn keypairs_issued(&self) -> usize {
        self.backend.keypairs.load(Ordering::SeqCst)
    }

    pub fn revealed_public_keys(&self) -> Vec<String> {
        lock(&self.backend.reveals)
            .iter()
            .map(|seen| seen.public_key.clone())
            .collect()
    }

    pub fn last_reveal(&self) -> Option<SeenReveal> {
        lock(&self.backend.reveals).last().cloned()
    }
}

#[async_trait]
impl FheRuntime for MockRuntime {
    type Client = MockClient;

    async fn initialize_runtime(&self) -> Result<(), FheClientError> {
        self.backend.init_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.backend.init_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.backend.failing_inits.load(Ordering::SeqCst);
        if failing > 0 {
            self.backend.failing_inits.store(failing - 1, Ordering::SeqCst);
            return Err(FheClientError::new("relayer unavailable"));
        }
        Ok(())
    }

    async fn create_instance(&self, network: &FheNetworkConfig) -> Result<MockClient, FheClientError> {
        self.backend.instances.fetch_add(1, Ordering::SeqCst);
        Ok(MockClient {
            backend: Arc::clone(&self.backend),
            network: network.clone(),
        })
    }
}

pub struct MockClient {
    backend: Arc<MockBackend>,
    network: FheNetworkConfig,
}

impl MockClient {
    fn authorized(&self, request: &RevealRequest<'_>) -> bool {
        let (Ok(start_timestamp), Ok(duration_days)) = (
            request.start_timestamp.parse::<u64>(),
            request.duration_days.parse::<u32>(),
        ) else {
            return false;
        };

        let rebuilt = AuthorizationRequest {
            public_key: request.public_key.to_string(),
            contract_addresses: request.contract_addresses.to_vec(),
            start_timestamp,
            duration_days,
        };
        let Ok(payload) = user_decrypt_typed_data(&self.network, &rebuilt) else {
            return false;
        };
        let Ok(grant) = AuthorizationGrant::new(rebuilt, payload, request.signature) else {
            return false;
        };

        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        grant.verify(request.user) && grant.request().is_active_at(now)
    }
}

#[async_trait]
impl Encryptor for MockClient {
    async fn encrypt(&self, input: EncryptedInput) -> Result<EncryptedInputs, FheClientError> {
        if let Some(message) = lock(&self.backend.encryption_failure).clone() {
            return Err(FheClientError::new(message));
        }

        let mut sealed = lock(&self.backend.sealed);
        let mut handles = Vec::with_capacity(input.values().len());
        for value in input.values() {
            let nonce = self.backend.nonce.fetch_add(1, Ordering::SeqCst);
            let mut preimage = Vec::with_capacity(68);
            preimage.extend_from_slice(input.contract().as_slice());
            preimage.extend_from_slice(input.user().as_slice());
            preimage.extend_from_slice(value.as_slice());
            preimage.extend_from_slice(&nonce.to_be_bytes());

            let handle = CiphertextHandle(keccak256(&preimage));
            sealed.insert(
                handle,
                SealedRecord {
                    contract: input.contract(),
                    user: input.user(),
                    value: *value,
                },
            );
            handles.push(handle);
        }

        Ok(EncryptedInputs {
            handles,
            input_proof: InputProof(mock_proof_for(input.user())),
        })
    }
}

#[async_trait]
impl Revealer for MockClient {
    fn generate_keypair(&self) -> Result<EphemeralKeyPair, FheClientError> {
        self.backend.keypairs.fetch_add(1, Ordering::SeqCst);
        Ok(EphemeralKeyPair::new(
            format!("0x{}", Uuid::new_v4().simple()),
            Uuid::new_v4().simple().to_string(),
        ))
    }

    fn authorization_payload(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<TypedData, FheClientError> {
        user_decrypt_typed_data(&self.network, request)
    }

    async fn reveal(
        &self,
        request: RevealRequest<'_>,
    ) -> Result<HashMap<CiphertextHandle, ClearValue>, FheClientError> {
        lock(&self.backend.reveals).push(SeenReveal {
            public_key: request.public_key.to_string(),
            signature: request.signature.to_string(),
            start_timestamp: request.start_timestamp.clone(),
            duration_days: request.duration_days.clone(),
            contract_addresses: request.contract_addresses.to_vec(),
            user: request.user,
        });

        let mut revealed = HashMap::new();
        if !self.authorized(&request) {
            return Ok(revealed);
        }

        let overrides = lock(&self.backend.overrides);
        let sealed = lock(&self.backend.sealed);
        for pair in &request.pairs {
            if !request.contract_addresses.contains(&pair.contract) {
                continue;
            }
            if let Some(value) = overrides.get(&pair.handle) {
                revealed.insert(pair.handle, value.clone());
                continue;
            }
            match sealed.get(&pair.handle) {
                Some(record) if record.contract == pair.contract && record.user == request.user => {
                    revealed.insert(pair.handle, ClearValue::Address(record.value));
                }
                _ => {}
            }
        }
        Ok(revealed)
    }
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    platform: String,
    handle: CiphertextHandle,
    timestamp: u64,
}

#[derive(Default)]
struct LedgerState {
    entries: HashMap<Address, Vec<LedgerEntry>>,
    transactions: u64,
}

impl LedgerState {
    fn next_tx(&mut self) -> TxHash {
        self.transactions += 1;
        B256::left_padding_from(&self.transactions.to_be_bytes())
    }

    fn upsert(&mut self, owner: Address, platform: &str, handle: CiphertextHandle) {
        let timestamp = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        let entries = self.entries.entry(owner).or_default();
        match entries.iter_mut().find(|entry| entry.platform == platform) {
            Some(entry) => {
                entry.handle = handle;
                entry.timestamp = timestamp;
            }
            None => entries.push(LedgerEntry {
                platform: platform.to_string(),
                handle,
                timestamp,
            }),
        }
    }

    fn find(&self, owner: Address, platform: &str) -> Option<&LedgerEntry> {
        self.entries
            .get(&owner)?
            .iter()
            .find(|entry| entry.platform == platform)
    }
}

fn ensure_platform(platform: &str) -> Result<(), LedgerError> {
    if platform.is_empty() {
        return Err(LedgerError::ContractError(
            "execution reverted: Platform name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// In-memory ledger with the PasswordKeeper contract's rules.
///
/// [`MemoryLedger::with_caller`] gives another identity a view over the same
/// state.
#[derive(Clone)]
pub struct MemoryLedger {
    caller: Address,
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            state: Arc::default(),
        }
    }

    pub fn with_caller(&self, caller: Address) -> Self {
        Self {
            caller,
            state: Arc::clone(&self.state),
        }
    }

    pub fn transactions(&self) -> u64 {
        lock(&self.state).transactions
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn caller(&self) -> Address {
        self.caller
    }

    async fn store(
        &self,
        platform: &str,
        credential: &EncryptedCredential,
    ) -> Result<TxHash, LedgerError> {
        ensure_platform(platform)?;
        let mut state = lock(&self.state);
        state.upsert(self.caller, platform, credential.handle);
        Ok(state.next_tx())
    }

    async fn update(
        &self,
        platform: &str,
        credential: &EncryptedCredential,
    ) -> Result<TxHash, LedgerError> {
        ensure_platform(platform)?;
        let mut state = lock(&self.state);
        if state.find(self.caller, platform).is_none() {
            return Err(LedgerError::NotFound);
        }
        state.upsert(self.caller, platform, credential.handle);
        Ok(state.next_tx())
    }

    async fn batch_store(
        &self,
        entries: &[(String, EncryptedCredential)],
    ) -> Result<TxHash, LedgerError> {
        for (platform, _) in entries {
            ensure_platform(platform)?;
        }
        let mut state = lock(&self.state);
        for (platform, credential) in entries {
            state.upsert(self.caller, platform, credential.handle);
        }
        Ok(state.next_tx())
    }

    async fn get(&self, owner: Address, platform: &str) -> Result<CiphertextHandle, LedgerError> {
        lock(&self.state)
            .find(owner, platform)
            .map(|entry| entry.handle)
            .ok_or(LedgerError::NotFound)
    }

    async fn has(&self, platform: &str) -> Result<bool, LedgerError> {
        Ok(lock(&self.state).find(self.caller, platform).is_some())
    }

    async fn delete(&self, platform: &str) -> Result<TxHash, LedgerError> {
        let mut state = lock(&self.state);
        let entries = state.entries.entry(self.caller).or_default();
        let index = entries
            .iter()
            .position(|entry| entry.platform == platform)
            .ok_or(LedgerError::NotFound)?;
        entries.remove(index);
        Ok(state.next_tx())
    }

    async fn list_platforms(&self, owner: Address) -> Result<Vec<String>, LedgerError> {
        Ok(lock(&self.state)
            .entries
            .get(&owner)
            .map(|entries| entries.iter().map(|entry| entry.platform.clone()).collect())
            .unwrap_or_default())
    }

    async fn count(&self) -> Result<u64, LedgerError> {
        Ok(lock(&self.state)
            .entries
            .get(&self.caller)
            .map_or(0, |entries| entries.len() as u64))
    }

    async fn timestamp_of(&self, platform: &str) -> Result<u64, LedgerError> {
        lock(&self.state)
            .find(self.caller, platform)
            .map(|entry| entry.timestamp)
            .ok_or(LedgerError::NotFound)
    }
}

/// Wallet that never answers, like a user who walked away from the prompt.
pub struct PendingSigner {
    address: Address,
}

impl PendingSigner {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

#[async_trait]
impl StructuredSigner for PendingSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, _payload: &TypedData) -> Result<String, SignerError> {
        std::future::pending().await
    }
}

/// Wallet that rejects every request.
pub struct FailingSigner {
    address: Address,
    message: String,
}

impl FailingSigner {
    pub fn new(address: Address, message: &str) -> Self {
        Self {
            address,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl StructuredSigner for FailingSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, _payload: &TypedData) -> Result<String, SignerError> {
        Err(SignerError(self.message.clone()))
    }
}

/// Bytes of an input proof produced by the mock encryptor.
pub fn mock_proof_for(user: Address) -> Bytes {
    let mut proof = vec![0x01];
    proof.extend_from_slice(user.as_slice());
    Bytes::from(proof)
}
