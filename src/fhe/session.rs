// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Confidential Session
//!
//! Owns the lifecycle of the confidential-computation client and runs the
//! two protocols built on it:
//!
//! - **encrypt**: value → `(handle, proof)` scoped to one (contract, user) pair
//! - **authorize_and_decrypt**: ephemeral key pair → signed EIP-712 grant →
//!   reveal request → cleartext → credential
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──▶ Initializing ──ok──▶ Ready
//!                                     │  ▲
//!                                   err  └──initialize()── Failed
//!                                     ▼
//!                                   Failed
//! ```
//!
//! Initialization is serialized. Callers that were waiting while another
//! attempt ran adopt that attempt's outcome instead of starting their own.
//! An attempt whose future is dropped midway counts as never started: the
//! session goes back to `Uninitialized` and the next waiter runs its own.
//! Decryption keeps no state between calls: a failed or cancelled attempt is
//! retried from a fresh key pair.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::Address;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::grant::{AuthorizationGrant, AuthorizationRequest};
use super::traits::{
    ClearValue, EncryptedInput, EncryptedInputs, Encryptor, FheRuntime, HandleContractPair,
    RevealRequest, Revealer, StructuredSigner,
};
use crate::blockchain::{CiphertextHandle, EncryptedCredential, FheNetworkConfig};
use crate::codec::{self, FixedWidthValue};
use crate::error::{CodecError, SessionError};

enum SessionState<C> {
    Uninitialized,
    Initializing,
    Ready(Arc<C>),
    Failed(String),
}

/// Observable snapshot of the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

/// Explicitly owned confidential-computation session.
///
/// Share it behind an `Arc`; every operation takes `&self`.
pub struct ConfidentialSession<R: FheRuntime> {
    runtime: R,
    network: FheNetworkConfig,
    state: RwLock<SessionState<R::Client>>,
    init_lock: Mutex<()>,
    completed_attempts: AtomicU64,
}

impl<R: FheRuntime> ConfidentialSession<R> {
    pub fn new(runtime: R, network: FheNetworkConfig) -> Self {
        Self {
            runtime,
            network,
            state: RwLock::new(SessionState::Uninitialized),
            init_lock: Mutex::new(()),
            completed_attempts: AtomicU64::new(0),
        }
    }

    pub fn network(&self) -> &FheNetworkConfig {
        &self.network
    }

    pub fn status(&self) -> SessionStatus {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SessionState::Uninitialized => SessionStatus::Uninitialized,
            SessionState::Initializing => SessionStatus::Initializing,
            SessionState::Ready(_) => SessionStatus::Ready,
            SessionState::Failed(message) => SessionStatus::Failed(message.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == SessionStatus::Ready
    }

    /// Set up the client. No-op once `Ready`; retries from `Failed`.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        if self.is_ready() {
            return Ok(());
        }

        let seen = self.completed_attempts.load(Ordering::Acquire);
        let _guard = self.init_lock.lock().await;

        if self.completed_attempts.load(Ordering::Acquire) != seen {
            return self.outcome();
        }
        if self.is_ready() {
            return Ok(());
        }

        self.set_state(SessionState::Initializing);
        info!(network = %self.network.name, "Initializing FHE session");

        let attempt = AttemptGuard::new(self);
        let result = self.create_client().await;
        attempt.complete();

        match result {
            Ok(client) => {
                self.set_state(SessionState::Ready(Arc::new(client)));
                info!(network = %self.network.name, "FHE session ready");
                Ok(())
            }
            Err(message) => {
                warn!(error = %message, "FHE session initialization failed");
                self.set_state(SessionState::Failed(message.clone()));
                Err(SessionError::InitializationFailed(message))
            }
        }
    }

    async fn create_client(&self) -> Result<R::Client, String> {
        self.runtime
            .initialize_runtime()
            .await
            .map_err(|e| e.to_string())?;
        self.runtime
            .create_instance(&self.network)
            .await
            .map_err(|e| e.to_string())
    }

    fn outcome(&self) -> Result<(), SessionError> {
        match self.status() {
            SessionStatus::Ready => Ok(()),
            SessionStatus::Failed(message) => Err(SessionError::InitializationFailed(message)),
            SessionStatus::Uninitialized | SessionStatus::Initializing => {
                Err(SessionError::NotInitialized)
            }
        }
    }

    fn set_state(&self, state: SessionState<R::Client>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn client(&self) -> Result<Arc<R::Client>, SessionError> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SessionState::Ready(client) => Ok(Arc::clone(client)),
            _ => Err(SessionError::NotInitialized),
        }
    }

    /// Encrypt a packed credential for `(contract, owner)`.
    ///
    /// The handle and proof are only accepted by `contract` when submitted by
    /// `owner`. Either both are returned or neither is.
    pub async fn encrypt(
        &self,
        value: &FixedWidthValue,
        contract: Address,
        owner: Address,
        cancel: &CancellationToken,
    ) -> Result<EncryptedCredential, SessionError> {
        let client = self.client()?;

        let mut input = EncryptedInput::new(contract, owner);
        input.add_address(*value);

        let EncryptedInputs {
            handles,
            input_proof,
        } = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = client.encrypt(input) => {
                result.map_err(|e| SessionError::EncryptionFailed(e.to_string()))?
            }
        };

        let handle = handles.into_iter().next().ok_or_else(|| {
            SessionError::EncryptionFailed("no ciphertext handle returned".to_string())
        })?;
        if input_proof.is_empty() {
            return Err(SessionError::EncryptionFailed(
                "empty input proof returned".to_string(),
            ));
        }

        debug!(
            handle = %handle,
            contract = %contract,
            owner = %owner,
            proof_len = input_proof.len(),
            "Credential encrypted"
        );

        Ok(EncryptedCredential {
            handle,
            proof: input_proof,
        })
    }

    /// Prove to the decryption service that `owner` may read `handle`, then
    /// unpack the revealed credential.
    ///
    /// Waits on `signer` without a time limit. Cancelling `cancel` (or
    /// dropping the future) abandons the attempt and leaves the session as it
    /// was.
    pub async fn authorize_and_decrypt<S>(
        &self,
        handle: CiphertextHandle,
        contract: Address,
        owner: Address,
        signer: &S,
        cancel: &CancellationToken,
    ) -> Result<String, SessionError>
    where
        S: StructuredSigner + ?Sized,
    {
        let client = self.client()?;
        let attempt_id = Uuid::new_v4();

        let keypair = client
            .generate_keypair()
            .map_err(|e| SessionError::RevealFailed(e.to_string()))?;

        let start_timestamp = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        let request = AuthorizationRequest::new(keypair.public_key(), contract, start_timestamp);
        let payload = client
            .authorization_payload(&request)
            .map_err(|e| SessionError::RevealFailed(e.to_string()))?;

        debug!(
            attempt = %attempt_id,
            handle = %handle,
            contract = %contract,
            key = %keypair.fingerprint(),
            "Requesting decryption grant signature"
        );

        let raw_signature = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(attempt = %attempt_id, "Decryption grant signing abandoned");
                return Err(SessionError::Cancelled);
            }
            result = signer.sign_typed_data(&payload) => {
                result.map_err(|e| SessionError::SigningFailed(e.to_string()))?
            }
        };

        let grant = AuthorizationGrant::new(request, payload, &raw_signature)?;
        let reveal = RevealRequest {
            pairs: vec![HandleContractPair { handle, contract }],
            private_key: keypair.private_key(),
            public_key: keypair.public_key(),
            signature: grant.signature(),
            contract_addresses: &grant.request().contract_addresses,
            user: owner,
            start_timestamp: grant.request().start_timestamp_string(),
            duration_days: grant.request().duration_days_string(),
        };

        let mut revealed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = client.reveal(reveal) => {
                result.map_err(|e| SessionError::RevealFailed(e.to_string()))?
            }
        };

        let Some(clear) = revealed.remove(&handle) else {
            warn!(attempt = %attempt_id, handle = %handle, "Decryption denied");
            return Err(SessionError::DecryptionDenied);
        };

        let value = match clear {
            ClearValue::Address(address) => FixedWidthValue::from(address),
            other => {
                return Err(CodecError::InvalidFormat(format!(
                    "expected an address cleartext, got {other}"
                ))
                .into())
            }
        };

        debug!(attempt = %attempt_id, handle = %handle, "Handle revealed");
        Ok(codec::decode(&value)?)
    }
}

/// Returns the session to `Uninitialized` if an initialization future is
/// dropped before it completes. An abandoned attempt is not counted, so
/// waiters run their own.
struct AttemptGuard<'a, R: FheRuntime> {
    session: &'a ConfidentialSession<R>,
    completed: bool,
}

impl<'a, R: FheRuntime> AttemptGuard<'a, R> {
    fn new(session: &'a ConfidentialSession<R>) -> Self {
        Self {
            session,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.completed = true;
        self.session
            .completed_attempts
            .fetch_add(1, Ordering::AcqRel);
    }
}

impl<R: FheRuntime> Drop for AttemptGuard<'_, R> {
    fn drop(&mut self) {
        if !self.completed {
            warn!("FHE session initialization abandoned");
            self.session.set_state(SessionState::Uninitialized);
        }
    }
}
