// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential-computation session: encryption of credentials and
//! signature-authorized user decryption.

pub mod grant;
pub mod session;
pub mod traits;

pub use grant::{AuthorizationGrant, AuthorizationRequest, GRANT_VALIDITY_DAYS};
pub use session::{ConfidentialSession, SessionStatus};
pub use traits::{
    ClearValue, EncryptedInput, EncryptedInputs, Encryptor, EphemeralKeyPair, FheClient,
    FheRuntime, HandleContractPair, RevealRequest, Revealer, StructuredSigner,
};
