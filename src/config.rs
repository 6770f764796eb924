// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! by password keeper clients. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `KEEPER_CONTRACT_ADDRESS` | Deployed PasswordKeeper contract | Required |
//! | `FHE_NETWORK` | FHE network identifier (only `sepolia`) | `sepolia` |
//! | `RPC_URL` | EVM JSON-RPC endpoint | Sepolia public RPC |
//! | `RELAYER_URL` | FHE relayer endpoint | Zama testnet relayer |
//! | `KEEPER_SIGNER_PEM_FILE` | PEM secp256k1 key of the writing wallet | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::fs;
use std::path::PathBuf;

use alloy::{primitives::Address, providers::DynProvider, signers::local::PrivateKeySigner};
use url::Url;

use crate::blockchain::signing::signer_from_pem;
use crate::blockchain::{ensure_sepolia_network, FheNetworkConfig, PasswordKeeperContract};
use crate::error::{ConfigError, LedgerError};
use crate::logging::LogFormat;

/// Environment variable name for the PasswordKeeper contract address.
///
/// Ciphertexts are bound to this address; a handle encrypted for one
/// deployment cannot be stored in or decrypted through another.
pub const CONTRACT_ADDRESS_ENV: &str = "KEEPER_CONTRACT_ADDRESS";

/// Environment variable name for the FHE network identifier.
pub const NETWORK_ENV: &str = "FHE_NETWORK";

/// Environment variable name for the JSON-RPC endpoint override.
pub const RPC_URL_ENV: &str = "RPC_URL";

/// Environment variable name for the relayer endpoint override.
pub const RELAYER_URL_ENV: &str = "RELAYER_URL";

/// Environment variable name for the wallet key file.
///
/// SEC1 or PKCS#8 PEM. The same wallet writes to the ledger and signs
/// decryption grants for its own entries.
pub const SIGNER_PEM_FILE_ENV: &str = "KEEPER_SIGNER_PEM_FILE";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Client configuration resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperConfig {
    pub contract: Address,
    pub network: FheNetworkConfig,
    pub signer_pem_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl KeeperConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load using `lookup` to resolve variables. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let raw_contract = var(CONTRACT_ADDRESS_ENV).ok_or(ConfigError::Missing(CONTRACT_ADDRESS_ENV))?;
        let contract = raw_contract
            .trim()
            .parse::<Address>()
            .map_err(|e| ConfigError::Invalid {
                name: CONTRACT_ADDRESS_ENV,
                reason: e.to_string(),
            })?;
        if contract == Address::ZERO {
            return Err(ConfigError::Invalid {
                name: CONTRACT_ADDRESS_ENV,
                reason: "contract address is not configured".to_string(),
            });
        }

        ensure_sepolia_network(var(NETWORK_ENV).as_deref()).map_err(|reason| {
            ConfigError::Invalid {
                name: NETWORK_ENV,
                reason,
            }
        })?;

        let mut network = FheNetworkConfig::sepolia();
        if let Some(rpc_url) = var(RPC_URL_ENV) {
            network.rpc_url = parse_url(RPC_URL_ENV, &rpc_url)?;
        }
        if let Some(relayer_url) = var(RELAYER_URL_ENV) {
            network.relayer_url = parse_url(RELAYER_URL_ENV, &relayer_url)?;
        }

        let log_format = match var(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            contract,
            network,
            signer_pem_file: var(SIGNER_PEM_FILE_ENV).map(PathBuf::from),
            log_format,
        })
    }

    /// Read the wallet key named by `KEEPER_SIGNER_PEM_FILE`.
    pub fn load_signer(&self) -> Result<PrivateKeySigner, ConfigError> {
        let path = self
            .signer_pem_file
            .as_ref()
            .ok_or(ConfigError::Missing(SIGNER_PEM_FILE_ENV))?;
        let invalid = |reason: String| ConfigError::Invalid {
            name: SIGNER_PEM_FILE_ENV,
            reason,
        };

        let pem_bytes = fs::read(path).map_err(|e| invalid(format!("{}: {e}", path.display())))?;
        signer_from_pem(&pem_bytes).map_err(|e| invalid(e.to_string()))
    }

    /// HTTP client for the configured contract, writing as `signer`.
    pub fn connect_ledger(
        &self,
        signer: PrivateKeySigner,
    ) -> Result<PasswordKeeperContract<DynProvider>, LedgerError> {
        PasswordKeeperContract::connect(&self.network.rpc_url, self.contract, signer)
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}
