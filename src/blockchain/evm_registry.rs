// src/blockchain/evm_registry.rs
//! zkSync-backed implementation of the credential registry client.
//!
//! Wraps a `zksync-web3-rs` provider and signing wallet around the deployed
//! CredentialRegistry contract. Reads go through the plain provider; writes
//! go through the era signer middleware. Every call carries a bounded
//! timeout, and read calls are retried on transport failure with a short
//! backoff. Write calls are never retried here: deciding whether a retry is
//! safe belongs to the lifecycle coordinator.
//!
//! Contract revert reasons are classified into the tagged registry error
//! taxonomy in exactly one place ([`classify_revert`]); nothing downstream
//! inspects error strings.

use crate::blockchain::registry::CredentialRegistry;
use crate::error::RegistryError;
use crate::models::credential::{Credential, RegistryReceipt};
use crate::models::fingerprint::DocumentFingerprint;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ethers_contract::{BaseContract, ContractError};
use ethers_core::{
    abi::Abi,
    types::{Address, H256, U256},
    utils::hex,
};
use k256::{ecdsa::SigningKey, elliptic_curve::generic_array::GenericArray};
use log::warn;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use zksync_web3_rs::{
    contract::Contract,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{Signer, Wallet},
    zks_wallet::ZKSWallet,
};

/// Base delay between read retries; doubled on each attempt.
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Gas limit for state-changing registry calls.
const WRITE_GAS_LIMIT: u64 = 3_000_000;

/// Registry client backed by the on-chain CredentialRegistry contract.
pub struct EvmRegistry {
    /// zkSync RPC provider for read-only calls
    provider: Arc<Provider<Http>>,
    /// zkSync wallet with signing capabilities for state-changing calls
    wallet: ZKSWallet<SignerMiddleware<Arc<Provider<Http>>, Wallet<SigningKey>>, SigningKey>,
    /// Deployed CredentialRegistry contract address
    contract_address: Address,
    /// Parsed contract interface, loaded once at construction
    base_contract: BaseContract,
    /// Upper bound on any single registry call
    call_timeout: Duration,
    /// How many times a read is retried on transport failure
    read_retries: u32,
}

impl EvmRegistry {
    /// Connects to the registry contract.
    ///
    /// # Arguments
    /// * `rpc_url` - zkSync RPC endpoint URL
    /// * `private_key` - hex-encoded signer key (with or without 0x prefix)
    /// * `contract_address` - deployed CredentialRegistry address
    /// * `call_timeout` - per-call deadline
    /// * `read_retries` - transport-failure retries for read calls
    ///
    /// # Errors
    /// Fails if the RPC connection cannot be established, the private key is
    /// invalid, or the contract address does not parse.
    pub async fn connect(
        rpc_url: &str,
        private_key: &str,
        contract_address: &str,
        call_timeout: Duration,
        read_retries: u32,
    ) -> anyhow::Result<Self> {
        let provider =
            Arc::new(Provider::<Http>::try_from(rpc_url).context("connecting to registry RPC")?);

        let key_hex = private_key.strip_prefix("0x").unwrap_or(private_key);
        let private_key_bytes = hex::decode(key_hex).context("decoding signer private key")?;
        let signing_key = SigningKey::from_bytes(GenericArray::from_slice(&private_key_bytes))
            .context("constructing signing key")?;

        let chain_id = provider
            .get_chainid()
            .await
            .context("fetching chain id")?
            .as_u64();
        let l2_wallet = Wallet::from(signing_key).with_chain_id(chain_id);

        let signer_middleware = SignerMiddleware::new(provider.clone(), l2_wallet.clone());
        let wallet = ZKSWallet::new(l2_wallet, None, Some(signer_middleware), None)
            .context("initializing zkSync wallet")?;

        let abi = Abi::load(include_bytes!("../abi/CredentialRegistry.json") as &[u8])
            .context("loading CredentialRegistry ABI")?;

        Ok(Self {
            provider,
            wallet,
            contract_address: Address::from_str(contract_address)
                .context("parsing registry contract address")?,
            base_contract: BaseContract::from(abi),
            call_timeout,
            read_retries,
        })
    }

    /// Single read attempt against `getCredential`.
    async fn try_read(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Option<Credential>, RegistryError> {
        let contract = Contract::new(
            self.contract_address,
            self.base_contract.clone(),
            self.provider.clone(),
        );

        let call = contract
            .method::<_, (Address, bool, String, U256, bool)>(
                "getCredential",
                fingerprint.as_bytes(),
            )
            .map_err(|e| RegistryError::External(format!("abi error: {}", e)))?;

        let (issuer, valid, content_ref, issued_at, exists) =
            match timeout(self.call_timeout, call.call()).await {
                Ok(Ok(value)) => value,
                Ok(Err(e)) => return Err(map_contract_error(e)),
                Err(_) => return Err(timeout_error(self.call_timeout)),
            };

        if !exists {
            return Ok(None);
        }

        Ok(Some(Credential {
            issuer,
            fingerprint: *fingerprint,
            valid,
            content_ref: if content_ref.is_empty() {
                None
            } else {
                Some(content_ref)
            },
            issued_at: Utc
                .timestamp_opt(issued_at.as_u64() as i64, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }))
    }

    /// Submits a state-changing contract call and waits for the transaction
    /// hash. No retries: on transport failure the outcome is unknown and the
    /// caller must re-check via a read.
    async fn send_write(
        &self,
        method: &str,
        params: (
            [u8; 32],
            Address,
            Option<String>,
        ),
    ) -> Result<RegistryReceipt, RegistryError> {
        let era_provider = self
            .wallet
            .get_era_provider()
            .map_err(|e| RegistryError::Transport(format!("signer unavailable: {}", e)))?;

        let contract = Contract::new(
            self.contract_address,
            self.base_contract.clone(),
            era_provider.clone(),
        );

        let (fingerprint, actor, content_ref) = params;
        let call = match content_ref {
            Some(content_ref) => contract
                .method::<_, H256>(method, (fingerprint, actor, content_ref))
                .map_err(|e| RegistryError::External(format!("abi error: {}", e)))?,
            None => contract
                .method::<_, H256>(method, (fingerprint, actor))
                .map_err(|e| RegistryError::External(format!("abi error: {}", e)))?,
        };
        let call = call.gas(U256::from(WRITE_GAS_LIMIT));

        let pending_tx = match timeout(self.call_timeout, call.send()).await {
            Ok(Ok(tx)) => tx,
            Ok(Err(e)) => return Err(map_contract_error(e)),
            Err(_) => return Err(timeout_error(self.call_timeout)),
        };

        Ok(RegistryReceipt {
            external_ref: format!("0x{:x}", pending_tx.tx_hash()),
            confirmed_at: Utc::now(),
        })
    }
}

#[async_trait]
impl CredentialRegistry for EvmRegistry {
    async fn read_credential(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Option<Credential>, RegistryError> {
        let mut attempt = 0u32;
        loop {
            match self.try_read(fingerprint).await {
                Err(RegistryError::Transport(detail)) if attempt < self.read_retries => {
                    attempt += 1;
                    let backoff = READ_RETRY_BACKOFF * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "registry read failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.read_retries, backoff, detail
                    );
                    sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    async fn write_credential(
        &self,
        fingerprint: &DocumentFingerprint,
        actor: Address,
        content_ref: Option<&str>,
    ) -> Result<RegistryReceipt, RegistryError> {
        self.send_write(
            "issueCredential",
            (
                fingerprint.as_bytes(),
                actor,
                Some(content_ref.unwrap_or_default().to_string()),
            ),
        )
        .await
    }

    async fn revoke_credential(
        &self,
        fingerprint: &DocumentFingerprint,
        actor: Address,
    ) -> Result<RegistryReceipt, RegistryError> {
        self.send_write("revokeCredential", (fingerprint.as_bytes(), actor, None))
            .await
    }
}

fn timeout_error(deadline: Duration) -> RegistryError {
    RegistryError::Transport(format!("registry call timed out after {:?}", deadline))
}

/// Maps a contract call failure into the tagged registry taxonomy.
///
/// A decodable revert reason means the registry itself rejected the call;
/// anything else never reached (or never returned from) the contract and is
/// classified as transport.
fn map_contract_error<M: Middleware>(err: ContractError<M>) -> RegistryError {
    if let Some(reason) = err.decode_revert::<String>() {
        return classify_revert(&reason);
    }
    RegistryError::Transport(err.to_string())
}

/// Classifies a revert reason string from the CredentialRegistry contract.
///
/// This is the single place failure reasons are read out of contract
/// messages; unknown reasons become [`RegistryError::External`].
fn classify_revert(reason: &str) -> RegistryError {
    let normalized = reason.to_ascii_lowercase();
    if normalized.contains("already exists") || normalized.contains("already issued") {
        RegistryError::AlreadyExists
    } else if normalized.contains("already revoked") {
        RegistryError::AlreadyRevoked
    } else if normalized.contains("not found") || normalized.contains("no credential") {
        RegistryError::NotFound
    } else if normalized.contains("unauthorized")
        || normalized.contains("not authorized")
        || normalized.contains("not the issuer")
    {
        RegistryError::Unauthorized
    } else {
        RegistryError::External(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_revert_reasons() {
        assert!(matches!(
            classify_revert("Credential already exists"),
            RegistryError::AlreadyExists
        ));
        assert!(matches!(
            classify_revert("credential already issued for fingerprint"),
            RegistryError::AlreadyExists
        ));
        assert!(matches!(
            classify_revert("Credential already revoked"),
            RegistryError::AlreadyRevoked
        ));
        assert!(matches!(
            classify_revert("credential not found"),
            RegistryError::NotFound
        ));
        assert!(matches!(
            classify_revert("caller is not the issuer"),
            RegistryError::Unauthorized
        ));
        assert!(matches!(
            classify_revert("Unauthorized"),
            RegistryError::Unauthorized
        ));
    }

    #[test]
    fn test_unknown_revert_reason_is_external() {
        match classify_revert("paused by governance") {
            RegistryError::External(reason) => assert_eq!(reason, "paused by governance"),
            other => panic!("unexpected classification: {:?}", other),
        }
    }
}
