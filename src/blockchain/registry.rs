// src/blockchain/registry.rs
//! Typed interface over the external credential registry.
//!
//! The registry is an opaque external service exposing three capabilities,
//! all keyed by a 32-byte document fingerprint. The trait exists so the
//! lifecycle coordinator can be exercised against a test double; the
//! production implementation lives in [`crate::blockchain::evm_registry`].

use crate::error::RegistryError;
use crate::models::credential::{Credential, RegistryReceipt};
use crate::models::fingerprint::DocumentFingerprint;
use async_trait::async_trait;
use ethers_core::types::Address;

/// Async interface to the on-chain credential registry.
///
/// Semantics:
/// - `read_credential` is side-effect-free; implementations may retry it on
///   transport failure. `Ok(None)` means no credential exists.
/// - `write_credential` and `revoke_credential` are state-changing and must
///   be submitted at most once per call: implementations perform no hidden
///   retries; deciding whether a retry is safe belongs to the coordinator.
#[async_trait]
pub trait CredentialRegistry: Send + Sync {
    /// Reads the credential recorded for a fingerprint, if any.
    async fn read_credential(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Option<Credential>, RegistryError>;

    /// Records a new credential for the fingerprint on behalf of `actor`.
    ///
    /// Fails with [`RegistryError::AlreadyExists`] if a valid credential is
    /// already recorded, or [`RegistryError::Unauthorized`] if the registry's
    /// own policy denies the actor issuance rights.
    async fn write_credential(
        &self,
        fingerprint: &DocumentFingerprint,
        actor: Address,
        content_ref: Option<&str>,
    ) -> Result<RegistryReceipt, RegistryError>;

    /// Revokes the credential recorded for the fingerprint.
    ///
    /// Fails with [`RegistryError::NotFound`] if no credential exists,
    /// [`RegistryError::AlreadyRevoked`] if it was revoked before, or
    /// [`RegistryError::Unauthorized`] if `actor` is not the recorded issuer.
    async fn revoke_credential(
        &self,
        fingerprint: &DocumentFingerprint,
        actor: Address,
    ) -> Result<RegistryReceipt, RegistryError>;
}
