// src/models/credential.rs
//! On-chain credential data model.
//!
//! Defines the read-side view of a document credential as recorded by the
//! external registry contract. The registry is the single source of truth
//! for the valid/invalid transition; this model is never mutated locally.

use crate::models::fingerprint::DocumentFingerprint;
use chrono::{DateTime, Utc};
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};

/// A document credential as recorded on the external registry.
///
/// Created by a write-credential call and transitioned valid→invalid exactly
/// once by a revoke; never deleted.
///
/// # Fields
/// - `issuer`: on-chain address of the actor the credential was issued for
/// - `fingerprint`: 32-byte content digest of the underlying document
/// - `valid`: `false` once revoked
/// - `content_ref`: optional opaque reference to the document content
///   (e.g. an IPFS CID)
/// - `issued_at`: registry-recorded issuance timestamp
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Credential {
    /// Address recorded on-chain as the credential's issuer
    pub issuer: Address,

    /// Content digest the credential attests to
    pub fingerprint: DocumentFingerprint,

    /// Whether the credential is still valid (not revoked)
    pub valid: bool,

    /// Optional content reference, e.g. an IPFS CID
    pub content_ref: Option<String>,

    /// When the registry recorded the issuance
    pub issued_at: DateTime<Utc>,
}

/// Receipt returned by a state-changing registry call.
///
/// `external_ref` is the opaque transaction reference; `confirmed_at` is the
/// confirmation timestamp under the synchronous-confirmation model.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegistryReceipt {
    /// Transaction reference returned by the registry
    pub external_ref: String,

    /// When the call was confirmed
    pub confirmed_at: DateTime<Utc>,
}
