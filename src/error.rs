// src/error.rs
//! Error taxonomy for the credential lifecycle service.
//!
//! Failure reasons are tagged enums produced directly at the boundary that
//! observed them: the registry client classifies contract rejections, the
//! ledger reports persistence failures, and the coordinator exposes the
//! combined surface to callers. Nothing downstream reconstructs a failure
//! reason from an error message.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures produced by the registry client.
///
/// `Transport` is the only variant that is safely retryable, and only for
/// read operations; a write that fails with `Transport` has an unknown
/// outcome and must be re-checked via a fresh read before retrying.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A valid credential already exists for this fingerprint.
    #[error("a valid credential already exists for this fingerprint")]
    AlreadyExists,

    /// The credential was already revoked.
    #[error("credential is already revoked")]
    AlreadyRevoked,

    /// No credential exists for this fingerprint.
    #[error("no credential found for this fingerprint")]
    NotFound,

    /// The registry's own policy rejected the actor.
    #[error("actor is not authorized for this operation")]
    Unauthorized,

    /// Network-level failure or timeout; the call may not have reached the
    /// registry at all.
    #[error("registry transport failure: {0}")]
    Transport(String),

    /// The registry rejected the call for a reason outside the modeled
    /// taxonomy.
    #[error("registry rejected the call: {0}")]
    External(String),
}

/// Failures produced by the activity ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The blocking ledger task was cancelled or panicked.
    #[error("ledger task failed: {0}")]
    Task(String),
}

/// Failures produced by the content store collaborator.
#[derive(Error, Debug)]
pub enum ContentStoreError {
    #[error("content store backend error: {0}")]
    Backend(#[from] ipfs_api_backend_hyper::Error),

    #[error("content serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Caller-facing error surface of the lifecycle coordinator.
///
/// Distinguishes "the operation definitively did not happen" (everything
/// except `Transport { outcome_unknown: true }`) from "the outcome is
/// unknown"; the latter must prompt the caller to re-verify state before
/// retrying a state-changing operation.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Malformed fingerprint or actor identity, rejected before any side
    /// effect. No ledger record is written.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Quota exceeded for this actor. Retryable once `reset_at` passes; no
    /// ledger record and no registry call were made.
    #[error("rate limit exceeded, retry after {reset_at}")]
    RateLimited {
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
    },

    /// Revoke target does not exist on the registry.
    #[error("no credential found for this fingerprint")]
    NotFound,

    /// The actor is not the recorded issuer (or lacks issuance rights).
    #[error("actor is not authorized for this operation")]
    Unauthorized,

    /// Transport failure talking to the registry. `outcome_unknown` is set
    /// when a state-changing call may have landed despite the failure.
    #[error("registry transport failure: {detail}")]
    Transport { detail: String, outcome_unknown: bool },

    /// The registry rejected the call for an unmodeled reason.
    #[error("registry rejected the operation: {0}")]
    External(String),

    /// The operation outcome could not be recorded in the activity ledger.
    /// Surfaced loudly: an unrecorded operation must be treated as
    /// unverified. When the Execute stage itself also failed, its
    /// classification is carried in `operation_error`; when it succeeded,
    /// `external_ref` carries the transaction that did land.
    #[error("failed to record operation outcome: {source}")]
    LedgerWrite {
        #[source]
        source: LedgerError,
        operation_error: Option<String>,
        external_ref: Option<String>,
    },
}

impl LifecycleError {
    /// Maps an Execute-stage registry failure into the caller-facing
    /// taxonomy. `state_changing` marks write-type calls, whose transport
    /// failures leave the outcome unknown.
    ///
    /// `AlreadyExists`/`AlreadyRevoked` are intentionally absent: the
    /// coordinator maps those to idempotent no-op successes before this
    /// conversion applies.
    pub fn from_registry(err: RegistryError, state_changing: bool) -> Self {
        match err {
            RegistryError::NotFound => LifecycleError::NotFound,
            RegistryError::Unauthorized => LifecycleError::Unauthorized,
            RegistryError::Transport(detail) => LifecycleError::Transport {
                detail,
                outcome_unknown: state_changing,
            },
            RegistryError::External(detail) => LifecycleError::External(detail),
            RegistryError::AlreadyExists => {
                LifecycleError::External("unexpected duplicate-issue rejection".into())
            }
            RegistryError::AlreadyRevoked => {
                LifecycleError::External("unexpected duplicate-revoke rejection".into())
            }
        }
    }
}
