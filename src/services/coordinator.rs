// src/services/coordinator.rs
//! Credential lifecycle coordinator.
//!
//! Orchestrates the issue, verify, and revoke workflows over the
//! registry client, the rate limiter, and the activity ledger. Every
//! operation follows the same stages:
//!
//! Validate → RateGate → Execute → Record → Respond
//!
//! Validation failures and rate-limit denials short-circuit before any
//! registry call and leave no ledger record. Every Execute attempt, success
//! or failure, appends exactly one activity record; a failure to append is
//! surfaced loudly rather than swallowed, since an operation whose outcome
//! cannot be recorded must be treated as unverified.
//!
//! Idempotency: issue and revoke pre-check registry state and short-circuit
//! on already-issued / already-revoked. Two concurrent calls can still race
//! to the registry; the registry is the single arbiter of the valid/invalid
//! transition, and its AlreadyExists/AlreadyRevoked rejection of the race
//! loser is mapped to the same no-op success the pre-check would have
//! produced.

use crate::blockchain::registry::CredentialRegistry;
use crate::error::{LifecycleError, RegistryError};
use crate::models::activity::{ActivityStatus, NewActivity, Operation};
use crate::models::credential::{Credential, RegistryReceipt};
use crate::models::fingerprint::DocumentFingerprint;
use crate::services::rate_limiter::RateLimiter;
use crate::storage::activity_ledger::ActivityLedger;
use ethers_core::types::Address;
use log::{info, warn};
use std::str::FromStr;
use std::sync::Arc;

/// Result of an issue workflow.
#[derive(Debug, Clone)]
pub enum IssueOutcome {
    /// A new credential was recorded on the registry.
    Issued { receipt: RegistryReceipt },
    /// A valid credential already existed; idempotent no-op.
    AlreadyIssued,
}

/// Result of a verify workflow. A missing credential is a legitimate,
/// reportable outcome, not an error.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub found: bool,
    pub credential: Option<Credential>,
}

/// Result of a revoke workflow.
#[derive(Debug, Clone)]
pub enum RevokeOutcome {
    /// The credential was revoked on the registry.
    Revoked { receipt: RegistryReceipt },
    /// The credential was already revoked; idempotent no-op.
    AlreadyRevoked,
}

/// Coordinates the credential lifecycle across the registry, the rate
/// limiter, and the activity ledger.
///
/// Generic over the registry client so tests can substitute a double. The
/// coordinator exclusively owns the decision to call the registry and to
/// append to the ledger.
pub struct LifecycleCoordinator<R: CredentialRegistry> {
    registry: Arc<R>,
    ledger: ActivityLedger,
    rate_limiter: Arc<RateLimiter>,
}

impl<R: CredentialRegistry> LifecycleCoordinator<R> {
    pub fn new(registry: Arc<R>, ledger: ActivityLedger, rate_limiter: Arc<RateLimiter>) -> Self {
        LifecycleCoordinator {
            registry,
            ledger,
            rate_limiter,
        }
    }

    /// Read access to the activity ledger for the history view.
    pub fn ledger(&self) -> &ActivityLedger {
        &self.ledger
    }

    /// Issues a credential for `fingerprint` on behalf of `actor`.
    ///
    /// Pre-checks the registry: if a valid credential already exists the
    /// workflow short-circuits with [`IssueOutcome::AlreadyIssued`] and no
    /// write is attempted. A registry-side `AlreadyExists` rejection (a lost
    /// race) maps to the same outcome.
    pub async fn issue(
        &self,
        fingerprint: &str,
        actor: &str,
        content_ref: Option<String>,
    ) -> Result<IssueOutcome, LifecycleError> {
        // Validate
        let fingerprint = parse_fingerprint(fingerprint)?;
        let (actor_addr, actor_key) = parse_actor(actor)?;

        // RateGate
        self.gate(&actor_key)?;

        // Execute: read-before-write idempotency check
        let execute = self.execute_issue(&fingerprint, actor_addr, content_ref).await;

        // Record
        let external_ref = match &execute {
            Ok(IssueOutcome::Issued { receipt }) => Some(receipt.external_ref.clone()),
            _ => None,
        };
        self.record(
            Operation::Issue,
            Some(actor_key),
            fingerprint,
            execute.as_ref().map(|_| ()).map_err(|e| e.to_string()),
            external_ref,
        )
        .await?;

        // Respond
        execute
    }

    /// Verifies the credential state recorded for `fingerprint`.
    ///
    /// Read path: exempt from rate limiting. `NotFound` on the registry is
    /// translated into a successful "not issued" outcome.
    pub async fn verify(&self, fingerprint: &str) -> Result<VerifyOutcome, LifecycleError> {
        // Validate
        let fingerprint = parse_fingerprint(fingerprint)?;

        // Execute
        let execute = match self.registry.read_credential(&fingerprint).await {
            Ok(credential) => Ok(VerifyOutcome {
                found: credential.is_some(),
                credential,
            }),
            Err(err) => Err(LifecycleError::from_registry(err, false)),
        };

        // Record: status reflects whether the lookup itself succeeded
        self.record(
            Operation::Verify,
            None,
            fingerprint,
            execute.as_ref().map(|_| ()).map_err(|e| e.to_string()),
            None,
        )
        .await?;

        execute
    }

    /// Revokes the credential recorded for `fingerprint`.
    ///
    /// Pre-checks the registry to fail cheaply on missing credentials,
    /// foreign issuers, and already-revoked state. A registry-side
    /// `AlreadyRevoked` rejection (a lost race) maps to the same no-op
    /// outcome as the pre-check.
    pub async fn revoke(
        &self,
        fingerprint: &str,
        actor: &str,
    ) -> Result<RevokeOutcome, LifecycleError> {
        // Validate
        let fingerprint = parse_fingerprint(fingerprint)?;
        let (actor_addr, actor_key) = parse_actor(actor)?;

        // RateGate
        self.gate(&actor_key)?;

        // Execute
        let execute = self.execute_revoke(&fingerprint, actor_addr).await;

        // Record
        let external_ref = match &execute {
            Ok(RevokeOutcome::Revoked { receipt }) => Some(receipt.external_ref.clone()),
            _ => None,
        };
        self.record(
            Operation::Revoke,
            Some(actor_key),
            fingerprint,
            execute.as_ref().map(|_| ()).map_err(|e| e.to_string()),
            external_ref,
        )
        .await?;

        execute
    }

    /// Rate gate for state-changing operations.
    fn gate(&self, actor_key: &str) -> Result<(), LifecycleError> {
        let decision = self.rate_limiter.check(actor_key);
        if decision.allowed {
            return Ok(());
        }
        warn!(
            "rate limit exceeded for actor {}, window resets at {}",
            actor_key, decision.reset_at
        );
        Err(LifecycleError::RateLimited {
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at: decision.reset_at,
        })
    }

    async fn execute_issue(
        &self,
        fingerprint: &DocumentFingerprint,
        actor: Address,
        content_ref: Option<String>,
    ) -> Result<IssueOutcome, LifecycleError> {
        match self.registry.read_credential(fingerprint).await {
            Ok(Some(existing)) if existing.valid => {
                info!("issue short-circuit, credential already valid for {}", fingerprint);
                return Ok(IssueOutcome::AlreadyIssued);
            }
            Ok(_) => {}
            Err(err) => return Err(LifecycleError::from_registry(err, false)),
        }

        match self
            .registry
            .write_credential(fingerprint, actor, content_ref.as_deref())
            .await
        {
            Ok(receipt) => {
                info!(
                    "issued credential for {} in tx {}",
                    fingerprint, receipt.external_ref
                );
                Ok(IssueOutcome::Issued { receipt })
            }
            // Race loser: the registry observed a concurrent issue first.
            Err(RegistryError::AlreadyExists) => Ok(IssueOutcome::AlreadyIssued),
            Err(err) => Err(LifecycleError::from_registry(err, true)),
        }
    }

    async fn execute_revoke(
        &self,
        fingerprint: &DocumentFingerprint,
        actor: Address,
    ) -> Result<RevokeOutcome, LifecycleError> {
        match self.registry.read_credential(fingerprint).await {
            Ok(None) => return Err(LifecycleError::NotFound),
            Ok(Some(existing)) if !existing.valid => {
                info!("revoke short-circuit, credential already revoked for {}", fingerprint);
                return Ok(RevokeOutcome::AlreadyRevoked);
            }
            Ok(Some(existing)) if existing.issuer != actor => {
                return Err(LifecycleError::Unauthorized);
            }
            Ok(Some(_)) => {}
            Err(err) => return Err(LifecycleError::from_registry(err, false)),
        }

        match self.registry.revoke_credential(fingerprint, actor).await {
            Ok(receipt) => {
                info!(
                    "revoked credential for {} in tx {}",
                    fingerprint, receipt.external_ref
                );
                Ok(RevokeOutcome::Revoked { receipt })
            }
            // Race loser: a concurrent revoke landed first.
            Err(RegistryError::AlreadyRevoked) => Ok(RevokeOutcome::AlreadyRevoked),
            Err(err) => Err(LifecycleError::from_registry(err, true)),
        }
    }

    /// Record stage: appends exactly one activity record for an Execute
    /// attempt. On append failure the ledger error is layered on top of the
    /// operation outcome instead of hiding either side.
    async fn record(
        &self,
        operation: Operation,
        actor: Option<String>,
        fingerprint: DocumentFingerprint,
        execute: Result<(), String>,
        external_ref: Option<String>,
    ) -> Result<(), LifecycleError> {
        let status = match &execute {
            Ok(()) => ActivityStatus::Success,
            Err(_) => ActivityStatus::Failed,
        };
        let result = self
            .ledger
            .append(NewActivity {
                actor,
                operation,
                fingerprint,
                status,
                external_ref: external_ref.clone(),
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(source) => {
                warn!("failed to record {} outcome: {}", operation, source);
                Err(LifecycleError::LedgerWrite {
                    source,
                    operation_error: execute.err(),
                    external_ref,
                })
            }
        }
    }
}

fn parse_fingerprint(input: &str) -> Result<DocumentFingerprint, LifecycleError> {
    DocumentFingerprint::from_str(input)
        .map_err(|e| LifecycleError::InvalidInput(e.to_string()))
}

/// Parses an actor identity, returning both the on-chain address and the
/// canonical lowercase string used as ledger/rate-limit key.
fn parse_actor(input: &str) -> Result<(Address, String), LifecycleError> {
    let addr = Address::from_str(input)
        .map_err(|_| LifecycleError::InvalidInput(format!("malformed actor address '{}'", input)))?;
    Ok((addr, format!("0x{:x}", addr)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityFilter;
    use crate::utils::crypto::fingerprint;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const ACTOR_A: &str = "0x00000000000000000000000000000000000000aa";
    const ACTOR_B: &str = "0x00000000000000000000000000000000000000bb";

    /// In-memory registry double with injectable failures and call counters.
    #[derive(Default)]
    struct MockRegistry {
        state: Mutex<HashMap<DocumentFingerprint, Credential>>,
        read_errors: Mutex<Vec<RegistryError>>,
        write_errors: Mutex<Vec<RegistryError>>,
        revoke_errors: Mutex<Vec<RegistryError>>,
        read_calls: AtomicUsize,
        write_calls: AtomicUsize,
        revoke_calls: AtomicUsize,
    }

    impl MockRegistry {
        fn queue_read_error(&self, err: RegistryError) {
            self.read_errors.lock().unwrap().push(err);
        }

        fn queue_write_error(&self, err: RegistryError) {
            self.write_errors.lock().unwrap().push(err);
        }

        fn queue_revoke_error(&self, err: RegistryError) {
            self.revoke_errors.lock().unwrap().push(err);
        }
    }

    #[async_trait]
    impl CredentialRegistry for MockRegistry {
        async fn read_credential(
            &self,
            fingerprint: &DocumentFingerprint,
        ) -> Result<Option<Credential>, RegistryError> {
            self.read_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.read_errors.lock().unwrap().pop() {
                return Err(err);
            }
            Ok(self.state.lock().unwrap().get(fingerprint).cloned())
        }

        async fn write_credential(
            &self,
            fingerprint: &DocumentFingerprint,
            actor: Address,
            content_ref: Option<&str>,
        ) -> Result<RegistryReceipt, RegistryError> {
            let call = self.write_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.write_errors.lock().unwrap().pop() {
                return Err(err);
            }
            let mut state = self.state.lock().unwrap();
            if state.get(fingerprint).map(|c| c.valid).unwrap_or(false) {
                return Err(RegistryError::AlreadyExists);
            }
            state.insert(
                *fingerprint,
                Credential {
                    issuer: actor,
                    fingerprint: *fingerprint,
                    valid: true,
                    content_ref: content_ref.filter(|r| !r.is_empty()).map(String::from),
                    issued_at: Utc::now(),
                },
            );
            Ok(RegistryReceipt {
                external_ref: format!("0xtx{}", call),
                confirmed_at: Utc::now(),
            })
        }

        async fn revoke_credential(
            &self,
            fingerprint: &DocumentFingerprint,
            actor: Address,
        ) -> Result<RegistryReceipt, RegistryError> {
            let call = self.revoke_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.revoke_errors.lock().unwrap().pop() {
                return Err(err);
            }
            let mut state = self.state.lock().unwrap();
            let credential = state.get_mut(fingerprint).ok_or(RegistryError::NotFound)?;
            if !credential.valid {
                return Err(RegistryError::AlreadyRevoked);
            }
            if credential.issuer != actor {
                return Err(RegistryError::Unauthorized);
            }
            credential.valid = false;
            Ok(RegistryReceipt {
                external_ref: format!("0xrv{}", call),
                confirmed_at: Utc::now(),
            })
        }
    }

    fn coordinator_with_quota(
        registry: Arc<MockRegistry>,
        quota: u32,
    ) -> LifecycleCoordinator<MockRegistry> {
        LifecycleCoordinator::new(
            registry,
            ActivityLedger::open_in_memory().unwrap(),
            Arc::new(RateLimiter::new(quota, Duration::from_secs(60))),
        )
    }

    fn coordinator(registry: Arc<MockRegistry>) -> LifecycleCoordinator<MockRegistry> {
        coordinator_with_quota(registry, 100)
    }

    async fn rows(
        coordinator: &LifecycleCoordinator<MockRegistry>,
        operation: Operation,
    ) -> Vec<crate::models::activity::ActivityRecord> {
        coordinator
            .ledger()
            .query(ActivityFilter {
                operation: Some(operation),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_issue_twice_short_circuits_second_call() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator(registry.clone());
        let fp = fingerprint(b"diploma").to_string();

        let first = coordinator.issue(&fp, ACTOR_A, Some("ref1".into())).await.unwrap();
        match first {
            IssueOutcome::Issued { receipt } => assert_eq!(receipt.external_ref, "0xtx0"),
            other => panic!("expected Issued, got {:?}", other),
        }

        let second = coordinator.issue(&fp, ACTOR_A, Some("ref1".into())).await.unwrap();
        assert!(matches!(second, IssueOutcome::AlreadyIssued));

        // The second call never reached the registry write.
        assert_eq!(registry.write_calls.load(Ordering::SeqCst), 1);

        // Both attempts were recorded.
        let records = rows(&coordinator, Operation::Issue).await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == ActivityStatus::Success));
        assert_eq!(records[1].external_ref.as_deref(), Some("0xtx0"));
        assert_eq!(records[0].external_ref, None);
    }

    #[tokio::test]
    async fn test_revoke_already_revoked_short_circuits() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator(registry.clone());
        let fp = fingerprint(b"license").to_string();

        coordinator.issue(&fp, ACTOR_A, None).await.unwrap();
        let revoked = coordinator.revoke(&fp, ACTOR_A).await.unwrap();
        assert!(matches!(revoked, RevokeOutcome::Revoked { .. }));

        let again = coordinator.revoke(&fp, ACTOR_A).await.unwrap();
        assert!(matches!(again, RevokeOutcome::AlreadyRevoked));
        assert_eq!(registry.revoke_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_leaves_no_trace() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator(registry.clone());

        let bad_fp = coordinator.issue("not-a-fingerprint", ACTOR_A, None).await;
        assert!(matches!(bad_fp, Err(LifecycleError::InvalidInput(_))));

        let good_fp = fingerprint(b"doc").to_string();
        let bad_actor = coordinator.issue(&good_fp, "0xnothex", None).await;
        assert!(matches!(bad_actor, Err(LifecycleError::InvalidInput(_))));

        // Rejected before any external call or ledger write.
        assert_eq!(registry.read_calls.load(Ordering::SeqCst), 0);
        let records = coordinator.ledger().query(ActivityFilter::default()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_rate_gate_denies_before_any_side_effect() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator_with_quota(registry.clone(), 1);

        let fp1 = fingerprint(b"doc-1").to_string();
        let fp2 = fingerprint(b"doc-2").to_string();

        coordinator.issue(&fp1, ACTOR_A, None).await.unwrap();

        let denied = coordinator.issue(&fp2, ACTOR_A, None).await;
        match denied {
            Err(LifecycleError::RateLimited { limit, remaining, reset_at }) => {
                assert_eq!(limit, 1);
                assert_eq!(remaining, 0);
                assert!(reset_at > Utc::now());
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }

        // No registry call and no ledger record for the denied attempt.
        assert_eq!(registry.read_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rows(&coordinator, Operation::Issue).await.len(), 1);
    }

    #[tokio::test]
    async fn test_verify_is_exempt_from_rate_limiting() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator_with_quota(registry.clone(), 1);
        let fp = fingerprint(b"doc").to_string();

        coordinator.issue(&fp, ACTOR_A, None).await.unwrap();
        for _ in 0..5 {
            coordinator.verify(&fp).await.unwrap();
        }
        assert_eq!(rows(&coordinator, Operation::Verify).await.len(), 5);
    }

    #[tokio::test]
    async fn test_verify_not_found_is_a_successful_outcome() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator(registry);

        let outcome = coordinator
            .verify(&fingerprint(b"never-issued").to_string())
            .await
            .unwrap();
        assert!(!outcome.found);
        assert!(outcome.credential.is_none());

        let records = rows(&coordinator, Operation::Verify).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ActivityStatus::Success);
        assert!(records[0].actor.is_none());
    }

    #[tokio::test]
    async fn test_failed_lookup_is_recorded_as_failed() {
        let registry = Arc::new(MockRegistry::default());
        registry.queue_read_error(RegistryError::Transport("connection refused".into()));
        let coordinator = coordinator(registry);

        let outcome = coordinator.verify(&fingerprint(b"doc").to_string()).await;
        match outcome {
            Err(LifecycleError::Transport { outcome_unknown, .. }) => {
                assert!(!outcome_unknown)
            }
            other => panic!("expected Transport, got {:?}", other),
        }

        let records = rows(&coordinator, Operation::Verify).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ActivityStatus::Failed);
    }

    #[tokio::test]
    async fn test_every_execute_attempt_yields_exactly_one_record() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator(registry.clone());
        let fp = fingerprint(b"doc").to_string();

        // success
        coordinator.issue(&fp, ACTOR_A, None).await.unwrap();
        // idempotent no-op
        coordinator.issue(&fp, ACTOR_A, None).await.unwrap();
        // transport failure during write
        let fp2 = fingerprint(b"doc-2").to_string();
        registry.queue_write_error(RegistryError::Transport("timeout".into()));
        let failed = coordinator.issue(&fp2, ACTOR_A, None).await;
        match failed {
            Err(LifecycleError::Transport { outcome_unknown, .. }) => assert!(outcome_unknown),
            other => panic!("expected Transport, got {:?}", other),
        }

        let records = rows(&coordinator, Operation::Issue).await;
        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().filter(|r| r.status == ActivityStatus::Failed).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_registry_race_rejections_map_to_no_op_success() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator(registry.clone());

        // Issue race: pre-check sees nothing, the write loses to a
        // concurrent issuer.
        let fp = fingerprint(b"contested").to_string();
        registry.queue_write_error(RegistryError::AlreadyExists);
        let outcome = coordinator.issue(&fp, ACTOR_A, None).await.unwrap();
        assert!(matches!(outcome, IssueOutcome::AlreadyIssued));
        assert_eq!(
            rows(&coordinator, Operation::Issue).await[0].status,
            ActivityStatus::Success
        );

        // Revoke race: pre-check sees a valid credential, the revoke loses.
        let fp2 = fingerprint(b"contested-2").to_string();
        coordinator.issue(&fp2, ACTOR_A, None).await.unwrap();
        registry.queue_revoke_error(RegistryError::AlreadyRevoked);
        let outcome = coordinator.revoke(&fp2, ACTOR_A).await.unwrap();
        assert!(matches!(outcome, RevokeOutcome::AlreadyRevoked));
    }

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator(registry.clone());
        let fp = fingerprint(b"title-deed").to_string();

        // Never issued: verify reports not-found, successfully.
        let before = coordinator.verify(&fp).await.unwrap();
        assert!(!before.found);

        // Issue by actor A.
        let issued = coordinator.issue(&fp, ACTOR_A, Some("ref1".into())).await.unwrap();
        assert!(matches!(issued, IssueOutcome::Issued { .. }));

        // Verify reports the issued credential.
        let after_issue = coordinator.verify(&fp).await.unwrap();
        assert!(after_issue.found);
        let credential = after_issue.credential.unwrap();
        assert!(credential.valid);
        assert_eq!(format!("0x{:x}", credential.issuer), ACTOR_A);
        assert_eq!(credential.content_ref.as_deref(), Some("ref1"));

        // A different actor cannot revoke; the registry's revoke operation
        // is never reached (the pre-check fails first).
        let foreign = coordinator.revoke(&fp, ACTOR_B).await;
        assert!(matches!(foreign, Err(LifecycleError::Unauthorized)));
        assert_eq!(registry.revoke_calls.load(Ordering::SeqCst), 0);

        // The issuer revokes.
        let revoked = coordinator.revoke(&fp, ACTOR_A).await.unwrap();
        assert!(matches!(revoked, RevokeOutcome::Revoked { .. }));

        // Verify now reports invalid.
        let after_revoke = coordinator.verify(&fp).await.unwrap();
        assert!(after_revoke.found);
        assert!(!after_revoke.credential.unwrap().valid);
    }

    #[tokio::test]
    async fn test_revoke_missing_credential_is_not_found() {
        let registry = Arc::new(MockRegistry::default());
        let coordinator = coordinator(registry.clone());

        let outcome = coordinator
            .revoke(&fingerprint(b"ghost").to_string(), ACTOR_A)
            .await;
        assert!(matches!(outcome, Err(LifecycleError::NotFound)));
        assert_eq!(registry.revoke_calls.load(Ordering::SeqCst), 0);

        // The failed attempt is still part of the audit trail.
        let records = rows(&coordinator, Operation::Revoke).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ActivityStatus::Failed);
    }
}
