// src/models/activity.rs
//! Activity ledger data model.
//!
//! Every attempted lifecycle operation, successful or not, is captured as
//! an `ActivityRecord`. The ledger is a log, not a keyed table: multiple
//! records may exist for the same fingerprint, and current credential state
//! is always derived from the registry, never inferred from the ledger.

use crate::models::fingerprint::DocumentFingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle operation kinds recorded in the ledger.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Issue,
    Verify,
    Revoke,
}

impl Operation {
    /// Stable text form used for ledger storage and query filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Issue => "issue",
            Operation::Verify => "verify",
            Operation::Revoke => "revoke",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issue" => Ok(Operation::Issue),
            "verify" => Ok(Operation::Verify),
            "revoke" => Ok(Operation::Revoke),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}

/// Outcome of the recorded attempt.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Failed,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Success => "success",
            ActivityStatus::Failed => "failed",
        }
    }
}

impl FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ActivityStatus::Success),
            "failed" => Ok(ActivityStatus::Failed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// A single append-only ledger row. Never mutated or deleted once written.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ActivityRecord {
    /// Stable record identifier, `act-<uuid>`
    pub id: String,

    /// Actor that requested the operation; absent for anonymous reads
    pub actor: Option<String>,

    /// Which lifecycle operation was attempted
    pub operation: Operation,

    /// Fingerprint the operation targeted
    pub fingerprint: DocumentFingerprint,

    /// Whether the attempt succeeded
    pub status: ActivityStatus,

    /// Transaction reference for state-changing successes
    pub external_ref: Option<String>,

    /// When the record was appended
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the coordinator when appending a record; id and
/// timestamp are assigned by the ledger.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor: Option<String>,
    pub operation: Operation,
    pub fingerprint: DocumentFingerprint,
    pub status: ActivityStatus,
    pub external_ref: Option<String>,
}

/// Query filter for the activity view. All fields optional; records are
/// always returned most-recent-first.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub actor: Option<String>,
    pub operation: Option<Operation>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_round_trip() {
        for op in [Operation::Issue, Operation::Verify, Operation::Revoke] {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("delete".parse::<Operation>().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(
            "success".parse::<ActivityStatus>().unwrap(),
            ActivityStatus::Success
        );
        assert_eq!(
            "failed".parse::<ActivityStatus>().unwrap(),
            ActivityStatus::Failed
        );
        assert!("pending".parse::<ActivityStatus>().is_err());
    }
}
