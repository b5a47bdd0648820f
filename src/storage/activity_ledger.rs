// src/storage/activity_ledger.rs
//! Append-only activity ledger backed by SQLite.
//!
//! Every attempted lifecycle operation is recorded here, success or failure,
//! so the local history mirrors what was asked of the registry. The public
//! contract is append and query only; no update or delete exists.
//!
//! # Schema
//!
//! The `activity_records` table has columns: `id`, `actor`, `operation`,
//! `fingerprint`, `status`, `external_ref`, `created_at_ms`. Queries order by
//! `created_at_ms DESC, rowid DESC` so records for one fingerprint are seen
//! in the order their Record step completed, even within one millisecond.

use crate::error::LedgerError;
use crate::models::activity::{
    ActivityFilter, ActivityRecord, ActivityStatus, NewActivity, Operation,
};
use crate::models::fingerprint::DocumentFingerprint;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params_from_iter, Connection};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::task;
use uuid::Uuid;

/// Append-only local record of every attempted operation.
///
/// The connection is shared behind `Arc<Mutex<_>>`; each call locks only for
/// the duration of one statement and the blocking work runs on the tokio
/// blocking pool, so the async runtime is never stalled on SQLite I/O.
#[derive(Clone)]
pub struct ActivityLedger {
    conn: Arc<Mutex<Connection>>,
}

impl ActivityLedger {
    /// Opens (creating if necessary) a ledger database at the given path.
    pub fn open(path: &str) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(ActivityLedger {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory ledger. Used by tests and ephemeral deployments.
    #[allow(dead_code)]
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(ActivityLedger {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initializes the database schema.
    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS activity_records (
                id TEXT PRIMARY KEY,
                actor TEXT,
                operation TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                status TEXT NOT NULL,
                external_ref TEXT,
                created_at_ms INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activity_actor ON activity_records(actor)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activity_created_at
             ON activity_records(created_at_ms)",
            [],
        )?;
        Ok(())
    }

    /// Appends one record and returns its id.
    ///
    /// A persistence failure propagates to the caller: an operation whose
    /// outcome cannot be recorded must be treated as unverified.
    pub async fn append(&self, activity: NewActivity) -> Result<String, LedgerError> {
        let conn = self.conn.clone();
        let id = format!("act-{}", Uuid::new_v4());
        let record_id = id.clone();
        let created_at_ms = Utc::now().timestamp_millis();

        task::spawn_blocking(move || -> Result<(), LedgerError> {
            let conn = conn.lock().expect("ledger mutex poisoned");
            conn.execute(
                "INSERT INTO activity_records
                 (id, actor, operation, fingerprint, status, external_ref, created_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record_id,
                    activity.actor,
                    activity.operation.as_str(),
                    activity.fingerprint.to_string(),
                    activity.status.as_str(),
                    activity.external_ref,
                    created_at_ms,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| LedgerError::Task(e.to_string()))??;

        Ok(id)
    }

    /// Queries records matching the filter, most-recent-first.
    pub async fn query(&self, filter: ActivityFilter) -> Result<Vec<ActivityRecord>, LedgerError> {
        let conn = self.conn.clone();

        task::spawn_blocking(move || -> Result<Vec<ActivityRecord>, LedgerError> {
            let conn = conn.lock().expect("ledger mutex poisoned");

            let mut sql = String::from(
                "SELECT id, actor, operation, fingerprint, status, external_ref, created_at_ms
                 FROM activity_records WHERE 1=1",
            );
            let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(actor) = &filter.actor {
                sql.push_str(&format!(" AND actor = ?{}", args.len() + 1));
                args.push(Box::new(actor.clone()));
            }
            if let Some(operation) = filter.operation {
                sql.push_str(&format!(" AND operation = ?{}", args.len() + 1));
                args.push(Box::new(operation.as_str().to_string()));
            }
            if let Some(since) = filter.since {
                sql.push_str(&format!(" AND created_at_ms >= ?{}", args.len() + 1));
                args.push(Box::new(since.timestamp_millis()));
            }
            if let Some(until) = filter.until {
                sql.push_str(&format!(" AND created_at_ms <= ?{}", args.len() + 1));
                args.push(Box::new(until.timestamp_millis()));
            }
            sql.push_str(" ORDER BY created_at_ms DESC, rowid DESC");
            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params_from_iter(args.iter().map(|a| a.as_ref())),
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )?;

            let mut records = Vec::new();
            for row in rows {
                let (id, actor, operation, fingerprint, status, external_ref, created_at_ms) =
                    row?;
                records.push(ActivityRecord {
                    id,
                    actor,
                    operation: Operation::from_str(&operation)
                        .map_err(|e| LedgerError::Task(e))?,
                    fingerprint: DocumentFingerprint::from_str(&fingerprint)
                        .map_err(|e| LedgerError::Task(e.to_string()))?,
                    status: ActivityStatus::from_str(&status)
                        .map_err(|e| LedgerError::Task(e))?,
                    external_ref,
                    created_at: ms_to_datetime(created_at_ms),
                });
            }
            Ok(records)
        })
        .await
        .map_err(|e| LedgerError::Task(e.to_string()))?
    }
}

fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::fingerprint;

    fn new_activity(
        actor: Option<&str>,
        operation: Operation,
        doc: &[u8],
        status: ActivityStatus,
        external_ref: Option<&str>,
    ) -> NewActivity {
        NewActivity {
            actor: actor.map(String::from),
            operation,
            fingerprint: fingerprint(doc),
            status,
            external_ref: external_ref.map(String::from),
        }
    }

    #[test]
    fn test_append_then_query() {
        tokio_test::block_on(async {
            let ledger = ActivityLedger::open_in_memory().unwrap();

            let id = ledger
                .append(new_activity(
                    Some("0xaaaa"),
                    Operation::Issue,
                    b"doc-1",
                    ActivityStatus::Success,
                    Some("0xtx1"),
                ))
                .await
                .unwrap();
            assert!(id.starts_with("act-"));

            let records = ledger.query(ActivityFilter::default()).await.unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, id);
            assert_eq!(records[0].operation, Operation::Issue);
            assert_eq!(records[0].status, ActivityStatus::Success);
            assert_eq!(records[0].external_ref.as_deref(), Some("0xtx1"));
            assert_eq!(records[0].fingerprint, fingerprint(b"doc-1"));
        });
    }

    #[test]
    fn test_query_orders_most_recent_first() {
        tokio_test::block_on(async {
            let ledger = ActivityLedger::open_in_memory().unwrap();

            for doc in [b"first" as &[u8], b"second", b"third"] {
                ledger
                    .append(new_activity(
                        None,
                        Operation::Verify,
                        doc,
                        ActivityStatus::Success,
                        None,
                    ))
                    .await
                    .unwrap();
            }

            let records = ledger.query(ActivityFilter::default()).await.unwrap();
            assert_eq!(records.len(), 3);
            // Inserts within one millisecond fall back to rowid ordering.
            assert_eq!(records[0].fingerprint, fingerprint(b"third"));
            assert_eq!(records[1].fingerprint, fingerprint(b"second"));
            assert_eq!(records[2].fingerprint, fingerprint(b"first"));
        });
    }

    #[test]
    fn test_query_filters_by_actor_and_operation() {
        tokio_test::block_on(async {
            let ledger = ActivityLedger::open_in_memory().unwrap();

            ledger
                .append(new_activity(
                    Some("0xaaaa"),
                    Operation::Issue,
                    b"doc-a",
                    ActivityStatus::Success,
                    Some("0xtx1"),
                ))
                .await
                .unwrap();
            ledger
                .append(new_activity(
                    Some("0xbbbb"),
                    Operation::Revoke,
                    b"doc-a",
                    ActivityStatus::Failed,
                    None,
                ))
                .await
                .unwrap();
            ledger
                .append(new_activity(
                    None,
                    Operation::Verify,
                    b"doc-a",
                    ActivityStatus::Success,
                    None,
                ))
                .await
                .unwrap();

            let by_actor = ledger
                .query(ActivityFilter {
                    actor: Some("0xbbbb".into()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(by_actor.len(), 1);
            assert_eq!(by_actor[0].operation, Operation::Revoke);
            assert_eq!(by_actor[0].status, ActivityStatus::Failed);

            let by_operation = ledger
                .query(ActivityFilter {
                    operation: Some(Operation::Verify),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(by_operation.len(), 1);
            assert!(by_operation[0].actor.is_none());
        });
    }

    #[test]
    fn test_query_respects_limit() {
        tokio_test::block_on(async {
            let ledger = ActivityLedger::open_in_memory().unwrap();

            for i in 0..5u8 {
                ledger
                    .append(new_activity(
                        Some("0xaaaa"),
                        Operation::Issue,
                        &[i],
                        ActivityStatus::Success,
                        None,
                    ))
                    .await
                    .unwrap();
            }

            let limited = ledger
                .query(ActivityFilter {
                    limit: Some(2),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(limited.len(), 2);
            assert_eq!(limited[0].fingerprint, fingerprint(&[4]));
        });
    }
}
