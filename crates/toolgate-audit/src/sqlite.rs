//! SQLite implementation of `AuditLog`.
//!
//! Each append is one immediate transaction: read the chain tail, insert the
//! new entry, commit. Nothing is cached across appends, so a reopened log
//! resumes the chain exactly where the file left it. If any step fails the
//! transaction is dropped and rolled back; no partial entry is ever visible.
//!
//! Filter columns (`tool_name`, `principal`, `route`, `outcome`,
//! `timestamp_ns`) are stored beside the JSON record so `page` can filter in
//! SQL.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use toolgate_contracts::{
    audit::{AuditEntry, AuditFilter, DecisionRecord},
    error::{GateError, GateResult},
};
use toolgate_core::traits::AuditLog;

use crate::chain::{hash_entry, verify_chain};

const SCHEMA: &str = "BEGIN;
CREATE TABLE IF NOT EXISTS audit_entries(
    sequence INTEGER PRIMARY KEY,
    timestamp_ns INTEGER NOT NULL,
    principal TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    route TEXT NOT NULL,
    outcome TEXT NOT NULL,
    record TEXT NOT NULL,
    prev_hash TEXT NOT NULL,
    this_hash TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_tool ON audit_entries(tool_name);
CREATE INDEX IF NOT EXISTS idx_audit_principal ON audit_entries(principal);
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_entries(timestamp_ns);
COMMIT;";

/// A durable, append-only audit log in a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteAuditLog {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteAuditLog {
    /// Open (or create) the audit table in the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> GateResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path).map_err(unavailable)?;
        Self::init(conn, Some(db_path))
    }

    /// A private, non-persistent database.
    pub fn open_in_memory() -> GateResult<Self> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> GateResult<Self> {
        conn.execute_batch(SCHEMA).map_err(unavailable)?;
        let log = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        };
        let entries = log.len()?;
        info!(path = ?log.db_path, entries, "audit log opened");
        Ok(log)
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Number of entries in the log.
    pub fn len(&self) -> GateResult<u64> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(1) FROM audit_entries", [], |r| r.get(0))
            .map_err(unavailable)?;
        Ok(count as u64)
    }

    pub fn is_empty(&self) -> GateResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Every entry, in sequence order.
    pub fn entries(&self) -> GateResult<Vec<AuditEntry>> {
        let conn = self.lock()?;
        Self::select(
            &conn,
            "SELECT sequence, record, prev_hash, this_hash FROM audit_entries ORDER BY sequence",
            [],
        )
    }

    /// Re-read the whole file and verify the hash chain.
    pub fn verify_integrity(&self) -> GateResult<bool> {
        Ok(verify_chain(&self.entries()?))
    }

    fn lock(&self) -> GateResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| GateError::AuditUnavailable {
            reason: "audit connection lock poisoned".to_string(),
        })
    }

    fn select(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> GateResult<Vec<AuditEntry>> {
        let mut stmt = conn.prepare(sql).map_err(unavailable)?;
        let rows = stmt
            .query_map(args, |row| -> rusqlite::Result<(i64, String, String, String)> {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(unavailable)?;

        let mut entries = Vec::new();
        for row in rows {
            let (sequence, record, prev_hash, this_hash) = row.map_err(unavailable)?;
            let record: DecisionRecord = serde_json::from_str(&record).map_err(unavailable)?;
            entries.push(AuditEntry {
                sequence: sequence as u64,
                record,
                prev_hash,
                this_hash,
            });
        }
        Ok(entries)
    }
}

impl AuditLog for SqliteAuditLog {
    fn append(&self, record: &DecisionRecord) -> GateResult<u64> {
        let json = serde_json::to_string(record).map_err(unavailable)?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(unavailable)?;

        let tail: Option<(i64, String)> = tx
            .query_row(
                "SELECT sequence, this_hash FROM audit_entries ORDER BY sequence DESC LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()
            .map_err(unavailable)?;

        let (sequence, prev_hash) = match tail {
            Some((last, hash)) => (last as u64 + 1, hash),
            None => (0, AuditEntry::GENESIS_HASH.to_string()),
        };
        let this_hash = hash_entry(sequence, record, &prev_hash)?;

        tx.execute(
            "INSERT INTO audit_entries(sequence, timestamp_ns, principal, tool_name, route, outcome, record, prev_hash, this_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                sequence as i64,
                nanos(&record.timestamp),
                record.principal.as_str(),
                record.tool_name,
                record.route.as_str(),
                record.verdict.outcome().as_str(),
                json,
                prev_hash,
                this_hash,
            ],
        )
        .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;

        debug!(sequence, tool = %record.tool_name, "audit entry committed");
        Ok(sequence)
    }

    fn page(&self, filter: &AuditFilter, limit: usize) -> GateResult<Vec<AuditEntry>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(tool) = &filter.tool_name {
            clauses.push("tool_name = ?");
            args.push(SqlValue::Text(tool.clone()));
        }
        if let Some(principal) = &filter.principal {
            clauses.push("principal = ?");
            args.push(SqlValue::Text(principal.as_str().to_string()));
        }
        if let Some(route) = &filter.route {
            clauses.push("route = ?");
            args.push(SqlValue::Text(route.as_str().to_string()));
        }
        if let Some(outcome) = filter.outcome {
            clauses.push("outcome = ?");
            args.push(SqlValue::Text(outcome.as_str().to_string()));
        }
        if let Some(since) = filter.since {
            clauses.push("timestamp_ns >= ?");
            args.push(SqlValue::Integer(nanos(&since)));
        }
        if let Some(until) = filter.until {
            clauses.push("timestamp_ns < ?");
            args.push(SqlValue::Integer(nanos(&until)));
        }
        if let Some(after) = filter.after_sequence {
            clauses.push("sequence > ?");
            args.push(SqlValue::Integer(i64::try_from(after).unwrap_or(i64::MAX)));
        }

        let mut sql =
            String::from("SELECT sequence, record, prev_hash, this_hash FROM audit_entries");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY sequence LIMIT ?");
        args.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let conn = self.lock()?;
        Self::select(&conn, &sql, params_from_iter(args))
    }
}

/// Nanoseconds since the epoch, the same precision `AuditFilter::matches`
/// compares at. Instants outside the i64 range (before 1677, after 2262)
/// saturate.
fn nanos(at: &DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt()
        .unwrap_or(if at.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

fn unavailable(e: impl Display) -> GateError {
    GateError::AuditUnavailable {
        reason: e.to_string(),
    }
}
