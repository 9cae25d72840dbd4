//! SQLite implementation of `GrantStore`.
//!
//! One row per grant. Capabilities and scope are stored as JSON text;
//! instants are stored as Unix milliseconds so expiry can be filtered in SQL.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use toolgate_contracts::{
    capability::{CapabilityGrant, CapabilitySet, GrantId, GrantScope},
    error::{GateError, GateResult},
    principal::PrincipalId,
};
use toolgate_core::traits::GrantStore;

use crate::strip;

const SCHEMA: &str = "BEGIN;
CREATE TABLE IF NOT EXISTS capability_grants(
    grant_id TEXT PRIMARY KEY,
    principal TEXT NOT NULL,
    capabilities TEXT NOT NULL,
    scope TEXT,
    granted_at_ms INTEGER NOT NULL,
    expires_at_ms INTEGER
);
CREATE INDEX IF NOT EXISTS idx_grants_principal ON capability_grants(principal);
COMMIT;";

const SELECT_COLUMNS: &str =
    "SELECT grant_id, principal, capabilities, scope, granted_at_ms, expires_at_ms FROM capability_grants";

/// A `GrantStore` backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteGrantStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

/// Raw column values, decoded outside the rusqlite row closure.
type GrantRow = (String, String, String, Option<String>, i64, Option<i64>);

impl SqliteGrantStore {
    /// Open (or create) the grant table in the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> GateResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path).map_err(storage)?;
        Self::init(conn, Some(db_path))
    }

    /// A private, non-persistent database.
    pub fn open_in_memory() -> GateResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> GateResult<Self> {
        conn.execute_batch(SCHEMA).map_err(storage)?;
        info!(path = ?db_path, "grant store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> GateResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| GateError::StorageError {
            reason: "grant store connection lock poisoned".to_string(),
        })
    }

    fn query(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> GateResult<Vec<CapabilityGrant>> {
        let mut stmt = conn.prepare(sql).map_err(storage)?;
        let rows = stmt
            .query_map(args, |row| -> rusqlite::Result<GrantRow> {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .map_err(storage)?;

        let mut grants = Vec::new();
        for row in rows {
            grants.push(decode(row.map_err(storage)?)?);
        }
        Ok(grants)
    }
}

impl GrantStore for SqliteGrantStore {
    fn insert(&self, grant: CapabilityGrant) -> GateResult<GrantId> {
        let capabilities = serde_json::to_string(&grant.capabilities).map_err(storage)?;
        let scope = grant
            .scope
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(storage)?;

        self.lock()?
            .execute(
                "INSERT INTO capability_grants(grant_id, principal, capabilities, scope, granted_at_ms, expires_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    grant.grant_id.to_string(),
                    grant.principal.as_str(),
                    capabilities,
                    scope,
                    grant.granted_at.timestamp_millis(),
                    grant.expires_at.map(|at| at.timestamp_millis()),
                ],
            )
            .map_err(storage)?;

        debug!(grant = %grant.grant_id, principal = %grant.principal, "grant stored");
        Ok(grant.grant_id)
    }

    fn revoke(&self, principal: &PrincipalId, capabilities: &CapabilitySet) -> GateResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage)?;

        let held = Self::query(
            &tx,
            &format!("{SELECT_COLUMNS} WHERE principal = ?1"),
            params![principal.as_str()],
        )?;

        let mut touched = 0;
        for mut grant in held {
            if !strip(&mut grant, capabilities) {
                continue;
            }
            touched += 1;
            let id = grant.grant_id.to_string();
            if grant.capabilities.is_empty() {
                tx.execute("DELETE FROM capability_grants WHERE grant_id = ?1", params![id])
                    .map_err(storage)?;
            } else {
                let remaining = serde_json::to_string(&grant.capabilities).map_err(storage)?;
                tx.execute(
                    "UPDATE capability_grants SET capabilities = ?1 WHERE grant_id = ?2",
                    params![remaining, id],
                )
                .map_err(storage)?;
            }
        }

        tx.commit().map_err(storage)?;
        debug!(principal = %principal, touched, "grants revoked");
        Ok(touched)
    }

    fn active_grants(
        &self,
        principal: &PrincipalId,
        now: DateTime<Utc>,
    ) -> GateResult<Vec<CapabilityGrant>> {
        let conn = self.lock()?;
        Self::query(
            &conn,
            &format!(
                "{SELECT_COLUMNS} WHERE principal = ?1 AND (expires_at_ms IS NULL OR expires_at_ms > ?2)
                 ORDER BY granted_at_ms"
            ),
            params![principal.as_str(), now.timestamp_millis()],
        )
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> GateResult<usize> {
        self.lock()?
            .execute(
                "DELETE FROM capability_grants WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?1",
                params![now.timestamp_millis()],
            )
            .map_err(storage)
    }
}

fn decode(row: GrantRow) -> GateResult<CapabilityGrant> {
    let (grant_id, principal, capabilities, scope, granted_at_ms, expires_at_ms) = row;

    let grant_id = uuid::Uuid::parse_str(&grant_id).map(GrantId).map_err(storage)?;
    let capabilities: CapabilitySet = serde_json::from_str(&capabilities).map_err(storage)?;
    let scope: Option<GrantScope> = scope
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(storage)?;

    Ok(CapabilityGrant {
        grant_id,
        principal: PrincipalId::new(principal),
        capabilities,
        scope,
        granted_at: from_millis(granted_at_ms)?,
        expires_at: expires_at_ms.map(from_millis).transpose()?,
    })
}

fn from_millis(ms: i64) -> GateResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| GateError::StorageError {
            reason: format!("stored timestamp {ms} is out of range"),
        })
}

fn storage(e: impl Display) -> GateError {
    GateError::StorageError {
        reason: e.to_string(),
    }
}
