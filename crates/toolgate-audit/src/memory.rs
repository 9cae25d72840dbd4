//! In-memory implementation of `AuditLog`.
//!
//! `InMemoryAuditLog` keeps every entry in a `Vec` protected by a `Mutex`.
//! Clones share the same chain, so a test can hold one handle while the
//! guard owns another.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use toolgate_contracts::{
    audit::{AuditEntry, AuditFilter, DecisionRecord},
    error::{GateError, GateResult},
};
use toolgate_core::traits::AuditLog;

use crate::chain::{hash_entry, verify_chain};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    /// All entries appended so far, in sequence order.
    pub(crate) entries: Vec<AuditEntry>,

    /// The `this_hash` of the last entry, or `GENESIS_HASH` before any
    /// entry has been appended.
    pub(crate) last_hash: String,
}

// ── Public log ────────────────────────────────────────────────────────────────

/// An in-memory, append-only audit log backed by a SHA-256 hash chain.
#[derive(Clone)]
pub struct InMemoryAuditLog {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState {
                entries: Vec::new(),
                last_hash: AuditEntry::GENESIS_HASH.to_string(),
            })),
        }
    }

    /// A snapshot of every entry.
    pub fn entries(&self) -> GateResult<Vec<AuditEntry>> {
        Ok(self.lock()?.entries.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify that the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> GateResult<bool> {
        Ok(verify_chain(&self.lock()?.entries))
    }

    fn lock(&self) -> GateResult<MutexGuard<'_, InMemoryState>> {
        self.state.lock().map_err(|e| GateError::AuditUnavailable {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }
}

// ── AuditLog impl ─────────────────────────────────────────────────────────────

impl AuditLog for InMemoryAuditLog {
    /// Append one decision record to the hash chain.
    ///
    /// Sequence assignment, hashing and the push all happen under one lock,
    /// so concurrent appends never share or skip a sequence number.
    fn append(&self, record: &DecisionRecord) -> GateResult<u64> {
        let mut state = self.lock()?;

        let sequence = state.entries.len() as u64;
        let prev_hash = state.last_hash.clone();
        let this_hash = hash_entry(sequence, record, &prev_hash)?;

        state.entries.push(AuditEntry {
            sequence,
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.last_hash = this_hash;

        debug!(sequence, tool = %record.tool_name, "audit entry appended");
        Ok(sequence)
    }

    fn page(&self, filter: &AuditFilter, limit: usize) -> GateResult<Vec<AuditEntry>> {
        let state = self.lock()?;
        // Sequence equals index, so skip straight to the resume point.
        let start = filter
            .after_sequence
            .map_or(0, |after| usize::try_from(after).map_or(usize::MAX, |a| a.saturating_add(1)));

        Ok(state
            .entries
            .iter()
            .skip(start)
            .filter(|entry| filter.matches(entry))
            .take(limit)
            .cloned()
            .collect())
    }
}
