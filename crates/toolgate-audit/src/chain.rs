//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Every field that contributes to an entry's hash is listed explicitly so
//! nothing is accidentally omitted.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the decision record (keys sorted at every depth)

use sha2::{Digest, Sha256};

use toolgate_contracts::{
    audit::{AuditEntry, DecisionRecord},
    error::{GateError, GateResult},
};
use toolgate_core::canonical::canonical_json;

/// Compute the SHA-256 hash for one audit entry.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_entry(sequence: u64, record: &DecisionRecord, prev_hash: &str) -> GateResult<String> {
    let value = serde_json::to_value(record).map_err(|e| GateError::AuditUnavailable {
        reason: format!("decision record is not serializable: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(canonical_json(&value).as_bytes());

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain that starts at sequence 0.
///
/// Returns `true` when, for every entry:
///
/// 1. **Position**: its `sequence` equals its index (no gaps, no reorder).
/// 2. **Prev-hash linkage**: its `prev_hash` equals the `this_hash` of the
///    preceding entry (or `GENESIS_HASH` for entry 0).
/// 3. **Hash correctness**: its `this_hash` matches the value recomputed
///    from its own fields.
///
/// An empty chain is valid.
pub fn verify_chain(entries: &[AuditEntry]) -> bool {
    let mut expected_prev = AuditEntry::GENESIS_HASH.to_string();

    for (index, entry) in entries.iter().enumerate() {
        if entry.sequence != index as u64 || entry.prev_hash != expected_prev {
            return false;
        }

        match hash_entry(entry.sequence, &entry.record, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }

        expected_prev = entry.this_hash.clone();
    }

    true
}
