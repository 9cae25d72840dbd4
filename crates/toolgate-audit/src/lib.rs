//! # toolgate-audit
//!
//! Append-only, SHA-256 hash-chained decision log for the toolgate guard.
//!
//! ## Overview
//!
//! Every decision the guard makes is wrapped in an `AuditEntry` that links
//! to the previous entry via its SHA-256 hash. Tampering with any entry,
//! even a single byte, breaks the chain and is detected by `verify_chain`.
//!
//! Two backends implement `toolgate_core::traits::AuditLog`:
//!
//! - [`InMemoryAuditLog`] for tests and ephemeral sessions
//! - [`SqliteAuditLog`] for a durable log that resumes its chain on reopen
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolgate_audit::SqliteAuditLog;
//! use toolgate_core::traits::AuditLog;
//!
//! let log = SqliteAuditLog::open("audit.db")?;
//! let sequence = log.append(&record)?;
//! assert!(log.verify_integrity()?);
//! ```

pub mod chain;
pub mod memory;
pub mod sqlite;

pub use chain::{hash_entry, verify_chain};
pub use memory::InMemoryAuditLog;
pub use sqlite::SqliteAuditLog;

// ── Tests ─────────────────────────────────────────────────────────────────────
