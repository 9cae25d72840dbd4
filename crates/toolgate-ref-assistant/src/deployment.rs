//! Wiring: policy document + stores → guard → runner.

use std::path::Path;

use toolgate_audit::{InMemoryAuditLog, SqliteAuditLog};
use toolgate_contracts::{
    audit::{AuditEntry, AuditFilter},
    error::GateResult,
};
use toolgate_core::{
    traits::{AuditLog, GrantStore},
    AuditQuery, GuardConfig, SafetyGuard,
};
use toolgate_grants::InMemoryGrantStore;
use toolgate_policy::PolicyConfig;
use toolgate_verify::{FieldMasker, SchemaValidator};

use crate::{runner::ToolRunner, tools};

/// The assistant policy shipped with this crate.
pub const ASSISTANT_POLICY: &str = include_str!("../policies/assistant.toml");

/// An audit log the caller keeps a handle to after the guard takes its own.
///
/// Both backends share state across clones, so the handle observes every
/// entry the guard appends.
#[derive(Clone)]
pub enum AuditBackend {
    Memory(InMemoryAuditLog),
    Sqlite(SqliteAuditLog),
}

impl AuditBackend {
    pub fn in_memory() -> Self {
        AuditBackend::Memory(InMemoryAuditLog::new())
    }

    pub fn sqlite(path: &Path) -> GateResult<Self> {
        Ok(AuditBackend::Sqlite(SqliteAuditLog::open(path)?))
    }

    fn boxed(&self) -> Box<dyn AuditLog> {
        match self {
            AuditBackend::Memory(log) => Box::new(log.clone()),
            AuditBackend::Sqlite(log) => Box::new(log.clone()),
        }
    }

    pub fn entries(&self) -> GateResult<Vec<AuditEntry>> {
        match self {
            AuditBackend::Memory(log) => log.entries(),
            AuditBackend::Sqlite(log) => log.entries(),
        }
    }

    pub fn verify_integrity(&self) -> GateResult<bool> {
        match self {
            AuditBackend::Memory(log) => log.verify_integrity(),
            AuditBackend::Sqlite(log) => log.verify_integrity(),
        }
    }

    /// Lazily page through entries matching `filter`.
    pub fn query(&self, filter: AuditFilter) -> AuditQuery<'_> {
        let page_size = GuardConfig::default().audit_page_size;
        match self {
            AuditBackend::Memory(log) => AuditQuery::new(log, filter, page_size),
            AuditBackend::Sqlite(log) => AuditQuery::new(log, filter, page_size),
        }
    }
}

/// Build a guard from `policy_toml` over the given stores.
pub fn build_guard(
    policy_toml: &str,
    grants: Box<dyn GrantStore>,
    audit: &AuditBackend,
) -> GateResult<SafetyGuard> {
    let parts = PolicyConfig::from_toml_str(policy_toml)?.into_parts()?;
    let validator = SchemaValidator::with_schemas(parts.registry.declarations().map(|d| &d.schema));

    let guard = SafetyGuard::new(
        Box::new(parts.registry),
        Box::new(parts.policy),
        grants,
        audit.boxed(),
        Box::new(validator),
        Box::new(FieldMasker::new(&parts.masked_fields)),
    )
    .with_config(GuardConfig {
        confirmation_ttl: parts.confirmation_ttl,
        ..GuardConfig::default()
    });

    Ok(guard)
}

/// The assistant policy with every mock tool body registered.
pub fn assistant_runner(grants: Box<dyn GrantStore>, audit: &AuditBackend) -> GateResult<ToolRunner> {
    let mut runner = ToolRunner::new(build_guard(ASSISTANT_POLICY, grants, audit)?);
    tools::register_all(&mut runner);
    Ok(runner)
}

/// `assistant_runner` with in-memory grants.
pub fn in_memory_runner(audit: &AuditBackend) -> GateResult<ToolRunner> {
    assistant_runner(Box::new(InMemoryGrantStore::new()), audit)
}
