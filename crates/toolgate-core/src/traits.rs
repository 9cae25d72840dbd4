//! Trait seams around the safety guard.
//!
//! - `ToolRegistry`: read-only tool declarations
//! - `ToolPolicy`: allow/deny list and the route-independent safe set
//! - `GrantStore`: shared, mutable capability grants
//! - `AuditLog`: append-only decision record
//! - `ArgumentValidator`: schema check on call arguments
//! - `Redactor`: masking applied before arguments are audited
//!
//! The guard owns one of each and never reaches around them.

use chrono::{DateTime, Utc};

use toolgate_contracts::{
    audit::{AuditEntry, AuditFilter, DecisionRecord},
    capability::{CapabilityGrant, CapabilitySet, GrantId},
    error::{GateError, GateResult},
    principal::PrincipalId,
    tool::{ListEntry, ToolDeclaration},
    verify::ValidationReport,
};

/// Read-only lookup of registered tools.
///
/// Declarations are fixed once the registry is built. A missing declaration
/// means DENY, never "no capabilities required".
pub trait ToolRegistry: Send + Sync {
    fn lookup(&self, tool_name: &str) -> Option<&ToolDeclaration>;

    /// Capabilities required to invoke `tool_name`.
    fn capabilities_required(&self, tool_name: &str) -> GateResult<&CapabilitySet> {
        self.lookup(tool_name)
            .map(|decl| &decl.capabilities)
            .ok_or_else(|| GateError::UnknownTool {
                tool: tool_name.to_string(),
            })
    }

    /// Whether `tool_name` has side effects the system cannot undo.
    fn is_irreversible(&self, tool_name: &str) -> GateResult<bool> {
        self.lookup(tool_name)
            .map(|decl| decl.reversibility.is_irreversible())
            .ok_or_else(|| GateError::UnknownTool {
                tool: tool_name.to_string(),
            })
    }
}

/// Static security classification of tools.
pub trait ToolPolicy: Send + Sync {
    /// The explicit allow/deny entry for `tool_name`.
    fn list_entry(&self, tool_name: &str) -> ListEntry;

    /// True for the fixed set of read-only introspection tools reachable
    /// from any route.
    fn is_route_independent(&self, tool_name: &str) -> bool;
}

/// Storage for capability grants.
///
/// Reads and writes are linearizable per principal: `active_grants` reflects
/// every `insert` and `revoke` that completed before it was called.
pub trait GrantStore: Send + Sync {
    fn insert(&self, grant: CapabilityGrant) -> GateResult<GrantId>;

    /// Remove `capabilities` from every grant held by `principal`.
    ///
    /// Grants left with no capabilities are deleted. Returns the number of
    /// grants touched.
    fn revoke(&self, principal: &PrincipalId, capabilities: &CapabilitySet) -> GateResult<usize>;

    /// All of `principal`'s grants that have not expired at `now`.
    fn active_grants(
        &self,
        principal: &PrincipalId,
        now: DateTime<Utc>,
    ) -> GateResult<Vec<CapabilityGrant>>;

    /// Delete every grant expired at `now`. Returns how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> GateResult<usize>;
}

/// The append-only decision log.
///
/// Every `authorize()` call produces exactly one record that must be
/// persisted here before its verdict is returned. Entries are never
/// modified or deleted.
pub trait AuditLog: Send + Sync {
    /// Durably append `record`, returning its sequence number.
    ///
    /// Sequence numbers are strictly increasing and gap-free.
    fn append(&self, record: &DecisionRecord) -> GateResult<u64>;

    /// Up to `limit` entries matching `filter`, ascending by sequence.
    ///
    /// Non-destructive; `filter.after_sequence` is the resume point.
    fn page(&self, filter: &AuditFilter, limit: usize) -> GateResult<Vec<AuditEntry>>;
}

/// Validates call arguments against a tool's declared schema.
pub trait ArgumentValidator: Send + Sync {
    fn validate(
        &self,
        arguments: &serde_json::Value,
        schema: &serde_json::Value,
    ) -> GateResult<ValidationReport>;
}

/// Masks sensitive argument values before they are written to the audit log.
pub trait Redactor: Send + Sync {
    fn redact(&self, arguments: &serde_json::Value) -> serde_json::Value;
}

/// A redactor that records arguments unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRedaction;

impl Redactor for NoRedaction {
    fn redact(&self, arguments: &serde_json::Value) -> serde_json::Value {
        arguments.clone()
    }
}
