//! The capability gate.
//!
//! Decides whether a principal's active grants cover a tool's declared
//! capabilities:
//!
//! 1. Look up the tool; unknown → `UnknownTool`.
//! 2. Union the capabilities of every non-expired grant whose scope covers
//!    the call's target.
//! 3. Required ⊄ active → `InsufficientCapability` naming what is missing.
//! 4. Covered and reversible → `Allow`.
//! 5. Covered and irreversible → `NeedsConfirmation`.
//!
//! Grants are read at evaluation time, so a revoke that completes before
//! `evaluate` reads the store is always observed. The gate never overrides
//! an upstream deny; the guard only consults it after the deny list.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use toolgate_contracts::{
    capability::CapabilitySet,
    error::{GateError, GateResult},
    principal::PrincipalId,
    tool::ToolDeclaration,
    verdict::GateDecision,
};

use crate::traits::{GrantStore, ToolRegistry};

/// Evaluates capability coverage against a registry and a grant store.
pub struct CapabilityGate<'a> {
    registry: &'a dyn ToolRegistry,
    grants: &'a dyn GrantStore,
}

impl<'a> CapabilityGate<'a> {
    pub fn new(registry: &'a dyn ToolRegistry, grants: &'a dyn GrantStore) -> Self {
        Self { registry, grants }
    }

    /// Evaluate a call to `tool_name` with `arguments` on behalf of `principal`.
    pub fn evaluate(
        &self,
        principal: &PrincipalId,
        tool_name: &str,
        arguments: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> GateResult<GateDecision> {
        let declaration = self
            .registry
            .lookup(tool_name)
            .ok_or_else(|| GateError::UnknownTool {
                tool: tool_name.to_string(),
            })?;
        self.evaluate_declared(principal, declaration, arguments, now)
    }

    /// Evaluate against a declaration the caller already looked up.
    pub fn evaluate_declared(
        &self,
        principal: &PrincipalId,
        declaration: &ToolDeclaration,
        arguments: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> GateResult<GateDecision> {
        // Tools that need nothing never touch grant storage.
        let active = if declaration.capabilities.is_empty() {
            CapabilitySet::default()
        } else {
            let target = declaration.target(arguments);
            self.active_capabilities(principal, target.as_deref(), now)
                .map_err(|err| {
                    warn!(
                        principal = %principal,
                        tool = %declaration.name,
                        error = %err,
                        "grant lookup failed; failing closed"
                    );
                    GateError::InsufficientCapability {
                        principal: principal.to_string(),
                        tool: declaration.name.clone(),
                        missing: format!(
                            "{} (grant storage unavailable)",
                            declaration.capabilities
                        ),
                    }
                })?
        };

        decide(principal, declaration, &active)
    }

    /// The union of capabilities from `principal`'s non-expired grants that
    /// apply to `target`.
    pub fn active_capabilities(
        &self,
        principal: &PrincipalId,
        target: Option<&str>,
        now: DateTime<Utc>,
    ) -> GateResult<CapabilitySet> {
        let mut active = CapabilitySet::default();
        for grant in self.grants.active_grants(principal, now)? {
            if grant.is_expired(now) || !grant.covers(target) {
                continue;
            }
            active.extend(&grant.capabilities);
        }
        Ok(active)
    }
}

/// Pure coverage decision over an already-computed active set.
pub fn decide(
    principal: &PrincipalId,
    declaration: &ToolDeclaration,
    active: &CapabilitySet,
) -> GateResult<GateDecision> {
    let missing = declaration.capabilities.missing_from(active);
    if !missing.is_empty() {
        debug!(
            principal = %principal,
            tool = %declaration.name,
            missing = %missing,
            "capability coverage incomplete"
        );
        return Err(GateError::InsufficientCapability {
            principal: principal.to_string(),
            tool: declaration.name.clone(),
            missing: missing.to_string(),
        });
    }

    if declaration.reversibility.is_irreversible() {
        Ok(GateDecision::NeedsConfirmation)
    } else {
        Ok(GateDecision::Allow)
    }
}
