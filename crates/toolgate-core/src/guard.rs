//! The safety guard: the authorization pipeline for tool calls.
//!
//! Every `authorize()` call runs:
//!
//!   Shape → Deny list → Route → Capability gate → Confirmation → Audit
//!
//! Each stage may short-circuit to a deny. Whatever the outcome, exactly one
//! decision record is appended to the audit log before the verdict is
//! returned. If the append fails, the verdict is replaced by
//! `Deny(AuditUnavailable)`: an unaudited allow never reaches the caller.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use toolgate_contracts::{
    audit::{AuditFilter, DecisionRecord},
    capability::{CapabilityGrant, CapabilitySet, GrantId, GrantScope},
    confirm::{ConfirmationToken, PendingConfirmation},
    error::{GateError, GateResult},
    principal::{AuthorizationRequest, PrincipalId},
    tool::{ListEntry, RouteCheck, ToolDeclaration},
    verdict::{DenyKind, GateDecision, Verdict},
};

use crate::{
    canonical::args_hash,
    confirm::ConfirmationLedger,
    gate::CapabilityGate,
    query::AuditQuery,
    traits::{ArgumentValidator, AuditLog, GrantStore, Redactor, ToolPolicy, ToolRegistry},
};

/// Runtime settings for a guard.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// How long an issued confirmation token stays valid.
    pub confirmation_ttl: Duration,
    /// Entries fetched per backend round trip by `query_audit`.
    pub audit_page_size: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            confirmation_ttl: Duration::seconds(120),
            audit_page_size: 256,
        }
    }
}

/// A verdict together with the audit sequence number it was recorded under.
///
/// `sequence` is `None` only when the audit append failed, in which case the
/// verdict is always `Deny(AuditUnavailable)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub sequence: Option<u64>,
}

/// The orchestrator that mediates every tool call.
///
/// Owns its registry, policy, stores, and validator. Construct one per
/// deployment (or per test) and share it by reference; `authorize` takes
/// `&self` and may run concurrently.
pub struct SafetyGuard {
    registry: Box<dyn ToolRegistry>,
    policy: Box<dyn ToolPolicy>,
    grants: Box<dyn GrantStore>,
    audit: Box<dyn AuditLog>,
    validator: Box<dyn ArgumentValidator>,
    redactor: Box<dyn Redactor>,
    confirmations: ConfirmationLedger,
    config: GuardConfig,
}

impl SafetyGuard {
    /// Create a guard with default settings.
    pub fn new(
        registry: Box<dyn ToolRegistry>,
        policy: Box<dyn ToolPolicy>,
        grants: Box<dyn GrantStore>,
        audit: Box<dyn AuditLog>,
        validator: Box<dyn ArgumentValidator>,
        redactor: Box<dyn Redactor>,
    ) -> Self {
        let config = GuardConfig::default();
        Self {
            registry,
            policy,
            grants,
            audit,
            validator,
            redactor,
            confirmations: ConfirmationLedger::new(config.confirmation_ttl),
            config,
        }
    }

    /// Replace the default settings.
    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.confirmations = ConfirmationLedger::new(config.confirmation_ttl);
        self.config = config;
        self
    }

    /// How long issued confirmation tokens stay valid.
    pub fn confirmation_ttl(&self) -> Duration {
        self.config.confirmation_ttl
    }

    pub fn registry(&self) -> &dyn ToolRegistry {
        self.registry.as_ref()
    }

    /// Decide whether `request` may run, and record the decision.
    pub fn authorize(&self, request: &AuthorizationRequest) -> Decision {
        self.authorize_at(request, Utc::now())
    }

    /// `authorize` with an explicit clock, used for expiry-sensitive tests.
    pub fn authorize_at(&self, request: &AuthorizationRequest, now: DateTime<Utc>) -> Decision {
        debug!(
            principal = %request.principal,
            route = %request.route,
            tool = %request.tool_name,
            token = request.confirmation_token.is_some(),
            "authorize starting"
        );

        let mut route_check = None;
        let verdict = match self.run_pipeline(request, now, &mut route_check) {
            Ok(verdict) => verdict,
            Err(err) => self.verdict_for(request, err),
        };

        // ── Audit append ─────────────────────────────────────────────────────
        //
        // The verdict is only handed back once its record is durable.
        let record = DecisionRecord {
            principal: request.principal.clone(),
            route: request.route.clone(),
            tool_name: request.tool_name.clone(),
            arguments: self.redactor.redact(&request.arguments),
            verdict: verdict.clone(),
            route_check,
            confirmation_token: request.confirmation_token,
            timestamp: now,
        };

        match self.audit.append(&record) {
            Ok(sequence) => {
                match &verdict {
                    Verdict::Allow => info!(
                        principal = %request.principal,
                        tool = %request.tool_name,
                        sequence,
                        "tool call allowed"
                    ),
                    Verdict::Deny { kind, reason } => warn!(
                        principal = %request.principal,
                        tool = %request.tool_name,
                        route = %request.route,
                        kind = %kind,
                        reason = %reason,
                        sequence,
                        "tool call denied"
                    ),
                    Verdict::NeedsConfirmation { .. } => info!(
                        principal = %request.principal,
                        tool = %request.tool_name,
                        sequence,
                        "tool call awaiting confirmation"
                    ),
                }
                Decision {
                    verdict,
                    sequence: Some(sequence),
                }
            }
            Err(err) => {
                error!(
                    principal = %request.principal,
                    tool = %request.tool_name,
                    intended = %verdict.outcome(),
                    error = %err,
                    "audit append failed; downgrading verdict"
                );
                Decision {
                    verdict: Verdict::deny(
                        DenyKind::AuditUnavailable,
                        GateError::AuditUnavailable {
                            reason: err.to_string(),
                        }
                        .to_string(),
                    ),
                    sequence: None,
                }
            }
        }
    }

    /// Run the capability gate alone for `tool_name`.
    pub fn evaluate(
        &self,
        principal: &PrincipalId,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> GateResult<GateDecision> {
        CapabilityGate::new(self.registry.as_ref(), self.grants.as_ref()).evaluate(
            principal,
            tool_name,
            arguments,
            Utc::now(),
        )
    }

    /// Issue a confirmation token for one specific irreversible call.
    ///
    /// Called once the user has confirmed the pending action. The token is
    /// bound to the canonical hash of `arguments`.
    pub fn issue_confirmation(
        &self,
        principal: &PrincipalId,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> GateResult<ConfirmationToken> {
        self.issue_confirmation_at(principal, tool_name, arguments, Utc::now())
    }

    pub fn issue_confirmation_at(
        &self,
        principal: &PrincipalId,
        tool_name: &str,
        arguments: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> GateResult<ConfirmationToken> {
        if !self.registry.is_irreversible(tool_name)? {
            return Err(GateError::ConfirmationInvalid {
                reason: format!("tool '{tool_name}' is reversible and takes no confirmation"),
            });
        }
        self.confirmations
            .issue(principal, tool_name, &args_hash(arguments), now)
    }

    /// Grant `capabilities` to `principal`, optionally scoped and bounded.
    pub fn grant(
        &self,
        principal: &PrincipalId,
        capabilities: CapabilitySet,
        scope: Option<GrantScope>,
        expires_at: Option<DateTime<Utc>>,
    ) -> GateResult<GrantId> {
        if capabilities.is_empty() {
            return Err(GateError::ConfigError {
                reason: "a grant must name at least one capability".to_string(),
            });
        }
        let grant = CapabilityGrant::new(principal.clone(), capabilities, scope, expires_at);
        if grant.is_expired(grant.granted_at) {
            return Err(GateError::ConfigError {
                reason: format!("grant for '{principal}' would already be expired"),
            });
        }

        info!(
            principal = %principal,
            capabilities = %grant.capabilities,
            scoped = grant.scope.is_some(),
            expires_at = ?grant.expires_at,
            "capabilities granted"
        );
        self.grants.insert(grant)
    }

    /// Remove `capabilities` from every grant held by `principal`.
    pub fn revoke(&self, principal: &PrincipalId, capabilities: &CapabilitySet) -> GateResult<usize> {
        let touched = self.grants.revoke(principal, capabilities)?;
        info!(
            principal = %principal,
            capabilities = %capabilities,
            grants_touched = touched,
            "capabilities revoked"
        );
        Ok(touched)
    }

    /// Destroy every grant that has expired.
    pub fn purge_expired_grants(&self) -> GateResult<usize> {
        self.purge_expired_grants_at(Utc::now())
    }

    pub fn purge_expired_grants_at(&self, now: DateTime<Utc>) -> GateResult<usize> {
        let purged = self.grants.purge_expired(now)?;
        debug!(purged, "expired grants purged");
        Ok(purged)
    }

    /// Lazily iterate audit entries matching `filter`, in sequence order.
    pub fn query_audit(&self, filter: AuditFilter) -> AuditQuery<'_> {
        AuditQuery::new(self.audit.as_ref(), filter, self.config.audit_page_size)
    }

    // ── Pipeline ─────────────────────────────────────────────────────────────

    fn run_pipeline(
        &self,
        request: &AuthorizationRequest,
        now: DateTime<Utc>,
        route_check: &mut Option<RouteCheck>,
    ) -> GateResult<Verdict> {
        // ── Step 1: Shape validation ─────────────────────────────────────────
        let declaration = self
            .registry
            .lookup(&request.tool_name)
            .ok_or_else(|| GateError::UnknownTool {
                tool: request.tool_name.clone(),
            })?;

        let report = self
            .validator
            .validate(&request.arguments, &declaration.schema)?;
        if !report.passed {
            return Err(GateError::SchemaViolation {
                tool: declaration.name.clone(),
                reason: report.summary(),
            });
        }

        // ── Step 2: Allow/deny list ──────────────────────────────────────────
        //
        // Deny always wins, before any grant is looked at.
        let entry = self.policy.list_entry(&declaration.name);
        if let ListEntry::Deny { reason } = &entry {
            return Err(GateError::DenylistMatch {
                tool: declaration.name.clone(),
                reason: reason.clone(),
            });
        }

        // ── Step 3: Route match ──────────────────────────────────────────────
        let check = self.route_check(declaration, &entry, request.route.as_str());
        *route_check = Some(check);
        if check == RouteCheck::Mismatch {
            return Err(GateError::RouteMismatch {
                tool: declaration.name.clone(),
                route: request.route.to_string(),
            });
        }

        // ── Step 4: Capability gate ──────────────────────────────────────────
        let gate = CapabilityGate::new(self.registry.as_ref(), self.grants.as_ref());
        match gate.evaluate_declared(&request.principal, declaration, &request.arguments, now)? {
            GateDecision::Allow => Ok(Verdict::Allow),
            // ── Step 5: Confirmation resolution ──────────────────────────────
            GateDecision::NeedsConfirmation => {
                let Some(token) = request.confirmation_token else {
                    return Err(GateError::ConfirmationRequired {
                        tool: declaration.name.clone(),
                        reason: "no confirmation token supplied".to_string(),
                    });
                };
                self.confirmations.consume(
                    token,
                    &request.principal,
                    &declaration.name,
                    &args_hash(&request.arguments),
                    now,
                )?;
                Ok(Verdict::Allow)
            }
        }
    }

    fn route_check(&self, declaration: &ToolDeclaration, entry: &ListEntry, route: &str) -> RouteCheck {
        if matches!(entry, ListEntry::Allow) {
            RouteCheck::AllowListed
        } else if self.policy.is_route_independent(&declaration.name) {
            RouteCheck::RouteIndependent
        } else if declaration.expects_route(route) {
            RouteCheck::Matched
        } else {
            RouteCheck::Mismatch
        }
    }

    /// Turn a pipeline error into the verdict the caller sees.
    fn verdict_for(&self, request: &AuthorizationRequest, err: GateError) -> Verdict {
        match err.deny_kind() {
            Some(DenyKind::ConfirmationRequired) => Verdict::NeedsConfirmation {
                pending: PendingConfirmation {
                    tool_name: request.tool_name.clone(),
                    args_hash: args_hash(&request.arguments),
                },
                reason: err.to_string(),
            },
            Some(kind) => Verdict::deny(kind, err.to_string()),
            // Infrastructure errors fail closed.
            None => Verdict::deny(DenyKind::InsufficientCapability, err.to_string()),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
